//! Command checks.
//!
//! A check is an async predicate over the execution context that gates
//! whether a command may run. Checks attached to one command run strictly in
//! registration order and must all pass; a failing check makes command search
//! continue to the next candidate unless it raises [`CheckFailure::Halt`]
//! (hard stop) or [`CheckFailure::Command`] (respond and stop).
//!
//! The standard checks ([`GuildCheck`], [`OwnerCheck`], …) share one failure
//! policy: on a failed predicate, prefer a custom error factory if supplied,
//! else a halt signal if requested, else a user-facing error message, else a
//! plain `false`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;
use tracing::trace;

use herald_core::model::Application;
use herald_core::permissions::Permissions;

use crate::context::Context;
use crate::errors::{BoxError, CommandError};
use crate::permissions::calculate_permissions;

/// Why a check did not simply return `true` or `false`.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailure {
    /// Respond with this error's message and stop dispatching.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Stop the whole command search, including sibling components.
    #[error("execution halted")]
    Halt,

    /// The check itself failed to evaluate (e.g. a REST call errored).
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl From<herald_core::rest::RestError> for CheckFailure {
    fn from(error: herald_core::rest::RestError) -> Self {
        Self::Other(Box::new(error))
    }
}

/// The result of one check evaluation.
pub type CheckResult = Result<bool, CheckFailure>;

/// A type-erased check callback.
pub type CheckFn<Ctx> = Arc<dyn Fn(Ctx) -> BoxFuture<'static, CheckResult> + Send + Sync>;

/// Wraps an async closure into a [`CheckFn`].
pub fn check<Ctx, F, Fut>(f: F) -> CheckFn<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
    F: Fn(Ctx) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CheckResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Runs checks in registration order with short-circuiting AND semantics.
///
/// Returns `Ok(false)` at the first check that returns `false`;
/// [`CheckFailure::Halt`] and [`CheckFailure::Command`] propagate to the
/// dispatcher untouched.
pub async fn gather_checks<Ctx: Clone>(ctx: &Ctx, checks: &[CheckFn<Ctx>]) -> CheckResult {
    for (index, check) in checks.iter().enumerate() {
        if !check(ctx.clone()).await? {
            trace!(index, "check failed, skipping command");
            return Ok(false);
        }
    }
    Ok(true)
}

// ─── Failure policy ──────────────────────────────────────────────────────────

/// How a standard check reports a failed predicate.
#[derive(Clone, Default)]
pub struct FailurePolicy {
    error_factory: Option<Arc<dyn Fn() -> CommandError + Send + Sync>>,
    halt: bool,
    message: Option<String>,
}

impl FailurePolicy {
    fn settle(&self, passed: bool) -> CheckResult {
        if passed {
            return Ok(true);
        }
        if let Some(factory) = &self.error_factory {
            return Err(CheckFailure::Command(factory()));
        }
        if self.halt {
            return Err(CheckFailure::Halt);
        }
        if let Some(message) = &self.message {
            return Err(CheckFailure::Command(CommandError::new(message.clone())));
        }
        Ok(false)
    }
}

macro_rules! impl_policy_setters {
    ($($check:ident),* $(,)?) => {
        $(
            impl $check {
                /// Reports failure by raising the error this factory builds.
                pub fn error(mut self, factory: impl Fn() -> CommandError + Send + Sync + 'static) -> Self {
                    self.policy.error_factory = Some(Arc::new(factory));
                    self
                }

                /// Reports failure by halting the whole command search.
                pub fn halt_execution(mut self) -> Self {
                    self.policy.halt = true;
                    self
                }

                /// Reports failure by responding with this message.
                pub fn error_message(mut self, message: impl Into<String>) -> Self {
                    self.policy.message = Some(message.into());
                    self
                }
            }
        )*
    };
}

impl_policy_setters!(
    DmCheck,
    GuildCheck,
    NsfwCheck,
    SfwCheck,
    OwnerCheck,
    AuthorPermissionCheck,
    OwnPermissionCheck,
);

// ─── Standard checks ─────────────────────────────────────────────────────────

/// Only lets a command run in a DM channel.
#[derive(Clone, Default)]
pub struct DmCheck {
    policy: FailurePolicy,
}

impl DmCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_check<C: Context>(self) -> CheckFn<C> {
        check(move |ctx: C| {
            let policy = self.policy.clone();
            async move { policy.settle(ctx.guild_id().is_none()) }
        })
    }
}

/// Only lets a command run in a guild channel.
#[derive(Clone, Default)]
pub struct GuildCheck {
    policy: FailurePolicy,
}

impl GuildCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_check<C: Context>(self) -> CheckFn<C> {
        check(move |ctx: C| {
            let policy = self.policy.clone();
            async move { policy.settle(ctx.guild_id().is_some()) }
        })
    }
}

async fn channel_is_nsfw<C: Context>(ctx: &C) -> Result<bool, CheckFailure> {
    // DM channels are never age-restricted by the platform; treat them as
    // nsfw-allowed like guild channels with the flag set.
    if ctx.guild_id().is_none() {
        return Ok(true);
    }

    let channel_id = ctx.channel_id();
    if let Some(channel) = ctx
        .client()
        .cache()
        .and_then(|cache| cache.guild_channel(channel_id))
    {
        return Ok(channel.is_nsfw);
    }

    let channel = ctx.client().rest().fetch_channel(channel_id).await?;
    Ok(channel.is_nsfw)
}

/// Only lets a command run in a channel marked as nsfw.
#[derive(Clone, Default)]
pub struct NsfwCheck {
    policy: FailurePolicy,
}

impl NsfwCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_check<C: Context>(self) -> CheckFn<C> {
        check(move |ctx: C| {
            let policy = self.policy.clone();
            async move { policy.settle(channel_is_nsfw(&ctx).await?) }
        })
    }
}

/// Only lets a command run in a channel not marked as nsfw.
#[derive(Clone, Default)]
pub struct SfwCheck {
    policy: FailurePolicy,
}

impl SfwCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_check<C: Context>(self) -> CheckFn<C> {
        check(move |ctx: C| {
            let policy = self.policy.clone();
            async move { policy.settle(!channel_is_nsfw(&ctx).await?) }
        })
    }
}

struct OwnerState {
    application: Option<Application>,
    fetched_at: Option<Instant>,
}

/// Only lets a command run for the bot's owner(s).
///
/// Accounts for team-owned applications. The application record is fetched
/// through the REST seam and cached for `expire_after` (5 minutes by
/// default).
pub struct OwnerCheck {
    policy: FailurePolicy,
    expire_after: Duration,
    state: tokio::sync::Mutex<OwnerState>,
}

impl Default for OwnerCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl OwnerCheck {
    pub fn new() -> Self {
        Self {
            policy: FailurePolicy::default(),
            expire_after: Duration::from_secs(300),
            state: tokio::sync::Mutex::new(OwnerState {
                application: None,
                fetched_at: None,
            }),
        }
    }

    /// Overrides how long a fetched application record stays fresh.
    pub fn expire_after(mut self, expire_after: Duration) -> Self {
        self.expire_after = expire_after;
        self
    }

    async fn application<C: Context>(&self, ctx: &C) -> Result<Application, CheckFailure> {
        let mut state = self.state.lock().await;
        let fresh = state
            .fetched_at
            .is_some_and(|at| at.elapsed() < self.expire_after);
        if let (true, Some(application)) = (fresh, &state.application) {
            return Ok(application.clone());
        }

        let application = ctx.client().rest().fetch_application().await?;
        state.application = Some(application.clone());
        state.fetched_at = Some(Instant::now());
        Ok(application)
    }

    pub fn into_check<C: Context>(self) -> CheckFn<C> {
        let this = Arc::new(self);
        check(move |ctx: C| {
            let this = Arc::clone(&this);
            async move {
                let application = this.application(&ctx).await?;
                this.policy.settle(application.is_owned_by(ctx.author().id))
            }
        })
    }
}

/// Only lets a command run when its author holds the given permissions in the
/// current channel.
///
/// Always passes in DMs.
#[derive(Clone)]
pub struct AuthorPermissionCheck {
    required: Permissions,
    policy: FailurePolicy,
}

impl AuthorPermissionCheck {
    pub fn new(required: Permissions) -> Self {
        Self {
            required,
            policy: FailurePolicy::default(),
        }
    }

    pub fn into_check<C: Context>(self) -> CheckFn<C> {
        check(move |ctx: C| {
            let this = self.clone();
            async move {
                let Some(member) = ctx.member().cloned() else {
                    return this.policy.settle(true);
                };
                let held =
                    calculate_permissions(ctx.client(), &member, Some(ctx.channel_id())).await?;
                this.policy.settle(held.contains(this.required))
            }
        })
    }
}

/// Only lets a command run when the bot itself holds the given permissions in
/// the current channel.
///
/// Always passes in DMs. The bot's own user is fetched once and cached for
/// the lifetime of the check.
pub struct OwnPermissionCheck {
    required: Permissions,
    policy: FailurePolicy,
    me: tokio::sync::Mutex<Option<herald_core::model::User>>,
}

impl OwnPermissionCheck {
    pub fn new(required: Permissions) -> Self {
        Self {
            required,
            policy: FailurePolicy::default(),
            me: tokio::sync::Mutex::new(None),
        }
    }

    async fn own_user<C: Context>(&self, ctx: &C) -> Result<herald_core::model::User, CheckFailure> {
        let mut me = self.me.lock().await;
        if let Some(user) = &*me {
            return Ok(user.clone());
        }

        let user = match ctx.client().cache().and_then(|cache| cache.current_user()) {
            Some(user) => user,
            None => ctx.client().rest().fetch_my_user().await?,
        };
        *me = Some(user.clone());
        Ok(user)
    }

    pub fn into_check<C: Context>(self) -> CheckFn<C> {
        let this = Arc::new(self);
        check(move |ctx: C| {
            let this = Arc::clone(&this);
            async move {
                let Some(guild_id) = ctx.guild_id() else {
                    return this.policy.settle(true);
                };

                let user = this.own_user(&ctx).await?;
                let member = match ctx
                    .client()
                    .cache()
                    .and_then(|cache| cache.member(guild_id, user.id))
                {
                    Some(member) => member,
                    None => ctx.client().rest().fetch_member(guild_id, user.id).await?,
                };

                let held =
                    calculate_permissions(ctx.client(), &member, Some(ctx.channel_id())).await?;
                this.policy.settle(held.contains(this.required))
            }
        })
    }
}

// ─── Any-of combinator ───────────────────────────────────────────────────────

/// Combines checks with OR semantics: the first one to pass wins.
///
/// Failure kinds declared as expected are treated as a soft fail and the next
/// check is tried; unexpected kinds abort the chain immediately. When no
/// check passes the configured failure policy decides what to raise.
pub struct AnyChecks<Ctx> {
    checks: Vec<CheckFn<Ctx>>,
    suppress_command_errors: bool,
    suppress_halts: bool,
    policy: FailurePolicy,
}

impl<Ctx> Default for AnyChecks<Ctx> {
    fn default() -> Self {
        Self {
            checks: Vec::new(),
            suppress_command_errors: true,
            suppress_halts: false,
            policy: FailurePolicy::default(),
        }
    }
}

impl<Ctx> AnyChecks<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check(mut self, check: CheckFn<Ctx>) -> Self {
        self.checks.push(check);
        self
    }

    /// Whether a member check raising a user-facing error counts as a soft
    /// fail (defaults to `true`).
    pub fn suppress_command_errors(mut self, suppress: bool) -> Self {
        self.suppress_command_errors = suppress;
        self
    }

    /// Whether a member check raising a halt counts as a soft fail (defaults
    /// to `false`).
    pub fn suppress_halts(mut self, suppress: bool) -> Self {
        self.suppress_halts = suppress;
        self
    }

    /// Reports all-failed by raising the error this factory builds.
    pub fn error(mut self, factory: impl Fn() -> CommandError + Send + Sync + 'static) -> Self {
        self.policy.error_factory = Some(Arc::new(factory));
        self
    }

    /// Reports all-failed by halting the whole command search.
    pub fn halt_execution(mut self) -> Self {
        self.policy.halt = true;
        self
    }

    /// Reports all-failed by responding with this message.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.policy.message = Some(message.into());
        self
    }

    pub fn into_check(self) -> CheckFn<Ctx> {
        let this = Arc::new(self);
        check(move |ctx: Ctx| {
            let this = Arc::clone(&this);
            async move {
                for member in &this.checks {
                    match member(ctx.clone()).await {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(CheckFailure::Command(_)) if this.suppress_command_errors => {}
                        Err(CheckFailure::Halt) if this.suppress_halts => {}
                        Err(failure) => return Err(failure),
                    }
                }
                this.policy.settle(false)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passing() -> CheckFn<()> {
        check(|_| async { Ok(true) })
    }

    fn failing() -> CheckFn<()> {
        check(|_| async { Ok(false) })
    }

    fn erroring() -> CheckFn<()> {
        check(|_| async { Err(CheckFailure::Command(CommandError::new("denied"))) })
    }

    fn halting() -> CheckFn<()> {
        check(|_| async { Err(CheckFailure::Halt) })
    }

    #[tokio::test]
    async fn test_gather_checks_all_pass() {
        let checks = vec![passing(), passing()];
        assert!(gather_checks(&(), &checks).await.unwrap());
    }

    #[tokio::test]
    async fn test_gather_checks_short_circuits_on_false() {
        let checks = vec![passing(), failing(), erroring()];
        // The erroring check is never reached.
        assert!(!gather_checks(&(), &checks).await.unwrap());
    }

    #[tokio::test]
    async fn test_gather_checks_empty_passes() {
        assert!(gather_checks::<()>(&(), &[]).await.unwrap());
    }

    #[tokio::test]
    async fn test_gather_checks_propagates_halt() {
        let checks = vec![halting()];
        assert!(matches!(
            gather_checks(&(), &checks).await,
            Err(CheckFailure::Halt)
        ));
    }

    #[tokio::test]
    async fn test_any_checks_first_pass_wins() {
        let combined = AnyChecks::new()
            .with_check(failing())
            .with_check(passing())
            .into_check();
        assert!(combined(()).await.unwrap());
    }

    #[tokio::test]
    async fn test_any_checks_suppresses_expected_command_error() {
        let combined = AnyChecks::new()
            .with_check(erroring())
            .with_check(passing())
            .into_check();
        assert!(combined(()).await.unwrap());
    }

    #[tokio::test]
    async fn test_any_checks_halt_aborts_by_default() {
        let combined = AnyChecks::new()
            .with_check(halting())
            .with_check(passing())
            .into_check();
        assert!(matches!(combined(()).await, Err(CheckFailure::Halt)));
    }

    #[tokio::test]
    async fn test_any_checks_all_fail_uses_policy() {
        let combined = AnyChecks::new()
            .with_check(failing())
            .error_message("none of that")
            .into_check();
        match combined(()).await {
            Err(CheckFailure::Command(error)) => assert_eq!(error.message, "none of that"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_any_checks_all_fail_without_policy_is_false() {
        let combined = AnyChecks::new().with_check(failing()).into_check();
        assert!(!combined(()).await.unwrap());
    }
}
