//! Command execution hooks.
//!
//! A [`Hooks`] object carries five independent callback lists fired around a
//! single command execution: pre-execution, post-execution, on-success,
//! on-error, and on-parser-error. One `Hooks` object may be shared across
//! many commands and attached at command, component, or client scope; the
//! dispatcher merges the scopes into a deduplicated list so a set visited
//! from two scopes fires once.
//!
//! # Error suppression
//!
//! On-error callbacks vote: returning `Some(true)` asks for the error to be
//! suppressed (+1), `Some(false)` for it to be re-raised (−1), and `None`
//! abstains (0). The dispatcher sums the votes across every scope and
//! re-raises when the total is ≤ 0.
//!
//! Parser errors are different: malformed user input is expected, so they are
//! dispatched to the separate on-parser-error list which — when non-empty —
//! always suppresses the error.

use std::sync::Arc;

use futures::future::{BoxFuture, join_all};

use crate::errors::{ParserError, SharedError};

/// A plain lifecycle hook callback (post-execution, on-success).
pub type HookFn<Ctx> = Arc<dyn Fn(Ctx) -> BoxFuture<'static, ()> + Send + Sync>;

/// A pre-execution callback. Returning `false` from a command's own hook set
/// aborts the execution before the callback runs.
pub type PreExecutionHookFn<Ctx> = Arc<dyn Fn(Ctx) -> BoxFuture<'static, bool> + Send + Sync>;

/// An on-error callback: `Some(true)` votes suppress, `Some(false)` votes
/// re-raise, `None` abstains.
pub type ErrorHookFn<Ctx> =
    Arc<dyn Fn(Ctx, SharedError) -> BoxFuture<'static, Option<bool>> + Send + Sync>;

/// An on-parser-error callback.
pub type ParserErrorHookFn<Ctx> =
    Arc<dyn Fn(Ctx, Arc<ParserError>) -> BoxFuture<'static, ()> + Send + Sync>;

/// The error forms [`Hooks::trigger_error`] dispatches on.
#[derive(Clone)]
pub enum TriggeredError {
    /// Malformed user input; goes to the parser-error list.
    Parser(Arc<ParserError>),
    /// Any other failure; goes to the error list for the vote.
    Other(SharedError),
}

/// Hook callbacks wrapping a single command execution.
///
/// Within one list, callbacks are gathered concurrently; their relative
/// completion order is not guaranteed, only that all complete before the
/// next phase starts.
pub struct Hooks<Ctx> {
    pre_execution: Vec<PreExecutionHookFn<Ctx>>,
    post_execution: Vec<HookFn<Ctx>>,
    on_success: Vec<HookFn<Ctx>>,
    on_error: Vec<ErrorHookFn<Ctx>>,
    on_parser_error: Vec<ParserErrorHookFn<Ctx>>,
}

impl<Ctx> Default for Hooks<Ctx> {
    fn default() -> Self {
        Self {
            pre_execution: Vec::new(),
            post_execution: Vec::new(),
            on_success: Vec::new(),
            on_error: Vec::new(),
            on_parser_error: Vec::new(),
        }
    }
}

impl<Ctx> Hooks<Ctx>
where
    Ctx: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pre-execution callback.
    pub fn with_pre_execution<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Ctx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.pre_execution
            .push(Arc::new(move |ctx| Box::pin(callback(ctx))));
        self
    }

    /// Adds a post-execution callback.
    pub fn with_post_execution<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Ctx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.post_execution
            .push(Arc::new(move |ctx| Box::pin(callback(ctx))));
        self
    }

    /// Adds an on-success callback.
    pub fn with_on_success<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Ctx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_success
            .push(Arc::new(move |ctx| Box::pin(callback(ctx))));
        self
    }

    /// Adds an on-error callback.
    pub fn with_on_error<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Ctx, SharedError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<bool>> + Send + 'static,
    {
        self.on_error
            .push(Arc::new(move |ctx, error| Box::pin(callback(ctx, error))));
        self
    }

    /// Adds an on-parser-error callback.
    pub fn with_on_parser_error<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Ctx, Arc<ParserError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_parser_error
            .push(Arc::new(move |ctx, error| Box::pin(callback(ctx, error))));
        self
    }

    /// Replaces all pre-execution callbacks with the given one.
    pub fn set_pre_execution<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Ctx) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.pre_execution.clear();
        self.with_pre_execution(callback)
    }

    /// Replaces all on-error callbacks with the given one.
    pub fn set_on_error<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Ctx, SharedError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<bool>> + Send + 'static,
    {
        self.on_error.clear();
        self.with_on_error(callback)
    }

    /// Fires the pre-execution phase.
    ///
    /// Own callbacks are gathered first; if any returns `false` the whole
    /// execution is aborted and this returns `false`. Friend sets fire
    /// afterwards but cannot abort — only the command's own set votes.
    pub async fn trigger_pre_execution(&self, ctx: &Ctx, friends: &[Arc<Hooks<Ctx>>]) -> bool {
        let mut proceed = true;
        if !self.pre_execution.is_empty() {
            let results = join_all(
                self.pre_execution
                    .iter()
                    .map(|callback| callback(ctx.clone())),
            )
            .await;
            proceed = results.into_iter().all(|result| result);
        }

        for friend in friends {
            if !friend.pre_execution.is_empty() {
                join_all(
                    friend
                        .pre_execution
                        .iter()
                        .map(|callback| callback(ctx.clone())),
                )
                .await;
            }
        }

        proceed
    }

    /// Fires the error phase and returns the accumulated suppression level.
    ///
    /// A level > 0 means the error is swallowed; ≤ 0 means the caller should
    /// re-raise it after all hooks ran.
    pub async fn trigger_error(
        &self,
        ctx: &Ctx,
        error: &TriggeredError,
        friends: &[Arc<Hooks<Ctx>>],
    ) -> i64 {
        let mut level = self.trigger_error_own(ctx, error).await;
        for friend in friends {
            level += friend.trigger_error_own(ctx, error).await;
        }
        level
    }

    async fn trigger_error_own(&self, ctx: &Ctx, error: &TriggeredError) -> i64 {
        match error {
            TriggeredError::Parser(parser_error) => {
                if self.on_parser_error.is_empty() {
                    return 0;
                }
                join_all(
                    self.on_parser_error
                        .iter()
                        .map(|callback| callback(ctx.clone(), Arc::clone(parser_error))),
                )
                .await;
                // A handled parser error is never re-raised.
                100
            }
            TriggeredError::Other(shared) => {
                if self.on_error.is_empty() {
                    return 0;
                }
                let votes = join_all(
                    self.on_error
                        .iter()
                        .map(|callback| callback(ctx.clone(), Arc::clone(shared))),
                )
                .await;
                votes
                    .into_iter()
                    .map(|vote| match vote {
                        Some(true) => 1,
                        Some(false) => -1,
                        None => 0,
                    })
                    .sum()
            }
        }
    }

    /// Fires the success phase.
    pub async fn trigger_success(&self, ctx: &Ctx, friends: &[Arc<Hooks<Ctx>>]) {
        if !self.on_success.is_empty() {
            join_all(self.on_success.iter().map(|callback| callback(ctx.clone()))).await;
        }
        for friend in friends {
            if !friend.on_success.is_empty() {
                join_all(
                    friend
                        .on_success
                        .iter()
                        .map(|callback| callback(ctx.clone())),
                )
                .await;
            }
        }
    }

    /// Fires the post-execution phase. This runs on every exit path of a
    /// command execution, whichever branch was taken.
    pub async fn trigger_post_execution(&self, ctx: &Ctx, friends: &[Arc<Hooks<Ctx>>]) {
        if !self.post_execution.is_empty() {
            join_all(
                self.post_execution
                    .iter()
                    .map(|callback| callback(ctx.clone())),
            )
            .await;
        }
        for friend in friends {
            if !friend.post_execution.is_empty() {
                join_all(
                    friend
                        .post_execution
                        .iter()
                        .map(|callback| callback(ctx.clone())),
                )
                .await;
            }
        }
    }
}

impl<Ctx> std::fmt::Debug for Hooks<Ctx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_execution", &self.pre_execution.len())
            .field("post_execution", &self.post_execution.len())
            .field("on_success", &self.on_success.len())
            .field("on_error", &self.on_error.len())
            .field("on_parser_error", &self.on_parser_error.len())
            .finish()
    }
}

/// Merges the hook sets in scope into a deduplicated friend list.
///
/// `own` is excluded so a set attached at both command scope and an outer
/// scope fires once; among the outer scopes, pointer-identical sets are kept
/// only at their innermost position.
pub fn merge_hook_sets<Ctx>(
    own: Option<&Arc<Hooks<Ctx>>>,
    scopes: impl IntoIterator<Item = Option<Arc<Hooks<Ctx>>>>,
) -> Vec<Arc<Hooks<Ctx>>> {
    let mut merged: Vec<Arc<Hooks<Ctx>>> = Vec::new();
    for hooks in scopes.into_iter().flatten() {
        let is_own = own.is_some_and(|own| Arc::ptr_eq(own, &hooks));
        let seen = merged.iter().any(|existing| Arc::ptr_eq(existing, &hooks));
        if !is_own && !seen {
            merged.push(hooks);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    type TestHooks = Hooks<()>;

    fn voting_hooks(votes: Vec<Option<bool>>) -> TestHooks {
        let mut hooks = TestHooks::new();
        for vote in votes {
            hooks = hooks.with_on_error(move |_, _| async move { vote });
        }
        hooks
    }

    fn shared_error() -> TriggeredError {
        TriggeredError::Other(Arc::new(std::io::Error::other("boom")))
    }

    #[tokio::test]
    async fn test_majority_vote_suppresses() {
        let hooks = voting_hooks(vec![Some(true), Some(true), Some(false)]);
        assert_eq!(hooks.trigger_error(&(), &shared_error(), &[]).await, 1);
    }

    #[tokio::test]
    async fn test_majority_vote_reraises() {
        let hooks = voting_hooks(vec![Some(true), Some(false), Some(false)]);
        assert_eq!(hooks.trigger_error(&(), &shared_error(), &[]).await, -1);
    }

    #[tokio::test]
    async fn test_abstentions_do_not_suppress() {
        let hooks = voting_hooks(vec![None, None]);
        assert_eq!(hooks.trigger_error(&(), &shared_error(), &[]).await, 0);
    }

    #[tokio::test]
    async fn test_votes_accumulate_across_scopes() {
        let own = voting_hooks(vec![Some(false)]);
        let friend = Arc::new(voting_hooks(vec![Some(true), Some(true)]));
        let level = own.trigger_error(&(), &shared_error(), &[friend]).await;
        assert_eq!(level, 1);
    }

    #[tokio::test]
    async fn test_parser_error_always_suppresses_when_handled() {
        let counter = Arc::new(AtomicI64::new(0));
        let seen = Arc::clone(&counter);
        let hooks = TestHooks::new().with_on_parser_error(move |_, _| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        let error = TriggeredError::Parser(Arc::new(ParserError::NotEnoughArguments {
            parameter: "x".to_owned(),
        }));
        let level = hooks.trigger_error(&(), &error, &[]).await;
        assert_eq!(level, 100);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unhandled_parser_error_abstains() {
        let hooks = voting_hooks(vec![Some(true)]);
        let error = TriggeredError::Parser(Arc::new(ParserError::TooManyArguments {
            token: "extra".to_owned(),
        }));
        // No parser-error callbacks anywhere: level stays 0 and the caller
        // re-raises.
        assert_eq!(hooks.trigger_error(&(), &error, &[]).await, 0);
    }

    #[tokio::test]
    async fn test_own_pre_execution_false_aborts() {
        let hooks = TestHooks::new()
            .with_pre_execution(|_| async { true })
            .with_pre_execution(|_| async { false });
        assert!(!hooks.trigger_pre_execution(&(), &[]).await);
    }

    #[tokio::test]
    async fn test_friend_pre_execution_cannot_abort() {
        let own = TestHooks::new();
        let friend = Arc::new(TestHooks::new().with_pre_execution(|_| async { false }));
        assert!(own.trigger_pre_execution(&(), &[friend]).await);
    }

    #[test]
    fn test_merge_dedups_and_skips_own() {
        let own = Arc::new(TestHooks::new());
        let outer = Arc::new(TestHooks::new());
        let merged = merge_hook_sets(
            Some(&own),
            [
                Some(Arc::clone(&own)),
                Some(Arc::clone(&outer)),
                Some(Arc::clone(&outer)),
                None,
            ],
        );
        assert_eq!(merged.len(), 1);
        assert!(Arc::ptr_eq(&merged[0], &outer));
    }
}
