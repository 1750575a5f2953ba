//! The top-level client registry.
//!
//! A [`Client`] owns the registered components, the process-wide dependency
//! registry, message prefixes, client-scope checks and hooks, and the
//! declared-command cache. Inbound events enter here:
//!
//! - [`Client::dispatch_message`] strips a prefix and offers the remaining
//!   content to each component in registration order until one handles it.
//! - [`Client::dispatch_interaction`] routes slash/menu interactions to the
//!   component declaring the named command, responding not-found otherwise.
//! - [`Client::dispatch_autocomplete`] routes autocomplete requests the same
//!   way, without checks or hooks.
//!
//! Registration methods are meant to be called during setup or a reload
//! window, not concurrently with live dispatch.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use herald_core::declare::CommandData;
use herald_core::interaction::{AutocompleteInteraction, CommandInteraction};
use herald_core::model::Message;
use herald_core::rest::{Cache, Rest, SharedCache, SharedRest};

use crate::checks::{CheckFailure, CheckFn, gather_checks};
use crate::component::Component;
use crate::context::{AnyContext, AutocompleteContext, MessageContext, SlashContext};
use crate::dependencies::DependencyRegistry;
use crate::errors::{ExecutionError, LifecycleError, SchemaError};
use crate::hooks::Hooks;

static CLIENT_KEYS: AtomicU64 = AtomicU64::new(1);

const DEFAULT_NOT_FOUND_MESSAGE: &str = "Command not found";

/// Builds a [`Client`].
pub struct ClientBuilder {
    rest: SharedRest,
    cache: Option<SharedCache>,
    prefixes: Vec<String>,
    case_sensitive: bool,
    not_found_message: String,
}

impl ClientBuilder {
    pub fn new(rest: impl Rest + 'static) -> Self {
        Self {
            rest: Arc::new(rest),
            cache: None,
            prefixes: Vec::new(),
            case_sensitive: true,
            not_found_message: DEFAULT_NOT_FOUND_MESSAGE.to_owned(),
        }
    }

    /// Attaches a cache layer consulted before REST fallbacks.
    pub fn cache(mut self, cache: impl Cache + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Adds a message command prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Sets whether message command names match case-sensitively
    /// (defaults to `true`; components may override).
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Sets the response sent when an interaction names no known command.
    pub fn not_found_message(mut self, message: impl Into<String>) -> Self {
        self.not_found_message = message.into();
        self
    }

    pub fn build(self) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                key: CLIENT_KEYS.fetch_add(1, Ordering::Relaxed),
                rest: self.rest,
                cache: self.cache,
                components: RwLock::new(Vec::new()),
                dependencies: DependencyRegistry::new(),
                prefixes: RwLock::new(self.prefixes),
                case_sensitive: AtomicBool::new(self.case_sensitive),
                checks: RwLock::new(Vec::new()),
                message_hooks: RwLock::new(None),
                slash_hooks: RwLock::new(None),
                not_found_message: RwLock::new(self.not_found_message),
                declared_commands: RwLock::new(Vec::new()),
                running: AtomicBool::new(false),
            }),
        }
    }
}

struct ClientInner {
    key: u64,
    rest: SharedRest,
    cache: Option<SharedCache>,
    components: RwLock<Vec<Arc<Component>>>,
    dependencies: DependencyRegistry,
    prefixes: RwLock<Vec<String>>,
    case_sensitive: AtomicBool,
    checks: RwLock<Vec<CheckFn<AnyContext>>>,
    message_hooks: RwLock<Option<Arc<Hooks<MessageContext>>>>,
    slash_hooks: RwLock<Option<Arc<Hooks<SlashContext>>>>,
    not_found_message: RwLock<String>,
    declared_commands: RwLock<Vec<CommandData>>,
    running: AtomicBool,
}

/// The top-level registry owning components and process-wide state.
///
/// Cheap to clone; all clones share the same registry.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn builder(rest: impl Rest + 'static) -> ClientBuilder {
        ClientBuilder::new(rest)
    }

    pub fn rest(&self) -> &SharedRest {
        &self.inner.rest
    }

    pub fn cache(&self) -> Option<&SharedCache> {
        self.inner.cache.as_ref()
    }

    pub fn dependencies(&self) -> &DependencyRegistry {
        &self.inner.dependencies
    }

    /// Registers a dependency resolvable from any context by its type.
    pub fn set_dependency<T: Send + Sync + 'static>(&self, value: T) -> &Self {
        self.inner.dependencies.set(value);
        self
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.inner.case_sensitive.load(Ordering::Relaxed)
    }

    pub fn set_case_sensitive(&self, case_sensitive: bool) -> &Self {
        self.inner
            .case_sensitive
            .store(case_sensitive, Ordering::Relaxed);
        self
    }

    pub fn prefixes(&self) -> Vec<String> {
        self.inner.prefixes.read().clone()
    }

    pub fn add_prefix(&self, prefix: impl Into<String>) -> &Self {
        self.inner.prefixes.write().push(prefix.into());
        self
    }

    pub fn not_found_message(&self) -> String {
        self.inner.not_found_message.read().clone()
    }

    pub fn set_not_found_message(&self, message: impl Into<String>) -> &Self {
        *self.inner.not_found_message.write() = message.into();
        self
    }

    /// Adds a client-level check gating every command dispatch.
    pub fn add_check(&self, check: CheckFn<AnyContext>) -> &Self {
        self.inner.checks.write().push(check);
        self
    }

    /// Sets the hook set wrapping every message command execution.
    pub fn set_message_hooks(&self, hooks: Arc<Hooks<MessageContext>>) -> &Self {
        *self.inner.message_hooks.write() = Some(hooks);
        self
    }

    /// Sets the hook set wrapping every slash and menu command execution.
    pub fn set_slash_hooks(&self, hooks: Arc<Hooks<SlashContext>>) -> &Self {
        *self.inner.slash_hooks.write() = Some(hooks);
        self
    }

    // ─── Component registry ───────────────────────────────────────────────

    /// Adds a component, binding it to this client.
    ///
    /// Fails when a component with the same name is already registered or
    /// the component is still bound elsewhere.
    pub fn add_component(&self, component: Component) -> Result<(), SchemaError> {
        let mut components = self.inner.components.write();
        if components
            .iter()
            .any(|existing| existing.name() == component.name())
        {
            return Err(SchemaError::DuplicateComponent {
                name: component.name().to_owned(),
            });
        }

        component.bind_client(self.inner.key)?;
        debug!(component = component.name(), "component added");
        components.push(Arc::new(component));
        Ok(())
    }

    /// Removes a component by name, unbinding it.
    pub fn remove_component(&self, name: &str) -> Result<Arc<Component>, SchemaError> {
        let mut components = self.inner.components.write();
        let Some(position) = components
            .iter()
            .position(|component| component.name() == name)
        else {
            return Err(SchemaError::NotBound {
                name: name.to_owned(),
            });
        };

        let component = components.remove(position);
        component.unbind_client()?;
        debug!(component = name, "component removed");
        Ok(component)
    }

    pub fn component(&self, name: &str) -> Option<Arc<Component>> {
        self.inner
            .components
            .read()
            .iter()
            .find(|component| component.name() == name)
            .cloned()
    }

    /// A snapshot of the registered components, in registration order.
    pub fn components(&self) -> Vec<Arc<Component>> {
        self.inner.components.read().clone()
    }

    /// Collects the declared registration data of every slash and menu
    /// command across all components and caches it.
    pub fn build_declared_commands(&self) -> Vec<CommandData> {
        let declared: Vec<CommandData> = self
            .components()
            .iter()
            .flat_map(|component| component.build_commands())
            .collect();
        *self.inner.declared_commands.write() = declared.clone();
        declared
    }

    /// The declared-command cache from the last
    /// [`Self::build_declared_commands`] call.
    pub fn declared_commands(&self) -> Vec<CommandData> {
        self.inner.declared_commands.read().clone()
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────

    /// Opens the client, firing every component's open callbacks.
    pub async fn open(&self) -> Result<(), LifecycleError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(LifecycleError::AlreadyRunning);
        }

        debug!("client opening");
        for component in self.components() {
            component.run_on_open(self.clone()).await;
        }
        Ok(())
    }

    /// Closes the client, firing every component's close callbacks.
    pub async fn close(&self) -> Result<(), LifecycleError> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return Err(LifecycleError::NotRunning);
        }

        debug!("client closing");
        for component in self.components() {
            component.run_on_close(self.clone()).await;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Fires every component's callbacks registered under `name`.
    pub async fn dispatch_client_callback(&self, name: &str) {
        for component in self.components() {
            component.run_client_callback(self.clone(), name).await;
        }
    }

    /// Dispatches an event value to every listener registered for its type.
    pub async fn dispatch_event<E: Send + Sync + 'static>(&self, event: E) {
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(event);
        for component in self.components() {
            component
                .dispatch_event_erased(self.clone(), TypeId::of::<E>(), &erased)
                .await;
        }
    }

    // ─── Dispatch ─────────────────────────────────────────────────────────

    fn strip_prefix(&self, content: &str) -> Option<(String, String)> {
        let prefixes = self.inner.prefixes.read();
        for prefix in prefixes.iter() {
            if let Some(rest) = content.strip_prefix(prefix.as_str()) {
                return Some((prefix.clone(), rest.trim_start().to_owned()));
            }
        }
        None
    }

    /// Runs client-level checks; `Ok(false)` means silently ignore the
    /// event.
    async fn run_client_checks(&self, ctx: &AnyContext) -> Result<bool, ExecutionError> {
        let checks = self.inner.checks.read().clone();
        match gather_checks(ctx, &checks).await {
            Ok(passed) => Ok(passed),
            Err(CheckFailure::Command(error)) => {
                match ctx {
                    AnyContext::Message(ctx) => ctx.respond_error(&error).await,
                    AnyContext::Slash(ctx) => ctx.respond_error(&error).await,
                }
                Err(ExecutionError::Halt)
            }
            Err(CheckFailure::Halt) => Err(ExecutionError::Halt),
            Err(CheckFailure::Other(error)) => Err(ExecutionError::Other(Arc::from(error))),
        }
    }

    /// Dispatches an inbound message.
    ///
    /// Returns `Ok(true)` when a command handled it (including a halt), and
    /// `Ok(false)` when the message carried no known prefix or command.
    /// Unsuppressed command failures escape as the error.
    pub async fn dispatch_message(&self, message: Message) -> Result<bool, ExecutionError> {
        let Some((prefix, content)) = self.strip_prefix(&message.content) else {
            return Ok(false);
        };
        if content.is_empty() {
            return Ok(false);
        }

        let mut ctx = MessageContext::new(self.clone(), message, content, prefix);
        ctx.set_case_sensitive(self.is_case_sensitive());

        match self.run_client_checks(&AnyContext::Message(ctx.clone())).await {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(ExecutionError::Halt) => return Ok(true),
            Err(error) => return Err(error),
        }

        let client_hooks = self.inner.message_hooks.read().clone();
        for component in self.components() {
            match component
                .execute_message(ctx.clone(), client_hooks.clone())
                .await
            {
                Ok(true) => return Ok(true),
                Ok(false) => continue,
                Err(ExecutionError::Halt) => {
                    debug!("message command search halted");
                    return Ok(true);
                }
                Err(error) => return Err(error),
            }
        }

        trace!("message matched no command");
        Ok(false)
    }

    /// Dispatches a slash or menu command interaction.
    ///
    /// Responds not-found when no component declares the named command.
    pub async fn dispatch_interaction(
        &self,
        interaction: CommandInteraction,
    ) -> Result<bool, ExecutionError> {
        let ctx = SlashContext::new(self.clone(), interaction);

        match self.run_client_checks(&AnyContext::Slash(ctx.clone())).await {
            Ok(true) => {}
            Ok(false) => {
                self.respond_not_found(&ctx).await;
                return Ok(false);
            }
            Err(ExecutionError::Halt) => {
                self.respond_not_found(&ctx).await;
                return Ok(true);
            }
            Err(error) => return Err(error),
        }

        let client_hooks = self.inner.slash_hooks.read().clone();
        for component in self.components() {
            match component
                .execute_interaction(ctx.clone(), client_hooks.clone())
                .await
            {
                Ok(true) => return Ok(true),
                Ok(false) => continue,
                Err(ExecutionError::Halt) => {
                    debug!("interaction command search halted");
                    self.respond_not_found(&ctx).await;
                    return Ok(true);
                }
                Err(error) => return Err(error),
            }
        }

        self.respond_not_found(&ctx).await;
        Ok(false)
    }

    /// Dispatches an autocomplete request. No checks or hooks run for these.
    pub async fn dispatch_autocomplete(
        &self,
        interaction: AutocompleteInteraction,
    ) -> Result<bool, ExecutionError> {
        let ctx = AutocompleteContext::new(self.clone(), interaction);
        for component in self.components() {
            if component.execute_autocomplete(ctx.clone()).await? {
                return Ok(true);
            }
        }

        trace!("autocomplete matched no command");
        Ok(false)
    }

    async fn respond_not_found(&self, ctx: &SlashContext) {
        if let Err(error) = ctx.mark_not_found().await {
            debug!(error = %error, "failed to send not-found response");
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("components", &self.inner.components.read().len())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use herald_core::declare::CommandType;
    use herald_core::id::{ChannelId, GuildId, InteractionId, MessageId, UserId};
    use herald_core::interaction::{InteractionOption, OptionValue, ResolvedData};
    use herald_core::model::{Application, Guild, GuildChannel, Member, Role, User};
    use herald_core::rest::RestError;

    use crate::commands::message::MessageCommand;
    use crate::commands::slash::{SlashCommand, SlashCommandGroup, SlashOption};
    use crate::commands::{message_callback, slash_callback};
    use crate::context::Context;
    use crate::errors::CommandError;

    #[derive(Clone, Default)]
    struct RecordingRest {
        messages: Arc<StdMutex<Vec<String>>>,
        responses: Arc<StdMutex<Vec<(String, bool)>>>,
    }

    impl RecordingRest {
        fn sent_messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }

        fn sent_responses(&self) -> Vec<(String, bool)> {
            self.responses.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Rest for RecordingRest {
        async fn fetch_guild(&self, _: GuildId) -> Result<Guild, RestError> {
            Err(RestError::NotFound)
        }

        async fn fetch_roles(&self, _: GuildId) -> Result<Vec<Role>, RestError> {
            Err(RestError::NotFound)
        }

        async fn fetch_channel(&self, _: ChannelId) -> Result<GuildChannel, RestError> {
            Err(RestError::NotFound)
        }

        async fn fetch_member(&self, _: GuildId, _: UserId) -> Result<Member, RestError> {
            Err(RestError::NotFound)
        }

        async fn fetch_application(&self) -> Result<Application, RestError> {
            Err(RestError::NotFound)
        }

        async fn fetch_my_user(&self) -> Result<User, RestError> {
            Err(RestError::NotFound)
        }

        async fn create_message(&self, _: ChannelId, content: &str) -> Result<(), RestError> {
            self.messages.lock().unwrap().push(content.to_owned());
            Ok(())
        }

        async fn create_interaction_response(
            &self,
            _: InteractionId,
            _: &str,
            content: &str,
            ephemeral: bool,
        ) -> Result<(), RestError> {
            self.responses
                .lock()
                .unwrap()
                .push((content.to_owned(), ephemeral));
            Ok(())
        }
    }

    fn author() -> User {
        User {
            id: UserId(7),
            username: "caller".to_owned(),
            is_bot: false,
        }
    }

    fn message(content: &str) -> Message {
        Message {
            id: MessageId(1),
            channel_id: ChannelId(10),
            guild_id: Some(GuildId(5)),
            author: author(),
            member: None,
            content: content.to_owned(),
        }
    }

    fn interaction(name: &str, options: Vec<InteractionOption>) -> CommandInteraction {
        CommandInteraction {
            id: InteractionId(100),
            token: "token".to_owned(),
            command_name: name.to_owned(),
            command_type: CommandType::Slash,
            channel_id: ChannelId(10),
            guild_id: Some(GuildId(5)),
            user: author(),
            member: None,
            options,
            resolved: ResolvedData::default(),
            target_message_id: None,
            target_user_id: None,
        }
    }

    fn client(rest: &RecordingRest) -> Client {
        Client::builder(rest.clone()).prefix("!").build()
    }

    // ─── Message dispatch ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_message_without_prefix_ignored() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let handled = client.dispatch_message(message("ping")).await.unwrap();
        assert!(!handled);
    }

    #[tokio::test]
    async fn test_message_command_dispatch_and_content_trim() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let seen = Arc::new(StdMutex::new(Vec::<String>::new()));

        let seen_clone = Arc::clone(&seen);
        let command = MessageCommand::new(
            "echo",
            message_callback(move |ctx, _| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    seen.lock().unwrap().push(ctx.content().to_owned());
                    Ok(())
                }
            }),
        );

        let mut component = Component::new("general");
        component.add_message_command(command).unwrap();
        client.add_component(component).unwrap();

        let handled = client
            .dispatch_message(message("!echo hello there"))
            .await
            .unwrap();
        assert!(handled);
        assert_eq!(*seen.lock().unwrap(), vec!["hello there".to_owned()]);
    }

    #[tokio::test]
    async fn test_strict_group_dispatch_and_fallback() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let calls = Arc::new(StdMutex::new(Vec::<(String, String)>::new()));

        let track = |label: &'static str, calls: &Arc<StdMutex<Vec<(String, String)>>>| {
            let calls = Arc::clone(calls);
            message_callback(move |ctx, _| {
                let calls = Arc::clone(&calls);
                let label = label.to_owned();
                async move {
                    calls.lock().unwrap().push((label, ctx.content().to_owned()));
                    Ok(())
                }
            })
        };

        let group = MessageCommand::group("note", true, track("fallback", &calls))
            .child(MessageCommand::new("add", track("add", &calls)))
            .unwrap()
            .child(MessageCommand::new("remove", track("remove", &calls)))
            .unwrap();

        let mut component = Component::new("notes");
        component.add_message_command(group).unwrap();
        client.add_component(component).unwrap();

        // "add milk" dispatches to the child with the name trimmed off.
        client
            .dispatch_message(message("!note add milk"))
            .await
            .unwrap();
        // "addendum" must not match "add" (word boundary) and falls back.
        client
            .dispatch_message(message("!note addendum milk"))
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], ("add".to_owned(), "milk".to_owned()));
        assert_eq!(calls[1], ("fallback".to_owned(), "addendum milk".to_owned()));
    }

    #[tokio::test]
    async fn test_strict_group_duplicate_names_fail_at_registration() {
        let result = MessageCommand::group(
            "note",
            true,
            message_callback(|_, _| async { Ok(()) }),
        )
        .child(MessageCommand::new("add", message_callback(|_, _| async { Ok(()) })))
        .unwrap()
        .child(MessageCommand::new("add", message_callback(|_, _| async { Ok(()) })));

        assert!(matches!(result, Err(SchemaError::DuplicateNames { .. })));
    }

    #[tokio::test]
    async fn test_command_error_is_sent_as_response() {
        let rest = RecordingRest::default();
        let client = client(&rest);

        let command = MessageCommand::new(
            "fail",
            message_callback(|_, _| async {
                Err(CommandError::new("you cannot do that").into())
            }),
        );
        let mut component = Component::new("general");
        component.add_message_command(command).unwrap();
        client.add_component(component).unwrap();

        let handled = client.dispatch_message(message("!fail")).await.unwrap();
        assert!(handled);
        assert_eq!(rest.sent_messages(), vec!["you cannot do that".to_owned()]);
    }

    #[tokio::test]
    async fn test_halt_stops_sibling_component_search() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let second_ran = Arc::new(AtomicUsize::new(0));

        let halting = MessageCommand::new(
            "ban",
            message_callback(|_, _| async { Ok(()) }),
        )
        .check(crate::checks::check(|_ctx: MessageContext| async {
            Err(CheckFailure::Halt)
        }));

        let ran = Arc::clone(&second_ran);
        let shadowed = MessageCommand::new(
            "ban",
            message_callback(move |_, _| {
                let ran = Arc::clone(&ran);
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        let mut first = Component::new("first");
        first.add_message_command(halting).unwrap();
        let mut second = Component::new("second");
        second.add_message_command(shadowed).unwrap();
        client.add_component(first).unwrap();
        client.add_component(second).unwrap();

        let handled = client.dispatch_message(message("!ban them")).await.unwrap();
        assert!(handled);
        assert_eq!(second_ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_check_falls_through_to_sibling_component() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let second_ran = Arc::new(AtomicUsize::new(0));

        let gated = MessageCommand::new(
            "ban",
            message_callback(|_, _| async { Ok(()) }),
        )
        .check(crate::checks::check(|_ctx: MessageContext| async { Ok(false) }));

        let ran = Arc::clone(&second_ran);
        let fallback = MessageCommand::new(
            "ban",
            message_callback(move |_, _| {
                let ran = Arc::clone(&ran);
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }),
        );

        let mut first = Component::new("first");
        first.add_message_command(gated).unwrap();
        let mut second = Component::new("second");
        second.add_message_command(fallback).unwrap();
        client.add_component(first).unwrap();
        client.add_component(second).unwrap();

        client.dispatch_message(message("!ban them")).await.unwrap();
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parser_error_reraised_without_handlers() {
        let rest = RecordingRest::default();
        let client = client(&rest);

        let command = MessageCommand::new(
            "take",
            message_callback(|_, _| async { Ok(()) }),
        )
        .parser(
            crate::parsing::ShlexParser::new()
                .add_argument(crate::parsing::Argument::new("what"))
                .unwrap(),
        )
        .unwrap();

        let mut component = Component::new("general");
        component.add_message_command(command).unwrap();
        client.add_component(component).unwrap();

        let result = client.dispatch_message(message("!take")).await;
        assert!(matches!(result, Err(ExecutionError::Parser(_))));
    }

    #[tokio::test]
    async fn test_parser_error_suppressed_by_handler() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let handled_errors = Arc::new(AtomicUsize::new(0));

        let seen = Arc::clone(&handled_errors);
        let hooks = Arc::new(Hooks::new().with_on_parser_error(move |_, _| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let command = MessageCommand::new(
            "take",
            message_callback(|_, _| async { Ok(()) }),
        )
        .parser(
            crate::parsing::ShlexParser::new()
                .add_argument(crate::parsing::Argument::new("what"))
                .unwrap(),
        )
        .unwrap()
        .hooks(hooks);

        let mut component = Component::new("general");
        component.add_message_command(command).unwrap();
        client.add_component(component).unwrap();

        let handled = client.dispatch_message(message("!take")).await.unwrap();
        assert!(handled);
        assert_eq!(handled_errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_hooks_fire_once_across_scopes() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let fired = Arc::new(AtomicUsize::new(0));

        let count = Arc::clone(&fired);
        let shared = Arc::new(Hooks::new().with_post_execution(move |_| {
            let count = Arc::clone(&count);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let command = MessageCommand::new(
            "ping",
            message_callback(|_, _| async { Ok(()) }),
        )
        .hooks(Arc::clone(&shared));

        let mut component = Component::new("general");
        component.add_message_command(command).unwrap();
        let component = component.with_message_hooks(Arc::clone(&shared));
        client.add_component(component).unwrap();
        client.set_message_hooks(shared);

        client.dispatch_message(message("!ping")).await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dependency_resolution_from_context() {
        #[derive(Debug, PartialEq)]
        struct Greeting(&'static str);

        let rest = RecordingRest::default();
        let client = client(&rest);
        client.set_dependency(Greeting("hello"));

        let seen = Arc::new(StdMutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let command = MessageCommand::new(
            "greet",
            message_callback(move |ctx, _| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    let greeting = ctx.dependency::<Greeting>().map_err(ExecutionError::other)?;
                    *seen.lock().unwrap() = Some(greeting.0);
                    Ok(())
                }
            }),
        );

        let mut component = Component::new("general");
        component.add_message_command(command).unwrap();
        client.add_component(component).unwrap();

        client.dispatch_message(message("!greet")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), Some("hello"));
    }

    // ─── Interaction dispatch ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_slash_ping_invokes_callback_once_with_no_arguments() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let calls = Arc::new(AtomicUsize::new(0));
        let arg_counts = Arc::new(StdMutex::new(Vec::new()));

        let calls_clone = Arc::clone(&calls);
        let counts_clone = Arc::clone(&arg_counts);
        let ping = SlashCommand::new(
            "ping",
            "Replies with pong.",
            slash_callback(move |_, args| {
                let calls = Arc::clone(&calls_clone);
                let counts = Arc::clone(&counts_clone);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    counts.lock().unwrap().push(args.len());
                    Ok(())
                }
            }),
        )
        .unwrap();

        let mut component = Component::new("general");
        component.add_slash_command(ping).unwrap();
        client.add_component(component).unwrap();

        let handled = client
            .dispatch_interaction(interaction("ping", vec![]))
            .await
            .unwrap();
        assert!(handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*arg_counts.lock().unwrap(), vec![0]);
    }

    #[tokio::test]
    async fn test_slash_option_bound_to_callback_argument() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let seen = Arc::new(StdMutex::new(None));

        let seen_clone = Arc::clone(&seen);
        let command = SlashCommand::new(
            "age",
            "Records your age.",
            slash_callback(move |_, args| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    *seen.lock().unwrap() = args.int("age");
                    Ok(())
                }
            }),
        )
        .unwrap()
        .add_option(SlashOption::int("age", "Your age."))
        .unwrap();

        let mut component = Component::new("general");
        component.add_slash_command(command).unwrap();
        client.add_component(component).unwrap();

        client
            .dispatch_interaction(interaction(
                "age",
                vec![InteractionOption {
                    name: "age".to_owned(),
                    value: OptionValue::Int(42),
                }],
            ))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_required_option_missing_is_internal_error() {
        let rest = RecordingRest::default();
        let client = client(&rest);

        let command = SlashCommand::new(
            "age",
            "Records your age.",
            slash_callback(|_, _| async { Ok(()) }),
        )
        .unwrap()
        .add_option(SlashOption::int("age", "Your age."))
        .unwrap();

        let mut component = Component::new("general");
        component.add_slash_command(command).unwrap();
        client.add_component(component).unwrap();

        let result = client.dispatch_interaction(interaction("age", vec![])).await;
        assert!(matches!(result, Err(ExecutionError::Internal(_))));
    }

    #[tokio::test]
    async fn test_omitted_optional_option_binds_nothing() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let seen = Arc::new(StdMutex::new(None));

        let seen_clone = Arc::clone(&seen);
        let command = SlashCommand::new(
            "age",
            "Records your age.",
            slash_callback(move |_, args| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    *seen.lock().unwrap() = Some((args.contains("age"), args.int("fallback")));
                    Ok(())
                }
            }),
        )
        .unwrap()
        .add_option(SlashOption::int("age", "Your age.").optional())
        .unwrap()
        .add_option(SlashOption::int("fallback", "Defaulted.").default(9))
        .unwrap();

        let mut component = Component::new("general");
        component.add_slash_command(command).unwrap();
        client.add_component(component).unwrap();

        client
            .dispatch_interaction(interaction("age", vec![]))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some((false, Some(9))));
    }

    #[tokio::test]
    async fn test_unknown_interaction_marks_not_found_once() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        client.add_component(Component::new("empty")).unwrap();

        let handled = client
            .dispatch_interaction(interaction("missing", vec![]))
            .await
            .unwrap();
        assert!(!handled);

        let responses = rest.sent_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].0, "Command not found");
        assert!(responses[0].1);
    }

    #[tokio::test]
    async fn test_group_resolves_nested_sub_command() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let seen = Arc::new(StdMutex::new(None));

        let seen_clone = Arc::clone(&seen);
        let get = SlashCommand::new(
            "get",
            "Gets a note.",
            slash_callback(move |_, args| {
                let seen = Arc::clone(&seen_clone);
                async move {
                    *seen.lock().unwrap() = args.str("name").map(str::to_owned);
                    Ok(())
                }
            }),
        )
        .unwrap()
        .add_option(SlashOption::str("name", "The note name."))
        .unwrap();

        let group = SlashCommandGroup::new("note", "Note commands.")
            .unwrap()
            .add_command(get)
            .unwrap();

        let mut component = Component::new("notes");
        component.add_slash_group(group).unwrap();
        client.add_component(component).unwrap();

        client
            .dispatch_interaction(interaction(
                "note",
                vec![InteractionOption {
                    name: "get".to_owned(),
                    value: OptionValue::SubCommand(vec![InteractionOption {
                        name: "name".to_owned(),
                        value: OptionValue::Str("groceries".to_owned()),
                    }]),
                }],
            ))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some("groceries".to_owned()));
    }

    #[tokio::test]
    async fn test_group_unknown_sub_command_marks_not_found() {
        let rest = RecordingRest::default();
        let client = client(&rest);

        let group = SlashCommandGroup::new("note", "Note commands.")
            .unwrap()
            .add_command(
                SlashCommand::new("get", "Gets a note.", slash_callback(|_, _| async { Ok(()) }))
                    .unwrap(),
            )
            .unwrap();

        let mut component = Component::new("notes");
        component.add_slash_group(group).unwrap();
        client.add_component(component).unwrap();

        client
            .dispatch_interaction(interaction(
                "note",
                vec![InteractionOption {
                    name: "delete".to_owned(),
                    value: OptionValue::SubCommand(vec![]),
                }],
            ))
            .await
            .unwrap();
        assert_eq!(rest.sent_responses().len(), 1);
    }

    // ─── Component lifecycle ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_component_bind_unbind_lifecycle() {
        let rest = RecordingRest::default();
        let first = client(&rest);
        let second = client(&rest);

        first.add_component(Component::new("shared")).unwrap();
        let component = first.remove_component("shared").unwrap();
        assert!(!component.is_bound());

        // Binding the same component object twice without unbinding fails.
        component.bind_client(1).unwrap();
        assert!(matches!(
            component.bind_client(2),
            Err(SchemaError::AlreadyBound { .. })
        ));

        // A fresh copy starts unbound and can join another client.
        second.add_component(component.copy()).unwrap();
        let result = second.add_component(Component::new("shared"));
        assert!(matches!(result, Err(SchemaError::DuplicateComponent { .. })));
    }

    #[tokio::test]
    async fn test_component_copy_is_independent() {
        let mut original = Component::new("general");
        original
            .add_message_command(MessageCommand::new(
                "ping",
                message_callback(|_, _| async { Ok(()) }),
            ))
            .unwrap();

        let mut copied = original.copy();
        copied
            .add_message_command(MessageCommand::new(
                "pong",
                message_callback(|_, _| async { Ok(()) }),
            ))
            .unwrap();

        assert_eq!(original.message_commands().commands().len(), 1);
        assert_eq!(copied.message_commands().commands().len(), 2);
    }

    #[tokio::test]
    async fn test_open_close_lifecycle() {
        let rest = RecordingRest::default();
        let client = client(&rest);
        let events = Arc::new(StdMutex::new(Vec::<&'static str>::new()));

        let opened = Arc::clone(&events);
        let closed = Arc::clone(&events);
        let component = Component::new("general")
            .with_on_open(move |_| {
                let events = Arc::clone(&opened);
                async move {
                    events.lock().unwrap().push("open");
                }
            })
            .with_on_close(move |_| {
                let events = Arc::clone(&closed);
                async move {
                    events.lock().unwrap().push("close");
                }
            });
        client.add_component(component).unwrap();

        client.open().await.unwrap();
        assert!(matches!(client.open().await, Err(LifecycleError::AlreadyRunning)));
        client.close().await.unwrap();
        assert!(matches!(client.close().await, Err(LifecycleError::NotRunning)));
        assert_eq!(*events.lock().unwrap(), vec!["open", "close"]);
    }

    #[tokio::test]
    async fn test_declared_commands_collected_across_components() {
        let rest = RecordingRest::default();
        let client = client(&rest);

        let mut first = Component::new("first");
        first
            .add_slash_command(
                SlashCommand::new("ping", "Replies.", slash_callback(|_, _| async { Ok(()) }))
                    .unwrap(),
            )
            .unwrap();
        let mut second = Component::new("second");
        second
            .add_slash_command(
                SlashCommand::new("pong", "Replies.", slash_callback(|_, _| async { Ok(()) }))
                    .unwrap(),
            )
            .unwrap();
        client.add_component(first).unwrap();
        client.add_component(second).unwrap();

        let declared = client.build_declared_commands();
        let names: Vec<&str> = declared.iter().map(|data| data.name.as_str()).collect();
        assert_eq!(names, vec!["ping", "pong"]);
        assert_eq!(client.declared_commands().len(), 2);
    }
}
