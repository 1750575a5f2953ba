//! Components: loadable bundles of commands, checks, listeners, and hooks.
//!
//! A component is built by the user, filled through the fluent `with_*`
//! methods or the [`ComponentLoader`] protocol, then handed to a client. It
//! binds to exactly one client at a time; reloading works by [`Component::copy`]ing
//! an unbound clone, mutating it, and swapping it in.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use herald_core::declare::{CommandData, CommandType};

use crate::checks::{CheckFailure, CheckFn, gather_checks};
use crate::client::Client;
use crate::commands::index::MessageCommandIndex;
use crate::commands::menu::MenuCommand;
use crate::commands::message::MessageCommand;
use crate::commands::slash::{SlashCommand, SlashCommandGroup, SlashEntry};
use crate::context::{AnyContext, AutocompleteContext, MessageContext, SlashContext};
use crate::errors::{ExecutionError, SchemaError};
use crate::hooks::{Hooks, merge_hook_sets};

/// A listener for a gateway event dispatched through the client.
pub type ListenerFn =
    Arc<dyn Fn(Client, Arc<dyn Any + Send + Sync>) -> BoxFuture<'static, ()> + Send + Sync>;

/// A named client lifecycle callback.
pub type ClientCallbackFn = Arc<dyn Fn(Client) -> BoxFuture<'static, ()> + Send + Sync>;

/// Anything that can register itself into a component.
///
/// Commands implement this, so a module can expose one function returning
/// its loaders and the bootstrap enumerates them explicitly:
///
/// ```rust,ignore
/// fn loaders() -> Vec<Box<dyn ComponentLoader>> {
///     vec![Box::new(ping_command()), Box::new(note_group())]
/// }
///
/// component.load_all(loaders().iter().map(Box::as_ref))?;
/// ```
pub trait ComponentLoader: Send + Sync {
    fn load_into_component(&self, component: &mut Component) -> Result<(), SchemaError>;
}

/// A named bundle of commands, checks, listeners, and hooks.
pub struct Component {
    name: String,
    message_commands: MessageCommandIndex,
    slash_commands: Vec<Arc<SlashEntry>>,
    menu_commands: Vec<Arc<MenuCommand>>,
    checks: Vec<CheckFn<AnyContext>>,
    message_hooks: Option<Arc<Hooks<MessageContext>>>,
    slash_hooks: Option<Arc<Hooks<SlashContext>>>,
    listeners: HashMap<TypeId, Vec<ListenerFn>>,
    client_callbacks: HashMap<String, Vec<ClientCallbackFn>>,
    on_open: Vec<ClientCallbackFn>,
    on_close: Vec<ClientCallbackFn>,
    /// Overrides the client's case sensitivity when set.
    case_sensitive: Option<bool>,
    metadata: HashMap<String, serde_json::Value>,
    bound_client: Mutex<Option<u64>>,
}

impl Component {
    /// Creates a component with a loose (word-tree) message command index.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_index(name, false)
    }

    /// Creates a component with a strict message command index: no spaced
    /// names, case-insensitive uniqueness, O(1) dispatch.
    pub fn strict(name: impl Into<String>) -> Self {
        Self::with_index(name, true)
    }

    fn with_index(name: impl Into<String>, strict: bool) -> Self {
        Self {
            name: name.into(),
            message_commands: MessageCommandIndex::new(strict),
            slash_commands: Vec::new(),
            menu_commands: Vec::new(),
            checks: Vec::new(),
            message_hooks: None,
            slash_hooks: None,
            listeners: HashMap::new(),
            client_callbacks: HashMap::new(),
            on_open: Vec::new(),
            on_close: Vec::new(),
            case_sensitive: None,
            metadata: HashMap::new(),
            bound_client: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_case_sensitive(&self) -> Option<bool> {
        self.case_sensitive
    }

    /// Overrides the client's case sensitivity for this component's message
    /// commands.
    pub fn set_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = Some(case_sensitive);
        self
    }

    pub fn set_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    // ─── Registration ─────────────────────────────────────────────────────

    pub fn add_message_command(&mut self, command: MessageCommand) -> Result<(), SchemaError> {
        self.message_commands.add(command)
    }

    pub fn with_message_command(mut self, command: MessageCommand) -> Result<Self, SchemaError> {
        self.add_message_command(command)?;
        Ok(self)
    }

    pub fn add_slash_command(&mut self, command: SlashCommand) -> Result<(), SchemaError> {
        self.add_slash_entry(SlashEntry::Command(command))
    }

    pub fn add_slash_group(&mut self, group: SlashCommandGroup) -> Result<(), SchemaError> {
        self.add_slash_entry(SlashEntry::Group(group))
    }

    fn add_slash_entry(&mut self, entry: SlashEntry) -> Result<(), SchemaError> {
        if self
            .slash_commands
            .iter()
            .any(|existing| existing.name() == entry.name())
        {
            return Err(SchemaError::DuplicateNames {
                names: vec![entry.name().to_owned()],
            });
        }
        self.slash_commands.push(Arc::new(entry));
        Ok(())
    }

    pub fn with_slash_command(mut self, command: SlashCommand) -> Result<Self, SchemaError> {
        self.add_slash_command(command)?;
        Ok(self)
    }

    pub fn with_slash_group(mut self, group: SlashCommandGroup) -> Result<Self, SchemaError> {
        self.add_slash_group(group)?;
        Ok(self)
    }

    pub fn add_menu_command(&mut self, command: MenuCommand) -> Result<(), SchemaError> {
        if self
            .menu_commands
            .iter()
            .any(|existing| existing.kind() == command.kind() && existing.name() == command.name())
        {
            return Err(SchemaError::DuplicateNames {
                names: vec![command.name().to_owned()],
            });
        }
        self.menu_commands.push(Arc::new(command));
        Ok(())
    }

    pub fn with_menu_command(mut self, command: MenuCommand) -> Result<Self, SchemaError> {
        self.add_menu_command(command)?;
        Ok(self)
    }

    /// Adds a component-level check gating every command in this component.
    pub fn with_check(mut self, check: CheckFn<AnyContext>) -> Self {
        self.checks.push(check);
        self
    }

    /// Sets the hook set wrapping every message command execution.
    pub fn with_message_hooks(mut self, hooks: Arc<Hooks<MessageContext>>) -> Self {
        self.message_hooks = Some(hooks);
        self
    }

    /// Sets the hook set wrapping every slash and menu command execution.
    pub fn with_slash_hooks(mut self, hooks: Arc<Hooks<SlashContext>>) -> Self {
        self.slash_hooks = Some(hooks);
        self
    }

    /// Registers a listener for events of type `E` dispatched through
    /// [`Client::dispatch_event`].
    pub fn with_listener<E, F, Fut>(mut self, callback: F) -> Self
    where
        E: Send + Sync + 'static,
        F: Fn(Client, Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let erased: ListenerFn = Arc::new(move |client, event| {
            match event.downcast::<E>() {
                Ok(event) => Box::pin(callback(client, event)),
                // Dispatch is keyed by TypeId, so this cannot be reached
                // through the client.
                Err(_) => Box::pin(async {}),
            }
        });
        self.listeners
            .entry(TypeId::of::<E>())
            .or_default()
            .push(erased);
        self
    }

    /// Registers a named client callback.
    pub fn with_client_callback<F, Fut>(mut self, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.client_callbacks
            .entry(name.into())
            .or_default()
            .push(Arc::new(move |client| Box::pin(callback(client))));
        self
    }

    /// Registers a callback fired when the owning client opens.
    pub fn with_on_open<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_open
            .push(Arc::new(move |client| Box::pin(callback(client))));
        self
    }

    /// Registers a callback fired when the owning client closes.
    pub fn with_on_close<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Client) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_close
            .push(Arc::new(move |client| Box::pin(callback(client))));
        self
    }

    /// Runs every loader against this component, in order.
    pub fn load_all<'a>(
        &mut self,
        loaders: impl IntoIterator<Item = &'a dyn ComponentLoader>,
    ) -> Result<(), SchemaError> {
        for loader in loaders {
            loader.load_into_component(self)?;
        }
        Ok(())
    }

    // ─── Introspection ────────────────────────────────────────────────────

    pub fn message_commands(&self) -> &MessageCommandIndex {
        &self.message_commands
    }

    pub fn slash_commands(&self) -> &[Arc<SlashEntry>] {
        &self.slash_commands
    }

    pub fn menu_commands(&self) -> &[Arc<MenuCommand>] {
        &self.menu_commands
    }

    /// Builds the declared registration data of every slash and menu command
    /// in this component.
    pub fn build_commands(&self) -> Vec<CommandData> {
        self.slash_commands
            .iter()
            .map(|entry| entry.build())
            .chain(self.menu_commands.iter().map(|command| command.build()))
            .collect()
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────

    /// Binds this component to a client.
    ///
    /// Binding an already-bound component fails; unbind first.
    pub(crate) fn bind_client(&self, client_key: u64) -> Result<(), SchemaError> {
        let mut bound = self.bound_client.lock();
        if bound.is_some() {
            return Err(SchemaError::AlreadyBound {
                name: self.name.clone(),
            });
        }
        *bound = Some(client_key);
        Ok(())
    }

    pub(crate) fn unbind_client(&self) -> Result<(), SchemaError> {
        let mut bound = self.bound_client.lock();
        if bound.is_none() {
            return Err(SchemaError::NotBound {
                name: self.name.clone(),
            });
        }
        *bound = None;
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.bound_client.lock().is_some()
    }

    /// Copies this component into an independent, unbound clone with fresh
    /// command/check/hook/listener containers, suitable for reloading.
    pub fn copy(&self) -> Self {
        Self {
            name: self.name.clone(),
            message_commands: self.message_commands.copy(),
            slash_commands: self
                .slash_commands
                .iter()
                .map(|entry| Arc::new((**entry).clone()))
                .collect(),
            menu_commands: self
                .menu_commands
                .iter()
                .map(|command| Arc::new((**command).clone()))
                .collect(),
            checks: self.checks.clone(),
            message_hooks: self.message_hooks.clone(),
            slash_hooks: self.slash_hooks.clone(),
            listeners: self.listeners.clone(),
            client_callbacks: self.client_callbacks.clone(),
            on_open: self.on_open.clone(),
            on_close: self.on_close.clone(),
            case_sensitive: self.case_sensitive,
            metadata: self.metadata.clone(),
            bound_client: Mutex::new(None),
        }
    }

    pub(crate) async fn run_on_open(&self, client: Client) {
        join_all(
            self.on_open
                .iter()
                .map(|callback| callback(client.clone())),
        )
        .await;
    }

    pub(crate) async fn run_on_close(&self, client: Client) {
        join_all(
            self.on_close
                .iter()
                .map(|callback| callback(client.clone())),
        )
        .await;
    }

    pub(crate) async fn run_client_callback(&self, client: Client, name: &str) {
        if let Some(callbacks) = self.client_callbacks.get(name) {
            join_all(callbacks.iter().map(|callback| callback(client.clone()))).await;
        }
    }

    pub(crate) async fn dispatch_event_erased(
        &self,
        client: Client,
        type_id: TypeId,
        event: &Arc<dyn Any + Send + Sync>,
    ) {
        if let Some(listeners) = self.listeners.get(&type_id) {
            join_all(
                listeners
                    .iter()
                    .map(|listener| listener(client.clone(), Arc::clone(event))),
            )
            .await;
        }
    }

    // ─── Dispatch ─────────────────────────────────────────────────────────

    /// Checks this component's own check list, resolving how dispatch should
    /// proceed.
    ///
    /// A user-facing check error is responded to here and surfaces as
    /// [`ExecutionError::Halt`]: the dispatch is handled and no sibling
    /// component gets the event.
    async fn run_component_checks(&self, ctx: &AnyContext) -> Result<bool, ExecutionError> {
        match gather_checks(ctx, &self.checks).await {
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

    /// Offers message content to this component's commands.
    ///
    /// Returns whether a command ran. Check failures at the command level
    /// fall through to the next candidate; a user-facing check error
    /// responds and counts as handled.
    pub(crate) async fn execute_message(
        &self,
        mut ctx: MessageContext,
        client_hooks: Option<Arc<Hooks<MessageContext>>>,
    ) -> Result<bool, ExecutionError> {
        if self.message_commands.is_empty() {
            return Ok(false);
        }
        if !self
            .run_component_checks(&AnyContext::Message(ctx.clone()))
            .await?
        {
            return Ok(false);
        }

        ctx.set_component_name(self.name.clone());
        if let Some(case_sensitive) = self.case_sensitive {
            ctx.set_case_sensitive(case_sensitive);
        }

        for (name, command) in self
            .message_commands
            .find(ctx.content(), ctx.is_case_sensitive())
        {
            match command.check_context(&ctx).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(CheckFailure::Command(error)) => {
                    ctx.respond_error(&error).await;
                    return Ok(true);
                }
                Err(CheckFailure::Halt) => return Err(ExecutionError::Halt),
                Err(CheckFailure::Other(error)) => {
                    warn!(command = %name, error = %error, "command check errored");
                    return Err(ExecutionError::Other(Arc::from(error)));
                }
            }

            debug!(component = %self.name, command = %name, "executing message command");
            let mut command_ctx = ctx.clone();
            command_ctx.set_content(ctx.content()[name.len()..].trim_start().to_owned());
            command_ctx.push_triggering_name(&name);

            let friends = merge_hook_sets(
                command.hook_set(),
                [self.message_hooks.clone(), client_hooks],
            );
            command.execute(command_ctx, &friends).await?;
            return Ok(true);
        }

        trace!(component = %self.name, "no message command matched");
        Ok(false)
    }

    /// Offers a command interaction to this component.
    ///
    /// Returns whether a matching command was found and allowed to run; a
    /// found-but-checks-failed command reports `false` so a sibling component
    /// may still answer.
    pub(crate) async fn execute_interaction(
        &self,
        mut ctx: SlashContext,
        client_hooks: Option<Arc<Hooks<SlashContext>>>,
    ) -> Result<bool, ExecutionError> {
        let kind = ctx.interaction().command_type;
        let name = ctx.interaction().command_name.clone();

        if kind == CommandType::Slash {
            let Some(entry) = self
                .slash_commands
                .iter()
                .find(|entry| entry.name() == name)
                .cloned()
            else {
                return Ok(false);
            };

            if !self
                .run_component_checks(&AnyContext::Slash(ctx.clone()))
                .await?
            {
                return Ok(false);
            }

            ctx.set_component_name(self.name.clone());
            if let Some(state) = entry.ephemeral_default() {
                ctx.set_ephemeral_default(state);
            }

            match entry.check_context(&ctx).await {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(CheckFailure::Command(error)) => {
                    ctx.respond_error(&error).await;
                    return Ok(true);
                }
                Err(CheckFailure::Halt) => return Err(ExecutionError::Halt),
                Err(CheckFailure::Other(error)) => {
                    return Err(ExecutionError::Other(Arc::from(error)));
                }
            }

            debug!(component = %self.name, command = %name, "executing slash command");
            let friends = match &*entry {
                SlashEntry::Command(command) => {
                    merge_hook_sets(command.hook_set(), [self.slash_hooks.clone(), client_hooks])
                }
                SlashEntry::Group(group) => {
                    merge_hook_sets(group.hook_set(), [self.slash_hooks.clone(), client_hooks])
                }
            };
            entry.execute(ctx, None, &friends).await?;
            return Ok(true);
        }

        let Some(command) = self
            .menu_commands
            .iter()
            .find(|command| command.kind() == kind && command.name() == name)
            .cloned()
        else {
            return Ok(false);
        };

        if !self
            .run_component_checks(&AnyContext::Slash(ctx.clone()))
            .await?
        {
            return Ok(false);
        }

        ctx.set_component_name(self.name.clone());
        if let Some(state) = command.ephemeral_default() {
            ctx.set_ephemeral_default(state);
        }

        match command.check_context(&ctx).await {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(CheckFailure::Command(error)) => {
                ctx.respond_error(&error).await;
                return Ok(true);
            }
            Err(CheckFailure::Halt) => return Err(ExecutionError::Halt),
            Err(CheckFailure::Other(error)) => {
                return Err(ExecutionError::Other(Arc::from(error)));
            }
        }

        debug!(component = %self.name, command = %name, "executing menu command");
        let friends = merge_hook_sets(command.hook_set(), [self.slash_hooks.clone(), client_hooks]);
        command.execute(ctx, &friends).await?;
        Ok(true)
    }

    /// Offers an autocomplete interaction to this component.
    pub(crate) async fn execute_autocomplete(
        &self,
        ctx: AutocompleteContext,
    ) -> Result<bool, ExecutionError> {
        let name = ctx.interaction().command_name.clone();
        let Some(entry) = self
            .slash_commands
            .iter()
            .find(|entry| entry.name() == name)
            .cloned()
        else {
            return Ok(false);
        };

        entry.execute_autocomplete(ctx, None).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("message_commands", &self.message_commands.commands().len())
            .field("slash_commands", &self.slash_commands.len())
            .field("menu_commands", &self.menu_commands.len())
            .field("bound", &self.is_bound())
            .finish()
    }
}
