//! Message (prefix) commands.
//!
//! A [`MessageCommand`] binds one or more names to a callback, optionally
//! with a [`ShlexParser`] for argument binding. A command built through
//! [`MessageCommand::group`] additionally owns a child index: dispatch first
//! offers the remaining content to the children, trimming the matched name
//! off the front, and falls back to the group's own callback when no child
//! matches.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::arguments::Arguments;
use crate::checks::{CheckFailure, CheckFn, gather_checks};
use crate::commands::index::MessageCommandIndex;
use crate::commands::{CommandResult, MessageCallbackFn};
use crate::component::ComponentLoader;
use crate::context::MessageContext;
use crate::errors::{ExecutionError, SchemaError};
use crate::hooks::{Hooks, TriggeredError};

/// A command triggered by prefixed message content.
#[derive(Clone)]
pub struct MessageCommand {
    names: Vec<String>,
    callback: MessageCallbackFn,
    parser: Option<crate::parsing::ShlexParser>,
    checks: Vec<CheckFn<MessageContext>>,
    hooks: Option<Arc<Hooks<MessageContext>>>,
    metadata: HashMap<String, serde_json::Value>,
    declared_keys: Option<Vec<String>>,
    /// `Some` makes this command a group.
    children: Option<MessageCommandIndex>,
}

impl MessageCommand {
    /// Creates a leaf command with a single name.
    pub fn new(name: impl Into<String>, callback: MessageCallbackFn) -> Self {
        Self {
            names: vec![name.into()],
            callback,
            parser: None,
            checks: Vec::new(),
            hooks: None,
            metadata: HashMap::new(),
            declared_keys: None,
            children: None,
        }
    }

    /// Creates a command group.
    ///
    /// A strict group only allows child names without spaces, enforces
    /// case-insensitive uniqueness at registration time, and dispatches via
    /// an O(1) first-token lookup.
    pub fn group(name: impl Into<String>, strict: bool, callback: MessageCallbackFn) -> Self {
        let mut command = Self::new(name, callback);
        command.children = Some(MessageCommandIndex::new(strict));
        command
    }

    /// Adds another name this command answers to. Duplicates are dropped.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    /// Declares the argument keys the callback reads, enabling key
    /// validation for any parser set afterwards.
    pub fn validate_keys(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, SchemaError> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if let Some(parser) = &self.parser {
            parser.validate_keys(&keys)?;
        }
        self.declared_keys = Some(keys);
        Ok(self)
    }

    /// Sets the argument parser.
    ///
    /// When key validation is enabled, every parser parameter key must be a
    /// declared callback argument.
    pub fn parser(mut self, parser: crate::parsing::ShlexParser) -> Result<Self, SchemaError> {
        if let Some(declared) = &self.declared_keys {
            parser.validate_keys(declared)?;
        }
        self.parser = Some(parser);
        Ok(self)
    }

    /// Appends a check, run in registration order.
    pub fn check(mut self, check: CheckFn<MessageContext>) -> Self {
        self.checks.push(check);
        self
    }

    /// Sets this command's hook set, replacing any previous one.
    pub fn hooks(mut self, hooks: Arc<Hooks<MessageContext>>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Attaches an arbitrary metadata entry.
    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Adds a sub-command. Fails unless this command was built as a group.
    pub fn child(mut self, command: MessageCommand) -> Result<Self, SchemaError> {
        match &mut self.children {
            Some(children) => children.add(command)?,
            None => return Err(SchemaError::NotAGroup),
        }
        Ok(self)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The primary (first) name.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    pub fn is_group(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> Option<&MessageCommandIndex> {
        self.children.as_ref()
    }

    pub fn hook_set(&self) -> Option<&Arc<Hooks<MessageContext>>> {
        self.hooks.as_ref()
    }

    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Runs this command's checks in registration order.
    pub async fn check_context(&self, ctx: &MessageContext) -> Result<bool, CheckFailure> {
        gather_checks(ctx, &self.checks).await
    }

    /// Executes this command (or one of its children) under the full hook
    /// protocol.
    ///
    /// `friends` is the ordered list of outer-scope hook sets, innermost
    /// first; this command's own set fires first and is the only one whose
    /// pre-execution callbacks can abort.
    pub async fn execute(
        &self,
        ctx: MessageContext,
        friends: &[Arc<Hooks<MessageContext>>],
    ) -> Result<(), ExecutionError> {
        if let Some(children) = &self.children {
            let downstream = self.join_own_hooks(friends);
            for (name, command) in children.find(ctx.content(), ctx.is_case_sensitive()) {
                match command.check_context(&ctx).await {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(CheckFailure::Command(error)) => {
                        ctx.respond_error(&error).await;
                        return Ok(());
                    }
                    Err(CheckFailure::Halt) => return Err(ExecutionError::Halt),
                    Err(CheckFailure::Other(error)) => {
                        return Err(ExecutionError::Other(Arc::from(error)));
                    }
                }

                trace!(name = %name, "dispatching to sub-command");
                let mut child_ctx = ctx.clone();
                child_ctx.set_content(ctx.content()[name.len()..].trim_start().to_owned());
                child_ctx.push_triggering_name(&name);
                return Box::pin(command.execute(child_ctx, &downstream)).await;
            }

            // No child matched: the group's own callback is the fallback.
            trace!(group = %self.name(), "no sub-command matched, falling back to group callback");
        }

        self.execute_as_leaf(ctx, friends).await
    }

    /// Runs the execution protocol with this command as the leaf.
    async fn execute_as_leaf(
        &self,
        ctx: MessageContext,
        friends: &[Arc<Hooks<MessageContext>>],
    ) -> Result<(), ExecutionError> {
        let own = self
            .hooks
            .clone()
            .unwrap_or_else(|| Arc::new(Hooks::new()));
        let friends: Vec<_> = friends
            .iter()
            .filter(|set| !Arc::ptr_eq(set, &own))
            .cloned()
            .collect();

        let outcome = self.run_protocol(&own, &friends, &ctx).await;
        own.trigger_post_execution(&ctx, &friends).await;
        outcome
    }

    async fn run_protocol(
        &self,
        own: &Arc<Hooks<MessageContext>>,
        friends: &[Arc<Hooks<MessageContext>>],
        ctx: &MessageContext,
    ) -> Result<(), ExecutionError> {
        if !own.trigger_pre_execution(ctx, friends).await {
            debug!(command = %self.name(), "execution aborted by pre-execution hook");
            return Ok(());
        }

        let arguments = match &self.parser {
            Some(parser) => match parser.parse(ctx.content()).await {
                Ok(arguments) => arguments,
                Err(error) => {
                    return self
                        .handle_failure(own, friends, ctx, ExecutionError::from(error))
                        .await;
                }
            },
            None => Arguments::new(),
        };

        match (self.callback)(ctx.clone(), arguments).await {
            Ok(()) => {
                own.trigger_success(ctx, friends).await;
                Ok(())
            }
            Err(error) => self.handle_failure(own, friends, ctx, error).await,
        }
    }

    async fn handle_failure(
        &self,
        own: &Arc<Hooks<MessageContext>>,
        friends: &[Arc<Hooks<MessageContext>>],
        ctx: &MessageContext,
        error: ExecutionError,
    ) -> Result<(), ExecutionError> {
        match error {
            ExecutionError::Command(error) => {
                ctx.respond_error(&error).await;
                Ok(())
            }
            // Halt must reach the client so no sibling command is tried;
            // internal inconsistencies bypass the hooks entirely.
            ExecutionError::Halt => Err(ExecutionError::Halt),
            ExecutionError::Internal(message) => Err(ExecutionError::Internal(message)),
            ExecutionError::Parser(error) => {
                let level = own
                    .trigger_error(ctx, &TriggeredError::Parser(Arc::clone(&error)), friends)
                    .await;
                if level > 0 {
                    Ok(())
                } else {
                    Err(ExecutionError::Parser(error))
                }
            }
            ExecutionError::Other(error) => {
                let level = own
                    .trigger_error(ctx, &TriggeredError::Other(Arc::clone(&error)), friends)
                    .await;
                if level > 0 {
                    debug!(command = %self.name(), "error suppressed by hook vote");
                    Ok(())
                } else {
                    Err(ExecutionError::Other(error))
                }
            }
        }
    }

    /// Prepends this group's hook set to the friend list passed down to a
    /// matched child.
    fn join_own_hooks(
        &self,
        friends: &[Arc<Hooks<MessageContext>>],
    ) -> Vec<Arc<Hooks<MessageContext>>> {
        let Some(own) = &self.hooks else {
            return friends.to_vec();
        };

        let mut joined = Vec::with_capacity(friends.len() + 1);
        if !friends.iter().any(|set| Arc::ptr_eq(set, own)) {
            joined.push(Arc::clone(own));
        }
        joined.extend(friends.iter().cloned());
        joined
    }
}

impl ComponentLoader for MessageCommand {
    fn load_into_component(
        &self,
        component: &mut crate::component::Component,
    ) -> Result<(), SchemaError> {
        component.add_message_command(self.clone())
    }
}

impl std::fmt::Debug for MessageCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCommand")
            .field("names", &self.names)
            .field("is_group", &self.is_group())
            .finish()
    }
}
