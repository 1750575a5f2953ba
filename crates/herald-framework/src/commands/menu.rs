//! Context-menu commands.
//!
//! Menu commands are invoked by right-clicking a user or message; they have
//! no options, so execution is the hook protocol wrapped straight around the
//! callback. Unlike slash commands their names may contain spaces and mixed
//! case.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use herald_core::declare::{CommandData, CommandType};
use herald_core::permissions::Permissions;

use crate::checks::{CheckFailure, CheckFn, gather_checks};
use crate::commands::MenuCallbackFn;
use crate::component::ComponentLoader;
use crate::context::SlashContext;
use crate::errors::{ExecutionError, SchemaError};
use crate::hooks::{Hooks, TriggeredError};

fn validate_menu_name(name: &str) -> Result<(), SchemaError> {
    let length = name.chars().count();
    if length == 0 || length > 32 {
        return Err(SchemaError::InvalidName {
            name: name.to_owned(),
            reason: "must be between 1 and 32 characters long",
        });
    }
    Ok(())
}

/// A user or message context-menu command.
#[derive(Clone)]
pub struct MenuCommand {
    name: String,
    kind: CommandType,
    name_localizations: HashMap<String, String>,
    callback: MenuCallbackFn,
    checks: Vec<CheckFn<SlashContext>>,
    hooks: Option<Arc<Hooks<SlashContext>>>,
    metadata: HashMap<String, serde_json::Value>,
    default_member_permissions: Option<Permissions>,
    dm_enabled: bool,
    ephemeral_default: Option<bool>,
}

impl MenuCommand {
    /// Creates a user-menu command.
    pub fn user(name: impl Into<String>, callback: MenuCallbackFn) -> Result<Self, SchemaError> {
        Self::new(CommandType::UserMenu, name, callback)
    }

    /// Creates a message-menu command.
    pub fn message(name: impl Into<String>, callback: MenuCallbackFn) -> Result<Self, SchemaError> {
        Self::new(CommandType::MessageMenu, name, callback)
    }

    fn new(
        kind: CommandType,
        name: impl Into<String>,
        callback: MenuCallbackFn,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        validate_menu_name(&name)?;

        Ok(Self {
            name,
            kind,
            name_localizations: HashMap::new(),
            callback,
            checks: Vec::new(),
            hooks: None,
            metadata: HashMap::new(),
            default_member_permissions: None,
            dm_enabled: true,
            ephemeral_default: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CommandType {
        self.kind
    }

    pub fn hook_set(&self) -> Option<&Arc<Hooks<SlashContext>>> {
        self.hooks.as_ref()
    }

    pub fn ephemeral_default(&self) -> Option<bool> {
        self.ephemeral_default
    }

    pub fn check(mut self, check: CheckFn<SlashContext>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn hooks(mut self, hooks: Arc<Hooks<SlashContext>>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    pub fn dm_enabled(mut self, enabled: bool) -> Self {
        self.dm_enabled = enabled;
        self
    }

    pub fn set_ephemeral_default(mut self, state: bool) -> Self {
        self.ephemeral_default = Some(state);
        self
    }

    pub fn name_localization(
        mut self,
        locale: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.name_localizations.insert(locale.into(), name.into());
        self
    }

    /// Builds the declarative registration form: menu commands carry no
    /// description and no options.
    pub fn build(&self) -> CommandData {
        CommandData {
            kind: self.kind,
            name: self.name.clone(),
            name_localizations: self.name_localizations.clone(),
            description: String::new(),
            description_localizations: HashMap::new(),
            options: Vec::new(),
            default_member_permissions: self.default_member_permissions,
            dm_enabled: self.dm_enabled,
        }
    }

    pub async fn check_context(&self, ctx: &SlashContext) -> Result<bool, CheckFailure> {
        gather_checks(ctx, &self.checks).await
    }

    /// Executes this command under the full hook protocol.
    pub async fn execute(
        &self,
        mut ctx: SlashContext,
        friends: &[Arc<Hooks<SlashContext>>],
    ) -> Result<(), ExecutionError> {
        ctx.set_command_name(self.name.clone());
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
        own: &Arc<Hooks<SlashContext>>,
        friends: &[Arc<Hooks<SlashContext>>],
        ctx: &SlashContext,
    ) -> Result<(), ExecutionError> {
        if !own.trigger_pre_execution(ctx, friends).await {
            debug!(command = %self.name, "execution aborted by pre-execution hook");
            return Ok(());
        }

        match (self.callback)(ctx.clone()).await {
            Ok(()) => {
                own.trigger_success(ctx, friends).await;
                Ok(())
            }
            Err(error) => self.handle_failure(own, friends, ctx, error).await,
        }
    }

    async fn handle_failure(
        &self,
        own: &Arc<Hooks<SlashContext>>,
        friends: &[Arc<Hooks<SlashContext>>],
        ctx: &SlashContext,
        error: ExecutionError,
    ) -> Result<(), ExecutionError> {
        match error {
            ExecutionError::Command(error) => {
                ctx.respond_error(&error).await;
                Ok(())
            }
            ExecutionError::Halt => {
                if let Err(error) = ctx.mark_not_found().await {
                    debug!(error = %error, "failed to respond to halted interaction");
                }
                Ok(())
            }
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
                    Ok(())
                } else {
                    Err(ExecutionError::Other(error))
                }
            }
        }
    }
}

impl ComponentLoader for MenuCommand {
    fn load_into_component(
        &self,
        component: &mut crate::component::Component,
    ) -> Result<(), SchemaError> {
        component.add_menu_command(self.clone())
    }
}

impl std::fmt::Debug for MenuCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuCommand")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}
