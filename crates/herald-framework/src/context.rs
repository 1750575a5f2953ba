//! Execution contexts.
//!
//! A context is created per dispatched event and handed to checks, hooks, and
//! the command callback. Contexts are cheap to clone; mutation during group
//! dispatch (content trimming, triggering-name growth) happens on the
//! dispatcher's owned copy before the next layer sees it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use herald_core::id::{ChannelId, GuildId};
use herald_core::interaction::{AutocompleteInteraction, CommandInteraction, FocusedOption};
use herald_core::model::{Member, Message, User};
use herald_core::rest::RestError;

use crate::client::Client;
use crate::errors::{CommandError, MissingDependencyError};

/// The platform's maximum response length.
const MAX_RESPONSE_LEN: usize = 2000;

/// Truncates a response to the platform limit, marking the cut with an
/// ellipsis when anything was dropped.
pub(crate) fn truncate_response(content: &str) -> String {
    if content.chars().count() <= MAX_RESPONSE_LEN {
        return content.to_owned();
    }

    let mut truncated: String = content.chars().take(MAX_RESPONSE_LEN - 1).collect();
    truncated.push('…');
    truncated
}

/// What every execution context exposes, regardless of how the command was
/// triggered. Checks are written against this trait so one check works for
/// message, slash, and menu commands alike.
#[async_trait]
pub trait Context: Clone + Send + Sync + 'static {
    fn client(&self) -> &Client;

    fn author(&self) -> &User;

    fn member(&self) -> Option<&Member>;

    fn channel_id(&self) -> ChannelId;

    fn guild_id(&self) -> Option<GuildId>;

    /// Sends a response, truncated to the platform limit.
    async fn respond(&self, content: &str) -> Result<(), RestError>;

    /// Looks up a dependency from the client's registry.
    fn dependency<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, MissingDependencyError> {
        self.client().dependencies().require::<T>()
    }
}

// ─── MessageContext ──────────────────────────────────────────────────────────

/// Context of a text-message command invocation.
#[derive(Clone)]
pub struct MessageContext {
    client: Client,
    message: Arc<Message>,
    /// The content still to be matched; group dispatch trims matched names
    /// off the front.
    content: String,
    triggering_prefix: String,
    /// The full name path that led here, e.g. `"note add"`.
    triggering_name: String,
    component_name: Option<String>,
    /// Effective case sensitivity for name matching; the client's setting,
    /// possibly overridden by the invoked component.
    case_sensitive: bool,
}

impl MessageContext {
    pub(crate) fn new(client: Client, message: Message, content: String, prefix: String) -> Self {
        Self {
            client,
            message: Arc::new(message),
            content,
            triggering_prefix: prefix,
            triggering_name: String::new(),
            component_name: None,
            case_sensitive: true,
        }
    }

    /// Whether name matching is case-sensitive for this dispatch.
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub(crate) fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The remaining un-matched message content.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    /// The prefix that triggered this dispatch.
    pub fn triggering_prefix(&self) -> &str {
        &self.triggering_prefix
    }

    /// The space-joined command name path matched so far.
    pub fn triggering_name(&self) -> &str {
        &self.triggering_name
    }

    pub fn set_triggering_name(&mut self, name: String) {
        self.triggering_name = name;
    }

    /// Extends the triggering name with a newly matched segment.
    pub(crate) fn push_triggering_name(&mut self, name: &str) {
        if self.triggering_name.is_empty() {
            self.triggering_name = name.to_owned();
        } else {
            self.triggering_name.push(' ');
            self.triggering_name.push_str(name);
        }
    }

    /// The component this dispatch is running inside, once decided.
    pub fn component_name(&self) -> Option<&str> {
        self.component_name.as_deref()
    }

    pub(crate) fn set_component_name(&mut self, name: String) {
        self.component_name = Some(name);
    }

    /// Sends a [`CommandError`]'s message as the response, if it has one.
    pub(crate) async fn respond_error(&self, error: &CommandError) {
        if error.message.is_empty() {
            return;
        }
        if let Err(send_error) = self.respond(&error.message).await {
            debug!(error = %send_error, "failed to send command error response");
        }
    }
}

#[async_trait]
impl Context for MessageContext {
    fn client(&self) -> &Client {
        &self.client
    }

    fn author(&self) -> &User {
        &self.message.author
    }

    fn member(&self) -> Option<&Member> {
        self.message.member.as_ref()
    }

    fn channel_id(&self) -> ChannelId {
        self.message.channel_id
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.message.guild_id
    }

    async fn respond(&self, content: &str) -> Result<(), RestError> {
        self.client
            .rest()
            .create_message(self.message.channel_id, &truncate_response(content))
            .await
    }
}

// ─── SlashContext ────────────────────────────────────────────────────────────

/// Context of a slash or menu command invocation.
#[derive(Clone)]
pub struct SlashContext {
    client: Client,
    interaction: Arc<CommandInteraction>,
    /// Whether responses default to ephemeral; sub-commands may override on
    /// the way down.
    ephemeral_default: Arc<AtomicBool>,
    not_found: Arc<AtomicBool>,
    command_name: Option<String>,
    component_name: Option<String>,
}

impl SlashContext {
    pub(crate) fn new(client: Client, interaction: CommandInteraction) -> Self {
        Self {
            client,
            interaction: Arc::new(interaction),
            ephemeral_default: Arc::new(AtomicBool::new(false)),
            not_found: Arc::new(AtomicBool::new(false)),
            command_name: None,
            component_name: None,
        }
    }

    pub fn interaction(&self) -> &CommandInteraction {
        &self.interaction
    }

    pub(crate) fn interaction_arc(&self) -> Arc<CommandInteraction> {
        Arc::clone(&self.interaction)
    }

    /// The fully-qualified name of the command being executed, once resolved.
    pub fn command_name(&self) -> Option<&str> {
        self.command_name.as_deref()
    }

    pub(crate) fn set_command_name(&mut self, name: String) {
        self.command_name = Some(name);
    }

    pub fn component_name(&self) -> Option<&str> {
        self.component_name.as_deref()
    }

    pub(crate) fn set_component_name(&mut self, name: String) {
        self.component_name = Some(name);
    }

    pub fn defaults_to_ephemeral(&self) -> bool {
        self.ephemeral_default.load(Ordering::SeqCst)
    }

    pub fn set_ephemeral_default(&self, state: bool) {
        self.ephemeral_default.store(state, Ordering::SeqCst);
    }

    /// Responds that no matching command was found.
    ///
    /// Responds at most once however many layers report not-found.
    pub async fn mark_not_found(&self) -> Result<(), RestError> {
        if self.not_found.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!(command = %self.interaction.command_name, "marking interaction as not found");
        let message = self.client.not_found_message();
        self.client
            .rest()
            .create_interaction_response(self.interaction.id, &self.interaction.token, &message, true)
            .await
    }

    pub(crate) async fn respond_error(&self, error: &CommandError) {
        if error.message.is_empty() {
            return;
        }
        if let Err(send_error) = self.respond(&error.message).await {
            debug!(error = %send_error, "failed to send command error response");
        }
    }
}

#[async_trait]
impl Context for SlashContext {
    fn client(&self) -> &Client {
        &self.client
    }

    fn author(&self) -> &User {
        &self.interaction.user
    }

    fn member(&self) -> Option<&Member> {
        self.interaction.member.as_ref()
    }

    fn channel_id(&self) -> ChannelId {
        self.interaction.channel_id
    }

    fn guild_id(&self) -> Option<GuildId> {
        self.interaction.guild_id
    }

    async fn respond(&self, content: &str) -> Result<(), RestError> {
        self.client
            .rest()
            .create_interaction_response(
                self.interaction.id,
                &self.interaction.token,
                &truncate_response(content),
                self.defaults_to_ephemeral(),
            )
            .await
    }
}

// ─── AutocompleteContext ─────────────────────────────────────────────────────

/// Context of an autocomplete request.
#[derive(Clone)]
pub struct AutocompleteContext {
    client: Client,
    interaction: Arc<AutocompleteInteraction>,
}

impl AutocompleteContext {
    pub(crate) fn new(client: Client, interaction: AutocompleteInteraction) -> Self {
        Self {
            client,
            interaction: Arc::new(interaction),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn interaction(&self) -> &AutocompleteInteraction {
        &self.interaction
    }

    pub(crate) fn interaction_arc(&self) -> Arc<AutocompleteInteraction> {
        Arc::clone(&self.interaction)
    }

    /// The option the user is currently typing.
    pub fn focused(&self) -> Option<FocusedOption> {
        self.interaction.focused()
    }

    pub fn dependency<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, MissingDependencyError> {
        self.client.dependencies().require::<T>()
    }
}

// ─── AnyContext ──────────────────────────────────────────────────────────────

/// A context of either kind, used where one check list gates every command
/// type (component and client scope checks).
#[derive(Clone)]
pub enum AnyContext {
    Message(MessageContext),
    Slash(SlashContext),
}

#[async_trait]
impl Context for AnyContext {
    fn client(&self) -> &Client {
        match self {
            Self::Message(ctx) => ctx.client(),
            Self::Slash(ctx) => ctx.client(),
        }
    }

    fn author(&self) -> &User {
        match self {
            Self::Message(ctx) => ctx.author(),
            Self::Slash(ctx) => ctx.author(),
        }
    }

    fn member(&self) -> Option<&Member> {
        match self {
            Self::Message(ctx) => ctx.member(),
            Self::Slash(ctx) => ctx.member(),
        }
    }

    fn channel_id(&self) -> ChannelId {
        match self {
            Self::Message(ctx) => ctx.channel_id(),
            Self::Slash(ctx) => ctx.channel_id(),
        }
    }

    fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::Message(ctx) => ctx.guild_id(),
            Self::Slash(ctx) => ctx.guild_id(),
        }
    }

    async fn respond(&self, content: &str) -> Result<(), RestError> {
        match self {
            Self::Message(ctx) => ctx.respond(content).await,
            Self::Slash(ctx) => ctx.respond(content).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_content_untouched() {
        assert_eq!(truncate_response("hello"), "hello");
    }

    #[test]
    fn test_truncate_long_content_ends_with_ellipsis() {
        let long = "a".repeat(2500);
        let truncated = truncate_response(&long);
        assert_eq!(truncated.chars().count(), 2000);
        assert!(truncated.ends_with('…'));
    }

    #[test]
    fn test_truncate_exact_limit_untouched() {
        let exact = "b".repeat(2000);
        assert_eq!(truncate_response(&exact), exact);
    }
}
