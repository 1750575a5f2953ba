//! Transport seams.
//!
//! The framework never talks to the platform directly; it calls through the
//! [`Rest`] trait (and optionally a [`Cache`]) supplied at client
//! construction. Callers that miss the cache are expected to fall back to
//! REST, in that order.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::id::{ChannelId, GuildId, InteractionId, UserId};
use crate::model::{Application, Guild, GuildChannel, Member, Role, User};

/// Errors surfaced by the REST seam.
#[derive(Clone, Debug, Error)]
pub enum RestError {
    #[error("entity not found")]
    NotFound,
    #[error("missing access")]
    Forbidden,
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: f64 },
    #[error("internal platform error: {0}")]
    Internal(String),
}

/// The REST operations the framework requires from a transport layer.
#[async_trait]
pub trait Rest: Send + Sync {
    async fn fetch_guild(&self, guild_id: GuildId) -> Result<Guild, RestError>;

    async fn fetch_roles(&self, guild_id: GuildId) -> Result<Vec<Role>, RestError>;

    async fn fetch_channel(&self, channel_id: ChannelId) -> Result<GuildChannel, RestError>;

    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<Member, RestError>;

    async fn fetch_application(&self) -> Result<Application, RestError>;

    async fn fetch_my_user(&self) -> Result<User, RestError>;

    /// Sends a plain text message to a channel.
    async fn create_message(&self, channel_id: ChannelId, content: &str) -> Result<(), RestError>;

    /// Sends the initial response to an interaction.
    async fn create_interaction_response(
        &self,
        interaction_id: InteractionId,
        token: &str,
        content: &str,
        ephemeral: bool,
    ) -> Result<(), RestError>;
}

/// Shared handle to a REST implementation.
pub type SharedRest = Arc<dyn Rest>;

/// The cache operations the framework can take advantage of when present.
///
/// Every method may miss; callers fall back to [`Rest`].
pub trait Cache: Send + Sync {
    fn guild(&self, guild_id: GuildId) -> Option<Guild>;

    fn roles_view(&self, guild_id: GuildId) -> Option<Vec<Role>>;

    fn guild_channel(&self, channel_id: ChannelId) -> Option<GuildChannel>;

    fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<Member>;

    fn current_user(&self) -> Option<User>;
}

/// Shared handle to a cache implementation.
pub type SharedCache = Arc<dyn Cache>;
