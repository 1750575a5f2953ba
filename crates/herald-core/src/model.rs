//! Guild, channel, and user model.
//!
//! These are deliberately thin decoded shapes: just the fields Herald's
//! checks and argument resolution read. A transport layer is expected to map
//! its own richer types into these.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::{ApplicationId, AttachmentId, ChannelId, GuildId, RoleId, UserId};
use crate::permissions::Permissions;

/// A platform user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub is_bot: bool,
}

/// A guild member: a [`User`] plus their guild-scoped state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    pub guild_id: GuildId,
    pub role_ids: Vec<RoleId>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// A guild role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub permissions: Permissions,
    #[serde(default)]
    pub position: i32,
}

/// The subset of guild state permission calculation needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub owner_id: UserId,
}

/// The channel kinds Herald distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    GuildText,
    Dm,
    GuildVoice,
    GuildCategory,
    GuildNews,
    GuildThread,
}

/// Whether a permission overwrite targets a role or a single member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteType {
    Role,
    Member,
}

/// A channel-level permission overwrite.
///
/// The target id is a role id or user id depending on `kind`; both are
/// snowflakes so the raw value is stored untyped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub target_id: u64,
    pub kind: OverwriteType,
    pub allow: Permissions,
    pub deny: Permissions,
}

/// A channel inside a guild.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuildChannel {
    pub id: ChannelId,
    pub guild_id: GuildId,
    pub name: String,
    pub kind: ChannelType,
    #[serde(default)]
    pub is_nsfw: bool,
    /// Overwrites keyed by target id for O(1) lookup during permission math.
    #[serde(default)]
    pub permission_overwrites: HashMap<u64, PermissionOverwrite>,
}

impl GuildChannel {
    /// Looks up the overwrite targeting the given role, if any.
    pub fn role_overwrite(&self, id: RoleId) -> Option<&PermissionOverwrite> {
        self.permission_overwrites
            .get(&id.get())
            .filter(|o| o.kind == OverwriteType::Role)
    }

    /// Looks up the overwrite targeting the given member, if any.
    pub fn member_overwrite(&self, id: UserId) -> Option<&PermissionOverwrite> {
        self.permission_overwrites
            .get(&id.get())
            .filter(|o| o.kind == OverwriteType::Member)
    }
}

/// A chat message as decoded by the transport layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: crate::id::MessageId,
    pub channel_id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub author: User,
    #[serde(default)]
    pub member: Option<Member>,
    pub content: String,
}

/// A message attachment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

/// The bot's application record, used by the owner check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    /// The individual owner, absent for team-owned applications.
    #[serde(default)]
    pub owner_id: Option<UserId>,
    /// Team member ids, empty for individually-owned applications.
    #[serde(default)]
    pub team_member_ids: Vec<UserId>,
}

impl Application {
    /// Returns `true` if the given user owns this application, either
    /// directly or through team membership.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == Some(user_id) || self.team_member_ids.contains(&user_id)
    }
}

/// The value of a mentionable option: either a role or a user (with member
/// data when the user is in the guild).
#[derive(Clone, Debug, PartialEq)]
pub enum Mentionable {
    Role(Role),
    User(User),
    Member(Member),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_ownership() {
        let app = Application {
            id: ApplicationId(1),
            owner_id: Some(UserId(10)),
            team_member_ids: vec![UserId(20), UserId(21)],
        };
        assert!(app.is_owned_by(UserId(10)));
        assert!(app.is_owned_by(UserId(21)));
        assert!(!app.is_owned_by(UserId(30)));
    }

    #[test]
    fn test_overwrite_kind_filtering() {
        let mut overwrites = HashMap::new();
        overwrites.insert(
            5,
            PermissionOverwrite {
                target_id: 5,
                kind: OverwriteType::Role,
                allow: Permissions::SEND_MESSAGES,
                deny: Permissions::empty(),
            },
        );
        let channel = GuildChannel {
            id: ChannelId(1),
            guild_id: GuildId(2),
            name: "general".to_owned(),
            kind: ChannelType::GuildText,
            is_nsfw: false,
            permission_overwrites: overwrites,
        };
        assert!(channel.role_overwrite(RoleId(5)).is_some());
        assert!(channel.member_overwrite(UserId(5)).is_none());
    }
}
