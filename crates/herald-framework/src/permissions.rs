//! Effective permission calculation.
//!
//! Combines role permissions and channel overwrites in the platform's
//! documented precedence order:
//!
//! 1. Guild owners implicitly hold every permission.
//! 2. Base permissions are the everyone role's joined with each of the
//!    member's roles'.
//! 3. ADMINISTRATOR short-circuits to every permission, overriding any
//!    channel overwrite.
//! 4. Channel overwrites apply everyone deny/allow, then the union of role
//!    denies and allows, then the member's own deny/allow.
//!
//! Guild, role, and channel state is read cache-first with REST fallback.

use std::collections::HashMap;

use herald_core::id::{ChannelId, RoleId};
use herald_core::model::{Guild, GuildChannel, Member, Role};
use herald_core::permissions::Permissions;
use herald_core::rest::RestError;

use crate::client::Client;

fn calculate_role_permissions(roles: &HashMap<RoleId, Role>, member: &Member) -> Permissions {
    // The everyone role shares the guild's id.
    let everyone_id = RoleId(member.guild_id.get());
    let mut permissions = roles
        .get(&everyone_id)
        .map(|role| role.permissions)
        .unwrap_or_else(Permissions::empty);

    for role in member.role_ids.iter().filter_map(|id| roles.get(id)) {
        if role.id != everyone_id {
            permissions |= role.permissions;
        }
    }

    permissions
}

fn calculate_channel_overwrites(
    channel: &GuildChannel,
    member: &Member,
    mut permissions: Permissions,
) -> Permissions {
    if let Some(everyone) = channel.role_overwrite(RoleId(member.guild_id.get())) {
        permissions &= !everyone.deny;
        permissions |= everyone.allow;
    }

    let mut deny = Permissions::empty();
    let mut allow = Permissions::empty();
    for overwrite in member
        .role_ids
        .iter()
        .filter_map(|id| channel.role_overwrite(*id))
    {
        deny |= overwrite.deny;
        allow |= overwrite.allow;
    }

    permissions &= !deny;
    permissions |= allow;

    if let Some(own) = channel.member_overwrite(member.user.id) {
        permissions &= !own.deny;
        permissions |= own.allow;
    }

    permissions
}

async fn fetch_guild(client: &Client, member: &Member) -> Result<Guild, RestError> {
    if let Some(guild) = client.cache().and_then(|cache| cache.guild(member.guild_id)) {
        return Ok(guild);
    }
    client.rest().fetch_guild(member.guild_id).await
}

async fn fetch_roles(client: &Client, member: &Member) -> Result<HashMap<RoleId, Role>, RestError> {
    let roles = match client
        .cache()
        .and_then(|cache| cache.roles_view(member.guild_id))
    {
        Some(roles) => roles,
        None => client.rest().fetch_roles(member.guild_id).await?,
    };
    Ok(roles.into_iter().map(|role| (role.id, role)).collect())
}

async fn fetch_channel(client: &Client, channel_id: ChannelId) -> Result<GuildChannel, RestError> {
    if let Some(channel) = client
        .cache()
        .and_then(|cache| cache.guild_channel(channel_id))
    {
        return Ok(channel);
    }
    client.rest().fetch_channel(channel_id).await
}

/// Calculates a member's effective permissions, scoped to `channel` when one
/// is given.
pub async fn calculate_permissions(
    client: &Client,
    member: &Member,
    channel: Option<ChannelId>,
) -> Result<Permissions, RestError> {
    let guild = fetch_guild(client, member).await?;

    // Guild owners are implicitly admins.
    if guild.owner_id == member.user.id {
        return Ok(Permissions::all());
    }

    let roles = fetch_roles(client, member).await?;

    // Admin overrides all overwrites and is only applicable to roles.
    let permissions = calculate_role_permissions(&roles, member);
    if permissions.contains(Permissions::ADMINISTRATOR) {
        return Ok(Permissions::all());
    }

    let Some(channel_id) = channel else {
        return Ok(permissions);
    };

    let channel = fetch_channel(client, channel_id).await?;
    Ok(calculate_channel_overwrites(&channel, member, permissions))
}

/// Calculates the permissions everyone holds in `channel` by default.
pub async fn calculate_everyone_permissions(
    client: &Client,
    guild_id: herald_core::id::GuildId,
    channel: Option<ChannelId>,
) -> Result<Permissions, RestError> {
    let everyone_id = RoleId(guild_id.get());
    let roles = match client.cache().and_then(|cache| cache.roles_view(guild_id)) {
        Some(roles) => roles,
        None => client.rest().fetch_roles(guild_id).await?,
    };

    let mut permissions = roles
        .iter()
        .find(|role| role.id == everyone_id)
        .map(|role| role.permissions)
        .unwrap_or_else(Permissions::empty);

    if permissions.contains(Permissions::ADMINISTRATOR) {
        return Ok(Permissions::all());
    }

    let Some(channel_id) = channel else {
        return Ok(permissions);
    };

    let channel = fetch_channel(client, channel_id).await?;
    if let Some(everyone) = channel.role_overwrite(everyone_id) {
        permissions &= !everyone.deny;
        permissions |= everyone.allow;
    }

    Ok(permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use herald_core::id::{GuildId, InteractionId, UserId};
    use herald_core::model::{Application, OverwriteType, PermissionOverwrite, User};
    use herald_core::rest::{Cache, Rest, RestError};

    fn member(guild: u64, user: u64, role_ids: Vec<u64>) -> Member {
        Member {
            user: User {
                id: UserId(user),
                username: "someone".to_owned(),
                is_bot: false,
            },
            guild_id: GuildId(guild),
            role_ids: role_ids.into_iter().map(RoleId).collect(),
            nickname: None,
        }
    }

    fn role(id: u64, permissions: Permissions) -> Role {
        Role {
            id: RoleId(id),
            name: format!("role-{id}"),
            permissions,
            position: 0,
        }
    }

    #[test]
    fn test_role_permissions_join_member_roles() {
        let mut roles = HashMap::new();
        roles.insert(RoleId(1), role(1, Permissions::VIEW_CHANNEL));
        roles.insert(RoleId(2), role(2, Permissions::SEND_MESSAGES));
        roles.insert(RoleId(3), role(3, Permissions::BAN_MEMBERS));

        let permissions = calculate_role_permissions(&roles, &member(1, 99, vec![2]));
        assert!(permissions.contains(Permissions::VIEW_CHANNEL));
        assert!(permissions.contains(Permissions::SEND_MESSAGES));
        assert!(!permissions.contains(Permissions::BAN_MEMBERS));
    }

    struct UnreachableRest;

    #[async_trait]
    impl Rest for UnreachableRest {
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

        async fn create_message(&self, _: ChannelId, _: &str) -> Result<(), RestError> {
            Ok(())
        }

        async fn create_interaction_response(
            &self,
            _: InteractionId,
            _: &str,
            _: &str,
            _: bool,
        ) -> Result<(), RestError> {
            Ok(())
        }
    }

    /// A cache with one guild, its roles, and one channel.
    struct StaticCache {
        guild: Guild,
        roles: Vec<Role>,
        channel: GuildChannel,
    }

    impl Cache for StaticCache {
        fn guild(&self, _: GuildId) -> Option<Guild> {
            Some(self.guild.clone())
        }

        fn roles_view(&self, _: GuildId) -> Option<Vec<Role>> {
            Some(self.roles.clone())
        }

        fn guild_channel(&self, _: ChannelId) -> Option<GuildChannel> {
            Some(self.channel.clone())
        }

        fn member(&self, _: GuildId, _: UserId) -> Option<Member> {
            None
        }

        fn current_user(&self) -> Option<User> {
            None
        }
    }

    fn cached_client(owner: u64, roles: Vec<Role>, channel: GuildChannel) -> Client {
        Client::builder(UnreachableRest)
            .cache(StaticCache {
                guild: Guild {
                    id: GuildId(1),
                    name: "guild".to_owned(),
                    owner_id: UserId(owner),
                },
                roles,
                channel,
            })
            .build()
    }

    fn denying_channel() -> GuildChannel {
        let mut overwrites = HashMap::new();
        overwrites.insert(
            1,
            PermissionOverwrite {
                target_id: 1,
                kind: OverwriteType::Role,
                allow: Permissions::empty(),
                deny: Permissions::all(),
            },
        );
        GuildChannel {
            id: ChannelId(10),
            guild_id: GuildId(1),
            name: "locked".to_owned(),
            kind: herald_core::model::ChannelType::GuildText,
            is_nsfw: false,
            permission_overwrites: overwrites,
        }
    }

    #[tokio::test]
    async fn test_guild_owner_gets_all_permissions() {
        let client = cached_client(99, vec![role(1, Permissions::empty())], denying_channel());
        let held = calculate_permissions(&client, &member(1, 99, vec![]), Some(ChannelId(10)))
            .await
            .unwrap();
        assert_eq!(held, Permissions::all());
    }

    #[tokio::test]
    async fn test_administrator_overrides_deny_overwrites() {
        let roles = vec![
            role(1, Permissions::empty()),
            role(2, Permissions::ADMINISTRATOR),
        ];
        let client = cached_client(42, roles, denying_channel());
        let held = calculate_permissions(&client, &member(1, 99, vec![2]), Some(ChannelId(10)))
            .await
            .unwrap();
        assert_eq!(held, Permissions::all());
    }

    #[tokio::test]
    async fn test_deny_overwrite_applies_to_plain_member() {
        let roles = vec![role(
            1,
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
        )];
        let client = cached_client(42, roles, denying_channel());
        let held = calculate_permissions(&client, &member(1, 99, vec![]), Some(ChannelId(10)))
            .await
            .unwrap();
        assert_eq!(held, Permissions::empty());
    }

    #[test]
    fn test_member_overwrite_beats_role_overwrite() {
        let mut overwrites = HashMap::new();
        overwrites.insert(
            2,
            PermissionOverwrite {
                target_id: 2,
                kind: OverwriteType::Role,
                allow: Permissions::empty(),
                deny: Permissions::SEND_MESSAGES,
            },
        );
        overwrites.insert(
            99,
            PermissionOverwrite {
                target_id: 99,
                kind: OverwriteType::Member,
                allow: Permissions::SEND_MESSAGES,
                deny: Permissions::empty(),
            },
        );
        let channel = GuildChannel {
            id: ChannelId(10),
            guild_id: GuildId(1),
            name: "general".to_owned(),
            kind: herald_core::model::ChannelType::GuildText,
            is_nsfw: false,
            permission_overwrites: overwrites,
        };

        let result = calculate_channel_overwrites(
            &channel,
            &member(1, 99, vec![2]),
            Permissions::SEND_MESSAGES | Permissions::VIEW_CHANNEL,
        );
        assert!(result.contains(Permissions::SEND_MESSAGES));
        assert!(result.contains(Permissions::VIEW_CHANNEL));
    }
}
