//! Decoded interaction payloads.
//!
//! A transport layer decodes the platform's interaction events into these
//! shapes before handing them to the framework. Entity-typed option values
//! carry only ids; the actual entities travel in [`ResolvedData`] and are
//! looked up through the `resolve_to_*` helpers.

use std::collections::HashMap;

use thiserror::Error;

use crate::declare::{CommandType, OptionType};
use crate::id::{AttachmentId, ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};
use crate::model::{Attachment, GuildChannel, Member, Mentionable, Role, User};

/// Error returned when a resolved entity referenced by an option is missing
/// from the interaction's resolved maps.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("no resolved {kind} found for id {id}")]
pub struct ResolveError {
    pub kind: &'static str,
    pub id: u64,
}

impl ResolveError {
    fn new(kind: &'static str, id: u64) -> Self {
        Self { kind, id }
    }
}

/// The decoded value of one interaction option.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    /// A sub-command with its nested options.
    SubCommand(Vec<InteractionOption>),
    /// A sub-command group with its nested sub-command option.
    SubGroup(Vec<InteractionOption>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    User(UserId),
    Channel(ChannelId),
    Role(RoleId),
    /// A role or user id; which one is decided during resolution.
    Mentionable(u64),
    Attachment(AttachmentId),
    /// The option currently being typed in an autocomplete interaction.
    /// `kind` is the declared type of the focused option.
    Focused { kind: OptionType, value: String },
}

impl OptionValue {
    /// The platform type tag for this value.
    pub fn kind(&self) -> OptionType {
        match self {
            Self::SubCommand(_) => OptionType::SubCommand,
            Self::SubGroup(_) => OptionType::SubGroup,
            Self::Str(_) => OptionType::String,
            Self::Int(_) => OptionType::Integer,
            Self::Float(_) => OptionType::Float,
            Self::Bool(_) => OptionType::Boolean,
            Self::User(_) => OptionType::User,
            Self::Channel(_) => OptionType::Channel,
            Self::Role(_) => OptionType::Role,
            Self::Mentionable(_) => OptionType::Mentionable,
            Self::Attachment(_) => OptionType::Attachment,
            Self::Focused { kind, .. } => *kind,
        }
    }
}

/// One named option in an interaction payload.
#[derive(Clone, Debug, PartialEq)]
pub struct InteractionOption {
    pub name: String,
    pub value: OptionValue,
}

impl InteractionOption {
    /// The nested options of a sub-command or sub-group value, if any.
    pub fn nested(&self) -> Option<&[InteractionOption]> {
        match &self.value {
            OptionValue::SubCommand(options) | OptionValue::SubGroup(options) => Some(options),
            _ => None,
        }
    }
}

/// Entities resolved by the platform for the ids referenced in option values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedData {
    pub users: HashMap<UserId, User>,
    pub members: HashMap<UserId, Member>,
    pub roles: HashMap<RoleId, Role>,
    pub channels: HashMap<ChannelId, GuildChannel>,
    pub attachments: HashMap<AttachmentId, Attachment>,
}

impl ResolvedData {
    /// Resolves a user option value to the full user.
    pub fn resolve_to_user(&self, id: UserId) -> Result<&User, ResolveError> {
        self.users
            .get(&id)
            .ok_or_else(|| ResolveError::new("user", id.get()))
    }

    /// Resolves a user option value to guild member data.
    ///
    /// Fails when the user is not in the guild (the platform only resolves
    /// member data for present members).
    pub fn resolve_to_member(&self, id: UserId) -> Result<&Member, ResolveError> {
        self.members
            .get(&id)
            .ok_or_else(|| ResolveError::new("member", id.get()))
    }

    /// Resolves a role option value to the full role.
    pub fn resolve_to_role(&self, id: RoleId) -> Result<&Role, ResolveError> {
        self.roles
            .get(&id)
            .ok_or_else(|| ResolveError::new("role", id.get()))
    }

    /// Resolves a channel option value to the full channel.
    pub fn resolve_to_channel(&self, id: ChannelId) -> Result<&GuildChannel, ResolveError> {
        self.channels
            .get(&id)
            .ok_or_else(|| ResolveError::new("channel", id.get()))
    }

    /// Resolves an attachment option value to the full attachment.
    pub fn resolve_to_attachment(&self, id: AttachmentId) -> Result<&Attachment, ResolveError> {
        self.attachments
            .get(&id)
            .ok_or_else(|| ResolveError::new("attachment", id.get()))
    }

    /// Resolves a mentionable option value to a role, member, or user,
    /// preferring member data over the bare user.
    pub fn resolve_to_mentionable(&self, id: u64) -> Result<Mentionable, ResolveError> {
        if let Some(role) = self.roles.get(&RoleId(id)) {
            return Ok(Mentionable::Role(role.clone()));
        }
        if let Some(member) = self.members.get(&UserId(id)) {
            return Ok(Mentionable::Member(member.clone()));
        }
        if let Some(user) = self.users.get(&UserId(id)) {
            return Ok(Mentionable::User(user.clone()));
        }
        Err(ResolveError::new("mentionable", id))
    }
}

/// A decoded application-command invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandInteraction {
    pub id: InteractionId,
    pub token: String,
    pub command_name: String,
    pub command_type: CommandType,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub user: User,
    pub member: Option<Member>,
    pub options: Vec<InteractionOption>,
    pub resolved: ResolvedData,
    /// For message-menu commands, the message the command targets.
    pub target_message_id: Option<MessageId>,
    /// For user-menu commands, the user the command targets.
    pub target_user_id: Option<UserId>,
}

/// A decoded autocomplete request.
#[derive(Clone, Debug, PartialEq)]
pub struct AutocompleteInteraction {
    pub id: InteractionId,
    pub token: String,
    pub command_name: String,
    pub channel_id: ChannelId,
    pub guild_id: Option<GuildId>,
    pub user: User,
    pub options: Vec<InteractionOption>,
}

/// The option currently being typed, located by walking the option tree.
#[derive(Clone, Debug, PartialEq)]
pub struct FocusedOption {
    pub name: String,
    pub kind: OptionType,
    pub value: String,
}

impl AutocompleteInteraction {
    /// Finds the focused option anywhere in the option tree.
    pub fn focused(&self) -> Option<FocusedOption> {
        fn walk(options: &[InteractionOption]) -> Option<FocusedOption> {
            for option in options {
                match &option.value {
                    OptionValue::Focused { kind, value } => {
                        return Some(FocusedOption {
                            name: option.name.clone(),
                            kind: *kind,
                            value: value.clone(),
                        });
                    }
                    OptionValue::SubCommand(nested) | OptionValue::SubGroup(nested) => {
                        if let Some(found) = walk(nested) {
                            return Some(found);
                        }
                    }
                    _ => {}
                }
            }
            None
        }

        walk(&self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> User {
        User {
            id: UserId(id),
            username: format!("user-{id}"),
            is_bot: false,
        }
    }

    #[test]
    fn test_resolve_to_member_missing() {
        let resolved = ResolvedData::default();
        let err = resolved.resolve_to_member(UserId(7)).unwrap_err();
        assert_eq!(err.kind, "member");
        assert_eq!(err.id, 7);
    }

    #[test]
    fn test_mentionable_prefers_role_then_member() {
        let mut resolved = ResolvedData::default();
        resolved.users.insert(UserId(1), user(1));
        assert!(matches!(
            resolved.resolve_to_mentionable(1),
            Ok(Mentionable::User(_))
        ));

        resolved.members.insert(
            UserId(1),
            Member {
                user: user(1),
                guild_id: GuildId(9),
                role_ids: vec![],
                nickname: None,
            },
        );
        assert!(matches!(
            resolved.resolve_to_mentionable(1),
            Ok(Mentionable::Member(_))
        ));
    }

    #[test]
    fn test_focused_option_found_inside_sub_command() {
        let interaction = AutocompleteInteraction {
            id: InteractionId(1),
            token: "token".to_owned(),
            command_name: "tag".to_owned(),
            channel_id: ChannelId(2),
            guild_id: None,
            user: user(3),
            options: vec![InteractionOption {
                name: "get".to_owned(),
                value: OptionValue::SubCommand(vec![InteractionOption {
                    name: "name".to_owned(),
                    value: OptionValue::Focused {
                        kind: OptionType::String,
                        value: "par".to_owned(),
                    },
                }]),
            }],
        };

        let focused = interaction.focused().unwrap();
        assert_eq!(focused.name, "name");
        assert_eq!(focused.value, "par");
    }
}
