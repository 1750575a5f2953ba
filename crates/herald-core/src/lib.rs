//! Platform data model and transport seams for the Herald command framework.
//!
//! This crate defines everything Herald needs to know about the chat platform
//! without owning a gateway or REST implementation of its own:
//!
//! - Snowflake id newtypes ([`UserId`], [`GuildId`], …) and the
//!   [`Permissions`] bitset.
//! - The guild/channel/member model used by checks and argument resolution.
//! - Decoded interaction payloads ([`CommandInteraction`],
//!   [`AutocompleteInteraction`]) with `resolve_to_*` helpers over the
//!   payload's resolved-entity maps.
//! - The declarative command-registration output ([`CommandData`]) that a
//!   transport layer serializes when bulk-registering commands.
//! - The [`Rest`] and [`Cache`] seams the framework calls through; any real
//!   HTTP/cache client can sit behind them.

pub mod declare;
pub mod id;
pub mod interaction;
pub mod model;
pub mod permissions;
pub mod rest;

pub use declare::{ChoiceValue, CommandChoice, CommandData, CommandOptionData, CommandType, OptionType};
pub use id::{
    ApplicationId, AttachmentId, ChannelId, CommandId, GuildId, InteractionId, MessageId, RoleId,
    UserId,
};
pub use interaction::{
    AutocompleteInteraction, CommandInteraction, FocusedOption, InteractionOption, OptionValue,
    ResolveError, ResolvedData,
};
pub use model::{
    Application, Attachment, ChannelType, Guild, GuildChannel, Member, Mentionable, Message,
    OverwriteType, PermissionOverwrite, Role, User,
};
pub use permissions::Permissions;
pub use rest::{Cache, Rest, RestError, SharedCache, SharedRest};
