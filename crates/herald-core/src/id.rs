//! Snowflake id newtypes.
//!
//! Every platform entity is identified by a 64-bit snowflake. Each entity
//! kind gets its own newtype so that a [`RoleId`] can never be passed where a
//! [`UserId`] is expected.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta] $name:ident),* $(,)?) => {
        $(
            #[$meta]
            #[derive(
                Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(pub u64);

            impl $name {
                /// Returns the raw snowflake value.
                pub const fn get(self) -> u64 {
                    self.0
                }
            }

            impl From<u64> for $name {
                fn from(value: u64) -> Self {
                    Self(value)
                }
            }

            impl From<$name> for u64 {
                fn from(value: $name) -> Self {
                    value.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }
        )*
    };
}

id_type! {
    /// Id of an application (bot account).
    ApplicationId,
    /// Id of a message attachment.
    AttachmentId,
    /// Id of a guild channel or DM channel.
    ChannelId,
    /// Id of a declared application command.
    CommandId,
    /// Id of a guild.
    GuildId,
    /// Id of a single interaction event.
    InteractionId,
    /// Id of a message.
    MessageId,
    /// Id of a guild role.
    RoleId,
    /// Id of a user.
    UserId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_raw_value() {
        assert_eq!(UserId(123456789).to_string(), "123456789");
    }

    #[test]
    fn test_serde_transparent() {
        let id: GuildId = serde_json::from_str("42").unwrap();
        assert_eq!(id, GuildId(42));
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
    }
}
