//! Guild permission bitset.
//!
//! A plain `u64` bitset mirroring the platform's permission flags. Only the
//! flags the framework itself reasons about are named; unknown bits survive
//! round-trips untouched.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

/// A set of guild permissions.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub u64);

impl Permissions {
    pub const CREATE_INSTANT_INVITE: Self = Self(1 << 0);
    pub const KICK_MEMBERS: Self = Self(1 << 1);
    pub const BAN_MEMBERS: Self = Self(1 << 2);
    pub const ADMINISTRATOR: Self = Self(1 << 3);
    pub const MANAGE_CHANNELS: Self = Self(1 << 4);
    pub const MANAGE_GUILD: Self = Self(1 << 5);
    pub const ADD_REACTIONS: Self = Self(1 << 6);
    pub const VIEW_AUDIT_LOG: Self = Self(1 << 7);
    pub const VIEW_CHANNEL: Self = Self(1 << 10);
    pub const SEND_MESSAGES: Self = Self(1 << 11);
    pub const MANAGE_MESSAGES: Self = Self(1 << 13);
    pub const EMBED_LINKS: Self = Self(1 << 14);
    pub const ATTACH_FILES: Self = Self(1 << 15);
    pub const READ_MESSAGE_HISTORY: Self = Self(1 << 16);
    pub const MENTION_EVERYONE: Self = Self(1 << 17);
    pub const MUTE_MEMBERS: Self = Self(1 << 22);
    pub const DEAFEN_MEMBERS: Self = Self(1 << 23);
    pub const MOVE_MEMBERS: Self = Self(1 << 24);
    pub const MANAGE_NICKNAMES: Self = Self(1 << 27);
    pub const MANAGE_ROLES: Self = Self(1 << 28);
    pub const MANAGE_WEBHOOKS: Self = Self(1 << 29);

    const NAMED: [(&'static str, Self); 21] = [
        ("CREATE_INSTANT_INVITE", Self::CREATE_INSTANT_INVITE),
        ("KICK_MEMBERS", Self::KICK_MEMBERS),
        ("BAN_MEMBERS", Self::BAN_MEMBERS),
        ("ADMINISTRATOR", Self::ADMINISTRATOR),
        ("MANAGE_CHANNELS", Self::MANAGE_CHANNELS),
        ("MANAGE_GUILD", Self::MANAGE_GUILD),
        ("ADD_REACTIONS", Self::ADD_REACTIONS),
        ("VIEW_AUDIT_LOG", Self::VIEW_AUDIT_LOG),
        ("VIEW_CHANNEL", Self::VIEW_CHANNEL),
        ("SEND_MESSAGES", Self::SEND_MESSAGES),
        ("MANAGE_MESSAGES", Self::MANAGE_MESSAGES),
        ("EMBED_LINKS", Self::EMBED_LINKS),
        ("ATTACH_FILES", Self::ATTACH_FILES),
        ("READ_MESSAGE_HISTORY", Self::READ_MESSAGE_HISTORY),
        ("MENTION_EVERYONE", Self::MENTION_EVERYONE),
        ("MUTE_MEMBERS", Self::MUTE_MEMBERS),
        ("DEAFEN_MEMBERS", Self::DEAFEN_MEMBERS),
        ("MOVE_MEMBERS", Self::MOVE_MEMBERS),
        ("MANAGE_NICKNAMES", Self::MANAGE_NICKNAMES),
        ("MANAGE_ROLES", Self::MANAGE_ROLES),
        ("MANAGE_WEBHOOKS", Self::MANAGE_WEBHOOKS),
    ];

    /// The empty permission set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every named permission flag combined.
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < Self::NAMED.len() {
            bits |= Self::NAMED[i].1.0;
            i += 1;
        }
        Self(bits)
    }

    /// Returns `true` if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for Permissions {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for Permissions {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Permissions(0)");
        }

        let mut first = true;
        write!(f, "Permissions(")?;
        for (name, flag) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_contains_every_named_flag() {
        for (_, flag) in Permissions::NAMED {
            assert!(Permissions::all().contains(flag));
        }
    }

    #[test]
    fn test_contains_requires_every_bit() {
        let both = Permissions::SEND_MESSAGES | Permissions::EMBED_LINKS;
        assert!(both.contains(Permissions::SEND_MESSAGES));
        assert!(!Permissions::SEND_MESSAGES.contains(both));
    }

    #[test]
    fn test_deny_then_allow() {
        let mut perms = Permissions::all();
        perms &= !Permissions::SEND_MESSAGES;
        assert!(!perms.contains(Permissions::SEND_MESSAGES));
        perms |= Permissions::SEND_MESSAGES;
        assert!(perms.contains(Permissions::SEND_MESSAGES));
    }
}
