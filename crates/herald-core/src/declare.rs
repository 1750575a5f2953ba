//! Declarative command-registration output.
//!
//! [`CommandData`] is the stable, serializable shape a transport layer sends
//! when bulk-registering application commands with the platform. The
//! framework's builders produce it via their `build()` methods; nothing in
//! this crate performs the registration call itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::permissions::Permissions;

/// Platform type tags for command options.
///
/// The numeric discriminants are part of the wire format and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[serde(into = "u8", try_from = "u8")]
pub enum OptionType {
    SubCommand = 1,
    SubGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
    Mentionable = 9,
    Float = 10,
    Attachment = 11,
}

impl OptionType {
    /// Returns `true` for the scalar types whose values run through the
    /// converter chain rather than entity resolution.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::String | Self::Integer | Self::Boolean | Self::Float
        )
    }

    /// Returns `true` for the types that support autocomplete.
    pub fn supports_autocomplete(self) -> bool {
        matches!(self, Self::String | Self::Integer | Self::Float)
    }
}

impl From<OptionType> for u8 {
    fn from(value: OptionType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for OptionType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::SubCommand),
            2 => Ok(Self::SubGroup),
            3 => Ok(Self::String),
            4 => Ok(Self::Integer),
            5 => Ok(Self::Boolean),
            6 => Ok(Self::User),
            7 => Ok(Self::Channel),
            8 => Ok(Self::Role),
            9 => Ok(Self::Mentionable),
            10 => Ok(Self::Float),
            11 => Ok(Self::Attachment),
            other => Err(format!("unknown option type {other}")),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SubCommand => "sub-command",
            Self::SubGroup => "sub-command group",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::Mentionable => "mentionable",
            Self::Float => "float",
            Self::Attachment => "attachment",
        };
        f.write_str(name)
    }
}

/// The kind of an application command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[serde(into = "u8", try_from = "u8")]
pub enum CommandType {
    Slash = 1,
    UserMenu = 2,
    MessageMenu = 3,
}

impl From<CommandType> for u8 {
    fn from(value: CommandType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for CommandType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Slash),
            2 => Ok(Self::UserMenu),
            3 => Ok(Self::MessageMenu),
            other => Err(format!("unknown command type {other}")),
        }
    }
}

/// The value side of a command choice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ChoiceValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ChoiceValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// One predefined choice offered for an option.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandChoice {
    pub name: String,
    pub value: ChoiceValue,
}

/// One option in a declared command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandOptionData {
    #[serde(rename = "type")]
    pub kind: OptionType,
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub name_localizations: HashMap<String, String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub description_localizations: HashMap<String, String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<CommandChoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<crate::model::ChannelType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u16>,
    #[serde(default)]
    pub autocomplete: bool,
    /// Nested options for sub-commands and sub-command groups.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionData>,
}

impl CommandOptionData {
    /// A bare option of the given type with everything else defaulted.
    pub fn new(kind: OptionType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            name_localizations: HashMap::new(),
            description: description.into(),
            description_localizations: HashMap::new(),
            required: false,
            choices: Vec::new(),
            channel_types: Vec::new(),
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            autocomplete: false,
            options: Vec::new(),
        }
    }
}

/// A fully declared application command, ready for bulk registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    #[serde(rename = "type")]
    pub kind: CommandType,
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub name_localizations: HashMap<String, String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub description_localizations: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOptionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_member_permissions: Option<Permissions>,
    #[serde(default)]
    pub dm_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_type_wire_values() {
        assert_eq!(serde_json::to_string(&OptionType::String).unwrap(), "3");
        assert_eq!(serde_json::to_string(&OptionType::Attachment).unwrap(), "11");
        let parsed: OptionType = serde_json::from_str("10").unwrap();
        assert_eq!(parsed, OptionType::Float);
    }

    #[test]
    fn test_scalar_classification() {
        assert!(OptionType::Integer.is_scalar());
        assert!(!OptionType::User.is_scalar());
        assert!(!OptionType::SubCommand.is_scalar());
    }

    #[test]
    fn test_empty_collections_skipped() {
        let option = CommandOptionData::new(OptionType::String, "name", "A name.");
        let json = serde_json::to_value(&option).unwrap();
        assert!(json.get("choices").is_none());
        assert!(json.get("options").is_none());
        assert_eq!(json["type"], 3);
    }
}
