//! Error types for the Herald framework.
//!
//! The taxonomy separates what a failure *means* to the dispatcher:
//!
//! - [`CommandError`] — intentional, user-facing; its message is sent back as
//!   the response and execution ends normally.
//! - [`ParserError`] — malformed user input; routed to parser-error hooks,
//!   which always suppress it when present.
//! - [`ExecutionError::Halt`] — cooperative stop signal; propagates through
//!   every wrapping layer so no sibling command is tried.
//! - [`ExecutionError::Internal`] — the live command schema diverged from
//!   what was registered; never routed through hooks.
//! - [`SchemaError`] — registration-time validation failure, raised
//!   synchronously before any traffic is dispatched.
//! - Everything else is a generic error, subject to the on-error hook vote.

use std::sync::Arc;

use thiserror::Error;

/// Type-erased error used at the seams of the framework.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A shared, type-erased error handed to on-error hook callbacks.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Error raised to end command execution with a response to the user.
///
/// This is intentional and expected: the message is sent back (truncated to
/// the platform's 2000 character limit) and execution stops without being
/// treated as a bug. On-error hooks never see it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CommandError {
    /// The response message to send.
    pub message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a message parser or option resolver rejected user input.
#[derive(Debug, Error)]
pub enum ParserError {
    /// A parameter value failed every converter in its chain.
    ///
    /// `errors` holds each converter's failure in declaration order.
    #[error("couldn't convert {parameter}: no converter succeeded")]
    Conversion {
        parameter: String,
        errors: Vec<BoxError>,
    },

    /// Not enough values were supplied for a required parameter.
    #[error("missing value for required argument {parameter}")]
    NotEnoughArguments { parameter: String },

    /// More values were supplied than the declared parameters can take.
    #[error("too many arguments passed, couldn't parse {token:?}")]
    TooManyArguments { token: String },

    /// A converted value fell outside the parameter's declared bounds.
    #[error("{parameter} must be between {min} and {max}")]
    OutOfRange {
        parameter: String,
        min: f64,
        max: f64,
    },
}

impl ParserError {
    /// The key of the parameter this error was raised for, when applicable.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::Conversion { parameter, .. }
            | Self::NotEnoughArguments { parameter }
            | Self::OutOfRange { parameter, .. } => Some(parameter),
            Self::TooManyArguments { .. } => None,
        }
    }
}

/// Registration-time validation failure.
///
/// Raised synchronously while declaring commands, options, parsers, or
/// components — before any traffic is matched against them.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid command name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid description: {0}")]
    InvalidDescription(String),

    #[error("commands cannot have more than 25 options")]
    TooManyOptions,

    #[error("options cannot have more than 25 choices")]
    TooManyChoices,

    #[error("min_value cannot be greater than max_value")]
    InvertedValueBounds,

    #[error("invalid length bounds: {0}")]
    InvalidLengthBounds(String),

    #[error("{key:?} is not a declared callback argument")]
    UnknownKey { key: String },

    #[error("no option named {name:?} has been added")]
    UnknownOption { name: String },

    #[error("option {name:?} is a {actual} option, not a {expected} option")]
    OptionTypeMismatch {
        name: String,
        expected: herald_core::OptionType,
        actual: herald_core::OptionType,
    },

    #[error("command groups can only be nested one level deep")]
    NestedTooDeep,

    #[error("command groups cannot have more than 25 commands")]
    GroupFull,

    #[error("command name(s) already registered: {}", names.join(", "))]
    DuplicateNames { names: Vec<String> },

    #[error("command names cannot contain spaces in a strict index")]
    SpacedNameInStrict,

    #[error("only one greedy argument can be registered per parser")]
    MultipleGreedyArguments,

    #[error("a parameter cannot be both greedy and multi")]
    GreedyMultiConflict,

    #[error("no argument can be registered after a greedy or multi argument")]
    ArgumentAfterTerminal,

    #[error("this command is not a command group")]
    NotAGroup,

    #[error("component {name:?} is already bound to a client")]
    AlreadyBound { name: String },

    #[error("component {name:?} is not bound to a client")]
    NotBound { name: String },

    #[error("a component named {name:?} is already registered")]
    DuplicateComponent { name: String },
}

/// Error returned when a declared dependency was never registered.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("no dependency registered for type {type_name}")]
pub struct MissingDependencyError {
    pub type_name: &'static str,
}

/// The failure union produced by command execution.
///
/// Callbacks return `Result<(), ExecutionError>`; the execution protocol
/// routes each variant differently (see the module docs). Parser and generic
/// errors are reference-counted because hook callbacks observe them
/// concurrently before the dispatcher decides whether to re-raise.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Intentional user-facing error; responded to, never re-raised.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Malformed user input; handled by parser-error hooks.
    #[error("{0}")]
    Parser(Arc<ParserError>),

    /// Stop searching for further matching commands entirely.
    #[error("execution halted")]
    Halt,

    /// The live command schema diverged from what was registered.
    ///
    /// Fatal: bypasses all hooks and surfaces to the caller.
    #[error("internal consistency error: {0}")]
    Internal(String),

    /// Any other failure; subject to the on-error hook majority vote.
    #[error("{0}")]
    Other(SharedError),
}

impl ExecutionError {
    /// Wraps an arbitrary error into the generic variant.
    pub fn other(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Arc::new(error))
    }
}

impl From<ParserError> for ExecutionError {
    fn from(error: ParserError) -> Self {
        Self::Parser(Arc::new(error))
    }
}

impl From<BoxError> for ExecutionError {
    fn from(error: BoxError) -> Self {
        Self::Other(Arc::from(error))
    }
}

/// Errors from the client's open/close lifecycle.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("the client is already running")]
    AlreadyRunning,

    #[error("the client is not running")]
    NotRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_error_keeps_parameter() {
        let error = ParserError::Conversion {
            parameter: "age".to_owned(),
            errors: vec![],
        };
        assert_eq!(error.parameter(), Some("age"));
    }

    #[test]
    fn test_execution_error_from_command_error() {
        let error: ExecutionError = CommandError::new("nope").into();
        assert!(matches!(error, ExecutionError::Command(_)));
    }
}
