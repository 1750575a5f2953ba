//! Command resolution, argument binding, and execution pipeline for the
//! Herald bot framework.
//!
//! The flow of one inbound event:
//!
//! 1. The [`Client`] strips a message prefix (or reads an interaction's
//!    command name) and offers the event to each [`Component`] in
//!    registration order.
//! 2. The component's [`MessageCommandIndex`](commands::index::MessageCommandIndex)
//!    or slash-command lookup resolves a command, recursing through groups.
//! 3. [`checks`] run in registration order; a failure lets the search move
//!    on, a halt stops it, a user-facing error responds directly.
//! 4. The argument layer ([`parsing`] for messages, the tracked options of a
//!    [`SlashCommand`](commands::slash::SlashCommand) for interactions)
//!    builds the callback's [`Arguments`].
//! 5. [`hooks`] wrap the callback: pre-execution may abort, on-error votes on
//!    suppression, post-execution always fires.
//!
//! The gateway/REST transport, the concrete cache, and the bot bootstrap all
//! live outside this crate, behind the seams defined in `herald-core`.

pub mod arguments;
pub mod checks;
pub mod client;
pub mod commands;
pub mod component;
pub mod context;
pub mod dependencies;
pub mod errors;
pub mod hooks;
pub mod parsing;
pub mod permissions;

pub use arguments::{ArgumentValue, Arguments, ConverterFn, ScalarValue, converter};
pub use checks::{
    AnyChecks, AuthorPermissionCheck, CheckFailure, CheckFn, CheckResult, DmCheck, GuildCheck,
    NsfwCheck, OwnPermissionCheck, OwnerCheck, SfwCheck, check, gather_checks,
};
pub use client::{Client, ClientBuilder};
pub use commands::index::MessageCommandIndex;
pub use commands::menu::MenuCommand;
pub use commands::message::MessageCommand;
pub use commands::slash::{SlashCommand, SlashCommandGroup, SlashEntry, SlashOption};
pub use commands::{
    CommandResult, autocomplete_callback, menu_callback, message_callback, slash_callback,
};
pub use component::{Component, ComponentLoader};
pub use context::{AnyContext, AutocompleteContext, Context, MessageContext, SlashContext};
pub use dependencies::DependencyRegistry;
pub use errors::{
    BoxError, CommandError, ExecutionError, LifecycleError, MissingDependencyError, ParserError,
    SchemaError, SharedError,
};
pub use hooks::{Hooks, TriggeredError, merge_hook_sets};
pub use parsing::{Argument, FlagOption, ShlexParser};
pub use permissions::{calculate_everyone_permissions, calculate_permissions};
