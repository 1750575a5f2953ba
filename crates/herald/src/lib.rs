//! A command-dispatch framework for Discord-style chat bots.
//!
//! Herald sits between a gateway/REST transport and your command callbacks:
//! it matches inbound messages and interactions to registered commands, runs
//! authorization checks, binds typed arguments, and routes failures through
//! hook callbacks — with whole command bundles loadable and unloadable at
//! runtime.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! let ping = SlashCommand::new("ping", "Replies with pong.", slash_callback(
//!     |ctx: SlashContext, _args| async move {
//!         ctx.respond("pong!").await.map_err(ExecutionError::other)
//!     },
//! ))?;
//!
//! let component = Component::new("general").with_slash_command(ping)?;
//!
//! let client = Client::builder(my_rest).prefix("!").build();
//! client.add_component(component)?;
//! ```

pub use herald_core as core;
pub use herald_framework as framework;

pub use herald_core::{
    Application, Attachment, AutocompleteInteraction, Cache, ChannelType, ChoiceValue,
    CommandChoice, CommandData, CommandInteraction, CommandOptionData, CommandType, Guild,
    GuildChannel, InteractionOption, Member, Mentionable, Message, OptionType, OptionValue,
    OverwriteType, PermissionOverwrite, Permissions, ResolvedData, Rest, RestError, Role, User,
};
pub use herald_framework::{
    AnyChecks, AnyContext, Argument, ArgumentValue, Arguments, AuthorPermissionCheck,
    AutocompleteContext, CheckFailure, CheckFn, Client, ClientBuilder, CommandError,
    CommandResult, Component, ComponentLoader, Context, ConverterFn, DependencyRegistry, DmCheck,
    ExecutionError, FlagOption, GuildCheck, Hooks, MenuCommand, MessageCommand,
    MessageCommandIndex, MessageContext, NsfwCheck, OwnPermissionCheck, OwnerCheck, ParserError,
    ScalarValue, SchemaError, SfwCheck, ShlexParser, SlashCommand, SlashCommandGroup, SlashContext,
    SlashOption,
};

/// The common imports for building a bot with Herald.
pub mod prelude {
    pub use herald_core::{
        ChannelType, CommandInteraction, CommandType, Message, OptionType, Permissions,
    };
    pub use herald_framework::{
        Argument, ArgumentValue, Arguments, Client, CommandError, CommandResult, Component,
        ComponentLoader, Context, ExecutionError, FlagOption, Hooks, MenuCommand, MessageCommand,
        MessageContext, ShlexParser, SlashCommand, SlashCommandGroup, SlashContext, SlashOption,
        autocomplete_callback, check, converter, menu_callback, message_callback, slash_callback,
    };
}
