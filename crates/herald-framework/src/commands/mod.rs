//! Command implementations.
//!
//! Three command families share the same execution protocol (checks → hooks →
//! argument binding → callback → outcome routing) but differ in how they are
//! matched and how their arguments arrive:
//!
//! - [`message`] — prefix-triggered text commands, matched by name through
//!   the [`index`] and parsed with
//!   [`ShlexParser`](crate::parsing::ShlexParser).
//! - [`slash`] — application slash commands with a declared option schema.
//! - [`menu`] — user/message context-menu commands, no options at all.

pub mod index;
pub mod menu;
pub mod message;
pub mod slash;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::arguments::Arguments;
use crate::context::{AutocompleteContext, MessageContext, SlashContext};
use crate::errors::ExecutionError;

/// What a command callback returns.
pub type CommandResult = Result<(), ExecutionError>;

/// Type-erased message command callback.
pub type MessageCallbackFn =
    Arc<dyn Fn(MessageContext, Arguments) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Type-erased slash command callback.
pub type SlashCallbackFn =
    Arc<dyn Fn(SlashContext, Arguments) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Type-erased menu command callback.
pub type MenuCallbackFn =
    Arc<dyn Fn(SlashContext) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// Type-erased autocomplete callback; the second argument is the partial
/// value being typed.
pub type AutocompleteFn =
    Arc<dyn Fn(AutocompleteContext, String) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`MessageCallbackFn`].
pub fn message_callback<F, Fut>(f: F) -> MessageCallbackFn
where
    F: Fn(MessageContext, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    Arc::new(move |ctx, args| Box::pin(f(ctx, args)))
}

/// Wraps an async closure into a [`SlashCallbackFn`].
pub fn slash_callback<F, Fut>(f: F) -> SlashCallbackFn
where
    F: Fn(SlashContext, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    Arc::new(move |ctx, args| Box::pin(f(ctx, args)))
}

/// Wraps an async closure into a [`MenuCallbackFn`].
pub fn menu_callback<F, Fut>(f: F) -> MenuCallbackFn
where
    F: Fn(SlashContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Wraps an async closure into an [`AutocompleteFn`].
pub fn autocomplete_callback<F, Fut>(f: F) -> AutocompleteFn
where
    F: Fn(AutocompleteContext, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx, value| Box::pin(f(ctx, value)))
}
