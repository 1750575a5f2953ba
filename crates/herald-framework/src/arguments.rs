//! Resolved callback arguments.
//!
//! Argument resolution (slash option resolution and message parsing both)
//! produces an [`Arguments`] map of parameter key to [`ArgumentValue`], which
//! is then handed to the command callback.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;

use herald_core::model::{Attachment, GuildChannel, Member, Mentionable, Role, User};

use crate::errors::BoxError;

/// A raw scalar value as supplied by the platform (or a message token).
///
/// This is what converters receive; message tokens always arrive as
/// [`ScalarValue::Str`].
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// A fully resolved value bound to one callback parameter.
#[derive(Clone)]
pub enum ArgumentValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    User(User),
    Member(Member),
    Role(Role),
    Channel(GuildChannel),
    Mentionable(Mentionable),
    Attachment(Attachment),
    /// Collected values of a multi parameter, in supply order.
    List(Vec<ArgumentValue>),
    /// A converter's custom output, downcast with [`Arguments::custom`].
    Custom(Arc<dyn Any + Send + Sync>),
}

impl std::fmt::Debug for ArgumentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Str(value) => f.debug_tuple("Str").field(value).finish(),
            Self::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Self::Float(value) => f.debug_tuple("Float").field(value).finish(),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::User(user) => f.debug_tuple("User").field(&user.id).finish(),
            Self::Member(member) => f.debug_tuple("Member").field(&member.user.id).finish(),
            Self::Role(role) => f.debug_tuple("Role").field(&role.id).finish(),
            Self::Channel(channel) => f.debug_tuple("Channel").field(&channel.id).finish(),
            Self::Mentionable(_) => f.write_str("Mentionable(..)"),
            Self::Attachment(attachment) => {
                f.debug_tuple("Attachment").field(&attachment.id).finish()
            }
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<ScalarValue> for ArgumentValue {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Str(value) => Self::Str(value),
            ScalarValue::Int(value) => Self::Int(value),
            ScalarValue::Float(value) => Self::Float(value),
            ScalarValue::Bool(value) => Self::Bool(value),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ArgumentValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// The keyword-argument mapping handed to a command callback.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    values: HashMap<String, ArgumentValue>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ArgumentValue) {
        self.values.insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ArgumentValue> {
        self.values.get(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ArgumentValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ArgumentValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(ArgumentValue::Float(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ArgumentValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn user(&self, key: &str) -> Option<&User> {
        match self.values.get(key) {
            Some(ArgumentValue::User(value)) => Some(value),
            Some(ArgumentValue::Member(member)) => Some(&member.user),
            _ => None,
        }
    }

    pub fn member(&self, key: &str) -> Option<&Member> {
        match self.values.get(key) {
            Some(ArgumentValue::Member(value)) => Some(value),
            _ => None,
        }
    }

    pub fn role(&self, key: &str) -> Option<&Role> {
        match self.values.get(key) {
            Some(ArgumentValue::Role(value)) => Some(value),
            _ => None,
        }
    }

    pub fn channel(&self, key: &str) -> Option<&GuildChannel> {
        match self.values.get(key) {
            Some(ArgumentValue::Channel(value)) => Some(value),
            _ => None,
        }
    }

    pub fn mentionable(&self, key: &str) -> Option<&Mentionable> {
        match self.values.get(key) {
            Some(ArgumentValue::Mentionable(value)) => Some(value),
            _ => None,
        }
    }

    pub fn attachment(&self, key: &str) -> Option<&Attachment> {
        match self.values.get(key) {
            Some(ArgumentValue::Attachment(value)) => Some(value),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[ArgumentValue]> {
        match self.values.get(key) {
            Some(ArgumentValue::List(values)) => Some(values),
            _ => None,
        }
    }

    /// Downcasts a converter's custom output.
    pub fn custom<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        match self.values.get(key) {
            Some(ArgumentValue::Custom(value)) => Arc::clone(value).downcast::<T>().ok(),
            _ => None,
        }
    }
}

/// A single converter in an option's converter chain.
///
/// Converters are tried in declaration order; the first one that succeeds
/// supplies the resolved value. When every converter fails, the failures are
/// collected into one [`ParserError::Conversion`](crate::errors::ParserError).
pub type ConverterFn =
    Arc<dyn Fn(ScalarValue) -> BoxFuture<'static, Result<ArgumentValue, BoxError>> + Send + Sync>;

/// Wraps an async closure into a [`ConverterFn`].
pub fn converter<F, Fut>(f: F) -> ConverterFn
where
    F: Fn(ScalarValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ArgumentValue, BoxError>> + Send + 'static,
{
    Arc::new(move |value| Box::pin(f(value)))
}

/// Runs a converter chain with first-success semantics.
///
/// Returns the raw value untouched when the chain is empty. When every
/// converter fails, the error wraps all failures in declaration order, named
/// after `parameter`.
pub(crate) async fn run_converters(
    parameter: &str,
    converters: &[ConverterFn],
    value: ScalarValue,
) -> Result<ArgumentValue, crate::errors::ParserError> {
    if converters.is_empty() {
        return Ok(value.into());
    }

    let mut failures = Vec::new();
    for convert in converters {
        match convert(value.clone()).await {
            Ok(converted) => return Ok(converted),
            Err(error) => failures.push(error),
        }
    }

    Err(crate::errors::ParserError::Conversion {
        parameter: parameter.to_owned(),
        errors: failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing(message: &'static str) -> ConverterFn {
        converter(move |_| async move { Err(message.into()) })
    }

    fn doubling() -> ConverterFn {
        converter(|value| async move {
            match value {
                ScalarValue::Int(i) => Ok(ArgumentValue::Int(i * 2)),
                other => Err(format!("expected an int, got {other}").into()),
            }
        })
    }

    #[tokio::test]
    async fn test_empty_chain_passes_value_through() {
        let result = run_converters("x", &[], ScalarValue::Int(3)).await.unwrap();
        assert!(matches!(result, ArgumentValue::Int(3)));
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let chain = vec![failing("first"), doubling(), failing("third")];
        let result = run_converters("x", &chain, ScalarValue::Int(4))
            .await
            .unwrap();
        assert!(matches!(result, ArgumentValue::Int(8)));
    }

    #[tokio::test]
    async fn test_all_failures_collected_in_order() {
        let chain = vec![failing("first"), failing("second"), failing("third")];
        let error = run_converters("x", &chain, ScalarValue::Str("v".into()))
            .await
            .unwrap_err();
        match error {
            crate::errors::ParserError::Conversion { parameter, errors } => {
                assert_eq!(parameter, "x");
                assert_eq!(errors.len(), 3);
                assert_eq!(errors[0].to_string(), "first");
                assert_eq!(errors[2].to_string(), "third");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_arguments_accessors() {
        let mut args = Arguments::new();
        args.insert("name", ArgumentValue::Str("herald".into()));
        args.insert("count", ArgumentValue::Int(3));
        assert_eq!(args.str("name"), Some("herald"));
        assert_eq!(args.int("count"), Some(3));
        assert_eq!(args.int("name"), None);
        assert!(!args.contains("missing"));
    }
}
