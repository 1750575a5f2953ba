//! Message argument parsing.
//!
//! Message command input is tokenized with shell-like rules (whitespace
//! separation, single/double quotes, escapes inside double quotes) and bound
//! to declared parameters:
//!
//! - [`Argument`]s are positional. A `greedy` argument joins every remaining
//!   positional token into one string before conversion; a `multi` argument
//!   converts each remaining token and collects them into a list. Both are
//!   terminal: nothing positional can be declared after them.
//! - [`FlagOption`]s are named (`--name value`, `-n value`) and must carry a
//!   default, since the user may always omit them.
//!
//! Conversion shares the slash-command converter chain semantics: first
//! converter to succeed wins, all-fail aggregates every failure into one
//! error. Numeric bounds are applied after conversion.

use std::collections::HashMap;

use crate::arguments::{ArgumentValue, Arguments, ConverterFn, ScalarValue, run_converters};
use crate::errors::{ParserError, SchemaError};

/// Shell-like token splitting.
///
/// Handles space/tab separation, quoted strings (single and double quotes),
/// and escape sequences within double quotes.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    let mut has_token = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                has_token = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                has_token = true;
            }
            ' ' | '\t' if !in_single_quote && !in_double_quote => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            _ => {
                current.push(ch);
                has_token = true;
            }
        }
    }

    if has_token {
        tokens.push(current);
    }

    tokens
}

/// A positional parameter.
#[derive(Clone)]
pub struct Argument {
    key: String,
    converters: Vec<ConverterFn>,
    default: Option<ArgumentValue>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    greedy: bool,
    multi: bool,
}

impl Argument {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            converters: Vec::new(),
            default: None,
            min_value: None,
            max_value: None,
            greedy: false,
            multi: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Appends a converter to this parameter's chain.
    pub fn converter(mut self, converter: ConverterFn) -> Self {
        self.converters.push(converter);
        self
    }

    /// Makes the parameter optional with this fallback value.
    pub fn default(mut self, value: impl Into<ArgumentValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Joins all remaining positional tokens into one value.
    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    /// Converts each remaining positional token and collects them.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

/// A named `--flag value` parameter. Always optional, hence the required
/// default.
#[derive(Clone)]
pub struct FlagOption {
    key: String,
    names: Vec<String>,
    converters: Vec<ConverterFn>,
    default: ArgumentValue,
    /// Value used when the flag is present without a following value.
    empty_value: Option<ArgumentValue>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    multi: bool,
}

impl FlagOption {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        default: impl Into<ArgumentValue>,
    ) -> Self {
        Self {
            key: key.into(),
            names: vec![name.into()],
            converters: Vec::new(),
            default: default.into(),
            empty_value: None,
            min_value: None,
            max_value: None,
            multi: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Adds another accepted flag name (e.g. a short `-n` form).
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    pub fn converter(mut self, converter: ConverterFn) -> Self {
        self.converters.push(converter);
        self
    }

    /// Value to use when the flag appears with no value after it.
    pub fn empty_value(mut self, value: impl Into<ArgumentValue>) -> Self {
        self.empty_value = Some(value.into());
        self
    }

    pub fn min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    pub fn max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Collects every occurrence of the flag instead of rejecting repeats.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

fn check_bounds(
    key: &str,
    min: Option<f64>,
    max: Option<f64>,
    value: &ArgumentValue,
) -> Result<(), ParserError> {
    let numeric = match value {
        ArgumentValue::Int(v) => Some(*v as f64),
        ArgumentValue::Float(v) => Some(*v),
        _ => None,
    };
    let Some(numeric) = numeric else {
        return Ok(());
    };

    let low = min.unwrap_or(f64::NEG_INFINITY);
    let high = max.unwrap_or(f64::INFINITY);
    if numeric < low || numeric > high {
        return Err(ParserError::OutOfRange {
            parameter: key.to_owned(),
            min: low,
            max: high,
        });
    }
    Ok(())
}

/// The message command parser: ordered positional arguments plus named flag
/// options.
#[derive(Clone, Default)]
pub struct ShlexParser {
    arguments: Vec<Argument>,
    options: Vec<FlagOption>,
}

impl ShlexParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a positional argument.
    ///
    /// Fails when a greedy argument was already registered (only one may
    /// exist and it must be last), when the argument is both greedy and
    /// multi, or when anything positional follows a terminal argument.
    pub fn add_argument(mut self, argument: Argument) -> Result<Self, SchemaError> {
        if argument.greedy && argument.multi {
            return Err(SchemaError::GreedyMultiConflict);
        }
        if let Some(last) = self.arguments.last() {
            if last.greedy && argument.greedy {
                return Err(SchemaError::MultipleGreedyArguments);
            }
            if last.greedy || last.multi {
                return Err(SchemaError::ArgumentAfterTerminal);
            }
        }
        self.arguments.push(argument);
        Ok(self)
    }

    /// Registers a named flag option.
    pub fn add_option(mut self, option: FlagOption) -> Result<Self, SchemaError> {
        self.options.push(option);
        Ok(self)
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn options(&self) -> &[FlagOption] {
        &self.options
    }

    /// Validates every parameter key against the callback's declared
    /// argument names.
    pub fn validate_keys(&self, declared: &[String]) -> Result<(), SchemaError> {
        for key in self
            .arguments
            .iter()
            .map(Argument::key)
            .chain(self.options.iter().map(FlagOption::key))
        {
            if !declared.iter().any(|name| name == key) {
                return Err(SchemaError::UnknownKey {
                    key: key.to_owned(),
                });
            }
        }
        Ok(())
    }

    fn flag_key(&self, token: &str) -> Option<usize> {
        // A leading dash only marks a flag when it cannot be a negative
        // number, so "-5" stays positional.
        if !token.starts_with('-') || token[1..].starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        self.options
            .iter()
            .position(|option| option.names.iter().any(|name| name == token))
    }

    /// Parses message content into callback arguments.
    pub async fn parse(&self, content: &str) -> Result<Arguments, ParserError> {
        let tokens = tokenize(content);

        // First pass: pull declared flags and their values out of the token
        // stream; everything else stays positional.
        let mut positionals: Vec<String> = Vec::new();
        let mut flag_values: HashMap<usize, Vec<Option<String>>> = HashMap::new();
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            match self.flag_key(token) {
                Some(option_index) => {
                    let next = tokens.get(index + 1);
                    let takes_value = next.is_some_and(|next| self.flag_key(next).is_none());
                    let value = if takes_value {
                        index += 1;
                        Some(tokens[index].clone())
                    } else {
                        None
                    };
                    flag_values.entry(option_index).or_default().push(value);
                }
                None => positionals.push(token.clone()),
            }
            index += 1;
        }

        let mut arguments = Arguments::new();
        self.bind_options(&mut arguments, flag_values).await?;
        self.bind_arguments(&mut arguments, positionals).await?;
        Ok(arguments)
    }

    async fn bind_options(
        &self,
        arguments: &mut Arguments,
        mut flag_values: HashMap<usize, Vec<Option<String>>>,
    ) -> Result<(), ParserError> {
        for (index, option) in self.options.iter().enumerate() {
            let Some(raw_values) = flag_values.remove(&index) else {
                arguments.insert(option.key.clone(), option.default.clone());
                continue;
            };

            let mut converted = Vec::with_capacity(raw_values.len());
            for raw in raw_values {
                let value = match raw {
                    Some(raw) => {
                        let value = run_converters(
                            &option.key,
                            &option.converters,
                            ScalarValue::Str(raw),
                        )
                        .await?;
                        check_bounds(&option.key, option.min_value, option.max_value, &value)?;
                        value
                    }
                    None => match &option.empty_value {
                        Some(value) => value.clone(),
                        None => {
                            return Err(ParserError::NotEnoughArguments {
                                parameter: option.key.clone(),
                            });
                        }
                    },
                };
                converted.push(value);
            }

            if option.multi {
                arguments.insert(option.key.clone(), ArgumentValue::List(converted));
            } else if converted.len() > 1 {
                return Err(ParserError::TooManyArguments {
                    token: option.names[0].clone(),
                });
            } else if let Some(value) = converted.pop() {
                arguments.insert(option.key.clone(), value);
            }
        }
        Ok(())
    }

    async fn bind_arguments(
        &self,
        arguments: &mut Arguments,
        positionals: Vec<String>,
    ) -> Result<(), ParserError> {
        let mut stream = positionals.into_iter().peekable();

        for argument in &self.arguments {
            if argument.greedy {
                let rest: Vec<String> = stream.by_ref().collect();
                if rest.is_empty() {
                    match &argument.default {
                        Some(default) => {
                            arguments.insert(argument.key.clone(), default.clone());
                            continue;
                        }
                        None => {
                            return Err(ParserError::NotEnoughArguments {
                                parameter: argument.key.clone(),
                            });
                        }
                    }
                }
                let joined = rest.join(" ");
                let value = run_converters(
                    &argument.key,
                    &argument.converters,
                    ScalarValue::Str(joined),
                )
                .await?;
                check_bounds(&argument.key, argument.min_value, argument.max_value, &value)?;
                arguments.insert(argument.key.clone(), value);
                continue;
            }

            if argument.multi {
                let rest: Vec<String> = stream.by_ref().collect();
                if rest.is_empty() {
                    match &argument.default {
                        Some(default) => {
                            arguments.insert(argument.key.clone(), default.clone());
                            continue;
                        }
                        None => {
                            return Err(ParserError::NotEnoughArguments {
                                parameter: argument.key.clone(),
                            });
                        }
                    }
                }
                let mut collected = Vec::with_capacity(rest.len());
                for token in rest {
                    let value = run_converters(
                        &argument.key,
                        &argument.converters,
                        ScalarValue::Str(token),
                    )
                    .await?;
                    check_bounds(&argument.key, argument.min_value, argument.max_value, &value)?;
                    collected.push(value);
                }
                arguments.insert(argument.key.clone(), ArgumentValue::List(collected));
                continue;
            }

            match stream.next() {
                Some(token) => {
                    let value = run_converters(
                        &argument.key,
                        &argument.converters,
                        ScalarValue::Str(token),
                    )
                    .await?;
                    check_bounds(&argument.key, argument.min_value, argument.max_value, &value)?;
                    arguments.insert(argument.key.clone(), value);
                }
                None => match &argument.default {
                    Some(default) => arguments.insert(argument.key.clone(), default.clone()),
                    None => {
                        return Err(ParserError::NotEnoughArguments {
                            parameter: argument.key.clone(),
                        });
                    }
                },
            }
        }

        if let Some(extra) = stream.next() {
            return Err(ParserError::TooManyArguments { token: extra });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ShlexParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShlexParser")
            .field("arguments", &self.arguments.len())
            .field("options", &self.options.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::converter;
    use crate::errors::BoxError;

    fn int_converter() -> ConverterFn {
        converter(|value| async move {
            let text = value.to_string();
            let parsed: i64 = text.parse().map_err(|_| -> BoxError {
                format!("{text:?} is not a valid integer").into()
            })?;
            Ok(ArgumentValue::Int(parsed))
        })
    }

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(tokenize("add milk now"), vec!["add", "milk", "now"]);
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"say "hello world" 'single here'"#),
            vec!["say", "hello world", "single here"]
        );
    }

    #[test]
    fn test_tokenize_escapes_in_double_quotes() {
        assert_eq!(tokenize(r#""a \"quoted\" word""#), vec![r#"a "quoted" word"#]);
    }

    #[test]
    fn test_tokenize_empty_quotes_yield_empty_token() {
        assert_eq!(tokenize(r#"name """#), vec!["name", ""]);
    }

    #[tokio::test]
    async fn test_parse_positional_arguments() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("name"))
            .unwrap()
            .add_argument(Argument::new("count").converter(int_converter()))
            .unwrap();

        let args = parser.parse("milk 3").await.unwrap();
        assert_eq!(args.str("name"), Some("milk"));
        assert_eq!(args.int("count"), Some(3));
    }

    #[tokio::test]
    async fn test_parse_missing_required_argument() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("name"))
            .unwrap();
        let error = parser.parse("").await.unwrap_err();
        assert!(matches!(error, ParserError::NotEnoughArguments { .. }));
    }

    #[tokio::test]
    async fn test_parse_default_substituted() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("name").default("anyone"))
            .unwrap();
        let args = parser.parse("").await.unwrap();
        assert_eq!(args.str("name"), Some("anyone"));
    }

    #[tokio::test]
    async fn test_parse_too_many_arguments() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("only"))
            .unwrap();
        let error = parser.parse("one two").await.unwrap_err();
        match error {
            ParserError::TooManyArguments { token } => assert_eq!(token, "two"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_greedy_joins_remaining_tokens() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("target"))
            .unwrap()
            .add_argument(Argument::new("reason").greedy())
            .unwrap();

        let args = parser.parse("someone was being rude").await.unwrap();
        assert_eq!(args.str("target"), Some("someone"));
        assert_eq!(args.str("reason"), Some("was being rude"));
    }

    #[tokio::test]
    async fn test_multi_collects_each_token() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("values").multi().converter(int_converter()))
            .unwrap();

        let args = parser.parse("1 2 3").await.unwrap();
        let list = args.list("values").unwrap();
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_argument_after_greedy_rejected() {
        let result = ShlexParser::new()
            .add_argument(Argument::new("rest").greedy())
            .unwrap()
            .add_argument(Argument::new("after"));
        assert!(matches!(result, Err(SchemaError::ArgumentAfterTerminal)));
    }

    #[test]
    fn test_greedy_multi_conflict_rejected() {
        let result = ShlexParser::new().add_argument(Argument::new("x").greedy().multi());
        assert!(matches!(result, Err(SchemaError::GreedyMultiConflict)));
    }

    #[tokio::test]
    async fn test_flag_option_parsed() {
        let parser = ShlexParser::new()
            .add_option(
                FlagOption::new("count", "--count", ArgumentValue::Int(1))
                    .alias("-c")
                    .converter(int_converter()),
            )
            .unwrap();

        let args = parser.parse("-c 5").await.unwrap();
        assert_eq!(args.int("count"), Some(5));
    }

    #[tokio::test]
    async fn test_flag_option_default_when_absent() {
        let parser = ShlexParser::new()
            .add_option(FlagOption::new("count", "--count", ArgumentValue::Int(1)))
            .unwrap();
        let args = parser.parse("").await.unwrap();
        assert_eq!(args.int("count"), Some(1));
    }

    #[tokio::test]
    async fn test_flag_repeat_without_multi_rejected() {
        let parser = ShlexParser::new()
            .add_option(FlagOption::new("count", "--count", ArgumentValue::Int(1)))
            .unwrap();
        let error = parser.parse("--count 1 --count 2").await.unwrap_err();
        assert!(matches!(error, ParserError::TooManyArguments { .. }));
    }

    #[tokio::test]
    async fn test_negative_number_stays_positional() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("delta").converter(int_converter()))
            .unwrap();
        let args = parser.parse("-5").await.unwrap();
        assert_eq!(args.int("delta"), Some(-5));
    }

    #[tokio::test]
    async fn test_bounds_applied_after_conversion() {
        let parser = ShlexParser::new()
            .add_argument(
                Argument::new("age")
                    .converter(int_converter())
                    .min_value(13.0)
                    .max_value(130.0),
            )
            .unwrap();
        let error = parser.parse("200").await.unwrap_err();
        assert!(matches!(error, ParserError::OutOfRange { .. }));
    }

    #[test]
    fn test_validate_keys() {
        let parser = ShlexParser::new()
            .add_argument(Argument::new("name"))
            .unwrap();
        assert!(parser.validate_keys(&["name".to_owned()]).is_ok());
        let error = parser.validate_keys(&["other".to_owned()]).unwrap_err();
        assert!(matches!(error, SchemaError::UnknownKey { .. }));
    }
}
