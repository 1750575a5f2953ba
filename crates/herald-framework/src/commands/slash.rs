//! Slash commands.
//!
//! A [`SlashCommand`] owns a declared option schema (validated against the
//! platform's limits at registration time) plus the tracked options that bind
//! raw interaction values to callback arguments at execution time. A
//! [`SlashCommandGroup`] nests commands one level deep (groups in groups are
//! allowed, groups in groups in groups are not) and resolves the interaction's
//! structured option tree down to a leaf.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use herald_core::declare::{
    ChoiceValue, CommandChoice, CommandData, CommandOptionData, CommandType, OptionType,
};
use herald_core::interaction::{InteractionOption, OptionValue};
use herald_core::model::ChannelType;
use herald_core::permissions::Permissions;

use crate::arguments::{ArgumentValue, Arguments, ConverterFn, ScalarValue, run_converters};
use crate::checks::{CheckFailure, CheckFn, gather_checks};
use crate::commands::{AutocompleteFn, SlashCallbackFn};
use crate::component::ComponentLoader;
use crate::context::{AutocompleteContext, SlashContext};
use crate::errors::{ExecutionError, ParserError, SchemaError};
use crate::hooks::{Hooks, TriggeredError};

const MAX_OPTIONS: usize = 25;
const MAX_CHOICES: usize = 25;
const MAX_GROUP_COMMANDS: usize = 25;
const MAX_STR_LENGTH: u16 = 6000;

/// Validates a slash command or option name: 1–32 word characters or
/// dashes, already lowercase.
pub(crate) fn validate_name(name: &str) -> Result<(), SchemaError> {
    let length = name.chars().count();
    if length == 0 || length > 32 {
        return Err(SchemaError::InvalidName {
            name: name.to_owned(),
            reason: "must be between 1 and 32 characters long",
        });
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SchemaError::InvalidName {
            name: name.to_owned(),
            reason: "may only contain word characters and dashes",
        });
    }
    if name != name.to_lowercase() {
        return Err(SchemaError::InvalidName {
            name: name.to_owned(),
            reason: "must be lowercase",
        });
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), SchemaError> {
    let length = description.chars().count();
    if length == 0 || length > 100 {
        return Err(SchemaError::InvalidDescription(format!(
            "must be between 1 and 100 characters long, got {length}"
        )));
    }
    Ok(())
}

// ─── Option declaration ──────────────────────────────────────────────────────

/// Whether an option is required and what happens when it is absent.
#[derive(Clone, Debug)]
enum OptionDefault {
    /// No default: the platform requires the option.
    Required,
    /// Optional; when absent the callback key is omitted entirely.
    Omit,
    /// Optional; when absent this value is bound instead.
    Value(ArgumentValue),
}

/// Declarative description of one slash command option.
///
/// Build one with the typed constructors ([`SlashOption::str`],
/// [`SlashOption::int`], …), refine it with the fluent setters, then hand it
/// to [`SlashCommand::add_option`], which validates it against the platform's
/// constraints.
#[derive(Clone)]
pub struct SlashOption {
    kind: OptionType,
    name: String,
    description: String,
    name_localizations: HashMap<String, String>,
    description_localizations: HashMap<String, String>,
    choices: Vec<CommandChoice>,
    converters: Vec<ConverterFn>,
    default: OptionDefault,
    key: Option<String>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    min_length: Option<u16>,
    max_length: Option<u16>,
    channel_types: Vec<ChannelType>,
    always_float: bool,
    only_member: bool,
    pass_as_kwarg: bool,
}

impl SlashOption {
    fn new(kind: OptionType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: description.into(),
            name_localizations: HashMap::new(),
            description_localizations: HashMap::new(),
            choices: Vec::new(),
            converters: Vec::new(),
            default: OptionDefault::Required,
            key: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            channel_types: Vec::new(),
            always_float: false,
            only_member: false,
            pass_as_kwarg: true,
        }
    }

    pub fn str(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::String, name, description)
    }

    pub fn int(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::Integer, name, description)
    }

    pub fn float(name: impl Into<String>, description: impl Into<String>) -> Self {
        // Discord's double type hands back an int or a float depending on
        // what the user typed; always_float papers over that by default.
        let mut option = Self::new(OptionType::Float, name, description);
        option.always_float = true;
        option
    }

    pub fn bool(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::Boolean, name, description)
    }

    pub fn user(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::User, name, description)
    }

    /// A user option which only resolves when the user is a guild member.
    pub fn member(name: impl Into<String>, description: impl Into<String>) -> Self {
        let mut option = Self::new(OptionType::User, name, description);
        option.only_member = true;
        option
    }

    pub fn channel(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::Channel, name, description)
    }

    pub fn role(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::Role, name, description)
    }

    pub fn mentionable(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::Mentionable, name, description)
    }

    pub fn attachment(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionType::Attachment, name, description)
    }

    /// Adds a predefined choice.
    pub fn choice(mut self, name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        self.choices.push(CommandChoice {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a collection of name→value choices at once.
    pub fn choices<N, V>(mut self, choices: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<ChoiceValue>,
    {
        for (name, value) in choices {
            self = self.choice(name, value);
        }
        self
    }

    /// Appends a converter to this option's chain.
    pub fn converter(mut self, converter: ConverterFn) -> Self {
        self.converters.push(converter);
        self
    }

    /// Makes the option optional with this fallback value.
    pub fn default(mut self, value: impl Into<ArgumentValue>) -> Self {
        self.default = OptionDefault::Value(value.into());
        self
    }

    /// Makes the option optional; when absent no callback argument is bound
    /// at all.
    pub fn optional(mut self) -> Self {
        self.default = OptionDefault::Omit;
        self
    }

    /// Binds the option to a differently-named callback argument.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
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

    pub fn min_length(mut self, min: u16) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: u16) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Restricts a channel option to the given channel kinds.
    pub fn channel_types(mut self, types: impl IntoIterator<Item = ChannelType>) -> Self {
        self.channel_types = types.into_iter().collect();
        self
    }

    /// Whether an integer value from the wire is coerced to float before
    /// converters run. Defaults to `true` for float options.
    pub fn always_float(mut self, always_float: bool) -> Self {
        self.always_float = always_float;
        self
    }

    /// Registers the platform option without binding a callback argument;
    /// only requiredness applies and converters are ignored.
    pub fn pass_as_kwarg(mut self, pass: bool) -> Self {
        self.pass_as_kwarg = pass;
        self
    }

    pub fn name_localization(
        mut self,
        locale: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.name_localizations.insert(locale.into(), name.into());
        self
    }

    pub fn description_localization(
        mut self,
        locale: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.description_localizations
            .insert(locale.into(), description.into());
        self
    }
}

// ─── Tracked options ─────────────────────────────────────────────────────────

/// The runtime form of an option, used to bind interaction values to
/// callback arguments.
#[derive(Clone)]
struct TrackedOption {
    key: String,
    name: String,
    kind: OptionType,
    always_float: bool,
    only_member: bool,
    converters: Vec<ConverterFn>,
    default: OptionDefault,
}

impl TrackedOption {
    async fn convert(&self, value: ScalarValue) -> Result<ArgumentValue, ParserError> {
        run_converters(&self.name, &self.converters, value).await
    }
}

// ─── SlashCommand ────────────────────────────────────────────────────────────

/// A declared slash command.
pub struct SlashCommand {
    name: String,
    description: String,
    name_localizations: HashMap<String, String>,
    description_localizations: HashMap<String, String>,
    callback: SlashCallbackFn,
    options: Vec<CommandOptionData>,
    tracked: Vec<TrackedOption>,
    str_autocompletes: HashMap<String, AutocompleteFn>,
    int_autocompletes: HashMap<String, AutocompleteFn>,
    float_autocompletes: HashMap<String, AutocompleteFn>,
    checks: Vec<CheckFn<SlashContext>>,
    hooks: Option<Arc<Hooks<SlashContext>>>,
    metadata: HashMap<String, serde_json::Value>,
    declared_keys: Option<Vec<String>>,
    default_member_permissions: Option<Permissions>,
    dm_enabled: bool,
    ephemeral_default: Option<bool>,
    sort_options: bool,
    /// Required-first ordering computed on demand; any further add_option
    /// invalidates it.
    sorted_cache: Mutex<Option<Vec<CommandOptionData>>>,
}

impl Clone for SlashCommand {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            name_localizations: self.name_localizations.clone(),
            description_localizations: self.description_localizations.clone(),
            callback: Arc::clone(&self.callback),
            options: self.options.clone(),
            tracked: self.tracked.clone(),
            str_autocompletes: self.str_autocompletes.clone(),
            int_autocompletes: self.int_autocompletes.clone(),
            float_autocompletes: self.float_autocompletes.clone(),
            checks: self.checks.clone(),
            hooks: self.hooks.clone(),
            metadata: self.metadata.clone(),
            declared_keys: self.declared_keys.clone(),
            default_member_permissions: self.default_member_permissions,
            dm_enabled: self.dm_enabled,
            ephemeral_default: self.ephemeral_default,
            sort_options: self.sort_options,
            sorted_cache: Mutex::new(None),
        }
    }
}

impl SlashCommand {
    /// Creates a slash command.
    ///
    /// The name must match the platform's naming rule (1–32 word characters
    /// or dashes, lowercase); the description must be 1–100 characters.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        callback: SlashCallbackFn,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let description = description.into();
        validate_name(&name)?;
        validate_description(&description)?;

        Ok(Self {
            name,
            description,
            name_localizations: HashMap::new(),
            description_localizations: HashMap::new(),
            callback,
            options: Vec::new(),
            tracked: Vec::new(),
            str_autocompletes: HashMap::new(),
            int_autocompletes: HashMap::new(),
            float_autocompletes: HashMap::new(),
            checks: Vec::new(),
            hooks: None,
            metadata: HashMap::new(),
            declared_keys: None,
            default_member_permissions: None,
            dm_enabled: true,
            ephemeral_default: None,
            sort_options: true,
            sorted_cache: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn hook_set(&self) -> Option<&Arc<Hooks<SlashContext>>> {
        self.hooks.as_ref()
    }

    pub fn ephemeral_default(&self) -> Option<bool> {
        self.ephemeral_default
    }

    /// Declares the argument keys the callback reads, enabling key
    /// validation for options added afterwards.
    pub fn validate_keys(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, SchemaError> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        for tracked in &self.tracked {
            if !keys.contains(&tracked.key) {
                return Err(SchemaError::UnknownKey {
                    key: tracked.key.clone(),
                });
            }
        }
        self.declared_keys = Some(keys);
        Ok(self)
    }

    pub fn check(mut self, check: CheckFn<SlashContext>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn hooks(mut self, hooks: Arc<Hooks<SlashContext>>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    pub fn dm_enabled(mut self, enabled: bool) -> Self {
        self.dm_enabled = enabled;
        self
    }

    /// Whether responses default to ephemeral for this command.
    pub fn set_ephemeral_default(mut self, state: bool) -> Self {
        self.ephemeral_default = Some(state);
        self
    }

    /// Disables the required-first sort in [`Self::build`], keeping
    /// registration order instead.
    pub fn sort_options(mut self, sort: bool) -> Self {
        self.sort_options = sort;
        self
    }

    pub fn name_localization(
        mut self,
        locale: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.name_localizations.insert(locale.into(), name.into());
        self
    }

    pub fn description_localization(
        mut self,
        locale: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.description_localizations
            .insert(locale.into(), description.into());
        self
    }

    /// Adds an option, validating it against the platform's constraints.
    ///
    /// Fails when the option would exceed the 25-option cap, its name or
    /// description is invalid, its choices exceed 25 or don't match its type,
    /// its numeric or length bounds are inverted or out of range, a
    /// constraint is used with a type that doesn't support it, or key
    /// validation is enabled and the resolved key isn't a declared callback
    /// argument.
    pub fn add_option(mut self, option: SlashOption) -> Result<Self, SchemaError> {
        validate_name(&option.name)?;
        validate_description(&option.description)?;

        if self.options.len() == MAX_OPTIONS {
            return Err(SchemaError::TooManyOptions);
        }
        if option.choices.len() > MAX_CHOICES {
            return Err(SchemaError::TooManyChoices);
        }

        match option.kind {
            OptionType::String => {
                if let Some(min) = option.min_length
                    && min > MAX_STR_LENGTH
                {
                    return Err(SchemaError::InvalidLengthBounds(format!(
                        "min_length must be between 0 and {MAX_STR_LENGTH}, got {min}"
                    )));
                }
                if let Some(max) = option.max_length
                    && !(1..=MAX_STR_LENGTH).contains(&max)
                {
                    return Err(SchemaError::InvalidLengthBounds(format!(
                        "max_length must be between 1 and {MAX_STR_LENGTH}, got {max}"
                    )));
                }
                if let (Some(min), Some(max)) = (option.min_length, option.max_length)
                    && min > max
                {
                    return Err(SchemaError::InvalidLengthBounds(
                        "min_length cannot be greater than max_length".to_owned(),
                    ));
                }
                for choice in &option.choices {
                    if !matches!(choice.value, ChoiceValue::Str(_)) {
                        return Err(SchemaError::OptionTypeMismatch {
                            name: option.name.clone(),
                            expected: OptionType::String,
                            actual: option.kind,
                        });
                    }
                }
            }
            OptionType::Integer | OptionType::Float => {
                if let (Some(min), Some(max)) = (option.min_value, option.max_value)
                    && min > max
                {
                    return Err(SchemaError::InvertedValueBounds);
                }
            }
            OptionType::Boolean
            | OptionType::User
            | OptionType::Channel
            | OptionType::Role
            | OptionType::Mentionable
            | OptionType::Attachment => {}
            OptionType::SubCommand | OptionType::SubGroup => {
                // Sub-commands are built through SlashCommandGroup, never as
                // plain options.
                return Err(SchemaError::OptionTypeMismatch {
                    name: option.name.clone(),
                    expected: OptionType::String,
                    actual: option.kind,
                });
            }
        }

        let key = option.key.clone().unwrap_or_else(|| option.name.clone());
        if let Some(declared) = &self.declared_keys
            && !declared.contains(&key)
        {
            return Err(SchemaError::UnknownKey { key });
        }

        let required = matches!(option.default, OptionDefault::Required);
        let mut declared = CommandOptionData::new(option.kind, &option.name, &option.description);
        declared.name_localizations = option.name_localizations.clone();
        declared.description_localizations = option.description_localizations.clone();
        declared.required = required;
        declared.choices = option.choices.clone();
        declared.channel_types = option.channel_types.clone();
        declared.min_value = option.min_value;
        declared.max_value = option.max_value;
        declared.min_length = option.min_length;
        declared.max_length = option.max_length;
        self.options.push(declared);
        *self.sorted_cache.lock() = None;

        if option.pass_as_kwarg {
            self.tracked.push(TrackedOption {
                key,
                name: option.name,
                kind: option.kind,
                always_float: option.always_float,
                only_member: option.only_member,
                converters: option.converters,
                default: option.default,
            });
        }

        Ok(self)
    }

    fn set_autocomplete(
        mut self,
        kind: OptionType,
        name: &str,
        callback: AutocompleteFn,
    ) -> Result<Self, SchemaError> {
        let Some(option) = self.options.iter_mut().find(|option| option.name == name) else {
            return Err(SchemaError::UnknownOption {
                name: name.to_owned(),
            });
        };
        if option.kind != kind {
            return Err(SchemaError::OptionTypeMismatch {
                name: name.to_owned(),
                expected: kind,
                actual: option.kind,
            });
        }

        option.autocomplete = true;
        *self.sorted_cache.lock() = None;
        let map = match kind {
            OptionType::String => &mut self.str_autocompletes,
            OptionType::Integer => &mut self.int_autocompletes,
            _ => &mut self.float_autocompletes,
        };
        map.insert(name.to_owned(), callback);
        Ok(self)
    }

    /// Attaches an autocomplete callback to a previously added string option.
    pub fn set_str_autocomplete(
        self,
        name: &str,
        callback: AutocompleteFn,
    ) -> Result<Self, SchemaError> {
        self.set_autocomplete(OptionType::String, name, callback)
    }

    /// Attaches an autocomplete callback to a previously added integer
    /// option.
    pub fn set_int_autocomplete(
        self,
        name: &str,
        callback: AutocompleteFn,
    ) -> Result<Self, SchemaError> {
        self.set_autocomplete(OptionType::Integer, name, callback)
    }

    /// Attaches an autocomplete callback to a previously added float option.
    pub fn set_float_autocomplete(
        self,
        name: &str,
        callback: AutocompleteFn,
    ) -> Result<Self, SchemaError> {
        self.set_autocomplete(OptionType::Float, name, callback)
    }

    /// The declared options in stable output order: required before optional
    /// when sorting is enabled, registration order otherwise.
    pub fn sorted_options(&self) -> Vec<CommandOptionData> {
        if !self.sort_options {
            return self.options.clone();
        }

        let mut cache = self.sorted_cache.lock();
        if let Some(sorted) = &*cache {
            return sorted.clone();
        }

        let (required, optional): (Vec<_>, Vec<_>) = self
            .options
            .iter()
            .cloned()
            .partition(|option| option.required);
        let sorted: Vec<CommandOptionData> = required.into_iter().chain(optional).collect();
        *cache = Some(sorted.clone());
        sorted
    }

    /// Builds the declarative registration form of this command.
    pub fn build(&self) -> CommandData {
        CommandData {
            kind: CommandType::Slash,
            name: self.name.clone(),
            name_localizations: self.name_localizations.clone(),
            description: self.description.clone(),
            description_localizations: self.description_localizations.clone(),
            options: self.sorted_options(),
            default_member_permissions: self.default_member_permissions,
            dm_enabled: self.dm_enabled,
        }
    }

    pub async fn check_context(&self, ctx: &SlashContext) -> Result<bool, CheckFailure> {
        gather_checks(ctx, &self.checks).await
    }

    /// Binds the supplied interaction options to callback arguments.
    async fn process_args(
        &self,
        ctx: &SlashContext,
        options: &[InteractionOption],
    ) -> Result<Arguments, ExecutionError> {
        let supplied: HashMap<&str, &OptionValue> = options
            .iter()
            .map(|option| (option.name.as_str(), &option.value))
            .collect();
        let resolved = &ctx.interaction().resolved;

        let mut arguments = Arguments::new();
        for tracked in &self.tracked {
            let Some(value) = supplied.get(tracked.name.as_str()) else {
                match &tracked.default {
                    OptionDefault::Required => {
                        return Err(ExecutionError::Internal(format!(
                            "required option {} is missing data, are the declared commands up \
                             to date?",
                            tracked.name
                        )));
                    }
                    OptionDefault::Omit => continue,
                    OptionDefault::Value(default) => {
                        arguments.insert(tracked.key.clone(), default.clone());
                        continue;
                    }
                }
            };

            let bound = match (tracked.kind, value) {
                (OptionType::User, OptionValue::User(user_id)) => {
                    if tracked.only_member {
                        match resolved.resolve_to_member(*user_id) {
                            Ok(member) => ArgumentValue::Member(member.clone()),
                            Err(_) => {
                                return Err(ParserError::Conversion {
                                    parameter: tracked.name.clone(),
                                    errors: vec![format!(
                                        "couldn't find member for provided user: {user_id}"
                                    )
                                    .into()],
                                }
                                .into());
                            }
                        }
                    } else {
                        ArgumentValue::User(
                            resolved
                                .resolve_to_user(*user_id)
                                .map_err(ExecutionError::other)?
                                .clone(),
                        )
                    }
                }
                (OptionType::Channel, OptionValue::Channel(channel_id)) => ArgumentValue::Channel(
                    resolved
                        .resolve_to_channel(*channel_id)
                        .map_err(ExecutionError::other)?
                        .clone(),
                ),
                (OptionType::Role, OptionValue::Role(role_id)) => ArgumentValue::Role(
                    resolved
                        .resolve_to_role(*role_id)
                        .map_err(ExecutionError::other)?
                        .clone(),
                ),
                (OptionType::Mentionable, OptionValue::Mentionable(id)) => {
                    ArgumentValue::Mentionable(
                        resolved
                            .resolve_to_mentionable(*id)
                            .map_err(ExecutionError::other)?,
                    )
                }
                (OptionType::Attachment, OptionValue::Attachment(attachment_id)) => {
                    ArgumentValue::Attachment(
                        resolved
                            .resolve_to_attachment(*attachment_id)
                            .map_err(ExecutionError::other)?
                            .clone(),
                    )
                }
                (kind, value) if kind.is_scalar() => {
                    let scalar = match value {
                        OptionValue::Str(v) => ScalarValue::Str(v.clone()),
                        OptionValue::Int(v) => {
                            // Coerce before converters see the value so the
                            // wire's int-or-float ambiguity never leaks.
                            if kind == OptionType::Float && tracked.always_float {
                                ScalarValue::Float(*v as f64)
                            } else {
                                ScalarValue::Int(*v)
                            }
                        }
                        OptionValue::Float(v) => ScalarValue::Float(*v),
                        OptionValue::Bool(v) => ScalarValue::Bool(*v),
                        other => {
                            return Err(ExecutionError::Internal(format!(
                                "option {} arrived as {} but was declared {}",
                                tracked.name,
                                other.kind(),
                                kind
                            )));
                        }
                    };
                    tracked.convert(scalar).await?
                }
                (kind, other) => {
                    return Err(ExecutionError::Internal(format!(
                        "option {} arrived as {} but was declared {}",
                        tracked.name,
                        other.kind(),
                        kind
                    )));
                }
            };

            arguments.insert(tracked.key.clone(), bound);
        }

        Ok(arguments)
    }

    /// Executes this command under the full hook protocol.
    ///
    /// `options` is the option list at this level of the interaction tree:
    /// `None` at the top level, the sub-command's nested options when
    /// reached through a group.
    pub async fn execute(
        &self,
        mut ctx: SlashContext,
        options: Option<&[InteractionOption]>,
        friends: &[Arc<Hooks<SlashContext>>],
    ) -> Result<(), ExecutionError> {
        ctx.set_command_name(self.name.clone());
        let own = self
            .hooks
            .clone()
            .unwrap_or_else(|| Arc::new(Hooks::new()));
        let friends: Vec<_> = friends
            .iter()
            .filter(|set| !Arc::ptr_eq(set, &own))
            .cloned()
            .collect();

        let outcome = self.run_protocol(&own, &friends, &ctx, options).await;
        own.trigger_post_execution(&ctx, &friends).await;
        outcome
    }

    async fn run_protocol(
        &self,
        own: &Arc<Hooks<SlashContext>>,
        friends: &[Arc<Hooks<SlashContext>>],
        ctx: &SlashContext,
        options: Option<&[InteractionOption]>,
    ) -> Result<(), ExecutionError> {
        if !own.trigger_pre_execution(ctx, friends).await {
            debug!(command = %self.name, "execution aborted by pre-execution hook");
            return Ok(());
        }

        let arguments = if self.tracked.is_empty() {
            Arguments::new()
        } else {
            let options = options.unwrap_or(&ctx.interaction().options);
            match self.process_args(ctx, options).await {
                Ok(arguments) => arguments,
                Err(error) => return self.handle_failure(own, friends, ctx, error).await,
            }
        };

        match (self.callback)(ctx.clone(), arguments).await {
            Ok(()) => {
                own.trigger_success(ctx, friends).await;
                Ok(())
            }
            Err(error) => self.handle_failure(own, friends, ctx, error).await,
        }
    }

    async fn handle_failure(
        &self,
        own: &Arc<Hooks<SlashContext>>,
        friends: &[Arc<Hooks<SlashContext>>],
        ctx: &SlashContext,
        error: ExecutionError,
    ) -> Result<(), ExecutionError> {
        match error {
            ExecutionError::Command(error) => {
                ctx.respond_error(&error).await;
                Ok(())
            }
            // Unlike a message command this won't necessarily bubble back to
            // a client-level handler, so the not-found response happens here.
            ExecutionError::Halt => {
                if let Err(error) = ctx.mark_not_found().await {
                    debug!(error = %error, "failed to respond to halted interaction");
                }
                Ok(())
            }
            ExecutionError::Internal(message) => Err(ExecutionError::Internal(message)),
            ExecutionError::Parser(error) => {
                let level = own
                    .trigger_error(ctx, &TriggeredError::Parser(Arc::clone(&error)), friends)
                    .await;
                if level > 0 {
                    Ok(())
                } else {
                    Err(ExecutionError::Parser(error))
                }
            }
            ExecutionError::Other(error) => {
                let level = own
                    .trigger_error(ctx, &TriggeredError::Other(Arc::clone(&error)), friends)
                    .await;
                if level > 0 {
                    debug!(command = %self.name, "error suppressed by hook vote");
                    Ok(())
                } else {
                    Err(ExecutionError::Other(error))
                }
            }
        }
    }

    /// Dispatches an autocomplete request to the callback attached to the
    /// focused option.
    pub async fn execute_autocomplete(
        &self,
        ctx: AutocompleteContext,
    ) -> Result<(), ExecutionError> {
        let Some(focused) = ctx.focused() else {
            return Err(ExecutionError::Internal(
                "autocomplete interaction has no focused option".to_owned(),
            ));
        };

        let callback = match focused.kind {
            OptionType::String => self.str_autocompletes.get(&focused.name),
            OptionType::Integer => self.int_autocompletes.get(&focused.name),
            OptionType::Float => self.float_autocompletes.get(&focused.name),
            other => {
                return Err(ExecutionError::Internal(format!(
                    "autocomplete isn't supported for {other} options"
                )));
            }
        };

        let Some(callback) = callback else {
            return Err(ExecutionError::Internal(format!(
                "no autocomplete callback found for option {:?}",
                focused.name
            )));
        };

        trace!(option = %focused.name, "dispatching autocomplete");
        callback(ctx, focused.value).await;
        Ok(())
    }
}

impl ComponentLoader for SlashCommand {
    fn load_into_component(
        &self,
        component: &mut crate::component::Component,
    ) -> Result<(), SchemaError> {
        component.add_slash_command(self.clone())
    }
}

impl std::fmt::Debug for SlashCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlashCommand")
            .field("name", &self.name)
            .field("options", &self.options.len())
            .finish()
    }
}

// ─── SlashCommandGroup ───────────────────────────────────────────────────────

/// A slash command or a nested group, as stored inside groups and
/// components.
#[derive(Clone, Debug)]
pub enum SlashEntry {
    Command(SlashCommand),
    Group(SlashCommandGroup),
}

impl SlashEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::Command(command) => command.name(),
            Self::Group(group) => group.name(),
        }
    }

    pub fn ephemeral_default(&self) -> Option<bool> {
        match self {
            Self::Command(command) => command.ephemeral_default,
            Self::Group(group) => group.ephemeral_default,
        }
    }

    pub fn build(&self) -> CommandData {
        match self {
            Self::Command(command) => command.build(),
            Self::Group(group) => group.build(),
        }
    }

    pub async fn check_context(&self, ctx: &SlashContext) -> Result<bool, CheckFailure> {
        match self {
            Self::Command(command) => command.check_context(ctx).await,
            Self::Group(group) => gather_checks(ctx, &group.checks).await,
        }
    }

    pub async fn execute(
        &self,
        ctx: SlashContext,
        option: Option<&InteractionOption>,
        friends: &[Arc<Hooks<SlashContext>>],
    ) -> Result<(), ExecutionError> {
        match self {
            Self::Command(command) => {
                let options = option.map(|option| option.nested().unwrap_or_default());
                command.execute(ctx, options, friends).await
            }
            Self::Group(group) => Box::pin(group.execute(ctx, option, friends)).await,
        }
    }

    pub async fn execute_autocomplete(
        &self,
        ctx: AutocompleteContext,
        option: Option<&InteractionOption>,
    ) -> Result<(), ExecutionError> {
        match self {
            Self::Command(command) => command.execute_autocomplete(ctx).await,
            Self::Group(group) => Box::pin(group.execute_autocomplete(ctx, option)).await,
        }
    }

    fn contains_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl From<SlashCommand> for SlashEntry {
    fn from(command: SlashCommand) -> Self {
        Self::Command(command)
    }
}

impl From<SlashCommandGroup> for SlashEntry {
    fn from(group: SlashCommandGroup) -> Self {
        Self::Group(group)
    }
}

/// A slash command group: up to 25 uniquely named children, nested at most
/// one level deep.
#[derive(Clone)]
pub struct SlashCommandGroup {
    name: String,
    description: String,
    name_localizations: HashMap<String, String>,
    description_localizations: HashMap<String, String>,
    commands: Vec<Arc<SlashEntry>>,
    checks: Vec<CheckFn<SlashContext>>,
    hooks: Option<Arc<Hooks<SlashContext>>>,
    metadata: HashMap<String, serde_json::Value>,
    default_member_permissions: Option<Permissions>,
    dm_enabled: bool,
    ephemeral_default: Option<bool>,
}

impl SlashCommandGroup {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let description = description.into();
        validate_name(&name)?;
        validate_description(&description)?;

        Ok(Self {
            name,
            description,
            name_localizations: HashMap::new(),
            description_localizations: HashMap::new(),
            commands: Vec::new(),
            checks: Vec::new(),
            hooks: None,
            metadata: HashMap::new(),
            default_member_permissions: None,
            dm_enabled: true,
            ephemeral_default: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Arc<SlashEntry>] {
        &self.commands
    }

    pub fn hook_set(&self) -> Option<&Arc<Hooks<SlashContext>>> {
        self.hooks.as_ref()
    }

    pub fn check(mut self, check: CheckFn<SlashContext>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn hooks(mut self, hooks: Arc<Hooks<SlashContext>>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn default_member_permissions(mut self, permissions: Permissions) -> Self {
        self.default_member_permissions = Some(permissions);
        self
    }

    pub fn dm_enabled(mut self, enabled: bool) -> Self {
        self.dm_enabled = enabled;
        self
    }

    pub fn set_ephemeral_default(mut self, state: bool) -> Self {
        self.ephemeral_default = Some(state);
        self
    }

    /// Adds a sub-command or sub-group.
    ///
    /// Fails when the group already holds 25 children, the name is taken, or
    /// adding would nest groups more than one level deep.
    pub fn add_command(mut self, entry: impl Into<SlashEntry>) -> Result<Self, SchemaError> {
        let entry = entry.into();
        if self.commands.len() == MAX_GROUP_COMMANDS {
            return Err(SchemaError::GroupFull);
        }
        if self
            .commands
            .iter()
            .any(|existing| existing.name() == entry.name())
        {
            return Err(SchemaError::DuplicateNames {
                names: vec![entry.name().to_owned()],
            });
        }
        if let SlashEntry::Group(group) = &entry
            && group.commands.iter().any(|child| child.contains_group())
        {
            return Err(SchemaError::NestedTooDeep);
        }

        self.commands.push(Arc::new(entry));
        Ok(self)
    }

    fn find(&self, name: &str) -> Option<&Arc<SlashEntry>> {
        self.commands.iter().find(|entry| entry.name() == name)
    }

    /// Walks one level of the interaction's structured option tree.
    fn next_option<'a>(
        &self,
        ctx_options: &'a [InteractionOption],
        option: Option<&'a InteractionOption>,
    ) -> Option<&'a InteractionOption> {
        match option {
            None => ctx_options.first(),
            Some(option) => option.nested().and_then(|nested| nested.first()),
        }
    }

    /// Resolves the interaction's option tree to a child and dispatches down
    /// to it, reporting not-found when nothing matches.
    pub async fn execute(
        &self,
        ctx: SlashContext,
        option: Option<&InteractionOption>,
        friends: &[Arc<Hooks<SlashContext>>],
    ) -> Result<(), ExecutionError> {
        let interaction = ctx.interaction_arc();
        let Some(next) = self.next_option(&interaction.options, option) else {
            return Err(ExecutionError::Internal(
                "sub-command option is missing from the interaction".to_owned(),
            ));
        };

        if let Some(command) = self.find(&next.name) {
            if let Some(state) = command.ephemeral_default() {
                ctx.set_ephemeral_default(state);
            }

            match command.check_context(&ctx).await {
                Ok(true) => {
                    let downstream = self.join_own_hooks(friends);
                    return command.execute(ctx, Some(next), &downstream).await;
                }
                Ok(false) => {}
                Err(CheckFailure::Command(error)) => {
                    ctx.respond_error(&error).await;
                    return Ok(());
                }
                Err(CheckFailure::Halt) => return Err(ExecutionError::Halt),
                Err(CheckFailure::Other(error)) => {
                    return Err(ExecutionError::Other(Arc::from(error)));
                }
            }
        } else {
            debug!(group = %self.name, name = %next.name, "unknown sub-command");
        }

        if let Err(error) = ctx.mark_not_found().await {
            debug!(error = %error, "failed to send not-found response");
        }
        Ok(())
    }

    /// Walks the option tree to the focused sub-command for autocomplete.
    pub async fn execute_autocomplete(
        &self,
        ctx: AutocompleteContext,
        option: Option<&InteractionOption>,
    ) -> Result<(), ExecutionError> {
        let interaction = ctx.interaction_arc();
        let Some(next) = self.next_option(&interaction.options, option) else {
            return Err(ExecutionError::Internal(
                "sub-command option is missing from the autocomplete interaction".to_owned(),
            ));
        };

        let Some(command) = self.find(&next.name) else {
            return Err(ExecutionError::Internal(format!(
                "sub-command {:?} not found for autocomplete",
                next.name
            )));
        };

        command.execute_autocomplete(ctx, Some(next)).await
    }

    fn join_own_hooks(
        &self,
        friends: &[Arc<Hooks<SlashContext>>],
    ) -> Vec<Arc<Hooks<SlashContext>>> {
        let Some(own) = &self.hooks else {
            return friends.to_vec();
        };

        let mut joined = Vec::with_capacity(friends.len() + 1);
        if !friends.iter().any(|set| Arc::ptr_eq(set, own)) {
            joined.push(Arc::clone(own));
        }
        joined.extend(friends.iter().cloned());
        joined
    }

    /// Builds the declarative registration form: children become
    /// sub-command and sub-command-group options.
    pub fn build(&self) -> CommandData {
        let options = self
            .commands
            .iter()
            .map(|entry| entry_to_option(entry.as_ref()))
            .collect();

        CommandData {
            kind: CommandType::Slash,
            name: self.name.clone(),
            name_localizations: self.name_localizations.clone(),
            description: self.description.clone(),
            description_localizations: self.description_localizations.clone(),
            options,
            default_member_permissions: self.default_member_permissions,
            dm_enabled: self.dm_enabled,
        }
    }
}

fn entry_to_option(entry: &SlashEntry) -> CommandOptionData {
    match entry {
        SlashEntry::Command(command) => {
            let mut option = CommandOptionData::new(
                OptionType::SubCommand,
                command.name(),
                command.description(),
            );
            option.name_localizations = command.name_localizations.clone();
            option.description_localizations = command.description_localizations.clone();
            option.options = command.sorted_options();
            option
        }
        SlashEntry::Group(group) => {
            let mut option =
                CommandOptionData::new(OptionType::SubGroup, &group.name, &group.description);
            option.name_localizations = group.name_localizations.clone();
            option.description_localizations = group.description_localizations.clone();
            option.options = group
                .commands
                .iter()
                .map(|entry| entry_to_option(entry.as_ref()))
                .collect();
            option
        }
    }
}

impl ComponentLoader for SlashCommandGroup {
    fn load_into_component(
        &self,
        component: &mut crate::component::Component,
    ) -> Result<(), SchemaError> {
        component.add_slash_group(self.clone())
    }
}

impl std::fmt::Debug for SlashCommandGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlashCommandGroup")
            .field("name", &self.name)
            .field("commands", &self.commands.len())
            .finish()
    }
}
