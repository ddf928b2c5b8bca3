use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::command::model::*;
use crate::model::Arity;
use crate::pipeline::{ActionHandler, CommandHandler, ExecutionContext, Middleware, StepResult};

/// An invalid command tree declaration.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Config error: {0}")]
pub struct ConfigError(pub(crate) String);

/// Declares an option (named argument).
///
/// ### Example
/// ```
/// use argot_engine::{Arity, OptionBuilder, TypeDescriptor};
///
/// let option = OptionBuilder::new("count")
///     .short('c')
///     .value_type(TypeDescriptor::of::<u32>())
///     .arity(Arity::ZERO_OR_MORE);
/// ```
#[derive(Debug, Clone)]
pub struct OptionBuilder {
    name: Option<String>,
    long: Option<String>,
    short: Option<char>,
    aliases: Vec<String>,
    flag: bool,
    inherited: bool,
    arity: Arity,
    type_descriptor: TypeDescriptor,
    allowed_values: Option<Vec<String>>,
    default: Option<DefaultValue>,
    hidden: bool,
    description: Option<String>,
}

impl OptionBuilder {
    /// An optional, single-valued `String` option named `--long`.
    pub fn new(long: impl Into<String>) -> Self {
        Self {
            long: Some(long.into()),
            ..Self::empty()
        }
    }

    /// An option spelled only as `-short`.
    pub fn short_only(short: char) -> Self {
        Self {
            short: Some(short),
            ..Self::empty()
        }
    }

    /// A boolean flag named `--long`.
    pub fn flag(long: impl Into<String>) -> Self {
        Self {
            long: Some(long.into()),
            flag: true,
            type_descriptor: TypeDescriptor::boolean(),
            ..Self::empty()
        }
    }

    fn empty() -> Self {
        Self {
            name: None,
            long: None,
            short: None,
            aliases: Vec::default(),
            flag: false,
            inherited: false,
            arity: Arity::ZERO_OR_ONE,
            type_descriptor: TypeDescriptor::string(),
            allowed_values: None,
            default: None,
            hidden: false,
            description: None,
        }
    }

    /// The binding name; defaults to the long name (or the short character).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name.replace(name.into());
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short.replace(short);
        self
    }

    /// An additional long name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Make the option matchable from every descendant command.
    pub fn inherited(mut self) -> Self {
        self.inherited = true;
        self
    }

    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    /// Shorthand for `arity(Arity::EXACTLY_ONE)`.
    pub fn required(self) -> Self {
        self.arity(Arity::EXACTLY_ONE)
    }

    pub fn value_type(mut self, type_descriptor: TypeDescriptor) -> Self {
        self.type_descriptor = type_descriptor;
        self
    }

    /// Restrict the option to a closed value set.
    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values
            .replace(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default
            .replace(DefaultValue::Static(vec![value.into()]));
        self
    }

    pub fn default_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default.replace(DefaultValue::Static(
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Fall back to the named environment variable.
    pub fn env_var(mut self, variable: impl Into<String>) -> Self {
        self.default.replace(DefaultValue::EnvVar(variable.into()));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description.replace(description.into());
        self
    }

    fn build(self, id: ArgumentId) -> Result<Argument, ConfigError> {
        let name = match (&self.name, &self.long, self.short) {
            (Some(name), _, _) => name.clone(),
            (None, Some(long), _) => long.clone(),
            (None, None, Some(short)) => short.to_string(),
            (None, None, None) => {
                return Err(ConfigError(
                    "option must have a long or short name.".to_string(),
                ))
            }
        };

        if self.long.as_deref() == Some("") || self.aliases.iter().any(String::is_empty) {
            return Err(ConfigError(format!("option '{name}' has an empty name.")));
        }

        if self.flag && self.arity.maximum() != Some(1) {
            return Err(ConfigError(format!(
                "flag '{name}' must accept at most one value, not {}.",
                self.arity
            )));
        }

        Ok(Argument {
            id,
            name,
            kind: ArgumentKind::Option(OptionNames {
                long: self.long,
                short: self.short,
                aliases: self.aliases,
                flag: self.flag,
                inherited: self.inherited,
            }),
            arity: self.arity,
            type_descriptor: self.type_descriptor,
            allowed_values: self.allowed_values,
            default: self.default,
            hidden: self.hidden,
            description: self.description,
        })
    }
}

/// Declares an operand (positional argument).
#[derive(Debug, Clone)]
pub struct OperandBuilder {
    name: String,
    arity: Arity,
    type_descriptor: TypeDescriptor,
    allowed_values: Option<Vec<String>>,
    default: Option<DefaultValue>,
    hidden: bool,
    description: Option<String>,
}

impl OperandBuilder {
    /// A required, single-valued `String` operand.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: Arity::EXACTLY_ONE,
            type_descriptor: TypeDescriptor::string(),
            allowed_values: None,
            default: None,
            hidden: false,
            description: None,
        }
    }

    pub fn arity(mut self, arity: Arity) -> Self {
        self.arity = arity;
        self
    }

    /// Shorthand for `arity(Arity::ZERO_OR_ONE)`.
    pub fn optional(self) -> Self {
        self.arity(Arity::ZERO_OR_ONE)
    }

    pub fn value_type(mut self, type_descriptor: TypeDescriptor) -> Self {
        self.type_descriptor = type_descriptor;
        self
    }

    pub fn allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values
            .replace(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default
            .replace(DefaultValue::Static(vec![value.into()]));
        self
    }

    pub fn env_var(mut self, variable: impl Into<String>) -> Self {
        self.default.replace(DefaultValue::EnvVar(variable.into()));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description.replace(description.into());
        self
    }

    fn build(self, id: ArgumentId) -> Result<Argument, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError("operand has an empty name.".to_string()));
        }

        Ok(Argument {
            id,
            name: self.name,
            kind: ArgumentKind::Operand,
            arity: self.arity,
            type_descriptor: self.type_descriptor,
            allowed_values: self.allowed_values,
            default: self.default,
            hidden: self.hidden,
            description: self.description,
        })
    }
}

#[derive(Debug, Clone)]
enum ArgumentBuilder {
    Option(OptionBuilder),
    Operand(OperandBuilder),
}

/// Declares a command, its arguments, and its subcommands.
///
/// ### Example
/// ```
/// use argot_engine::{CommandBuilder, CommandTree, ExitCode, OperandBuilder, OptionBuilder};
///
/// let tree = CommandBuilder::new("git")
///     .option(OptionBuilder::flag("verbose").short('v').inherited())
///     .subcommand(
///         CommandBuilder::new("add")
///             .operand(OperandBuilder::new("path"))
///             .action(|_| Ok(ExitCode::SUCCESS)),
///     )
///     .build()
///     .unwrap();
///
/// assert_eq!(tree.root().subcommands().len(), 1);
/// ```
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    arguments: Vec<ArgumentBuilder>,
    subcommands: Vec<CommandBuilder>,
    hidden: bool,
    handler: Option<Arc<dyn CommandHandler>>,
    interceptor: Option<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("arguments", &self.arguments)
            .field("subcommands", &self.subcommands)
            .finish_non_exhaustive()
    }
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::default(),
            description: None,
            arguments: Vec::default(),
            subcommands: Vec::default(),
            hidden: false,
            handler: None,
            interceptor: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description.replace(description.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn option(mut self, option: OptionBuilder) -> Self {
        self.arguments.push(ArgumentBuilder::Option(option));
        self
    }

    /// Operands bind positionally, in the order they are declared.
    pub fn operand(mut self, operand: OperandBuilder) -> Self {
        self.arguments.push(ArgumentBuilder::Operand(operand));
        self
    }

    pub fn subcommand(mut self, subcommand: CommandBuilder) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    /// Make the command invocable.
    pub fn handler(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.handler.replace(Arc::new(handler));
        self
    }

    /// Make the command invocable via a synchronous closure.
    pub fn action<F>(self, action: F) -> Self
    where
        F: Fn(&mut ExecutionContext) -> StepResult + Send + Sync + 'static,
    {
        self.handler(ActionHandler(action))
    }

    /// Wrap the invocation of this command and every descendant.
    pub fn interceptor(mut self, interceptor: impl Middleware + 'static) -> Self {
        self.interceptor.replace(Arc::new(interceptor));
        self
    }

    /// Validate the declarations and freeze them into a [`CommandTree`].
    pub fn build(self) -> Result<CommandTree, ConfigError> {
        let mut commands = Vec::default();
        flatten(self, None, &mut commands)?;

        #[cfg(feature = "tracing_debug")]
        {
            debug!("Built command tree with {} commands.", commands.len());
        }

        Ok(CommandTree { commands })
    }
}

fn flatten(
    builder: CommandBuilder,
    parent: Option<CommandId>,
    commands: &mut Vec<Command>,
) -> Result<CommandId, ConfigError> {
    let id = CommandId(commands.len());
    let CommandBuilder {
        name,
        aliases,
        description,
        arguments,
        subcommands,
        hidden,
        handler,
        interceptor,
    } = builder;

    if name.is_empty() {
        return Err(ConfigError("command has an empty name.".to_string()));
    }

    let arguments = arguments
        .into_iter()
        .enumerate()
        .map(|(index, argument)| {
            let argument_id = ArgumentId::new(id, index);
            match argument {
                ArgumentBuilder::Option(option) => option.build(argument_id),
                ArgumentBuilder::Operand(operand) => operand.build(argument_id),
            }
        })
        .collect::<Result<Vec<Argument>, ConfigError>>()?;
    validate_arguments(&name, &arguments)?;
    validate_subcommands(&name, &subcommands)?;

    commands.push(Command {
        id,
        name,
        aliases,
        description,
        parent,
        arguments,
        subcommands: Vec::default(),
        hidden,
        handler,
        interceptor,
    });

    let mut children = Vec::with_capacity(subcommands.len());
    for subcommand in subcommands {
        children.push(flatten(subcommand, Some(id), commands)?);
    }
    commands[id.0].subcommands = children;

    Ok(id)
}

fn validate_arguments(command: &str, arguments: &[Argument]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    let mut long_names = HashSet::new();
    let mut short_names = HashSet::new();

    for argument in arguments {
        if !names.insert(argument.name()) {
            return Err(ConfigError(format!(
                "command '{command}' contains duplicate argument '{}'.",
                argument.name()
            )));
        }

        if let Some(names) = argument.option() {
            for long in names.long_names() {
                if !long_names.insert(long) {
                    return Err(ConfigError(format!(
                        "command '{command}' contains duplicate option '--{long}'."
                    )));
                }
            }

            if let Some(short) = names.short() {
                if !short_names.insert(short) {
                    return Err(ConfigError(format!(
                        "command '{command}' contains duplicate short option '-{short}'."
                    )));
                }
            }
        }
    }

    let operands: Vec<&Argument> = arguments.iter().filter(|a| a.is_operand()).collect();
    for (position, operand) in operands.iter().enumerate() {
        let last = position + 1 == operands.len();

        // A variable length operand would swallow every operand after it.
        if !last && operand.arity().maximum() != Some(operand.arity().minimum()) {
            return Err(ConfigError(format!(
                "command '{command}' operand '{}' with arity {} must be declared last.",
                operand.name(),
                operand.arity()
            )));
        }
    }

    Ok(())
}

fn validate_subcommands(command: &str, subcommands: &[CommandBuilder]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for subcommand in subcommands {
        for name in std::iter::once(&subcommand.name).chain(subcommand.aliases.iter()) {
            if !names.insert(name.as_str()) {
                return Err(ConfigError(format!(
                    "command '{command}' contains duplicate subcommand '{name}'."
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExitCode;
    use crate::test::assert_contains;
    use crate::tokens::OptionPrefix;
    use rstest::rstest;

    fn git() -> CommandBuilder {
        CommandBuilder::new("git")
            .option(OptionBuilder::flag("verbose").short('v').inherited())
            .option(OptionBuilder::new("config").short('c'))
            .subcommand(
                CommandBuilder::new("remote")
                    .alias("rem")
                    .subcommand(
                        CommandBuilder::new("add")
                            .operand(OperandBuilder::new("name"))
                            .operand(OperandBuilder::new("url"))
                            .action(|_| Ok(ExitCode::SUCCESS)),
                    ),
            )
            .subcommand(CommandBuilder::new("status").action(|_| Ok(ExitCode::SUCCESS)))
    }

    #[test]
    fn build_flattens_preorder() {
        let tree = git().build().unwrap();
        let names: Vec<&str> = tree.commands().map(|c| c.name()).collect();
        assert_eq!(names, vec!["git", "remote", "add", "status"]);

        let add = tree.find_subcommand(CommandId(1), "add").unwrap();
        assert_eq!(tree.full_name(add), "git remote add");
        assert_eq!(tree.path(add), vec![CommandId::ROOT, CommandId(1), add]);
        assert_eq!(tree.find_subcommand(CommandId::ROOT, "rem"), Some(CommandId(1)));
        assert_eq!(tree.find_subcommand(CommandId::ROOT, "add"), None);
        assert!(!tree.command(CommandId(1)).is_invocable());
        assert!(tree.command(add).is_invocable());
    }

    #[rstest]
    #[case(CommandId::ROOT, OptionPrefix::Long, "verbose", Some(0))]
    #[case(CommandId::ROOT, OptionPrefix::Short, "v", Some(0))]
    #[case(CommandId::ROOT, OptionPrefix::Short, "c", Some(1))]
    #[case(CommandId::ROOT, OptionPrefix::Short, "verbose", None)]
    #[case(CommandId::ROOT, OptionPrefix::Slash, "verbose", Some(0))]
    #[case(CommandId::ROOT, OptionPrefix::Slash, "v", Some(0))]
    #[case(CommandId(2), OptionPrefix::Long, "verbose", Some(0))]
    #[case(CommandId(2), OptionPrefix::Long, "config", None)]
    fn find_option(
        #[case] command: CommandId,
        #[case] prefix: OptionPrefix,
        #[case] name: &str,
        #[case] expected: Option<usize>,
    ) {
        let tree = git().build().unwrap();
        assert_eq!(
            tree.find_option(command, prefix, name, false),
            expected.map(|index| ArgumentId::new(CommandId::ROOT, index))
        );
    }

    #[test]
    fn find_option_single_hyphen() {
        let tree = git().build().unwrap();
        assert_eq!(
            tree.find_option(CommandId::ROOT, OptionPrefix::Short, "verbose", true),
            Some(ArgumentId::new(CommandId::ROOT, 0))
        );
    }

    #[rstest]
    #[case(
        CommandBuilder::new("x").option(OptionBuilder::new("a")).option(OptionBuilder::new("a")),
        "duplicate argument 'a'"
    )]
    #[case(
        CommandBuilder::new("x").option(OptionBuilder::new("a")).option(OptionBuilder::new("b").alias("a")),
        "duplicate option '--a'"
    )]
    #[case(
        CommandBuilder::new("x").option(OptionBuilder::new("a").short('s')).option(OptionBuilder::new("b").short('s')),
        "duplicate short option '-s'"
    )]
    #[case(
        CommandBuilder::new("x").subcommand(CommandBuilder::new("a")).subcommand(CommandBuilder::new("b").alias("a")),
        "duplicate subcommand 'a'"
    )]
    #[case(
        CommandBuilder::new("x").operand(OperandBuilder::new("a").arity(Arity::ONE_OR_MORE)).operand(OperandBuilder::new("b")),
        "must be declared last"
    )]
    #[case(
        CommandBuilder::new("x").operand(OperandBuilder::new("a").optional()).operand(OperandBuilder::new("b")),
        "must be declared last"
    )]
    #[case(
        CommandBuilder::new("x").option(OptionBuilder::flag("f").arity(Arity::ZERO_OR_MORE)),
        "must accept at most one value"
    )]
    #[case(CommandBuilder::new(""), "empty name")]
    fn build_invalid(#[case] builder: CommandBuilder, #[case] expected: &str) {
        assert_matches!(builder.build(), Err(ConfigError(message)) => {
            assert_contains!(message, expected);
        });
    }

    #[test]
    fn duplicates_across_commands_allowed() {
        CommandBuilder::new("x")
            .option(OptionBuilder::new("a"))
            .subcommand(CommandBuilder::new("y").option(OptionBuilder::new("a")))
            .subcommand(CommandBuilder::new("z").subcommand(CommandBuilder::new("y")))
            .build()
            .unwrap();
    }

    #[test]
    fn argument_properties() {
        let tree = CommandBuilder::new("x")
            .option(OptionBuilder::flag("dry-run").short('n').alias("simulate"))
            .option(OptionBuilder::short_only('q'))
            .operand(
                OperandBuilder::new("color")
                    .allowed_values(["red", "green"])
                    .default_value("red"),
            )
            .build()
            .unwrap();
        let arguments = tree.root().arguments();

        assert_eq!(arguments[0].name(), "dry-run");
        assert_eq!(arguments[0].display_name(), "--dry-run");
        assert_eq!(arguments[0].allowed_values(), Some(vec!["false", "true"]));
        assert_eq!(
            arguments[0].option().unwrap().spellings(OptionPrefix::Slash, false),
            vec!["/dry-run", "/simulate", "/n"]
        );
        assert_eq!(
            arguments[0].option().unwrap().spellings(OptionPrefix::Short, true),
            vec!["-dry-run", "-simulate", "-n"]
        );
        assert_eq!(
            arguments[0].option().unwrap().spellings(OptionPrefix::Short, false),
            vec!["--dry-run", "--simulate", "-n"]
        );
        assert_eq!(arguments[1].name(), "q");
        assert_eq!(arguments[1].display_name(), "-q");
        assert!(arguments[2].is_allowed("green"));
        assert!(!arguments[2].is_allowed("blue"));
        assert_eq!(
            arguments[2].default(),
            Some(&DefaultValue::Static(vec!["red".to_string()]))
        );
    }

    #[rstest]
    #[case(TypeDescriptor::of::<u32>(), "42", true)]
    #[case(TypeDescriptor::of::<u32>(), "-1", false)]
    #[case(TypeDescriptor::of::<f64>(), "1.5", true)]
    #[case(TypeDescriptor::boolean(), "true", true)]
    #[case(TypeDescriptor::boolean(), "yes", false)]
    #[case(TypeDescriptor::string(), "", true)]
    fn type_descriptor_check(
        #[case] type_descriptor: TypeDescriptor,
        #[case] raw: &str,
        #[case] ok: bool,
    ) {
        assert_eq!(type_descriptor.check(raw).is_ok(), ok);
    }
}
