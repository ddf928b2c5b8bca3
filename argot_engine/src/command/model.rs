use std::str::FromStr;
use std::sync::Arc;

use crate::constant::*;
use crate::model::Arity;
use crate::pipeline::{CommandHandler, Middleware};
use crate::tokens::OptionPrefix;

/// Index of a command within its [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) usize);

impl CommandId {
    /// The root command of every tree.
    pub const ROOT: CommandId = CommandId(0);
}

/// Identity of an argument: its owning command and its declaration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArgumentId {
    command: CommandId,
    index: usize,
}

impl ArgumentId {
    pub(crate) fn new(command: CommandId, index: usize) -> Self {
        Self { command, index }
    }

    pub fn command(&self) -> CommandId {
        self.command
    }
}

/// The value type of an argument: its display name and how raw text is coerced.
///
/// All coercion is controlled by [`std::str::FromStr`]; the coerced value is discarded here and re-parsed on extraction.
#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    name: &'static str,
    check: fn(&str) -> Result<(), String>,
    allowed_values: Option<&'static [&'static str]>,
}

fn convert<T>(raw: &str) -> Result<(), String>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    T::from_str(raw).map(|_| ()).map_err(|e| e.to_string())
}

impl TypeDescriptor {
    /// Describe any `T: FromStr`.
    pub fn of<T>() -> Self
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        Self {
            name: std::any::type_name::<T>(),
            check: convert::<T>,
            allowed_values: None,
        }
    }

    pub fn string() -> Self {
        Self::of::<String>()
    }

    /// `bool`, with `false`/`true` as its closed value set.
    pub fn boolean() -> Self {
        Self {
            name: "bool",
            check: convert::<bool>,
            allowed_values: Some(&[FLAG_FALSE, FLAG_TRUE]),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Verify that `raw` coerces to this type.
    pub fn check(&self, raw: &str) -> Result<(), String> {
        (self.check)(raw)
    }

    pub fn allowed_values(&self) -> Option<&'static [&'static str]> {
        self.allowed_values
    }
}

/// Where an argument's value comes from when the command line omits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// Fixed values, tagged [`crate::ValueSource::Default`].
    Static(Vec<String>),
    /// The named environment variable, tagged [`crate::ValueSource::EnvVar`].
    EnvVar(String),
}

/// The naming of an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionNames {
    pub(crate) long: Option<String>,
    pub(crate) short: Option<char>,
    pub(crate) aliases: Vec<String>,
    pub(crate) flag: bool,
    pub(crate) inherited: bool,
}

impl OptionNames {
    pub fn long(&self) -> Option<&str> {
        self.long.as_deref()
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// A boolean-arity option: present means `true`, and a value may only be attached by assignment.
    pub fn is_flag(&self) -> bool {
        self.flag
    }

    /// Matchable from descendant commands, as an interceptor option.
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    /// Long name followed by aliases.
    pub fn long_names(&self) -> impl Iterator<Item = &str> {
        self.long
            .iter()
            .map(String::as_str)
            .chain(self.aliases.iter().map(String::as_str))
    }

    /// Every spelling of the option in the given prefix style.
    ///
    /// With `single_hyphen_long_names`, the `Short` style spells long names as `-name`.
    pub fn spellings(&self, prefix: OptionPrefix, single_hyphen_long_names: bool) -> Vec<String> {
        let (long_prefix, short_prefix) = match prefix {
            OptionPrefix::Slash => (SLASH_PREFIX, SLASH_PREFIX),
            OptionPrefix::Short if single_hyphen_long_names => (SHORT_PREFIX, SHORT_PREFIX),
            OptionPrefix::Long | OptionPrefix::Short => (LONG_PREFIX, SHORT_PREFIX),
        };
        let mut spellings: Vec<String> = self
            .long_names()
            .map(|name| format!("{long_prefix}{name}"))
            .collect();

        if let Some(short) = self.short {
            spellings.push(format!("{short_prefix}{short}"));
        }

        spellings
    }

    /// The preferred spelling: the long name when present.
    pub fn primary(&self, prefix: OptionPrefix, single_hyphen_long_names: bool) -> String {
        self.spellings(prefix, single_hyphen_long_names)
            .into_iter()
            .next()
            .expect("internal error - an option always has a long or short name")
    }
}

/// Operand (positional) vs option (named).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentKind {
    Operand,
    Option(OptionNames),
}

/// A declared operand or option.
#[derive(Debug, Clone)]
pub struct Argument {
    pub(crate) id: ArgumentId,
    pub(crate) name: String,
    pub(crate) kind: ArgumentKind,
    pub(crate) arity: Arity,
    pub(crate) type_descriptor: TypeDescriptor,
    pub(crate) allowed_values: Option<Vec<String>>,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) hidden: bool,
    pub(crate) description: Option<String>,
}

impl Argument {
    pub fn id(&self) -> ArgumentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ArgumentKind {
        &self.kind
    }

    pub fn is_operand(&self) -> bool {
        matches!(self.kind, ArgumentKind::Operand)
    }

    pub fn option(&self) -> Option<&OptionNames> {
        match &self.kind {
            ArgumentKind::Option(names) => Some(names),
            ArgumentKind::Operand => None,
        }
    }

    pub fn is_flag(&self) -> bool {
        self.option().map(OptionNames::is_flag).unwrap_or(false)
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn type_descriptor(&self) -> &TypeDescriptor {
        &self.type_descriptor
    }

    /// The closed value set: the declared one, otherwise the type's (ex: `bool`).
    pub fn allowed_values(&self) -> Option<Vec<&str>> {
        match &self.allowed_values {
            Some(values) => Some(values.iter().map(String::as_str).collect()),
            None => self
                .type_descriptor
                .allowed_values()
                .map(|values| values.to_vec()),
        }
    }

    pub fn is_allowed(&self, value: &str) -> bool {
        match self.allowed_values() {
            Some(values) => values.contains(&value),
            None => true,
        }
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// How the argument is named in messages: `--name` for options, `name` for operands.
    pub fn display_name(&self) -> String {
        match &self.kind {
            ArgumentKind::Option(names) => names.primary(OptionPrefix::Long, false),
            ArgumentKind::Operand => self.name.clone(),
        }
    }
}

/// A node of the command tree.
pub struct Command {
    pub(crate) id: CommandId,
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) description: Option<String>,
    pub(crate) parent: Option<CommandId>,
    pub(crate) arguments: Vec<Argument>,
    pub(crate) subcommands: Vec<CommandId>,
    pub(crate) hidden: bool,
    pub(crate) handler: Option<Arc<dyn CommandHandler>>,
    pub(crate) interceptor: Option<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parent", &self.parent)
            .field("arguments", &self.arguments)
            .field("subcommands", &self.subcommands)
            .field("hidden", &self.hidden)
            .field("invocable", &self.handler.is_some())
            .field("intercepts", &self.interceptor.is_some())
            .finish()
    }
}

impl Command {
    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Name followed by aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Back-reference for path lookup only.
    pub fn parent(&self) -> Option<CommandId> {
        self.parent
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Operands, in positional binding order.
    pub fn operands(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| a.is_operand())
    }

    pub fn options(&self) -> impl Iterator<Item = &Argument> {
        self.arguments.iter().filter(|a| !a.is_operand())
    }

    pub fn subcommands(&self) -> &[CommandId] {
        &self.subcommands
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Whether the command can run without a subcommand.
    pub fn is_invocable(&self) -> bool {
        self.handler.is_some()
    }

    pub fn handler(&self) -> Option<&Arc<dyn CommandHandler>> {
        self.handler.as_ref()
    }

    pub fn interceptor(&self) -> Option<&Arc<dyn Middleware>> {
        self.interceptor.as_ref()
    }
}

/// The immutable tree of commands, stored as an arena with the root at [`CommandId::ROOT`].
///
/// Built once (see [`crate::CommandBuilder::build`]) and only read afterwards, so it may be shared freely.
#[derive(Debug)]
pub struct CommandTree {
    pub(crate) commands: Vec<Command>,
}

impl CommandTree {
    pub fn root(&self) -> &Command {
        &self.commands[CommandId::ROOT.0]
    }

    pub fn command(&self, id: CommandId) -> &Command {
        &self.commands[id.0]
    }

    pub fn argument(&self, id: ArgumentId) -> &Argument {
        &self.command(id.command).arguments[id.index]
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// The commands from the root down to (and including) `id`.
    pub fn path(&self, id: CommandId) -> Vec<CommandId> {
        let mut path = vec![id];
        let mut cursor = self.command(id).parent;

        while let Some(parent) = cursor {
            path.push(parent);
            cursor = self.command(parent).parent;
        }

        path.reverse();
        path
    }

    /// Space separated names from the root, ex: `git remote add`.
    pub fn full_name(&self, id: CommandId) -> String {
        self.path(id)
            .into_iter()
            .map(|c| self.command(c).name.as_str())
            .collect::<Vec<&str>>()
            .join(" ")
    }

    /// A direct subcommand of `parent` by name or alias.
    pub fn find_subcommand(&self, parent: CommandId, name: &str) -> Option<CommandId> {
        self.command(parent)
            .subcommands
            .iter()
            .copied()
            .find(|id| self.command(*id).names().any(|n| n == name))
    }

    /// The options matchable while `command` is current: its own, then inherited ones from its ancestors (nearest first).
    pub fn visible_options(&self, command: CommandId) -> Vec<&Argument> {
        let mut options: Vec<&Argument> = self.command(command).options().collect();
        let mut cursor = self.command(command).parent;

        while let Some(ancestor) = cursor {
            options.extend(
                self.command(ancestor)
                    .options()
                    .filter(|o| o.option().map(OptionNames::is_inherited).unwrap_or(false)),
            );
            cursor = self.command(ancestor).parent;
        }

        options
    }

    /// Resolve an option token's name against the options visible from `command`.
    pub fn find_option(
        &self,
        command: CommandId,
        prefix: OptionPrefix,
        name: &str,
        single_hyphen_long_names: bool,
    ) -> Option<ArgumentId> {
        let single = {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            }
        };
        let match_short = matches!(prefix, OptionPrefix::Short | OptionPrefix::Slash);
        let match_long = match prefix {
            OptionPrefix::Long | OptionPrefix::Slash => true,
            OptionPrefix::Short => single_hyphen_long_names,
        };

        self.visible_options(command)
            .into_iter()
            .find(|argument| match argument.option() {
                Some(names) => {
                    (match_short && single.is_some() && names.short == single)
                        || (match_long && names.long_names().any(|n| n == name))
                }
                None => false,
            })
            .map(Argument::id)
    }
}
