use std::collections::BTreeMap;

use crate::command::{ArgumentId, CommandId, CommandTree};
use crate::model::ValueSource;
use crate::parser::ParserConfig;
use crate::tokens::{Token, TokenId};

/// A batch of values for one argument, as supplied by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputValue {
    source: ValueSource,
    values: Vec<String>,
    tokens: Vec<TokenId>,
}

impl InputValue {
    /// Values supplied by a collaborator rather than the command line.
    pub fn new(source: ValueSource, values: Vec<String>) -> Self {
        Self {
            source,
            values,
            tokens: Vec::default(),
        }
    }

    pub(crate) fn from_token(token: &Token, value: impl Into<String>) -> Self {
        Self {
            source: ValueSource::Cli,
            values: vec![value.into()],
            tokens: vec![token.id()],
        }
    }

    pub fn source(&self) -> &ValueSource {
        &self.source
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The command line tokens which supplied the values (empty for other sources).
    pub fn tokens(&self) -> &[TokenId] {
        &self.tokens
    }
}

/// Why the token walk stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An option token that matches nothing visible from `command`.
    UnrecognizedOption { command: CommandId, token: Token },
    /// A value token that is neither a subcommand nor an operand of `command`.
    UnrecognizedArgument { command: CommandId, token: Token },
    /// A value outside of `argument`'s closed value set.
    NotAllowedValue {
        command: CommandId,
        argument: ArgumentId,
        token: Token,
    },
    /// An `option` token with nothing to take as its value.
    MissingOptionValue {
        command: CommandId,
        option: ArgumentId,
        token: Token,
    },
}

impl ParseError {
    /// The command that was current when the walk stopped.
    pub fn command(&self) -> CommandId {
        match self {
            ParseError::UnrecognizedOption { command, .. }
            | ParseError::UnrecognizedArgument { command, .. }
            | ParseError::NotAllowedValue { command, .. }
            | ParseError::MissingOptionValue { command, .. } => *command,
        }
    }

    /// The offending token.
    pub fn token(&self) -> &Token {
        match self {
            ParseError::UnrecognizedOption { token, .. }
            | ParseError::UnrecognizedArgument { token, .. }
            | ParseError::NotAllowedValue { token, .. }
            | ParseError::MissingOptionValue { token, .. } => token,
        }
    }

    /// A user facing message.
    pub fn describe(&self, tree: &CommandTree) -> String {
        match self {
            ParseError::UnrecognizedOption { token, .. } => {
                format!("Parse error: unrecognized option '{}'.", token.raw())
            }
            ParseError::UnrecognizedArgument { command, token } => {
                if tree.command(*command).subcommands().is_empty() {
                    format!("Parse error: unrecognized argument '{}'.", token.raw())
                } else {
                    format!(
                        "Parse error: unrecognized command or argument '{}'.",
                        token.raw()
                    )
                }
            }
            ParseError::NotAllowedValue {
                argument, token, ..
            } => {
                let argument = tree.argument(*argument);
                format!(
                    "Parse error: unrecognized value '{}' for '{}' (allowed: {}).",
                    token.raw(),
                    argument.display_name(),
                    argument
                        .allowed_values()
                        .unwrap_or_default()
                        .join(", ")
                )
            }
            ParseError::MissingOptionValue { option, .. } => format!(
                "Parse error: missing value for option '{}'.",
                tree.argument(*option).display_name()
            ),
        }
    }
}

/// The outcome of walking the tokens against the command tree.
///
/// Carries values or an error, never a contradiction: when the walk stops on an error, everything consumed before it is still recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub(crate) target: CommandId,
    pub(crate) consumed: usize,
    pub(crate) total: usize,
    pub(crate) values: BTreeMap<ArgumentId, Vec<InputValue>>,
    pub(crate) error: Option<ParseError>,
    pub(crate) separated: Vec<String>,
    pub(crate) remaining_operands: Vec<Token>,
    pub(crate) last_token: Option<Token>,
    pub(crate) config: ParserConfig,
}

impl ParseResult {
    /// The deepest command reached.
    pub fn target(&self) -> CommandId {
        self.target
    }

    /// How many argument tokens were evaluated (including an erroneous one).
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// How many argument tokens there were.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether the walk reached the final token.
    pub fn evaluated_all(&self) -> bool {
        self.consumed == self.total
    }

    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Remove the error, ex: for a collaborator which recovers from it.
    pub fn take_error(&mut self) -> Option<ParseError> {
        self.error.take()
    }

    pub fn values(&self) -> &BTreeMap<ArgumentId, Vec<InputValue>> {
        &self.values
    }

    pub fn inputs(&self, argument: ArgumentId) -> &[InputValue] {
        self.values
            .get(&argument)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The number of values supplied to `argument` so far.
    pub fn count(&self, argument: ArgumentId) -> usize {
        self.inputs(argument).iter().map(|i| i.values.len()).sum()
    }

    /// Add values, ex: from a prompt or piped input.
    pub fn push_input(&mut self, argument: ArgumentId, input: InputValue) {
        self.values.entry(argument).or_default().push(input);
    }

    /// Arguments following a pass-through separator.
    pub fn separated(&self) -> &[String] {
        &self.separated
    }

    /// Value tokens that matched nothing, when unexpected operands are ignored.
    pub fn remaining_operands(&self) -> &[Token] {
        &self.remaining_operands
    }

    /// The final token, unless it is a directive or a plain value following `--`.
    pub fn last_token(&self) -> Option<&Token> {
        self.last_token.as_ref()
    }

    /// The rules the tokens were resolved under.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }
}
