use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::constant::*;
use crate::model::ExitCode;
use crate::tokens::model::*;
use crate::tokens::transform::*;

pub(crate) const INITIAL_PASS_NAME: &str = "from input";

/// How the `--` marker is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeparatorStrategy {
    /// Every later token is an operand value.
    #[default]
    EndOfOptions,
    /// Later tokens are not parsed at all; they are passed through to the command.
    PassThru,
}

/// Lexical rules of the tokenizer.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    pub allow_slash_prefix: bool,
    pub allow_single_hyphen_long_names: bool,
    pub enable_directives: bool,
    pub separator: SeparatorStrategy,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            allow_slash_prefix: false,
            allow_single_hyphen_long_names: false,
            enable_directives: true,
            separator: SeparatorStrategy::default(),
        }
    }
}

/// Malformed input which cannot be split into arguments.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Lex error: unterminated {quote} quote starting at position {position}.")]
    UnterminatedQuote { quote: char, position: usize },

    #[error("Lex error: dangling escape at position {position}.")]
    DanglingEscape { position: usize },
}

impl LexError {
    /// Lexical failures belong to the internal failure class.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::ERROR
    }
}

/// Split a single command line into arguments, the way a POSIX shell would for simple input.
///
/// Whitespace separates arguments.
/// Single quotes are literal, double quotes allow `\"` and `\\`, and a backslash outside quotes escapes the next character.
pub fn split_command_line(line: &str) -> Result<Vec<String>, LexError> {
    let mut arguments = Vec::default();
    let mut current = String::default();
    // Distinguishes `""` (an empty argument) from no argument at all.
    let mut started = false;
    let mut chars = line.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                started = true;
                let quote = c;
                let mut closed = false;

                while let Some((inner_position, inner)) = chars.next() {
                    if inner == quote {
                        closed = true;
                        break;
                    }

                    if inner == '\\' && quote == '"' {
                        match chars.peek() {
                            Some((_, escaped)) if *escaped == '"' || *escaped == '\\' => {
                                current.push(*escaped);
                                chars.next();
                            }
                            Some(_) => current.push(inner),
                            None => {
                                return Err(LexError::DanglingEscape {
                                    position: inner_position,
                                })
                            }
                        }
                    } else {
                        current.push(inner);
                    }
                }

                if !closed {
                    return Err(LexError::UnterminatedQuote { quote, position });
                }
            }
            '\\' => match chars.next() {
                Some((_, escaped)) => {
                    started = true;
                    current.push(escaped);
                }
                None => return Err(LexError::DanglingEscape { position }),
            },
            c if c.is_whitespace() => {
                if started {
                    arguments.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                started = true;
                current.push(c);
            }
        }
    }

    if started {
        arguments.push(current);
    }

    Ok(arguments)
}

/// Splits raw arguments into tokens, then runs the registered transformations in registration order.
#[derive(Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
    transformations: Vec<Arc<dyn TokenTransformation>>,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("config", &self.config)
            .field(
                "transformations",
                &self
                    .transformations
                    .iter()
                    .map(|t| t.name().to_string())
                    .collect::<Vec<String>>(),
            )
            .finish()
    }
}

impl Tokenizer {
    /// A tokenizer with the built-in transformations appropriate to `config`.
    pub fn new(config: TokenizerConfig) -> Self {
        let mut transformations: Vec<Arc<dyn TokenTransformation>> =
            vec![Arc::new(SplitOptionAssignments::default())];

        // `-name` is a long name under this rule, so it must never be read as `-n -a -m -e`.
        if !config.allow_single_hyphen_long_names {
            transformations.push(Arc::new(ExpandClubbedFlags::default()));
        }

        Self {
            config,
            transformations,
        }
    }

    /// A tokenizer without any transformations.
    pub fn bare(config: TokenizerConfig) -> Self {
        Self {
            config,
            transformations: Vec::default(),
        }
    }

    /// Append a transformation; it runs after every previously registered one.
    pub fn with_transformation(mut self, transformation: Arc<dyn TokenTransformation>) -> Self {
        self.transformations.push(transformation);
        self
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// The transformation names, in execution order.
    pub fn transformation_names(&self) -> Vec<&str> {
        self.transformations.iter().map(|t| t.name()).collect()
    }

    /// Produce the untransformed sequence (generation 0).
    pub fn lex<S: AsRef<str>>(&self, arguments: &[S]) -> (TokenArena, TokenSequence) {
        let mut arena = TokenArena::default();
        let generation = arena.begin_generation();
        let mut tokens = Vec::with_capacity(arguments.len());
        let mut leading = self.config.enable_directives;
        let mut past_end_of_options = false;

        for argument in arguments {
            let argument = argument.as_ref();

            if leading && is_directive(argument) {
                tokens.push(arena.mint(generation, TokenType::Directive, argument, None));
                continue;
            }

            leading = false;
            let token_type = if past_end_of_options {
                TokenType::Value
            } else if argument == END_OF_OPTIONS {
                past_end_of_options = true;
                match self.config.separator {
                    SeparatorStrategy::EndOfOptions => TokenType::EndOfOptions,
                    SeparatorStrategy::PassThru => TokenType::Separator,
                }
            } else {
                self.classify(argument)
            };
            tokens.push(arena.mint(generation, token_type, argument, None));
        }

        (arena, TokenSequence::new(tokens))
    }

    /// Lex, then apply every transformation, recording each pass.
    pub fn tokenize<S: AsRef<str>>(&self, arguments: &[S]) -> TokenHistory {
        let (arena, sequence) = self.lex(arguments);
        let mut history = TokenHistory::new(arena, INITIAL_PASS_NAME, sequence);

        for transformation in &self.transformations {
            let current = history.current().clone();
            let generation = history.arena_mut().begin_generation();
            let next = {
                let mut emitter = TokenEmitter::new(history.arena_mut(), generation);
                transformation.transform(&current, &mut emitter)
            };
            history.record(transformation.name(), next);

            #[cfg(feature = "tracing_debug")]
            {
                debug!(
                    "Transformation '{}' changed={}.",
                    transformation.name(),
                    history.passes().last().map(|p| p.changed()).unwrap_or(false)
                );
            }
        }

        history
    }

    fn classify(&self, argument: &str) -> TokenType {
        if argument.len() > LONG_PREFIX.len() && argument.starts_with(LONG_PREFIX) {
            TokenType::Option
        } else if argument.len() > SHORT_PREFIX.len()
            && argument.starts_with(SHORT_PREFIX)
            && !is_negative_number(argument)
        {
            TokenType::Option
        } else if self.config.allow_slash_prefix
            && argument.len() > SLASH_PREFIX.len()
            && argument.starts_with(SLASH_PREFIX)
            // `/usr/bin` is a path, not an option.
            && !argument[SLASH_PREFIX.len()..].contains(SLASH_PREFIX)
        {
            TokenType::Option
        } else {
            TokenType::Value
        }
    }
}

fn is_directive(argument: &str) -> bool {
    argument.len() > 2 && argument.starts_with(DIRECTIVE_OPEN) && argument.ends_with(DIRECTIVE_CLOSE)
}

fn is_negative_number(argument: &str) -> bool {
    let rest = &argument[SHORT_PREFIX.len()..];
    rest.starts_with(|c: char| c.is_ascii_digit() || c == '.') && rest.parse::<f64>().is_ok()
}
