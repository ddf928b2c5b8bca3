use std::collections::BTreeMap;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::command::{Argument, ArgumentId, CommandId, CommandTree};
use crate::constant::*;
use crate::parser::result::*;
use crate::tokens::{OptionPrefix, Token, TokenArena, TokenSequence, TokenType};

/// Matching rules of the resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserConfig {
    /// `/` is an option prefix; mirrors the tokenizer setting.
    pub allow_slash_prefix: bool,
    /// `-name` matches the long name `name`.
    pub allow_single_hyphen_long_names: bool,
    /// Collect unmatched value tokens rather than failing on them.
    pub ignore_unexpected_operands: bool,
}

/// Walks a token sequence against a [`CommandTree`] from left to right.
pub struct Resolver<'t> {
    tree: &'t CommandTree,
    config: ParserConfig,
}

struct Walk {
    current: CommandId,
    operands_started: bool,
    end_of_options: bool,
    values: BTreeMap<ArgumentId, Vec<InputValue>>,
    remaining_operands: Vec<Token>,
}

impl Walk {
    fn push(&mut self, argument: ArgumentId, input: InputValue) {
        self.values.entry(argument).or_default().push(input);
    }

    fn count(&self, argument: ArgumentId) -> usize {
        self.values
            .get(&argument)
            .map(|inputs| inputs.iter().map(|i| i.values().len()).sum())
            .unwrap_or(0)
    }
}

impl<'t> Resolver<'t> {
    pub fn new(tree: &'t CommandTree, config: ParserConfig) -> Self {
        Self { tree, config }
    }

    /// Resolve the argument tokens of `sequence`; `arena` supplies token provenance.
    ///
    /// Stops at the first error.
    /// Arity is only accumulated here, and validated when values are bound.
    pub fn resolve(&self, sequence: &TokenSequence, arena: &TokenArena) -> ParseResult {
        let arguments = sequence.arguments();
        let mut walk = Walk {
            current: CommandId::ROOT,
            operands_started: false,
            end_of_options: false,
            values: BTreeMap::default(),
            remaining_operands: Vec::default(),
        };
        let mut index = 0;
        let mut error = None;

        while index < arguments.len() {
            let token = &arguments[index];
            index += 1;

            let outcome = match token.token_type() {
                TokenType::EndOfOptions => {
                    walk.end_of_options = true;
                    Ok(())
                }
                TokenType::Option if !walk.end_of_options => {
                    self.resolve_option(&mut walk, token, arguments, &mut index, arena)
                }
                // Directives and separators never appear among the arguments.
                TokenType::Directive | TokenType::Separator => Ok(()),
                TokenType::Option | TokenType::Value => self.resolve_value(&mut walk, token),
            };

            if let Err(e) = outcome {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("Resolution stopped at token {index}: {e:?}.");
                }

                error.replace(e);
                break;
            }
        }

        ParseResult {
            target: walk.current,
            consumed: index,
            total: arguments.len(),
            values: walk.values,
            error,
            separated: sequence
                .separated()
                .iter()
                .map(|t| t.raw().to_string())
                .collect(),
            remaining_operands: walk.remaining_operands,
            last_token: last_token(sequence),
            config: self.config,
        }
    }

    fn resolve_option(
        &self,
        walk: &mut Walk,
        token: &Token,
        arguments: &[Token],
        index: &mut usize,
        arena: &TokenArena,
    ) -> Result<(), ParseError> {
        let prefix = token.option_prefix().unwrap_or(OptionPrefix::Long);
        let name = token.option_name().unwrap_or_default();
        let id = match self.tree.find_option(
            walk.current,
            prefix,
            name,
            self.config.allow_single_hyphen_long_names,
        ) {
            Some(id) => id,
            None => {
                return Err(ParseError::UnrecognizedOption {
                    command: walk.current,
                    token: token.clone(),
                })
            }
        };
        let option = self.tree.argument(id);

        if option.is_flag() {
            // `--flag=false` was split into two tokens sharing an origin; a standalone value never binds to a flag.
            match arguments.get(*index) {
                Some(next) if next.is_value() && same_origin(arena, token, next) => {
                    *index += 1;
                    self.check_allowed(walk, option, next)?;
                    walk.push(id, InputValue::from_token(next, next.raw()));
                }
                _ => walk.push(id, InputValue::from_token(token, FLAG_TRUE)),
            }

            return Ok(());
        }

        match arguments.get(*index) {
            Some(next) if next.is_value() => {
                *index += 1;
                self.check_allowed(walk, option, next)?;
                walk.push(id, InputValue::from_token(next, next.raw()));
                Ok(())
            }
            _ => Err(ParseError::MissingOptionValue {
                command: walk.current,
                option: id,
                token: token.clone(),
            }),
        }
    }

    fn resolve_value(&self, walk: &mut Walk, token: &Token) -> Result<(), ParseError> {
        if !walk.end_of_options && !walk.operands_started {
            if let Some(subcommand) = self.tree.find_subcommand(walk.current, token.raw()) {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("Descending into '{}'.", self.tree.full_name(subcommand));
                }

                walk.current = subcommand;
                return Ok(());
            }
        }

        let operand = self
            .tree
            .command(walk.current)
            .operands()
            .find(|operand| operand.arity().accepts_more(walk.count(operand.id())));

        match operand {
            Some(operand) => {
                self.check_allowed(walk, operand, token)?;
                walk.push(operand.id(), InputValue::from_token(token, token.raw()));
                walk.operands_started = true;
                Ok(())
            }
            None if self.config.ignore_unexpected_operands => {
                walk.remaining_operands.push(token.clone());
                Ok(())
            }
            None => Err(ParseError::UnrecognizedArgument {
                command: walk.current,
                token: token.clone(),
            }),
        }
    }

    fn check_allowed(&self, walk: &Walk, argument: &Argument, token: &Token) -> Result<(), ParseError> {
        if argument.is_allowed(token.raw()) {
            Ok(())
        } else {
            Err(ParseError::NotAllowedValue {
                command: walk.current,
                argument: argument.id(),
                token: token.clone(),
            })
        }
    }
}

fn same_origin(arena: &TokenArena, a: &Token, b: &Token) -> bool {
    match (arena.origin(a.id()), arena.origin(b.id())) {
        (Some(x), Some(y)) => x.id() == y.id(),
        _ => false,
    }
}

// The final token, unless it is a directive or an ordinary value after `--`.
fn last_token(sequence: &TokenSequence) -> Option<Token> {
    let (last, before) = sequence.tokens().split_last()?;
    let past_separator = before
        .iter()
        .any(|t| matches!(t.token_type(), TokenType::EndOfOptions | TokenType::Separator));

    match last.token_type() {
        TokenType::Directive => None,
        TokenType::Value if past_separator => None,
        _ => Some(last.clone()),
    }
}
