use crate::command::{CommandTree, OptionNames};
use crate::parser::{ParseError, ParseResult};
use crate::suggest::rank_suggestions;
use crate::tokens::{OptionPrefix, TokenHistory, TokenSequence, TokenType};

const SUGGESTION_HEADER: &str = "Did you mean ...";
const SUGGESTION_INDENT: &str = "   ";

/// Render every tokenizer pass, for the `[parse]` directive.
pub(crate) fn render_parse_trace(history: &TokenHistory) -> Vec<String> {
    let mut lines = Vec::default();

    for (i, pass) in history.passes().iter().enumerate() {
        if i == 0 {
            lines.push(format!(">>> {}", pass.name()));
            render_tokens(pass.sequence(), &mut lines);
        } else if pass.changed() {
            lines.push(format!(">>> after: {}", pass.name()));
            render_tokens(pass.sequence(), &mut lines);
        } else {
            lines.push(format!(">>> no changes after: {}", pass.name()));
        }
    }

    lines
}

fn render_tokens(sequence: &TokenSequence, lines: &mut Vec<String>) {
    for token in sequence {
        lines.push(format!(
            "  {:>width$}: {}",
            token.token_type().name(),
            token.raw(),
            width = TokenType::WIDEST
        ));
    }
}

/// Render a parse error, followed by a "Did you mean" block when there are similar names.
pub(crate) fn render_parse_error(
    tree: &CommandTree,
    result: &ParseResult,
    error: &ParseError,
    limit: usize,
) -> Vec<String> {
    let mut lines = vec![error.describe(tree)];
    let suggestions = typo_suggestions(tree, result, error, limit);

    if !suggestions.is_empty() {
        lines.push(String::default());
        lines.push(SUGGESTION_HEADER.to_string());
        lines.extend(
            suggestions
                .into_iter()
                .map(|s| format!("{SUGGESTION_INDENT}{s}")),
        );
    }

    lines
}

/// Similar names for the offending token of `error`, spelled the way the user would type them.
pub(crate) fn typo_suggestions(
    tree: &CommandTree,
    result: &ParseResult,
    error: &ParseError,
    limit: usize,
) -> Vec<String> {
    match error {
        ParseError::UnrecognizedOption { command, token } => {
            let prefix = match token.option_prefix() {
                Some(OptionPrefix::Slash) => OptionPrefix::Slash,
                Some(OptionPrefix::Short) if result.config().allow_single_hyphen_long_names => OptionPrefix::Short,
                _ => OptionPrefix::Long,
            };
            let typo = token.option_name().unwrap_or_default();
            let candidates: Vec<&str> = tree
                .visible_options(*command)
                .into_iter()
                .filter(|o| !o.is_hidden())
                .filter_map(|o| o.option())
                .flat_map(OptionNames::long_names)
                .collect();

            rank_suggestions(typo, candidates, limit)
                .into_iter()
                .map(|name| format!("{}{name}", prefix.as_str()))
                .collect()
        }
        ParseError::UnrecognizedArgument { command, token } => {
            let current = tree.command(*command);
            let mut candidates: Vec<&str> = Vec::default();

            if current.operands().all(|o| result.count(o.id()) == 0) {
                for subcommand in current.subcommands() {
                    let subcommand = tree.command(*subcommand);

                    if !subcommand.is_hidden() {
                        candidates.extend(subcommand.names());
                    }
                }
            }

            if let Some(next) = current
                .operands()
                .find(|o| o.arity().accepts_more(result.count(o.id())))
            {
                candidates.extend(next.allowed_values().unwrap_or_default());
            }

            rank_suggestions(token.raw(), candidates, limit)
        }
        ParseError::NotAllowedValue {
            argument, token, ..
        } => rank_suggestions(
            token.raw(),
            tree.argument(*argument)
                .allowed_values()
                .unwrap_or_default(),
            limit,
        ),
        ParseError::MissingOptionValue { .. } => Vec::default(),
    }
}
