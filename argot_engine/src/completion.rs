//! Shell completion: what may follow the input, or what the offending token could have been.
use std::collections::BTreeSet;

use crate::command::{Argument, CommandId, CommandTree};
use crate::constant::*;
use crate::parser::{ParseError, ParseResult};
use crate::tokens::OptionPrefix;

/// Suggest completions for the parse state.
///
/// Without an error, lists what may follow the input.
/// With an error on the final token, lists corrections of that token which start with its text.
/// A final token that is only an option prefix (`-`, `--`, or `/`) lists options alone.
/// An error on an earlier token yields nothing.
///
/// The output is sorted and free of duplicates.
pub fn complete(tree: &CommandTree, result: &ParseResult) -> Vec<String> {
    let mut suggestions = BTreeSet::default();

    if !result.evaluated_all() {
        return Vec::default();
    }

    if let Some((prefix, raw)) = bare_option_prefix(result) {
        let mut options = BTreeSet::default();
        option_suggestions(tree, result, result.target(), prefix, None, &mut options);
        suggestions.extend(options.into_iter().filter(|o| o.starts_with(raw)));
        return suggestions.into_iter().collect();
    }

    match result.error() {
        Some(ParseError::UnrecognizedOption { command, token }) => {
            let prefix = token.option_prefix().unwrap_or(OptionPrefix::Long);
            option_suggestions(tree, result, *command, prefix, Some(token.raw()), &mut suggestions);
        }
        Some(ParseError::UnrecognizedArgument { command, token }) => {
            value_suggestions(tree, result, *command, Some(token.raw()), &mut suggestions);
        }
        Some(ParseError::NotAllowedValue {
            argument, token, ..
        }) => {
            allowed_suggestions(tree.argument(*argument), Some(token.raw()), &mut suggestions);
        }
        Some(ParseError::MissingOptionValue { option, .. }) => {
            allowed_suggestions(tree.argument(*option), None, &mut suggestions);
        }
        None => {
            let target = result.target();
            option_suggestions(tree, result, target, OptionPrefix::Long, None, &mut suggestions);
            value_suggestions(tree, result, target, None, &mut suggestions);
        }
    }

    suggestions.into_iter().collect()
}

// The final token, when it is nothing but an option prefix.
fn bare_option_prefix(result: &ParseResult) -> Option<(OptionPrefix, &str)> {
    let raw = result.last_token()?.raw();

    match raw {
        LONG_PREFIX => Some((OptionPrefix::Long, raw)),
        SHORT_PREFIX => Some((OptionPrefix::Short, raw)),
        SLASH_PREFIX if result.config().allow_slash_prefix => Some((OptionPrefix::Slash, raw)),
        _ => None,
    }
}

fn matches_partial(candidate: &str, partial: Option<&str>) -> bool {
    partial.map_or(true, |p| candidate.starts_with(p))
}

fn option_suggestions(
    tree: &CommandTree,
    result: &ParseResult,
    command: CommandId,
    prefix: OptionPrefix,
    partial: Option<&str>,
    suggestions: &mut BTreeSet<String>,
) {
    for option in tree.visible_options(command) {
        let names = match option.option() {
            Some(names) if !option.is_hidden() => names,
            _ => continue,
        };

        // Satisfied options are done, unless they repeat.
        if !option.arity().accepts_more(result.count(option.id())) {
            continue;
        }

        let single_hyphen_long_names = result.config().allow_single_hyphen_long_names;

        match partial {
            None => {
                suggestions.insert(names.primary(prefix, single_hyphen_long_names));
            }
            Some(_) => suggestions.extend(
                names
                    .spellings(prefix, single_hyphen_long_names)
                    .into_iter()
                    .filter(|s| matches_partial(s, partial)),
            ),
        }
    }
}

fn value_suggestions(
    tree: &CommandTree,
    result: &ParseResult,
    command: CommandId,
    partial: Option<&str>,
    suggestions: &mut BTreeSet<String>,
) {
    let mut operands = tree.command(command).operands();
    let started = tree
        .command(command)
        .operands()
        .any(|operand| result.count(operand.id()) > 0);

    if let Some(next) = operands.find(|operand| operand.arity().accepts_more(result.count(operand.id()))) {
        allowed_suggestions(next, partial, suggestions);
    }

    if !started {
        for subcommand in tree.command(command).subcommands() {
            let subcommand = tree.command(*subcommand);

            if subcommand.is_hidden() {
                continue;
            }

            suggestions.extend(
                subcommand
                    .names()
                    .filter(|n| matches_partial(n, partial))
                    .map(str::to_string),
            );
        }
    }
}

fn allowed_suggestions(argument: &Argument, partial: Option<&str>, suggestions: &mut BTreeSet<String>) {
    if let Some(values) = argument.allowed_values() {
        suggestions.extend(
            values
                .into_iter()
                .filter(|v| matches_partial(v, partial))
                .map(str::to_string),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandBuilder, OperandBuilder, OptionBuilder};
    use crate::model::{Arity, ExitCode};
    use crate::parser::{ParserConfig, Resolver};
    use crate::tokens::{Tokenizer, TokenizerConfig};
    use rstest::rstest;

    fn tree() -> CommandTree {
        CommandBuilder::new("app")
            .option(OptionBuilder::flag("verbose").short('v').inherited())
            .option(OptionBuilder::new("name").alias("title"))
            .option(OptionBuilder::new("secret").hidden())
            .option(
                OptionBuilder::new("tag")
                    .short('t')
                    .arity(Arity::ZERO_OR_MORE),
            )
            .subcommand(
                CommandBuilder::new("add")
                    .alias("a")
                    .option(OptionBuilder::new("color").allowed_values(["red", "green", "blue"]))
                    .operand(OperandBuilder::new("shade").allowed_values(["light", "dark"]))
                    .operand(OperandBuilder::new("rest").arity(Arity::ZERO_OR_MORE))
                    .action(|_| Ok(ExitCode::SUCCESS)),
            )
            .subcommand(CommandBuilder::new("remove").action(|_| Ok(ExitCode::SUCCESS)))
            .subcommand(CommandBuilder::new("internal").hidden())
            .build()
            .unwrap()
    }

    fn suggest_with(tokenizer: TokenizerConfig, config: ParserConfig, arguments: &[&str]) -> Vec<String> {
        let tree = tree();
        let history = Tokenizer::new(tokenizer).tokenize(arguments);
        let result = Resolver::new(&tree, config).resolve(history.current(), history.arena());
        complete(&tree, &result)
    }

    fn suggest(arguments: &[&str]) -> Vec<String> {
        suggest_with(TokenizerConfig::default(), ParserConfig::default(), arguments)
    }

    #[rstest]
    #[case(vec![], vec!["--name", "--tag", "--verbose", "a", "add", "remove"])]
    #[case(vec!["--verbose"], vec!["--name", "--tag", "a", "add", "remove"])]
    #[case(vec!["--tag", "x", "--name", "y"], vec!["--tag", "--verbose", "a", "add", "remove"])]
    #[case(vec!["add"], vec!["--color", "--verbose", "dark", "light"])]
    #[case(vec!["add", "dark"], vec!["--color", "--verbose"])]
    #[case(vec!["remove"], vec!["--verbose"])]
    fn suggest_next(#[case] arguments: Vec<&str>, #[case] expected: Vec<&str>) {
        assert_eq!(suggest(&arguments), expected);
    }

    #[rstest]
    #[case(vec!["--na"], vec!["--name"])]
    #[case(vec!["--t"], vec!["--tag", "--title"])]
    #[case(vec!["--x"], vec![])]
    #[case(vec!["-x"], vec![])]
    #[case(vec!["add", "--c"], vec!["--color"])]
    #[case(vec!["--verbose", "--verb"], vec![])]
    #[case(vec!["-"], vec!["--name", "--tag", "--verbose"])]
    #[case(vec!["--"], vec!["--name", "--tag", "--verbose"])]
    #[case(vec!["--verbose", "-"], vec!["--name", "--tag"])]
    #[case(vec!["add", "-"], vec!["--color", "--verbose"])]
    #[case(vec!["add", "--"], vec!["--color", "--verbose"])]
    fn suggest_options(#[case] arguments: Vec<&str>, #[case] expected: Vec<&str>) {
        assert_eq!(suggest(&arguments), expected);
    }

    #[test]
    fn suggest_values_after_end_of_options() {
        assert_eq!(suggest(&["add", "--", "-"]), Vec::<String>::default());
        assert_eq!(suggest(&["add", "--", "--"]), Vec::<String>::default());
    }

    #[test]
    fn suggest_slash_options() {
        let tokenizer = TokenizerConfig {
            allow_slash_prefix: true,
            ..TokenizerConfig::default()
        };
        let config = ParserConfig {
            allow_slash_prefix: true,
            ..ParserConfig::default()
        };
        assert_eq!(suggest_with(tokenizer.clone(), config, &["/na"]), vec!["/name"]);
        assert_eq!(suggest_with(tokenizer.clone(), config, &["/ta"]), vec!["/tag"]);
        assert_eq!(
            suggest_with(tokenizer, config, &["/"]),
            vec!["/name", "/tag", "/verbose"]
        );
        // Without the setting, `/` is an ordinary value.
        assert!(suggest(&["/"]).is_empty());
    }

    #[rstest]
    #[case(vec!["-na"], vec!["-name"])]
    #[case(vec!["-ti"], vec!["-title"])]
    #[case(vec!["-"], vec!["-name", "-tag", "-verbose"])]
    #[case(vec!["--na"], vec!["--name"])]
    #[case(vec!["add", "-c"], vec!["-color"])]
    fn suggest_single_hyphen_options(#[case] arguments: Vec<&str>, #[case] expected: Vec<&str>) {
        let tokenizer = TokenizerConfig {
            allow_single_hyphen_long_names: true,
            ..TokenizerConfig::default()
        };
        let config = ParserConfig {
            allow_single_hyphen_long_names: true,
            ..ParserConfig::default()
        };
        assert_eq!(suggest_with(tokenizer, config, &arguments), expected);
    }

    #[rstest]
    #[case(vec!["re"], vec!["remove"])]
    #[case(vec!["a"], vec!["--color", "--verbose", "dark", "light"])]
    #[case(vec!["ad"], vec!["add"])]
    #[case(vec!["int"], vec![])]
    #[case(vec!["zzz"], vec![])]
    fn suggest_subcommands(#[case] arguments: Vec<&str>, #[case] expected: Vec<&str>) {
        assert_eq!(suggest(&arguments), expected);
    }

    #[rstest]
    #[case(vec!["add", "da"], vec!["dark"])]
    #[case(vec!["add", "--color", "r"], vec!["red"])]
    #[case(vec!["add", "--color", "x"], vec![])]
    #[case(vec!["add", "--color"], vec!["blue", "green", "red"])]
    #[case(vec!["--name"], vec![])]
    fn suggest_values(#[case] arguments: Vec<&str>, #[case] expected: Vec<&str>) {
        assert_eq!(suggest(&arguments), expected);
    }

    #[rstest]
    #[case(vec!["--nope", "add"])]
    #[case(vec!["zzz", "--verbose"])]
    #[case(vec!["add", "--color", "x", "dark"])]
    fn suggest_nothing_after_earlier_error(#[case] arguments: Vec<&str>) {
        assert!(suggest(&arguments).is_empty());
    }
}
