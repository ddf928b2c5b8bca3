use crate::constant::*;
use crate::tokens::model::*;

/// Mints the tokens of one transformation pass, recording where each came from.
pub struct TokenEmitter<'a> {
    arena: &'a mut TokenArena,
    generation: u32,
}

impl<'a> TokenEmitter<'a> {
    pub(crate) fn new(arena: &'a mut TokenArena, generation: u32) -> Self {
        Self { arena, generation }
    }

    /// Mint a new token derived from `source`.
    pub fn derive(&mut self, source: &Token, token_type: TokenType, raw: impl Into<String>) -> Token {
        self.arena
            .mint(self.generation, token_type, raw, Some(source.id()))
    }

    /// The generation being minted.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A rewrite of the token sequence.
///
/// Tokens passed through verbatim are cloned as-is; every new token must be minted via [`TokenEmitter::derive`].
/// Transformations run in registration order, and that order is part of the contract.
pub trait TokenTransformation: Send + Sync {
    /// The name shown in the parse trace.
    fn name(&self) -> &str;

    /// Produce the next sequence.
    fn transform(&self, sequence: &TokenSequence, emitter: &mut TokenEmitter<'_>) -> TokenSequence;
}

/// `--opt=value` → `--opt value` (also `-o=value`, `/opt:value`).
/// Only the first delimiter splits; `--key=a=b` yields the value `a=b`.
#[derive(Debug, Default)]
pub struct SplitOptionAssignments {}

impl TokenTransformation for SplitOptionAssignments {
    fn name(&self) -> &str {
        SPLIT_ASSIGNMENTS_NAME
    }

    fn transform(&self, sequence: &TokenSequence, emitter: &mut TokenEmitter<'_>) -> TokenSequence {
        let mut tokens = Vec::with_capacity(sequence.len());

        for token in sequence {
            let split = match (token.option_prefix(), token.option_name()) {
                (Some(prefix), Some(name)) => split_assignment(name)
                    .map(|(name, value)| (format!("{}{name}", prefix.as_str()), value.to_string())),
                _ => None,
            };

            match split {
                Some((option, value)) => {
                    tokens.push(emitter.derive(token, TokenType::Option, option));
                    tokens.push(emitter.derive(token, TokenType::Value, value));
                }
                None => tokens.push(token.clone()),
            }
        }

        TokenSequence::new(tokens)
    }
}

fn split_assignment(name: &str) -> Option<(&str, &str)> {
    match name.find(&ASSIGNMENT_DELIMITERS[..]) {
        Some(0) | None => None,
        Some(position) => Some((&name[..position], &name[position + 1..])),
    }
}

/// `-abc` → `-a -b -c`.
///
/// Tokens still holding an assignment are left alone, so this should run after [`SplitOptionAssignments`].
#[derive(Debug, Default)]
pub struct ExpandClubbedFlags {}

impl TokenTransformation for ExpandClubbedFlags {
    fn name(&self) -> &str {
        EXPAND_CLUBBED_NAME
    }

    fn transform(&self, sequence: &TokenSequence, emitter: &mut TokenEmitter<'_>) -> TokenSequence {
        let mut tokens = Vec::with_capacity(sequence.len());

        for token in sequence {
            match (token.option_prefix(), token.option_name()) {
                (Some(OptionPrefix::Short), Some(name))
                    if name.chars().count() > 1 && !name.contains(&ASSIGNMENT_DELIMITERS[..]) =>
                {
                    for single in name.chars() {
                        tokens.push(emitter.derive(
                            token,
                            TokenType::Option,
                            format!("{SHORT_PREFIX}{single}"),
                        ));
                    }
                }
                _ => tokens.push(token.clone()),
            }
        }

        TokenSequence::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{Tokenizer, TokenizerConfig};
    use rstest::rstest;

    fn run(
        transformation: &dyn TokenTransformation,
        arguments: &[&str],
    ) -> (TokenSequence, TokenSequence, TokenArena) {
        let tokenizer = Tokenizer::bare(TokenizerConfig {
            allow_slash_prefix: true,
            ..TokenizerConfig::default()
        });
        let (mut arena, sequence) = tokenizer.lex(arguments);
        let generation = arena.begin_generation();
        let output = {
            let mut emitter = TokenEmitter::new(&mut arena, generation);
            transformation.transform(&sequence, &mut emitter)
        };
        (sequence, output, arena)
    }

    fn raws(sequence: &TokenSequence) -> Vec<(TokenType, &str)> {
        sequence.iter().map(|t| (t.token_type(), t.raw())).collect()
    }

    #[rstest]
    #[case(vec!["--name=abc"], vec![(TokenType::Option, "--name"), (TokenType::Value, "abc")])]
    #[case(vec!["--name:abc"], vec![(TokenType::Option, "--name"), (TokenType::Value, "abc")])]
    #[case(vec!["--name="], vec![(TokenType::Option, "--name"), (TokenType::Value, "")])]
    #[case(vec!["--key=a=b"], vec![(TokenType::Option, "--key"), (TokenType::Value, "a=b")])]
    #[case(vec!["-n=1"], vec![(TokenType::Option, "-n"), (TokenType::Value, "1")])]
    #[case(vec!["/n:1"], vec![(TokenType::Option, "/n"), (TokenType::Value, "1")])]
    #[case(vec!["--=x"], vec![(TokenType::Option, "--=x")])]
    #[case(vec!["a=b"], vec![(TokenType::Value, "a=b")])]
    #[case(vec!["--", "--x=y"], vec![(TokenType::EndOfOptions, "--"), (TokenType::Value, "--x=y")])]
    fn split_assignments(#[case] arguments: Vec<&str>, #[case] expected: Vec<(TokenType, &str)>) {
        let (_, output, _) = run(&SplitOptionAssignments::default(), &arguments);
        assert_eq!(raws(&output), expected);
    }

    #[test]
    fn split_assignments_provenance() {
        let (input, output, _) = run(&SplitOptionAssignments::default(), &["x", "--name=abc"]);

        // Verbatim tokens are carried unchanged.
        assert_eq!(output.tokens()[0], input.tokens()[0]);
        assert_eq!(output.tokens()[1].source(), Some(input.tokens()[1].id()));
        assert_eq!(output.tokens()[2].source(), Some(input.tokens()[1].id()));
    }

    #[rstest]
    #[case(vec!["-abc"], vec!["-a", "-b", "-c"])]
    #[case(vec!["-a"], vec!["-a"])]
    #[case(vec!["--abc"], vec!["--abc"])]
    #[case(vec!["-ab=1"], vec!["-ab=1"])]
    #[case(vec!["-12"], vec!["-12"])]
    #[case(vec!["x", "-vq", "y"], vec!["x", "-v", "-q", "y"])]
    fn expand_clubbed(#[case] arguments: Vec<&str>, #[case] expected: Vec<&str>) {
        let (_, output, _) = run(&ExpandClubbedFlags::default(), &arguments);
        assert_eq!(
            output.iter().map(|t| t.raw()).collect::<Vec<&str>>(),
            expected
        );
    }

    #[test]
    fn expand_clubbed_provenance() {
        let (input, output, arena) = run(&ExpandClubbedFlags::default(), &["-vq"]);

        for token in &output {
            assert_eq!(token.source(), Some(input.tokens()[0].id()));
            assert_eq!(arena.origin(token.id()), Some(&input.tokens()[0]));
        }
    }
}
