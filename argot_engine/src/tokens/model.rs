use crate::constant::*;

/// The lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    /// A leading `[name]` or `[name:value]` pseudo-token.
    Directive,
    /// A `--long`, `-s` or (when enabled) `/name` token.
    Option,
    /// Any ordinary value.
    Value,
    /// The `--` marker when the pass-through separator strategy is configured.
    Separator,
    /// The `--` marker when every later token is an operand value.
    EndOfOptions,
}

impl TokenType {
    pub(crate) const WIDEST: usize = 12;

    /// The name used in the parse trace.
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::Directive => "Directive",
            TokenType::Option => "Option",
            TokenType::Value => "Value",
            TokenType::Separator => "Separator",
            TokenType::EndOfOptions => "EndOfOptions",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The syntax used to introduce an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionPrefix {
    /// `--name`
    Long,
    /// `-n`
    Short,
    /// `/name`
    Slash,
}

impl OptionPrefix {
    /// The literal prefix text.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionPrefix::Long => LONG_PREFIX,
            OptionPrefix::Short => SHORT_PREFIX,
            OptionPrefix::Slash => SLASH_PREFIX,
        }
    }
}

/// Arena identity of a token: the pass (generation) that minted it, and its slot in that generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId {
    generation: u32,
    index: u32,
}

impl TokenId {
    /// The pass which minted the token (`0` is the tokenizer itself).
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The slot of the token within its generation.
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// One lexical unit of the command line.
///
/// Immutable once minted.
/// A token produced by a transformation points back at the token it was derived from via [`Token::source`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    id: TokenId,
    token_type: TokenType,
    raw: String,
    source: Option<TokenId>,
}

impl Token {
    /// The arena identity.
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// The lexical class.
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// The text, exactly as it appears in this generation.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The token this one was derived from, if any.
    pub fn source(&self) -> Option<TokenId> {
        self.source
    }

    pub fn is_option(&self) -> bool {
        self.token_type == TokenType::Option
    }

    pub fn is_value(&self) -> bool {
        self.token_type == TokenType::Value
    }

    /// The prefix syntax of an `Option` token.
    pub fn option_prefix(&self) -> Option<OptionPrefix> {
        if !self.is_option() {
            return None;
        }

        if self.raw.starts_with(LONG_PREFIX) {
            Some(OptionPrefix::Long)
        } else if self.raw.starts_with(SLASH_PREFIX) {
            Some(OptionPrefix::Slash)
        } else {
            Some(OptionPrefix::Short)
        }
    }

    /// The name of an `Option` token, without its prefix.
    /// May still contain an assignment (`name=value`) before the assignments are split.
    pub fn option_name(&self) -> Option<&str> {
        self.option_prefix()
            .map(|prefix| &self.raw[prefix.as_str().len()..])
    }

    /// The `(name, value)` of a `Directive` token.
    pub fn directive(&self) -> Option<(&str, Option<&str>)> {
        if self.token_type != TokenType::Directive {
            return None;
        }

        let inner = self
            .raw
            .strip_prefix(DIRECTIVE_OPEN)
            .and_then(|r| r.strip_suffix(DIRECTIVE_CLOSE))
            .unwrap_or(&self.raw);

        match inner.split_once(DIRECTIVE_VALUE_DELIMITER) {
            Some((name, value)) => Some((name, Some(value))),
            None => Some((inner, None)),
        }
    }

    /// Compare the lexical content of two tokens, ignoring identity and provenance.
    pub fn same_text(&self, other: &Token) -> bool {
        self.token_type == other.token_type && self.raw == other.raw
    }
}

/// Storage for every token minted during one invocation, one vector per generation.
///
/// Provenance is an index into an earlier generation, never a live reference.
#[derive(Debug, Default, Clone)]
pub struct TokenArena {
    generations: Vec<Vec<Token>>,
}

impl TokenArena {
    pub(crate) fn begin_generation(&mut self) -> u32 {
        self.generations.push(Vec::default());
        (self.generations.len() - 1) as u32
    }

    pub(crate) fn mint(
        &mut self,
        generation: u32,
        token_type: TokenType,
        raw: impl Into<String>,
        source: Option<TokenId>,
    ) -> Token {
        let tokens = self
            .generations
            .get_mut(generation as usize)
            .expect("internal error - generation must begin before minting");
        let token = Token {
            id: TokenId {
                generation,
                index: tokens.len() as u32,
            },
            token_type,
            raw: raw.into(),
            source,
        };
        tokens.push(token.clone());
        token
    }

    /// Look up a token by identity.
    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.generations
            .get(id.generation as usize)
            .and_then(|tokens| tokens.get(id.index as usize))
    }

    /// The number of generations minted so far.
    pub fn generations(&self) -> usize {
        self.generations.len()
    }

    /// The chain from `id` back to its origin, starting with `id` itself.
    pub fn provenance(&self, id: TokenId) -> Vec<&Token> {
        let mut chain = Vec::default();
        let mut cursor = self.get(id);

        while let Some(token) = cursor {
            chain.push(token);
            // Sources always point at an earlier generation, so the walk terminates.
            cursor = token.source.and_then(|source| self.get(source));
        }

        chain
    }

    /// The token from the untransformed sequence that `id` ultimately derives from.
    pub fn origin(&self, id: TokenId) -> Option<&Token> {
        self.provenance(id).pop()
    }
}

/// An ordered list of tokens: leading directives followed by the arguments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// The leading directive tokens.
    pub fn directives(&self) -> &[Token] {
        let count = self
            .tokens
            .iter()
            .take_while(|t| t.token_type == TokenType::Directive)
            .count();
        &self.tokens[..count]
    }

    /// The tokens after the directives, up to (excluding) a pass-through separator.
    pub fn arguments(&self) -> &[Token] {
        let start = self.directives().len();
        let end = self
            .tokens
            .iter()
            .position(|t| t.token_type == TokenType::Separator)
            .unwrap_or(self.tokens.len());
        &self.tokens[start..end]
    }

    /// The tokens following a pass-through separator.
    pub fn separated(&self) -> &[Token] {
        match self
            .tokens
            .iter()
            .position(|t| t.token_type == TokenType::Separator)
        {
            Some(position) => &self.tokens[position + 1..],
            None => &[],
        }
    }

    /// Find a directive by name.
    pub fn directive(&self, name: &str) -> Option<&Token> {
        self.directives()
            .iter()
            .find(|t| matches!(t.directive(), Some((n, _)) if n == name))
    }

    /// Compare lexical content token by token, ignoring identity and provenance.
    pub fn same_text(&self, other: &TokenSequence) -> bool {
        self.tokens.len() == other.tokens.len()
            && self
                .tokens
                .iter()
                .zip(other.tokens.iter())
                .all(|(a, b)| a.same_text(b))
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// One recorded pass of the tokenizer.
#[derive(Debug, Clone)]
pub struct Pass {
    name: String,
    sequence: TokenSequence,
    changed: bool,
}

impl Pass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> &TokenSequence {
        &self.sequence
    }

    /// Whether this pass produced a sequence different from its input.
    pub fn changed(&self) -> bool {
        self.changed
    }
}

/// The arena plus every pass's resulting sequence, oldest first.
#[derive(Debug, Default, Clone)]
pub struct TokenHistory {
    arena: TokenArena,
    passes: Vec<Pass>,
}

impl TokenHistory {
    pub(crate) fn new(arena: TokenArena, name: impl Into<String>, sequence: TokenSequence) -> Self {
        Self {
            arena,
            passes: vec![Pass {
                name: name.into(),
                sequence,
                changed: true,
            }],
        }
    }

    pub(crate) fn arena_mut(&mut self) -> &mut TokenArena {
        &mut self.arena
    }

    pub(crate) fn record(&mut self, name: impl Into<String>, sequence: TokenSequence) {
        let changed = {
            let previous = self.current();
            previous.len() != sequence.len()
                || previous
                    .iter()
                    .zip(sequence.iter())
                    .any(|(a, b)| a.id != b.id)
        };
        self.passes.push(Pass {
            name: name.into(),
            sequence,
            changed,
        });
    }

    pub fn arena(&self) -> &TokenArena {
        &self.arena
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// The untransformed sequence.
    pub fn initial(&self) -> &TokenSequence {
        &self.passes[0].sequence
    }

    /// The sequence after the final pass.
    pub fn current(&self) -> &TokenSequence {
        &self
            .passes
            .last()
            .expect("internal error - history always holds the initial pass")
            .sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn mint_all(arena: &mut TokenArena, items: &[(TokenType, &str)]) -> Vec<Token> {
        let generation = arena.begin_generation();
        items
            .iter()
            .map(|(token_type, raw)| arena.mint(generation, *token_type, *raw, None))
            .collect()
    }

    #[rstest]
    #[case("--verbose", Some(OptionPrefix::Long), Some("verbose"))]
    #[case("-v", Some(OptionPrefix::Short), Some("v"))]
    #[case("/verbose", Some(OptionPrefix::Slash), Some("verbose"))]
    #[case("--name=abc", Some(OptionPrefix::Long), Some("name=abc"))]
    fn option_prefix(
        #[case] raw: &str,
        #[case] prefix: Option<OptionPrefix>,
        #[case] name: Option<&str>,
    ) {
        let mut arena = TokenArena::default();
        let token = mint_all(&mut arena, &[(TokenType::Option, raw)]).remove(0);
        assert_eq!(token.option_prefix(), prefix);
        assert_eq!(token.option_name(), name);
    }

    #[test]
    fn value_has_no_option_prefix() {
        let mut arena = TokenArena::default();
        let token = mint_all(&mut arena, &[(TokenType::Value, "--verbose")]).remove(0);
        assert_eq!(token.option_prefix(), None);
        assert_eq!(token.option_name(), None);
    }

    #[rstest]
    #[case("[parse]", "parse", None)]
    #[case("[suggest:3]", "suggest", Some("3"))]
    #[case("[a:b:c]", "a", Some("b:c"))]
    fn directive(#[case] raw: &str, #[case] name: &str, #[case] value: Option<&str>) {
        let mut arena = TokenArena::default();
        let token = mint_all(&mut arena, &[(TokenType::Directive, raw)]).remove(0);
        assert_eq!(token.directive(), Some((name, value)));
    }

    #[test]
    fn provenance_chain() {
        let mut arena = TokenArena::default();
        let original = mint_all(&mut arena, &[(TokenType::Option, "-ab=1")]).remove(0);
        let first = arena.begin_generation();
        let split = arena.mint(first, TokenType::Option, "-ab", Some(original.id()));
        let second = arena.begin_generation();
        let expanded = arena.mint(second, TokenType::Option, "-b", Some(split.id()));

        let chain: Vec<&str> = arena
            .provenance(expanded.id())
            .iter()
            .map(|t| t.raw())
            .collect();
        assert_eq!(chain, vec!["-b", "-ab", "-ab=1"]);
        assert_eq!(arena.origin(expanded.id()), Some(&original));
        assert_eq!(arena.origin(original.id()), Some(&original));
        assert_eq!(arena.generations(), 3);
    }

    #[test]
    fn sequence_partitions() {
        let mut arena = TokenArena::default();
        let tokens = mint_all(
            &mut arena,
            &[
                (TokenType::Directive, "[parse]"),
                (TokenType::Value, "add"),
                (TokenType::Option, "-v"),
                (TokenType::Separator, "--"),
                (TokenType::Value, "rest"),
            ],
        );
        let sequence = TokenSequence::new(tokens);

        let raws = |ts: &[Token]| ts.iter().map(|t| t.raw().to_string()).collect::<Vec<_>>();
        assert_eq!(raws(sequence.directives()), vec!["[parse]"]);
        assert_eq!(raws(sequence.arguments()), vec!["add", "-v"]);
        assert_eq!(raws(sequence.separated()), vec!["rest"]);
        assert!(sequence.directive("parse").is_some());
        assert!(sequence.directive("suggest").is_none());
    }

    #[test]
    fn history_detects_changes() {
        let mut arena = TokenArena::default();
        let tokens = mint_all(&mut arena, &[(TokenType::Value, "a")]);
        let sequence = TokenSequence::new(tokens);
        let mut history = TokenHistory::new(arena, "from shell", sequence.clone());

        history.record("noop", sequence.clone());
        assert!(!history.passes()[1].changed());

        let generation = history.arena_mut().begin_generation();
        let replaced = history.arena_mut().mint(
            generation,
            TokenType::Value,
            "a",
            Some(sequence.tokens()[0].id()),
        );
        history.record("copy", TokenSequence::new(vec![replaced]));
        assert!(history.passes()[2].changed());
        assert!(history.current().same_text(history.initial()));
    }
}
