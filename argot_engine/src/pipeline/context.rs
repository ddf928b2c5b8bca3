use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::command::CommandTree;
use crate::model::ExitCode;
use crate::parser::{Bindings, ParseResult};
use crate::pipeline::UserInterface;
use crate::runner::AppRunner;
use crate::tokens::TokenHistory;

/// A type keyed bag of collaborator state.
///
/// At most one value per type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}

impl Extensions {
    /// Store `value`, returning the previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut::<T>())
    }

    pub fn remove<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }
}

/// The mutable state of one invocation.
///
/// Created fresh for every run and discarded afterwards; it is never shared between runs.
/// Each product (tokens, parse result, bindings) is only present once the stage that produces it has run.
pub struct ExecutionContext {
    arguments: Vec<String>,
    tree: Arc<CommandTree>,
    interface: Arc<dyn UserInterface>,
    runner: Option<AppRunner>,
    tokens: Option<TokenHistory>,
    parse_result: Option<ParseResult>,
    bindings: Option<Bindings>,
    cancellation: CancellationToken,
    extensions: Extensions,
    exit_code: Option<ExitCode>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("arguments", &self.arguments)
            .field("tokens", &self.tokens.is_some())
            .field("parse_result", &self.parse_result)
            .field("bindings", &self.bindings.is_some())
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("extensions", &self.extensions)
            .field("exit_code", &self.exit_code)
            .finish()
    }
}

impl ExecutionContext {
    pub fn new(
        arguments: Vec<String>,
        tree: Arc<CommandTree>,
        interface: Arc<dyn UserInterface>,
    ) -> Self {
        Self {
            arguments,
            tree,
            interface,
            runner: None,
            tokens: None,
            parse_result: None,
            bindings: None,
            cancellation: CancellationToken::new(),
            extensions: Extensions::default(),
            exit_code: None,
        }
    }

    pub(crate) fn with_runner(mut self, runner: AppRunner) -> Self {
        self.runner.replace(runner);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The raw arguments of the invocation.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Rewrite the raw arguments; only meaningful before tokenization.
    pub fn arguments_mut(&mut self) -> &mut Vec<String> {
        &mut self.arguments
    }

    pub fn tree(&self) -> &Arc<CommandTree> {
        &self.tree
    }

    pub fn interface(&self) -> &Arc<dyn UserInterface> {
        &self.interface
    }

    /// The runner executing this context, for nested runs (ex: a REPL command).
    pub fn runner(&self) -> Option<&AppRunner> {
        self.runner.as_ref()
    }

    pub fn tokens(&self) -> Option<&TokenHistory> {
        self.tokens.as_ref()
    }

    pub fn set_tokens(&mut self, tokens: TokenHistory) {
        self.tokens.replace(tokens);
    }

    pub fn parse_result(&self) -> Option<&ParseResult> {
        self.parse_result.as_ref()
    }

    pub fn parse_result_mut(&mut self) -> Option<&mut ParseResult> {
        self.parse_result.as_mut()
    }

    pub fn set_parse_result(&mut self, parse_result: ParseResult) {
        self.parse_result.replace(parse_result);
    }

    pub fn bindings(&self) -> Option<&Bindings> {
        self.bindings.as_ref()
    }

    pub fn set_bindings(&mut self, bindings: Bindings) {
        self.bindings.replace(bindings);
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// The exit code, once the run has finished.
    pub fn exit_code(&self) -> Option<ExitCode> {
        self.exit_code
    }

    pub(crate) fn set_exit_code(&mut self, exit_code: ExitCode) {
        self.exit_code.replace(exit_code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    #[derive(Debug, PartialEq)]
    struct Label(&'static str);

    #[test]
    fn extensions_keyed_by_type() {
        let mut extensions = Extensions::default();
        assert_eq!(extensions.insert(Counter(1)), None);
        assert_eq!(extensions.insert(Label("a")), None);
        assert_eq!(extensions.insert(Counter(2)), Some(Counter(1)));

        extensions.get_mut::<Counter>().unwrap().0 += 1;
        assert_eq!(extensions.get::<Counter>(), Some(&Counter(3)));
        assert_eq!(extensions.get::<Label>(), Some(&Label("a")));
        assert!(!extensions.contains::<String>());

        assert_eq!(extensions.remove::<Label>(), Some(Label("a")));
        assert_eq!(extensions.get::<Label>(), None);
    }
}
