use async_trait::async_trait;
use std::sync::Arc;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::completion::complete;
use crate::constant::*;
use crate::model::ExitCode;
use crate::parser::{bind, ParserConfig, Resolver};
use crate::pipeline::printer::{render_parse_error, render_parse_trace};
use crate::pipeline::*;
use crate::tokens::Tokenizer;

/// Tokenize the raw arguments (`Tokenize`).
pub struct TokenizeStep {
    tokenizer: Tokenizer,
}

impl TokenizeStep {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }
}

#[async_trait]
impl Middleware for TokenizeStep {
    fn name(&self) -> &str {
        "tokenize"
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult {
        let history = self.tokenizer.tokenize(context.arguments());
        context.set_tokens(history);
        next.run(context).await
    }
}

/// Print the tokenizer passes instead of running, for the `[parse]` directive (`PostTokenizePreParseInput`).
#[derive(Debug, Default)]
pub struct ParseDirectiveStep {}

#[async_trait]
impl Middleware for ParseDirectiveStep {
    fn name(&self) -> &str {
        "parse-directive"
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult {
        let trace = context
            .tokens()
            .filter(|history| history.current().directive(PARSE_DIRECTIVE).is_some())
            .map(render_parse_trace);

        let Some(trace) = trace else {
            return next.run(context).await;
        };

        for line in trace {
            context.interface().print(line);
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Resolve the tokens against the command tree (`ParseInput`).
///
/// A parse error is recorded in the result rather than failing the step, so that later steps may recover from it.
pub struct ParseInputStep {
    config: ParserConfig,
}

impl ParseInputStep {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Middleware for ParseInputStep {
    fn name(&self) -> &str {
        "parse-input"
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult {
        let result = {
            let history = context
                .tokens()
                .ok_or(StepError::MissingProduct("tokens", Stage::Tokenize))?;
            Resolver::new(context.tree(), self.config).resolve(history.current(), history.arena())
        };

        #[cfg(feature = "tracing_debug")]
        {
            debug!("Parse result: {result:?}.");
        }

        context.set_parse_result(result);
        next.run(context).await
    }
}

/// Print completions instead of running, for the `[suggest]` directive (`PostParseInputPreBindValues`).
#[derive(Debug, Default)]
pub struct SuggestDirectiveStep {}

#[async_trait]
impl Middleware for SuggestDirectiveStep {
    fn name(&self) -> &str {
        "suggest-directive"
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult {
        let requested = context
            .tokens()
            .map(|history| history.current().directive(SUGGEST_DIRECTIVE).is_some())
            .unwrap_or(false);

        if !requested {
            return next.run(context).await;
        }

        let suggestions = {
            let result = context
                .parse_result()
                .ok_or(StepError::MissingProduct("parse result", Stage::ParseInput))?;
            complete(context.tree(), result)
        };

        for suggestion in suggestions {
            context.interface().print(suggestion);
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Report a parse error that no earlier step resolved (`PostParseInputPreBindValues`, last).
pub struct ParseErrorStep {
    typo_suggestion_limit: usize,
}

impl ParseErrorStep {
    pub fn new(typo_suggestion_limit: usize) -> Self {
        Self {
            typo_suggestion_limit,
        }
    }
}

#[async_trait]
impl Middleware for ParseErrorStep {
    fn name(&self) -> &str {
        "parse-error"
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult {
        let lines = {
            let result = context
                .parse_result()
                .ok_or(StepError::MissingProduct("parse result", Stage::ParseInput))?;
            result
                .error()
                .map(|error| render_parse_error(context.tree(), result, error, self.typo_suggestion_limit))
        };

        let Some(lines) = lines else {
            return next.run(context).await;
        };

        for line in lines {
            context.interface().print_error(line);
        }

        Ok(ExitCode::VALIDATION_ERROR)
    }
}

/// Merge, default, and validate the parsed values (`BindValues`).
#[derive(Debug, Default)]
pub struct BindValuesStep {}

#[async_trait]
impl Middleware for BindValuesStep {
    fn name(&self) -> &str {
        "bind-values"
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult {
        let outcome = {
            let result = context
                .parse_result()
                .ok_or(StepError::MissingProduct("parse result", Stage::ParseInput))?;

            match result.error() {
                Some(error) => Err(vec![error.describe(context.tree())]),
                None => bind(context.tree(), result)
                    .map_err(|errors| errors.iter().map(ToString::to_string).collect()),
            }
        };

        match outcome {
            Ok(bindings) => {
                context.set_bindings(bindings);
                next.run(context).await
            }
            Err(messages) => {
                for message in messages {
                    context.interface().print_error(message);
                }

                Ok(ExitCode::VALIDATION_ERROR)
            }
        }
    }
}

/// Run the target command through its ancestors' interceptors (`Invoke`).
///
/// The end of the chain: steps registered after it in the `Invoke` stage never run.
#[derive(Debug, Default)]
pub struct InvokeStep {}

struct HandlerStep(Arc<dyn CommandHandler>);

#[async_trait]
impl Middleware for HandlerStep {
    fn name(&self) -> &str {
        "handler"
    }

    async fn handle(&self, context: &mut ExecutionContext, _next: Next<'_>) -> StepResult {
        self.0.invoke(context).await
    }
}

#[async_trait]
impl Middleware for InvokeStep {
    fn name(&self) -> &str {
        "invoke"
    }

    async fn handle(&self, context: &mut ExecutionContext, _next: Next<'_>) -> StepResult {
        let target = context
            .bindings()
            .ok_or(StepError::MissingProduct("bindings", Stage::BindValues))?
            .target();

        if context.is_cancelled() {
            return Err(StepError::Cancelled);
        }

        let tree = context.tree().clone();
        let mut chain: Vec<Arc<dyn Middleware>> = tree
            .path(target)
            .into_iter()
            .filter_map(|id| tree.command(id).interceptor().cloned())
            .collect();

        match tree.command(target).handler() {
            Some(handler) => chain.push(Arc::new(HandlerStep(handler.clone()))),
            None => {
                return Err(StepError::message(format!(
                    "'{}' has no handler.",
                    tree.full_name(target)
                )))
            }
        }

        #[cfg(feature = "tracing_debug")]
        {
            debug!("Invoking '{}' through {} interceptors.", tree.full_name(target), chain.len() - 1);
        }

        Next::new(&chain).run(context).await
    }
}
