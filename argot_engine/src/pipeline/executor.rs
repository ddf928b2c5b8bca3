use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "tracing_debug")]
use tracing::debug;

use crate::model::ExitCode;
use crate::pipeline::{ExecutionContext, Stage};

pub type StepResult = Result<ExitCode, StepError>;

/// An internal failure of a step or command; the run ends with [`ExitCode::ERROR`].
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Step error: {0}")]
    Message(String),

    #[error("Step error: {0}")]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Step error: the run was cancelled.")]
    Cancelled,

    #[error("Step error: {0} is not available; the {1} stage did not run.")]
    MissingProduct(&'static str, Stage),
}

impl StepError {
    pub fn message(message: impl Into<String>) -> Self {
        StepError::Message(message.into())
    }
}

/// A step of the invocation pipeline.
///
/// Each step receives the context and the continuation to the remaining steps.
/// Invoking `next` at most once continues the run; returning without it short-circuits with the returned exit code.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// The name shown in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult;
}

/// The executable body of a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(&self, context: &mut ExecutionContext) -> StepResult;
}

pub(crate) struct ActionHandler<F>(pub(crate) F);

#[async_trait]
impl<F> CommandHandler for ActionHandler<F>
where
    F: Fn(&mut ExecutionContext) -> StepResult + Send + Sync,
{
    async fn invoke(&self, context: &mut ExecutionContext) -> StepResult {
        (self.0)(context)
    }
}

/// The continuation to the remaining steps.
///
/// Consumed when run, so the remaining steps run at most once.
pub struct Next<'a> {
    steps: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(steps: &'a [Arc<dyn Middleware>]) -> Self {
        Self { steps }
    }

    /// The number of steps which have yet to run.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Run the remaining steps; an exhausted chain succeeds.
    pub async fn run(self, context: &mut ExecutionContext) -> StepResult {
        match self.steps.split_first() {
            Some((step, rest)) => {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("Running step '{}'.", step.name());
                }

                step.handle(context, Next { steps: rest }).await
            }
            None => Ok(ExitCode::SUCCESS),
        }
    }
}

/// Adapts a closure into a [`Middleware`].
///
/// ### Example
/// ```
/// use argot_engine::FnStep;
///
/// let _step = FnStep::new("audit", |context, next| {
///     Box::pin(async move {
///         context.extensions_mut().insert(42u32);
///         next.run(context).await
///     })
/// });
/// ```
pub struct FnStep<F> {
    name: String,
    function: F,
}

impl<F> FnStep<F>
where
    F: for<'a> Fn(&'a mut ExecutionContext, Next<'a>) -> BoxFuture<'a, StepResult> + Send + Sync,
{
    pub fn new(name: impl Into<String>, function: F) -> Self {
        Self {
            name: name.into(),
            function,
        }
    }
}

#[async_trait]
impl<F> Middleware for FnStep<F>
where
    F: for<'a> Fn(&'a mut ExecutionContext, Next<'a>) -> BoxFuture<'a, StepResult> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, context: &mut ExecutionContext, next: Next<'_>) -> StepResult {
        (self.function)(context, next).await
    }
}

/// The sort key of a registered step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepKey {
    pub stage: Stage,
    pub order: i32,
    pub registration: usize,
}

/// The frozen, ordered chain of steps.
#[derive(Clone)]
pub struct Pipeline {
    keys: Arc<[StepKey]>,
    steps: Arc<[Arc<dyn Middleware>]>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.keys
                    .iter()
                    .zip(self.steps.iter())
                    .map(|(key, step)| (key.stage, key.order, step.name().to_string())),
            )
            .finish()
    }
}

impl Pipeline {
    pub fn keys(&self) -> &[StepKey] {
        &self.keys
    }

    /// The step names, in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(&self, context: &mut ExecutionContext) -> StepResult {
        Next::new(&self.steps).run(context).await
    }
}

/// Collects steps; [`PipelineBuilder::build`] freezes their order.
#[derive(Default)]
pub struct PipelineBuilder {
    steps: Vec<(StepKey, Arc<dyn Middleware>)>,
}

impl PipelineBuilder {
    /// Register a step; equal `(stage, order)` pairs run in registration order.
    pub fn step(mut self, stage: Stage, order: i32, step: Arc<dyn Middleware>) -> Self {
        let key = StepKey {
            stage,
            order,
            registration: self.steps.len(),
        };
        self.steps.push((key, step));
        self
    }

    pub fn build(mut self) -> Pipeline {
        self.steps.sort_by_key(|(key, _)| *key);

        #[cfg(feature = "tracing_debug")]
        {
            for (key, step) in &self.steps {
                debug!("Pipeline step {key:?}: '{}'.", step.name());
            }
        }

        let (keys, steps): (Vec<StepKey>, Vec<Arc<dyn Middleware>>) = self.steps.into_iter().unzip();
        Pipeline {
            keys: keys.into(),
            steps: steps.into(),
        }
    }
}
