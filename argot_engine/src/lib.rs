//! Engine crate for `argot`.
//! See [documentation root](https://docs.rs/argot/latest/argot/index.html) for full details.
mod command;
pub mod completion;
mod constant;
mod model;
mod parser;
mod pipeline;
pub mod prelude;
mod runner;
pub mod suggest;
mod tokens;

pub use command::*;
pub use model::*;
pub use parser::*;
pub use pipeline::{
    BindValuesStep, CommandHandler, Console, ExecutionContext, Extensions, FnStep, InvokeStep, MemoryInterface,
    Middleware, Next, ParseDirectiveStep, ParseErrorStep, ParseInputStep, Pipeline, PipelineBuilder, Stage, StepError,
    StepKey, StepResult, SuggestDirectiveStep, TokenizeStep, UserInterface,
};
pub use runner::*;
pub use tokens::*;
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
