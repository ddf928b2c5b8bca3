mod context;
mod executor;
mod interface;
pub(crate) mod printer;
mod stage;
mod steps;

pub use context::*;
pub(crate) use executor::ActionHandler;
pub use executor::{CommandHandler, FnStep, Middleware, Next, Pipeline, PipelineBuilder, StepError, StepKey, StepResult};
pub use interface::*;
pub use stage::*;
pub use steps::*;
