//! Traits which, typically, may be imported without concern: `use argot::prelude::*`.

// Needed to implement steps, handlers, consoles and transformations.
pub use crate::pipeline::{CommandHandler, Middleware, UserInterface};
pub use crate::tokens::TokenTransformation;
