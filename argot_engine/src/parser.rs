mod binder;
mod resolver;
mod result;

pub use binder::*;
pub use resolver::*;
pub use result::*;
