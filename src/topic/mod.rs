//! Declarative topic configuration files

mod discovery;
mod record;

pub use discovery::*;
pub use record::*;
