mod engine;
mod error;

pub use engine::ValuesEngine;
pub use error::ValuesError;
