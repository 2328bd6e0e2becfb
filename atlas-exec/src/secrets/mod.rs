mod tracker;
mod value;
mod writer;

pub use tracker::{SecretTracker, REDACTED};
pub use value::SecretValue;
pub use writer::SecretFilterWriter;
