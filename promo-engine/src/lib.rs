mod cache;
pub mod engine;
pub mod error;
mod extract;
mod source;

pub use engine::{PromoEngine, Validation};
pub use error::{LoadError, SourceError, SourceFailure};
