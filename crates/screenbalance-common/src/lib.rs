pub mod category;
pub mod error;
pub mod rollover;
pub mod schedule;
pub mod score;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
