pub mod config;
pub mod error;

pub use config::SproutConfig;
pub use error::{Result, SproutError};
