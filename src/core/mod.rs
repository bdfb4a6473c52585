pub mod config;
pub mod error;

pub use config::MdnaConfig;
pub use error::{MdnaError, Result};
