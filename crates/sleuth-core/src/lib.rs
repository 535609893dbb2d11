pub mod bug;
pub mod config;
pub mod error;
pub mod finding;
pub mod io;
pub mod paths;
pub mod prompt;

pub use error::{Result, SleuthError};
