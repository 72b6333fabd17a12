pub mod config;
mod error;
pub use error::{Error, Result};
pub mod lang;
pub mod middleware;
pub mod plugin;
pub mod solver;
