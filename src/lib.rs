pub mod config;
pub mod error;
pub mod server;
pub mod spammer;
pub mod stress;

pub use error::{Error, Result};
