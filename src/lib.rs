pub mod boundary;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod git;
pub mod matcher;
pub mod placeholder;
pub mod template;
pub mod ui;

pub use error::{GitVersioningError, Result};
