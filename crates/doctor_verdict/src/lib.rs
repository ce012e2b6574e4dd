#![forbid(unsafe_code)]

pub mod aggregate;
pub mod cli;
pub mod conditions;
pub mod error;
pub mod grid;
pub mod report;
pub mod util;
pub mod winner;

pub use cli::run_from_env;
pub use error::{DoctorError, Result};
