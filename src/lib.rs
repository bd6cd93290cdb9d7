// File: src/lib.rs

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod replay;

pub use crate::config::RunConfig;
pub use crate::core::emission::EmissionSet;
pub use crate::core::engine::Evaluator;
pub use crate::error::{EvalError, EvalResult};
