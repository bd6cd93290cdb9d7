// File: src/core/mod.rs

pub mod converter;
pub mod dictionary;
pub mod edit_distance;
pub mod emission;
pub mod engine;
pub mod meters;
pub mod types;
