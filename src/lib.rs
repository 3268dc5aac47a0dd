pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod field;
pub mod protocol;
pub mod rng;
pub mod types;
