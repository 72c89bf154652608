pub mod config;
pub mod error;
pub mod jsonl;
pub mod registry;
pub mod runner;
