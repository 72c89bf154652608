pub mod config;
pub mod error;
pub mod filter;
pub mod schema;
pub mod value;
