pub mod config;
pub mod health;
pub mod rewrite;
pub mod stats;
