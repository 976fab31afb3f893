pub mod cli;
pub mod config;
pub mod render;
pub mod services;
pub mod types;
