pub mod cli;
pub mod discord;
pub mod load_config;

pub use cli::{run, Cli, Commands};
