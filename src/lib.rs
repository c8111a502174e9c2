pub mod aws;
pub mod cli;
pub mod commands;
pub mod configmap;
pub mod kubectl;

pub use cli::{Cli, Commands};
