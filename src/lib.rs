pub mod check;
pub mod cli;
pub mod config;
pub mod github;
pub mod matrix;
pub mod monitor;
pub mod remote;
pub mod utils;
