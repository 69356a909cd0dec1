pub mod ask;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod logs;
pub mod source;
