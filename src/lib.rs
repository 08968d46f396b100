pub mod catalog;
pub mod cli;
pub mod config;
pub mod draft;
pub mod errors;
pub mod log;
pub mod merge;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod server;
pub mod transport;
pub mod ux;
pub mod validate;
pub mod wire;
