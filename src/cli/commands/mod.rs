//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod database;
mod index;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use database::{run_clear, run_info, run_stats};
pub use index::{run_index, IndexArgs};
pub use serve::run_serve;
