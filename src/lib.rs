pub mod adblock;
pub mod api;
pub mod blocklist;
pub mod config;
pub mod engine;
pub mod init;
pub mod logger;
pub mod middleware;
pub mod settings;
pub mod stats;
pub mod sync;
pub mod worker;
