//! CLI command implementations

pub mod check;
pub mod config;
pub mod exclude;
pub mod init;
pub mod stamp;
pub mod watch;
