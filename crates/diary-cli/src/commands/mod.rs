//! Command handlers, one module per subcommand group

pub mod config;
pub mod entry;
pub mod place;
pub mod status;
pub mod theme;
