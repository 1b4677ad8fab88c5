//! Command handlers, one module per subcommand.

pub mod completion;
pub mod config_cmd;
pub mod epic;
pub mod initiative;
pub mod mapping;
pub mod release;
pub mod rollup;
pub mod version;
