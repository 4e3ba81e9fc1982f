//! CLI command implementations

pub mod error;
pub mod fetch;
pub mod sources;
pub mod validate;

pub use error::CliError;
pub use fetch::{Cli, Commands, FetchArgs, OutputFormat};
pub use sources::SourcesCommand;
pub use validate::ValidateCommand;
