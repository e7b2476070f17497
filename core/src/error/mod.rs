#[allow(clippy::module_inception)]
pub mod error;
pub mod har;

pub use error::{CliError, LoadError, SendError};
pub use har::{HarError, TranslateError};
