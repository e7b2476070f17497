//! harload-cli library, exposing the command handlers for tests.

pub mod commands;
pub mod logging;
