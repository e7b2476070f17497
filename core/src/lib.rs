pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod har;
pub mod load;
pub mod sink;
pub mod translate;
