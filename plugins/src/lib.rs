pub mod factory;
pub mod sink;
