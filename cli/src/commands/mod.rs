pub mod cli;
pub mod load;
pub mod validate;
