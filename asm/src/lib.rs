pub mod error;
pub mod label;
pub mod parser;
pub mod token;
