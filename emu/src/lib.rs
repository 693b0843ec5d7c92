pub mod dump;
pub mod engine;
pub mod error;
pub mod mem;
