pub mod diag;
pub mod imm;
pub mod op;
pub mod reg;
