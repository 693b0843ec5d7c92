use thiserror::Error;

/// Runtime anomalies. All of them are logged and execution continues
/// with a best-effort fallback; none abort a run.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Address Error: loading from non-aligned word: {0}")]
    MisalignedLoad(i32),

    #[error("Address Error: storing to non-aligned word: {0}")]
    MisalignedStore(i32),

    #[error("Invalid memory location: {0}")]
    InvalidAddress(u32),

    #[error("Invalid memory location: {0} to {1}")]
    InvalidRange(u32, u32),

    #[error("Misaligned branch offset (must be a multiple of 4): {0}")]
    MisalignedBranchOffset(i32),

    #[error("Bad branch target (must be a multiple of 4 and in program range): {0}")]
    BadBranchTarget(i64),

    #[error("Misaligned jump target (must be a multiple of 4 and in program range): {0}")]
    BadJumpTarget(i64),

    #[error("Immediate exceeds {1}-bit field, truncated: {0}")]
    ImmTruncated(i32, u32),
}
