use thiserror::Error;

/// Front-end anomalies. None of these stop resolution or execution;
/// their `Display` text is what lands in the diagnostics log.
#[derive(Error, Debug)]
pub enum AsmError {
    #[error("Unsupported op: `{0}`")]
    UnknownOp(String),

    #[error("Invalid register: `{0}`")]
    BadRegister(String),

    #[error("Unknown value: `{0}`")]
    UnknownValue(String),

    #[error("Too few arguments for '{0}'")]
    TooFewArgs(&'static str),

    #[error("Extra arguments for '{0}': {1}")]
    ExtraArgs(&'static str, String),

    #[error("Incorrect argument type for '{0}'")]
    BadArgType(&'static str),

    #[error("Found multiple instances of label: `{0}`")]
    DuplicateLabel(String),

    #[error("Label name cannot start with a number: `{0}`")]
    DigitLabel(String),

    #[error("Could not find label: `{0}`")]
    MissingLabel(String),
}
