use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("toolchain file is missing a required key: {0}")]
    MissingKey(&'static str),

    #[error("duplicate key '{0}' in toolchain file")]
    DuplicateKey(String),

    #[error("unknown toolchain file key: '{0}'")]
    UnknownKey(String),

    #[error("malformed toolchain file line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
