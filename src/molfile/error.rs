use thiserror::Error;

#[derive(Debug, Error)]
pub enum MolFileError {
    #[error("I/O operation failed: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("failed to parse MOL block: {message} (at line {line})")]
    Parse { line: usize, message: String },
}

impl MolFileError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// 1-based line of a parse error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } => Some(*line),
            Self::Io { .. } => None,
        }
    }
}
