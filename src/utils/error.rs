use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required tool: {tool} ({message})")]
    DependencyMissing { tool: String, message: String },

    #[error("Input error: {message}")]
    Input { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Base layer extraction failed: {message}")]
    Extraction { message: String },

    #[error("Dolby Vision metadata error: {message}")]
    Metadata { message: String },

    #[error("Audio processing failed: {message}")]
    Audio { message: String },

    #[error("MP4 mux failed: {message}")]
    Mux { message: String },

    #[error("hvc1 retag failed (previous output kept): {message}")]
    Retag { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{message}")]
    Tool { message: String },

    #[error("Interrupted")]
    Interrupted,
}

impl Error {
    pub fn dependency_missing<T: Into<String>, M: Into<String>>(tool: T, message: M) -> Self {
        Self::DependencyMissing {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn input<T: Into<String>>(message: T) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub fn storage<T: Into<String>>(message: T) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn extraction<T: Into<String>>(message: T) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }

    pub fn metadata<T: Into<String>>(message: T) -> Self {
        Self::Metadata {
            message: message.into(),
        }
    }

    pub fn audio<T: Into<String>>(message: T) -> Self {
        Self::Audio {
            message: message.into(),
        }
    }

    pub fn mux<T: Into<String>>(message: T) -> Self {
        Self::Mux {
            message: message.into(),
        }
    }

    pub fn retag<T: Into<String>>(message: T) -> Self {
        Self::Retag {
            message: message.into(),
        }
    }

    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn tool<T: Into<String>>(message: T) -> Self {
        Self::Tool {
            message: message.into(),
        }
    }

    /// Process exit code reported by the binary for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Input { .. } => 2,
            Self::DependencyMissing { .. } => 3,
            Self::Storage { .. } => 4,
            Self::Config(_) | Self::Validation { .. } => 5,
            Self::Interrupted => 130,
            _ => 1,
        }
    }
}
