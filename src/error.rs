use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubweaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("The format of the time is incorrect: {0}")]
    InvalidTime(String),

    #[error("The format of the duration is incorrect: {0}")]
    InvalidDuration(String),

    #[error("Subtitle format error: {0}")]
    Format(String),

    #[error("Cue index {index} out of range (timeline has {len} cues)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cue not found: {0}")]
    CueNotFound(String),

    #[error("No earlier history")]
    HistoryEmpty,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Seek scheduling error: {0}")]
    Scheduler(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl SubweaveError {
    /// True for errors raised while reading time codes or subtitle text
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTime(_) | Self::InvalidDuration(_) | Self::Format(_)
        )
    }

    /// True for caller mistakes such as a stale index or a deleted cue
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. } | Self::CueNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SubweaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_input() {
        let err = SubweaveError::InvalidTime("incorrect".to_string());
        assert_eq!(err.to_string(), "The format of the time is incorrect: incorrect");

        let err = SubweaveError::InvalidDuration("incorrect".to_string());
        assert_eq!(err.to_string(), "The format of the duration is incorrect: incorrect");
    }

    #[test]
    fn test_error_classification() {
        assert!(SubweaveError::Format("x".into()).is_format_error());
        assert!(SubweaveError::IndexOutOfRange { index: 3, len: 1 }.is_precondition_violation());
        assert!(!SubweaveError::HistoryEmpty.is_format_error());
        assert!(!SubweaveError::HistoryEmpty.is_precondition_violation());
    }
}
