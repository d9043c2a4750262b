use thiserror::Error;

pub type SurveyResult<T> = Result<T, SurveyError>;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Question not found: {0}")]
    QuestionNotFound(String),

    #[error("Invalid survey: {0}")]
    InvalidSurvey(String),

    #[error("Survey is already finished")]
    AlreadyFinished,

    #[error("Response collection failed: {0}")]
    Response(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for SurveyError {
    fn from(err: config::ConfigError) -> Self {
        SurveyError::Config(err.to_string())
    }
}
