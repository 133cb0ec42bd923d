use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown field source: {0}")]
    UnknownFieldSource(String),
    #[error("unknown field data type: {0}")]
    UnknownDataType(String),
    #[error("layout definition json: {0}")]
    LayoutJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
