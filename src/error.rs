use thiserror::Error;

#[derive(Error, Debug)]
pub enum CantusError {
    #[error("Invalid line input: {0}")]
    Input(#[from] serde_yaml::Error),

    #[error("Invalid note at index {index}: {message}")]
    Note { index: usize, message: String },
}
