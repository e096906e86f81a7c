use thiserror::Error;

pub type RtResult<T> = Result<T, RtError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RtError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Not a numeric literal: {text:?}")]
    NotALiteral { text: String },
}
