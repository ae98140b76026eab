use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("{field} value {value} is out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: u32,
        max: u32,
    },
    #[error("unknown extraction mode `{0}`")]
    UnknownMode(String),
    #[error("unknown parameter field `{0}`")]
    UnknownField(String),
    #[error("invalid value `{value}` for {field}")]
    InvalidValue { field: &'static str, value: String },
}
