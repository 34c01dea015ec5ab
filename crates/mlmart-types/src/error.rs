//! Error types for MLMart domain values

use thiserror::Error;

/// Result type for domain type conversions
pub type Result<T> = std::result::Result<T, TypesError>;

/// Domain type errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// A stored or submitted string does not name a known variant
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

impl TypesError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}
