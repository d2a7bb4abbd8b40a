//! Error types for coordinate store operations

use crate::coords::Coords;
use crate::image::ImageFormat;
use thiserror::Error;

/// Main error type for store operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Image size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        expected: ImageFormat,
        actual: ImageFormat,
    },

    #[error("Storage does not contain image at {0}")]
    NotFound(Coords),

    #[error("Store has been closed")]
    ClosedStore,

    #[error("Datastore is frozen")]
    Frozen,

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Index overflow: {0}")]
    IndexOverflow(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Specialized Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let coords = Coords::builder().t(5).build();
        assert_eq!(
            StoreError::NotFound(coords).to_string(),
            "Storage does not contain image at time=5"
        );
        assert_eq!(StoreError::ClosedStore.to_string(), "Store has been closed");
        assert_eq!(
            StoreError::IndexOverflow("no index after 3 on axis z".into()).to_string(),
            "Index overflow: no index after 3 on axis z"
        );

        let err = StoreError::SizeMismatch {
            expected: ImageFormat::new(512, 512, 2, 1),
            actual: ImageFormat::new(256, 256, 2, 1),
        };
        assert_eq!(
            err.to_string(),
            "Image size mismatch: expected 512x512 (2 B/px, 1 component), got 256x256 (2 B/px, 1 component)"
        );
    }

    #[test]
    fn test_from_json_error() {
        let err: StoreError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
