//! Validates absolute paths used for the file sink's target directory.

use thiserror::Error;

const MAX_PATH_LEN: usize = 1024;
const MAX_SEGMENT_LEN: usize = 255;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    #[error("path must not be empty")]
    EmptyPath,
    #[error("path exceeds {MAX_PATH_LEN} characters")]
    PathTooLong,
    #[error("path must start with '/'")]
    InvalidFormat,
    #[error("a path segment exceeds {MAX_SEGMENT_LEN} characters")]
    SegmentTooLong,
}

/// A path passes iff it is non-empty, at most 1024 characters, starts with
/// `/`, and no `/`-separated segment exceeds 255 characters.
pub fn validate_path(path: &str) -> Result<(), PathError> {
    if path.is_empty() {
        return Err(PathError::EmptyPath);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(PathError::PathTooLong);
    }
    if !path.starts_with('/') {
        return Err(PathError::InvalidFormat);
    }
    for segment in path.split('/') {
        if segment.len() > MAX_SEGMENT_LEN {
            return Err(PathError::SegmentTooLong);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        assert_eq!(validate_path(""), Err(PathError::EmptyPath));
    }

    #[test]
    fn relative_path_is_rejected() {
        assert_eq!(validate_path("foo"), Err(PathError::InvalidFormat));
    }

    #[test]
    fn oversized_segment_is_rejected() {
        let path = format!("/{}", "a".repeat(256));
        assert_eq!(validate_path(&path), Err(PathError::SegmentTooLong));
    }

    #[test]
    fn oversized_path_is_rejected() {
        let path = format!("/{}", "a".repeat(1025));
        assert_eq!(validate_path(&path), Err(PathError::PathTooLong));
    }

    #[test]
    fn well_formed_path_is_accepted() {
        assert_eq!(validate_path("/ok/path.txt"), Ok(()));
    }
}
