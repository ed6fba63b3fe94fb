use crate::traits::{StorageError, StorageResult};

/// Reject keys that could address anything other than a single flat object
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.contains("..") || key.contains('/') || key.contains('\\') || key.starts_with('.') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("Ab3kQ9xz.webp").is_ok());
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("../etc/passwd"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("a/b.png"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key(".hidden"), Err(StorageError::InvalidKey(_))));
    }
}
