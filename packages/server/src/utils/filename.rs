/// Result of validating a flat filename.
#[derive(Debug)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename contains path traversal patterns (`..`).
    PathTraversal,
    /// Filename contains null bytes.
    NullByte,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
    /// Filename is longer than 255 characters.
    TooLong,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::PathTraversal => "Invalid filename: '..' is not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::Hidden => "Invalid filename: hidden files (starting with '.') are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::TooLong => "Invalid filename: at most 255 characters",
        }
    }
}

/// Validates a display filename for a task file (no directory components).
///
/// The bytes themselves live under a generated path; this only guards the
/// name echoed back in listings and Content-Disposition headers.
pub fn validate_flat_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.chars().count() > 255 {
        return Err(FilenameError::TooLong);
    }

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // Reject ASCII control characters to prevent
    // HTTP header injection (e.g. CRLF in Content-Disposition).
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(validate_flat_filename("handout.pdf").is_ok());
        assert!(validate_flat_filename("challenge.tar.gz").is_ok());
        assert!(validate_flat_filename("  padded.txt  ").is_ok());
        assert!(validate_flat_filename("crypto-100_hint.txt").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            validate_flat_filename(""),
            Err(FilenameError::Empty)
        ));
        assert!(matches!(
            validate_flat_filename("   "),
            Err(FilenameError::Empty)
        ));
    }

    #[test]
    fn rejects_path_separators() {
        assert!(matches!(
            validate_flat_filename("dir/file.txt"),
            Err(FilenameError::ContainsPathSeparator)
        ));
        assert!(matches!(
            validate_flat_filename("dir\\file.txt"),
            Err(FilenameError::ContainsPathSeparator)
        ));
    }

    #[test]
    fn rejects_traversal_but_allows_inner_double_dots() {
        assert!(matches!(
            validate_flat_filename(".."),
            Err(FilenameError::PathTraversal)
        ));
        assert!(validate_flat_filename("archive..tar.gz").is_ok());
    }

    #[test]
    fn rejects_control_characters_and_null_bytes() {
        assert!(matches!(
            validate_flat_filename("file\r\nname.txt"),
            Err(FilenameError::ControlCharacter)
        ));
        assert!(matches!(
            validate_flat_filename("file\0name"),
            Err(FilenameError::NullByte)
        ));
    }

    #[test]
    fn rejects_hidden_files() {
        assert!(matches!(
            validate_flat_filename(".hidden"),
            Err(FilenameError::Hidden)
        ));
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(256);
        assert!(matches!(
            validate_flat_filename(&long),
            Err(FilenameError::TooLong)
        ));
    }
}
