/// Reason a node name was rejected.
#[derive(Debug)]
pub enum NameError {
    /// Name is empty or whitespace-only.
    Empty,
    /// Name contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Name is `.` or `..`.
    Reserved,
    /// Name contains null bytes.
    NullByte,
    /// Name contains control characters (CR, LF, etc.).
    ControlCharacter,
    /// Name exceeds 255 characters.
    TooLong,
}

impl NameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Name cannot be empty",
            Self::ContainsPathSeparator => "Invalid name: path separators are not allowed",
            Self::Reserved => "Invalid name: '.' and '..' are not allowed",
            Self::NullByte => "Invalid name: null bytes are not allowed",
            Self::ControlCharacter => "Invalid name: control characters are not allowed",
            Self::TooLong => "Name exceeds maximum length of 255 characters",
        }
    }
}

/// Validates a file or folder name.
///
/// The tree is the namespace, so names are flat: no directory
/// components and no traversal tokens. Dotfiles are allowed (this is a
/// user drive, `.env` is a legitimate file), only the reserved `.`/`..`
/// entries are rejected.
pub fn validate_node_name(name: &str) -> Result<&str, NameError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }

    if trimmed.chars().count() > 255 {
        return Err(NameError::TooLong);
    }

    if trimmed.contains('\0') {
        return Err(NameError::NullByte);
    }

    // Reject ASCII control characters to prevent header injection when
    // the name is echoed into Content-Disposition.
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(NameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(NameError::ContainsPathSeparator);
    }

    if trimmed == "." || trimmed == ".." {
        return Err(NameError::Reserved);
    }

    Ok(trimmed)
}
