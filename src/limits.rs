//! Configurable limits for metadata header parsing.

/// Configurable limits for metadata header parsing.
///
/// The header scanner relies on the underlying stream's buffer to hold a
/// partial line while it waits for the newline, so an unterminated line
/// would otherwise grow that buffer without bound.
///
/// # Example
///
/// ```
/// use metawrap::HeaderLimits;
///
/// let limits = HeaderLimits {
///     max_lines: 16,
///     ..Default::default()
/// };
/// assert_eq!(limits.max_line_len, HeaderLimits::default().max_line_len);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLimits {
    /// Maximum length of a single header line in bytes, excluding the newline.
    ///
    /// Longer lines cause a [`StreamError::LineTooLong`] error.
    ///
    /// Default: 64 KiB.
    ///
    /// [`StreamError::LineTooLong`]: crate::StreamError::LineTooLong
    pub max_line_len: usize,

    /// Maximum number of key/value lines before the terminating blank line.
    ///
    /// More lines cause a [`StreamError::TooManyHeaderLines`] error.
    ///
    /// Default: 1024 lines.
    ///
    /// [`StreamError::TooManyHeaderLines`]: crate::StreamError::TooManyHeaderLines
    pub max_lines: usize,
}

impl Default for HeaderLimits {
    fn default() -> Self {
        Self {
            max_line_len: 64 * 1024, // 64 KiB
            max_lines: 1024,
        }
    }
}

impl HeaderLimits {
    /// Create a new `HeaderLimits` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits that effectively disable all checks.
    ///
    /// Only use this for input from trusted sources.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_line_len: usize::MAX,
            max_lines: usize::MAX,
        }
    }

    /// Conservative limits for untrusted input.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            max_line_len: 4096,
            max_lines: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = HeaderLimits::default();
        assert_eq!(limits.max_line_len, 64 * 1024);
        assert_eq!(limits.max_lines, 1024);
        assert_eq!(limits, HeaderLimits::new());
    }

    #[test]
    fn test_presets() {
        assert_eq!(HeaderLimits::permissive().max_lines, usize::MAX);
        assert!(HeaderLimits::strict().max_line_len < HeaderLimits::default().max_line_len);
        assert!(HeaderLimits::strict().max_lines < HeaderLimits::default().max_lines);
    }
}
