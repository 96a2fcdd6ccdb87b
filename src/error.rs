//! Crate-wide error type.
//!
//! Most failure modes inside the engine (§7 of the design) are non-fatal and
//! are reported through `tracing::warn!` at their point of occurrence instead
//! of surfacing here — a mismatched close tag, a font-name lookup miss, an
//! over-long word, or a full atlas page all degrade gracefully rather than
//! aborting the call. `AtresError` exists for the handful of operations that
//! are genuinely fallible from the caller's point of view: registering a font
//! under a name that's already taken, and reading a font definition file from
//! disk.

/// Errors returned from fallible, caller-visible operations.
#[derive(Debug, Clone)]
pub enum AtresError {
    /// `FontRegistry::register` was called with a name that is already
    /// registered. The existing font is left untouched.
    Duplicate(String),

    /// Reading or parsing a font/bitmap definition file failed.
    Io(String),

    /// A definition file was syntactically malformed beyond what the parser
    /// tolerates (e.g. a glyph row with too few fields).
    MalformedDefinition(String),
}

impl std::fmt::Display for AtresError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtresError::Duplicate(name) => {
                write!(f, "font '{}' is already registered", name)
            }
            AtresError::Io(msg) => write!(f, "I/O error: {}", msg),
            AtresError::MalformedDefinition(msg) => {
                write!(f, "malformed font definition: {}", msg)
            }
        }
    }
}

impl std::error::Error for AtresError {}

impl From<std::io::Error> for AtresError {
    fn from(err: std::io::Error) -> Self {
        AtresError::Io(err.to_string())
    }
}

/// Result type for fallible Atres operations.
pub type AtresResult<T> = Result<T, AtresError>;
