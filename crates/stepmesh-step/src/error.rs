//! Errors raised while reading Part 21 text and converting its entities.

use thiserror::Error;

/// Errors that can occur while reading a STEP file.
///
/// `Lexer`, `Parser` and `DuplicateEntity` are fatal: the entity graph is not
/// usable after any of them. The remaining variants are raised while
/// resolving individual entities and are recoverable per face.
#[derive(Error, Debug)]
pub enum StepError {
    /// The file could not be read.
    #[error("cannot read STEP input: {0}")]
    Io(#[from] std::io::Error),

    /// Bytes that do not form a Part 21 token.
    #[error("{line}:{col}: bad token: {message}")]
    Lexer {
        /// 1-based line.
        line: usize,
        /// 1-based column.
        col: usize,
        /// What was wrong.
        message: String,
    },

    /// Tokens that do not form a record, or a section out of place.
    #[error(
        "{line}:{col}: malformed record{}: {message}",
        entity_id.map(|id| format!(" #{id}")).unwrap_or_default()
    )]
    Parser {
        /// Instance being parsed, when the error is inside a record.
        entity_id: Option<u64>,
        /// 1-based line, 0 at end of input.
        line: usize,
        /// 1-based column.
        col: usize,
        /// What was wrong.
        message: String,
    },

    /// An instance id defined twice.
    #[error("#{0} is defined more than once")]
    DuplicateEntity(u64),

    /// A reference to an instance id that the file never defines.
    #[error("dangling reference to #{0}")]
    MissingEntity(u64),

    /// A curve or surface type without a converter.
    #[error("{0} is not supported")]
    UnsupportedEntity(String),

    /// Arguments that parse but do not describe valid geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A reference pointing at an instance of the wrong type.
    #[error("expected {expected}, found {actual}")]
    TypeMismatch {
        /// Accepted type name(s).
        expected: String,
        /// Type found in the file.
        actual: String,
    },
}

impl StepError {
    /// Lexer failure at a position.
    pub fn lexer(line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Lexer {
            line,
            col,
            message: message.into(),
        }
    }

    /// Parser failure at a position, optionally inside a record.
    pub fn parser(entity_id: Option<u64>, line: usize, col: usize, message: impl Into<String>) -> Self {
        Self::Parser {
            entity_id,
            line,
            col,
            message: message.into(),
        }
    }

    /// A record whose arguments have the wrong shape.
    pub fn argument(entity_id: u64, message: impl Into<String>) -> Self {
        Self::InvalidGeometry(format!("#{entity_id}: {}", message.into()))
    }

    /// A reference to the wrong entity type.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether this error aborts the whole import.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Lexer { .. } | Self::Parser { .. } | Self::DuplicateEntity(_)
        )
    }
}

impl From<stepmesh_nurbs::NurbsError> for StepError {
    fn from(e: stepmesh_nurbs::NurbsError) -> Self {
        Self::InvalidGeometry(e.to_string())
    }
}

/// Result alias for STEP operations.
pub type Result<T> = std::result::Result<T, StepError>;
