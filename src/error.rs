use std::fmt;
use thiserror::Error;

/// A single violated field constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

/// Collects every violated field of a request before failing.
///
/// Validation reports all problems at once rather than stopping at the
/// first bad field, so callers can surface a complete error list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(Violation {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }

    /// Returns `Err(BiblioError::Validation)` if anything was collected.
    pub fn into_result(self) -> Result<(), BiblioError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BiblioError::Validation(self))
        }
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BiblioError {
    #[error("validation failed: {0}")]
    Validation(Violations),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    AuthenticationRequired,

    #[error("not permitted: {0}")]
    Forbidden(String),

    #[error("duplicate {0}")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Other(String),
}

impl BiblioError {
    /// Maps a storage-level unique-constraint failure to [`BiblioError::Duplicate`].
    ///
    /// Both uniqueness invariants (one shelf entry and one review per
    /// user/book pair, plus the unique user email) are enforced by the
    /// store itself; a constraint violation raced in by a concurrent
    /// request must read as a duplicate, not as an infrastructure fault.
    pub(crate) fn duplicate_or_db(err: sqlx::Error, what: &'static str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => BiblioError::Duplicate(what),
            _ => BiblioError::Db(err),
        }
    }
}

pub type BiblioResult<T> = Result<T, BiblioError>;
