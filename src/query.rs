use std::fmt;

use index::Match;
use thiserror::Error;

/// Rejections produced before any upstream call is made.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Body absent, malformed, not an object, or `text` missing / not a string.
    #[error("Invalid input")]
    InvalidInput,
    #[error("Text must be a non-empty string")]
    EmptyText,
}

/// Query text that has passed validation: trimmed and non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct QueryText(String);

impl QueryText {
    /// Trims surrounding whitespace. No other normalization is applied.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Accepts the optional field of a decoded request body.
    pub fn from_field(field: Option<&str>) -> Result<Self, ValidationError> {
        field
            .ok_or(ValidationError::InvalidInput)
            .and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for QueryText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Query text is user content; keep it out of debug logs.
impl fmt::Debug for QueryText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryText({} bytes)", self.0.len())
    }
}

/// Outcome of a successful retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSet {
    /// Identifiers in index order, best first.
    Matches(Vec<String>),
    /// The index answered with nothing. Not an error.
    Empty,
}

impl ResultSet {
    pub fn from_matches(matches: Vec<Match>) -> Self {
        if matches.is_empty() {
            ResultSet::Empty
        } else {
            ResultSet::Matches(matches.into_iter().map(|m| m.id).collect())
        }
    }

    pub fn ids(&self) -> &[String] {
        match self {
            ResultSet::Matches(ids) => ids,
            ResultSet::Empty => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResultSet::Empty)
    }

    /// Identifiers joined with `", "`.
    pub fn joined(&self) -> String {
        self.ids().join(", ")
    }
}
