//! Node/region identifier parsing and validation
//!
//! MISO pricing nodes look like `MINN.HUB` or `AECI.ALTW`; load forecast
//! regions are plain names such as `North`. Identifiers are passed verbatim to
//! the API query string, so the accepted alphabet is kept narrow.

use std::fmt;

/// Maximum accepted identifier length
const MAX_IDENTIFIER_LEN: usize = 64;

/// Validated pricing node or load region code
///
/// Surrounding whitespace is trimmed; case is preserved because the upstream
/// API matches region names case-sensitively.
///
/// # Examples
///
/// ```
/// use miso_data_downloader::identifier::NodeIdentifier;
///
/// let id = NodeIdentifier::parse(" MINN.HUB ").unwrap();
/// assert_eq!(id.as_str(), "MINN.HUB");
/// assert_eq!(id.to_filesystem_safe(), "minn_hub");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentifier(String);

impl NodeIdentifier {
    /// Parse and validate an identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is empty, too long, or contains
    /// characters outside `[A-Za-z0-9._-]`.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        let value = s.trim();
        if value.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if value.len() > MAX_IDENTIFIER_LEN {
            return Err(IdentifierError::InvalidFormat(format!(
                "identifier is {} characters long, maximum is {MAX_IDENTIFIER_LEN}",
                value.len()
            )));
        }

        if let Some(bad) = value
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(IdentifierError::InvalidFormat(format!(
                "invalid character '{bad}' in identifier '{value}'"
            )));
        }

        Ok(Self(value.to_string()))
    }

    /// The identifier as sent to the API
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form with separators replaced, for output file names
    pub fn to_filesystem_safe(&self) -> String {
        self.0.to_lowercase().replace(['.', '-'], "_")
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for NodeIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Errors that can occur during identifier parsing
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// Identifier was empty or whitespace
    #[error("identifier cannot be empty")]
    Empty,

    /// Invalid identifier format
    #[error("identifier error: {0}")]
    InvalidFormat(String),
}
