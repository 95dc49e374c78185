//! Opaque media source references.

use std::fmt;
use std::path::PathBuf;

use crate::error::LoadError;

/// Resolvable identifier of the media to load (a path or a URI string).
///
/// The controller never looks inside; engines decide what they can open.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URI scheme, lowercased, or `None` for bare paths.
    ///
    /// Single-letter schemes are treated as Windows drive letters.
    pub fn scheme(&self) -> Option<String> {
        let (scheme, _) = self.0.trim().split_once("://")?;
        let valid = scheme.len() > 1
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        valid.then(|| scheme.to_ascii_lowercase())
    }

    /// Resolve to a local filesystem path (`file://` URIs and bare paths).
    pub fn to_local_path(&self) -> Result<PathBuf, LoadError> {
        let raw = self.0.trim();
        if raw.is_empty() {
            return Err(LoadError::InvalidSource(self.0.clone()));
        }
        match self.scheme().as_deref() {
            None => Ok(PathBuf::from(raw)),
            Some("file") => {
                let rest = &raw[raw.find("://").map(|i| i + 3).unwrap_or(0)..];
                // file://localhost/path and file:///path both name /path.
                let path = rest.strip_prefix("localhost").unwrap_or(rest);
                if path.is_empty() {
                    return Err(LoadError::InvalidSource(self.0.clone()));
                }
                Ok(PathBuf::from(path))
            }
            Some(other) => Err(LoadError::UnsupportedScheme {
                scheme: other.to_string(),
                source_ref: self.0.clone(),
            }),
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SourceRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<PathBuf> for SourceRef {
    fn from(value: PathBuf) -> Self {
        Self(value.to_string_lossy().into_owned())
    }
}

impl From<&std::path::Path> for SourceRef {
    fn from(value: &std::path::Path) -> Self {
        Self(value.to_string_lossy().into_owned())
    }
}
