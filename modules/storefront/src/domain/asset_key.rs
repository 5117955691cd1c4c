//! Storage keys for uploaded files.
//!
//! A key is a single path segment drawn from `[A-Za-z0-9._-]`, so joining it to a
//! storage root can never escape that root.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetKeyError {
    #[error("key is empty")]
    Empty,
    #[error("key is {len} bytes long (max {max})", max = AssetKey::MAX_LEN)]
    TooLong { len: usize },
    #[error("key must not start with '.'")]
    LeadingDot,
    #[error("key contains forbidden character {ch:?}")]
    ForbiddenChar { ch: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub const MAX_LEN: usize = 255;

    /// Longest extension carried over from an uploaded file name.
    const MAX_EXT_LEN: usize = 16;

    pub fn parse(raw: &str) -> Result<Self, AssetKeyError> {
        if raw.is_empty() {
            return Err(AssetKeyError::Empty);
        }
        if raw.len() > Self::MAX_LEN {
            return Err(AssetKeyError::TooLong { len: raw.len() });
        }
        // also rules out "." and ".."
        if raw.starts_with('.') {
            return Err(AssetKeyError::LeadingDot);
        }
        if let Some(ch) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(AssetKeyError::ForbiddenChar { ch });
        }
        Ok(Self(raw.to_string()))
    }

    /// Fresh key `{field}-{uuid}{.ext}`; the extension is taken from `original_name`
    /// when it is short and alphanumeric, and dropped otherwise.
    pub fn generate(field: &str, original_name: &str) -> Self {
        let prefix: String = field
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let mut key = format!("{}-{}", prefix, Uuid::new_v4());
        if let Some(ext) = sanitized_extension(original_name) {
            key.push('.');
            key.push_str(&ext);
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn extension(&self) -> Option<&str> {
        self.0
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitized_extension(original_name: &str) -> Option<String> {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or(original_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > AssetKey::MAX_EXT_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
