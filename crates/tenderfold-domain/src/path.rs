//! Dotted field paths into an extracted record

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A dotted path such as `projectOverview.bidValue`
///
/// Paths are how configuration names special fields (the product list, the
/// monetary fields checked for consistency) and how provenance records name
/// the section a fact came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The empty path, addressing the record root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path
    ///
    /// # Examples
    ///
    /// ```
    /// use tenderfold_domain::FieldPath;
    ///
    /// let path = FieldPath::parse("projectOverview.bidValue").unwrap();
    /// assert_eq!(path.segments(), ["projectOverview", "bidValue"]);
    /// assert!(FieldPath::parse("a..b").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in trimmed.split('.') {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(format!("Invalid field path '{}': empty segment", s));
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Path segments from the root down
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True for the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Extend this path by one key
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Self { segments }
    }

    /// Last segment, if any
    pub fn leaf(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path without its last segment
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = FieldPath::parse("productMapping.miiProductStatus").unwrap();
        assert_eq!(path.to_string(), "productMapping.miiProductStatus");
        assert_eq!(path.leaf(), Some("miiProductStatus"));
    }

    #[test]
    fn test_empty_is_root() {
        assert!(FieldPath::parse("").unwrap().is_root());
        assert_eq!(FieldPath::root().to_string(), "");
    }

    #[test]
    fn test_child_and_parent() {
        let path = FieldPath::root().child("finance").child("emd");
        assert_eq!(path.to_string(), "finance.emd");
        assert_eq!(path.parent().unwrap().to_string(), "finance");
        assert!(FieldPath::root().parent().is_none());
    }

    #[test]
    fn test_rejects_empty_segment() {
        assert!(FieldPath::parse(".a").is_err());
        assert!(FieldPath::parse("a.").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let path: FieldPath = serde_json::from_str(r#""legal.requiredDocuments""#).unwrap();
        assert_eq!(path.segments().len(), 2);
        assert_eq!(serde_json::to_string(&path).unwrap(), r#""legal.requiredDocuments""#);
    }
}
