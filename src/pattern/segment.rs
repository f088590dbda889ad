//! Pattern Segments
//!
//! A name is a sequence of `.`-separated segments. Each segment is a
//! literal, an unexpanded wildcard (`{}` / `{label}`), or a wildcard that
//! a listing has bound to a concrete value.

use std::fmt;

use crate::error::PatternError;

/// Character separating the segments of a name.
pub const SEPARATOR: char = '.';

/// One dot-separated segment of a [`NamePattern`](super::NamePattern).
#[derive(Debug, Clone)]
pub enum Segment {
    /// Fixed text that must match a file segment exactly.
    Literal(String),
    /// Matches any single non-empty segment.
    Wildcard { label: Option<String> },
    /// A wildcard filled with a concrete value.
    Bound { label: Option<String>, value: String },
}

impl Segment {
    /// Concrete text of this segment, `None` for an unexpanded wildcard.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Literal(text) => Some(text),
            Self::Wildcard { .. } => None,
            Self::Bound { value, .. } => Some(value),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }

    /// True for segments that originate from a wildcard, bound or not.
    pub fn is_variable(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Wildcard { label } | Self::Bound { label, .. } => label.as_deref(),
        }
    }

    /// Returns the segment with any bound value dropped.
    pub fn to_template(&self) -> Segment {
        match self {
            Self::Bound { label, .. } => Self::Wildcard {
                label: label.clone(),
            },
            other => other.clone(),
        }
    }

    /// Tests one file-name segment against this pattern segment.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Wildcard { .. } => !candidate.is_empty(),
            Self::Literal(text) | Self::Bound { value: text, .. } => text == candidate,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::Wildcard { label: None } => f.write_str("{}"),
            Self::Wildcard { label: Some(label) } => write!(f, "{{{}}}", label),
            Self::Bound { value, .. } => f.write_str(value),
        }
    }
}

/// Parses a single segment.
///
/// `{}` and `{label}` are wildcards. Any other use of a brace is rejected:
/// a wildcard has to be a whole segment.
pub fn parse_segment(segment: &str, text: &str) -> Result<Segment, PatternError> {
    if segment.is_empty() {
        return Err(PatternError::malformed(text, "empty segment"));
    }
    if segment.contains('/') {
        return Err(PatternError::malformed(
            text,
            format!("segment '{}' contains a directory separator", segment),
        ));
    }

    if let Some(inner) = segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        if inner.chars().all(is_label_char) {
            let label = if inner.is_empty() {
                None
            } else {
                Some(inner.to_string())
            };
            return Ok(Segment::Wildcard { label });
        }
    }

    if segment.contains('{') || segment.contains('}') {
        return Err(PatternError::malformed(
            text,
            format!("wildcard must be a whole segment, found '{}'", segment),
        ));
    }

    Ok(Segment::Literal(segment.to_string()))
}

/// Parses a dot-separated stem into segments.
pub fn parse_segments(stem: &str, text: &str) -> Result<Vec<Segment>, PatternError> {
    stem.split(SEPARATOR)
        .map(|segment| parse_segment(segment, text))
        .collect()
}

/// Checks a concrete value destined for a single segment.
pub fn validate_value(value: &str) -> Result<(), PatternError> {
    if value.is_empty() {
        return Err(PatternError::malformed(value, "empty segment value"));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| *c == SEPARATOR || *c == '/' || *c == '{' || *c == '}')
    {
        return Err(PatternError::malformed(
            value,
            format!("segment value may not contain '{}'", bad),
        ));
    }
    Ok(())
}

fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal_and_wildcards() {
        assert!(matches!(parse_segment("bwa", "x").unwrap(), Segment::Literal(ref s) if s == "bwa"));
        assert!(matches!(
            parse_segment("{}", "x").unwrap(),
            Segment::Wildcard { label: None }
        ));

        let labelled = parse_segment("{sample}", "x").unwrap();
        assert!(labelled.is_wildcard());
        assert_eq!(labelled.label(), Some("sample"));
        assert_eq!(labelled.to_string(), "{sample}");
    }

    #[test]
    fn test_embedded_marker_is_malformed() {
        for bad in ["sample{}", "{}x", "{a b}", "a}", "{"] {
            let err = parse_segment(bad, bad).unwrap_err();
            assert!(matches!(err, PatternError::Malformed { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_empty_segment_is_malformed() {
        let err = parse_segments("a..b", "a..b").unwrap_err();
        assert!(matches!(err, PatternError::Malformed { .. }));
    }

    #[test]
    fn test_segment_matching() {
        let wildcard = Segment::Wildcard { label: None };
        assert!(wildcard.matches("00"));
        assert!(wildcard.matches("sample_1"));
        assert!(!wildcard.matches(""));

        let bound = Segment::Bound {
            label: None,
            value: "00".to_string(),
        };
        assert!(bound.matches("00"));
        assert!(!bound.matches("01"));
        assert_eq!(bound.to_string(), "00");
        assert_eq!(bound.to_template().to_string(), "{}");
    }

    #[test]
    fn test_validate_value() {
        assert!(validate_value("merge").is_ok());
        assert!(validate_value("").is_err());
        assert!(validate_value("a.b").is_err());
        assert!(validate_value("a{}").is_err());
        assert!(validate_value("dir/a").is_err());
    }
}
