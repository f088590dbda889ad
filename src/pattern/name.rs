//! Name Pattern Value Type
//!
//! [`NamePattern`] is an immutable, dot-separated name that may contain
//! wildcard segments. It never carries a file extension: extensions are
//! stripped from candidate files when a pattern is listed (see
//! [`NamePattern::list`]).
//!
//! # Example
//!
//! ```
//! use namepipe::NamePattern;
//!
//! let reads = NamePattern::parse("data/sample.{}.read").unwrap();
//! let merged = reads.replace_wildcard("merge").unwrap();
//! assert_eq!(merged.to_string(), "data/sample.merge.read");
//!
//! let sorted = reads.concat(".sort").unwrap();
//! assert_eq!(sorted.to_string(), "data/sample.{}.read.sort");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::PatternError;

use super::listing::Fix;
use super::segment::{parse_segments, validate_value, Segment, SEPARATOR};

/// A dotted, wildcard-bearing file name without extension.
///
/// Operations never mutate a pattern; they return new instances.
#[derive(Debug, Clone)]
pub struct NamePattern {
    /// Directory prefix as written (`None` means the working directory).
    dir: Option<String>,
    segments: Vec<Segment>,
}

impl NamePattern {
    /// Parses pattern text such as `sample.{}.bwa` or `data/sample.{id}`.
    ///
    /// Text ending in `/`, or exactly `.` or `..`, is a directory pattern
    /// with no name segments.
    pub fn parse(text: &str) -> Result<Self, PatternError> {
        if text.is_empty() {
            return Err(PatternError::malformed(text, "empty name"));
        }

        if text == "." || text == ".." {
            return Ok(Self {
                dir: Some(text.to_string()),
                segments: Vec::new(),
            });
        }

        let (dir, stem) = match text.rsplit_once('/') {
            Some((dir, stem)) => (Some(dir), stem),
            None => (None, text),
        };

        if let Some(dir) = dir {
            if dir.contains('{') || dir.contains('}') {
                return Err(PatternError::malformed(
                    text,
                    "wildcards are not allowed in the directory part",
                ));
            }
            if stem.is_empty() {
                return Ok(Self {
                    dir: Some(text.to_string()),
                    segments: Vec::new(),
                });
            }
        }

        Ok(Self {
            dir: dir.and_then(normalize_dir),
            segments: parse_segments(stem, text)?,
        })
    }

    pub(crate) fn from_parts(dir: Option<String>, segments: Vec<Segment>) -> Self {
        Self { dir, segments }
    }

    /// Directory prefix, if the pattern has one.
    pub fn dir(&self) -> Option<&str> {
        self.dir.as_deref()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of name segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True for a pattern naming a directory rather than files in it.
    pub fn is_directory(&self) -> bool {
        self.segments.is_empty()
    }

    /// Directory that listings of this pattern scan.
    pub fn scan_dir(&self) -> &str {
        match self.dir.as_deref() {
            None => ".",
            Some("") => "/",
            Some(dir) => dir,
        }
    }

    /// Name part without the directory prefix.
    pub fn stem(&self) -> String {
        render_segments(&self.segments, |segment| segment.to_string())
    }

    /// Number of unexpanded wildcards.
    pub fn wildcard_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_wildcard()).count()
    }

    /// Number of wildcard positions, expanded or not.
    ///
    /// These are the positions that [`Fix`] indices address.
    pub fn variable_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_variable()).count()
    }

    /// True when no segment is an unexpanded wildcard.
    pub fn is_concrete(&self) -> bool {
        self.wildcard_count() == 0
    }

    /// Values of the wildcard positions, `None` where still unexpanded.
    pub fn values(&self) -> Vec<Option<&str>> {
        self.segments
            .iter()
            .filter(|s| s.is_variable())
            .map(Segment::value)
            .collect()
    }

    /// The pattern with every bound wildcard turned back into `{}`.
    pub fn template(&self) -> NamePattern {
        Self {
            dir: self.dir.clone(),
            segments: self.segments.iter().map(Segment::to_template).collect(),
        }
    }

    /// Appends segments. A single leading `.` in `suffix` is optional.
    ///
    /// ```
    /// use namepipe::NamePattern;
    ///
    /// let p = NamePattern::parse("a.{}.c").unwrap();
    /// assert_eq!(p.concat(".d").unwrap().to_string(), "a.{}.c.d");
    /// assert_eq!(p.concat("split.{}").unwrap().to_string(), "a.{}.c.split.{}");
    /// ```
    pub fn concat(&self, suffix: &str) -> Result<NamePattern, PatternError> {
        let trimmed = suffix.strip_prefix(SEPARATOR).unwrap_or(suffix);
        if trimmed.is_empty() {
            return Err(PatternError::malformed(suffix, "empty suffix"));
        }

        let mut segments = self.segments.clone();
        segments.extend(parse_segments(trimmed, suffix)?);
        Ok(Self {
            dir: self.dir.clone(),
            segments,
        })
    }

    /// Appends the segments of `other`. Its directory prefix is ignored.
    pub fn join(&self, other: &NamePattern) -> NamePattern {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self {
            dir: self.dir.clone(),
            segments,
        }
    }

    /// Replaces the last unexpanded wildcard with literal segment(s).
    ///
    /// This collapses a fan-out name to the single name of a merge step.
    pub fn replace_wildcard(&self, literal: &str) -> Result<NamePattern, PatternError> {
        let index = self.last_wildcard()?;
        let replacement = parse_literal(literal)?;

        let mut segments = self.segments.clone();
        segments.splice(index..=index, replacement);
        Ok(Self {
            dir: self.dir.clone(),
            segments,
        })
    }

    /// Removes the last unexpanded wildcard and glues `text` onto the
    /// segment before it: `a.t1M.{}` with `_merge` becomes `a.t1M_merge`.
    ///
    /// When `text` starts with `.` this is the same as
    /// [`replace_wildcard`](Self::replace_wildcard).
    pub fn collapse_wildcard(&self, text: &str) -> Result<NamePattern, PatternError> {
        if let Some(rest) = text.strip_prefix(SEPARATOR) {
            return self.replace_wildcard(rest);
        }

        let index = self.last_wildcard()?;
        let (head, tail) = match text.split_once(SEPARATOR) {
            Some((head, tail)) => (head, Some(tail)),
            None => (text, None),
        };
        let tail = match tail {
            Some(tail) => parse_literal(tail)?,
            None => Vec::new(),
        };

        let mut segments = self.segments.clone();
        if index == 0 {
            segments.splice(0..=0, parse_literal(head)?.into_iter().chain(tail));
        } else {
            let glued = match &segments[index - 1] {
                Segment::Literal(prev) => format!("{}{}", prev, head),
                _ => {
                    return Err(PatternError::malformed(
                        self.to_string(),
                        "cannot glue text onto a wildcard segment, use replace_wildcard",
                    ))
                }
            };
            validate_value(&glued)?;
            segments[index - 1] = Segment::Literal(glued);
            segments.splice(index..=index, tail);
        }

        Ok(Self {
            dir: self.dir.clone(),
            segments,
        })
    }

    /// Fills wildcard position(s) selected by `fix` with `value`.
    pub fn bind(&self, fix: impl Into<Fix>, value: &str) -> Result<NamePattern, PatternError> {
        validate_value(value)?;
        let positions = self.resolve_fix(&fix.into())?;

        let mut segments = self.segments.clone();
        for index in positions {
            segments[index] = Segment::Bound {
                label: segments[index].label().map(str::to_string),
                value: value.to_string(),
            };
        }
        Ok(Self {
            dir: self.dir.clone(),
            segments,
        })
    }

    /// Turns wildcard position(s) selected by `fix` back into `{}`.
    pub fn unbind(&self, fix: impl Into<Fix>) -> Result<NamePattern, PatternError> {
        let positions = self.resolve_fix(&fix.into())?;

        let mut segments = self.segments.clone();
        for index in positions {
            segments[index] = segments[index].to_template();
        }
        Ok(Self {
            dir: self.dir.clone(),
            segments,
        })
    }

    /// Maps a fix specification to indices into `segments`.
    pub(crate) fn resolve_fix(&self, fix: &Fix) -> Result<Vec<usize>, PatternError> {
        let variables: Vec<usize> = self
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_variable())
            .map(|(i, _)| i)
            .collect();

        match fix {
            Fix::Index(index) => {
                let count = variables.len() as isize;
                let position = if *index < 0 { count + index } else { *index };
                if position < 0 || position >= count {
                    return Err(PatternError::FixOutOfRange {
                        index: *index,
                        wildcards: variables.len(),
                    });
                }
                Ok(vec![variables[position as usize]])
            }
            Fix::Label(label) => {
                let positions: Vec<usize> = variables
                    .into_iter()
                    .filter(|i| self.segments[*i].label() == Some(label.as_str()))
                    .collect();
                if positions.is_empty() {
                    return Err(PatternError::UnknownLabel {
                        label: label.clone(),
                        pattern: self.to_string(),
                    });
                }
                Ok(positions)
            }
        }
    }

    fn last_wildcard(&self) -> Result<usize, PatternError> {
        self.segments
            .iter()
            .rposition(Segment::is_wildcard)
            .ok_or_else(|| PatternError::NoWildcard {
                pattern: self.to_string(),
            })
    }

    /// Comparison key: rendered values, wildcard labels ignored.
    fn key(&self) -> (Option<String>, Vec<Option<&str>>) {
        (
            self.dir.as_deref().and_then(normalize_dir),
            self.segments.iter().map(Segment::value).collect(),
        )
    }
}

/// Canonical form of a directory prefix: `.` components and repeated or
/// trailing `/` dropped. `None` means the current directory and `""` the
/// filesystem root.
fn normalize_dir(dir: &str) -> Option<String> {
    let rooted = dir.is_empty() || dir.starts_with('/');
    let parts: Vec<&str> = dir
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    match (rooted, parts.is_empty()) {
        (true, true) => Some(String::new()),
        (true, false) => Some(format!("/{}", parts.join("/"))),
        (false, true) => None,
        (false, false) => Some(parts.join("/")),
    }
}

/// Parses text that must consist of literal segments only.
fn parse_literal(text: &str) -> Result<Vec<Segment>, PatternError> {
    let segments = parse_segments(text, text)?;
    if segments.iter().any(Segment::is_variable) {
        return Err(PatternError::malformed(text, "expected literal text, found a wildcard"));
    }
    Ok(segments)
}

fn render_segments(segments: &[Segment], render: impl Fn(&Segment) -> String) -> String {
    segments
        .iter()
        .map(render)
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string())
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stem = self.stem();
        match self.dir.as_deref() {
            None => f.write_str(&stem),
            Some(dir) if stem.is_empty() => f.write_str(dir),
            Some(dir) if dir.ends_with('/') => write!(f, "{}{}", dir, stem),
            Some(dir) => write!(f, "{}/{}", dir, stem),
        }
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for NamePattern {}

impl Hash for NamePattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl FromStr for NamePattern {
    type Err = PatternError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl TryFrom<&str> for NamePattern {
    type Error = PatternError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Self::parse(text)
    }
}

impl TryFrom<String> for NamePattern {
    type Error = PatternError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl Serialize for NamePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(de::Error::custom)
    }
}
