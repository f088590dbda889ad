//! Pattern Listing
//!
//! Expands a [`NamePattern`] against the live contents of its directory.
//!
//! Algorithm:
//! 1. Read the basenames in the pattern's directory (never cached)
//! 2. Split each basename on `.`; names with fewer segments than the
//!    pattern cannot match, extra trailing segments are the extension
//! 3. Compare position by position: literals must be equal, wildcards
//!    take any non-empty segment
//! 4. Bind every wildcard that is not fixed, keep fixed ones as `{}`
//! 5. De-duplicate and sort by rendered name

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use log::debug;

use crate::error::PatternError;

use super::name::NamePattern;
use super::segment::{Segment, SEPARATOR};

/// Selects wildcard positions to keep unexpanded during a listing.
///
/// Indices count the wildcard positions of a pattern (bound or not), not
/// its segments. Negative indices count from the end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fix {
    Index(isize),
    Label(String),
}

impl From<isize> for Fix {
    fn from(index: isize) -> Self {
        Self::Index(index)
    }
}

impl From<i32> for Fix {
    fn from(index: i32) -> Self {
        Self::Index(index as isize)
    }
}

impl From<&str> for Fix {
    fn from(label: &str) -> Self {
        Self::Label(label.to_string())
    }
}

impl From<String> for Fix {
    fn from(label: String) -> Self {
        Self::Label(label)
    }
}

impl std::fmt::Display for Fix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{}", index),
            Self::Label(label) => f.write_str(label),
        }
    }
}

impl NamePattern {
    /// Lists the names on disk that match this pattern.
    ///
    /// Wildcards selected by `fix` stay `{}` in the results, all others
    /// are bound to the values found. With every wildcard fixed, the
    /// pattern itself is returned as long as at least one file has its
    /// shape.
    ///
    /// # Errors
    ///
    /// * [`PatternError::NoMatch`] - no file matches
    /// * [`PatternError::FixOutOfRange`] / [`PatternError::UnknownLabel`] -
    ///   `fix` addresses a wildcard the pattern does not have
    /// * [`PatternError::Io`] - the directory exists but cannot be read
    ///
    /// # Example
    ///
    /// Given `sample.00.read.1.fq`, `sample.00.read.2.fq` and
    /// `sample.01.read.1.fq`, listing `sample.{}.read.{}` with
    /// `fix = [-1]` yields `sample.00.read.{}` and `sample.01.read.{}`.
    pub fn list(&self, fix: &[Fix]) -> Result<Vec<NamePattern>, PatternError> {
        let mut fixed = HashSet::new();
        for f in fix {
            fixed.extend(self.resolve_fix(f)?);
        }

        if self.is_directory() {
            return if Path::new(self.scan_dir()).is_dir() {
                Ok(vec![self.clone()])
            } else {
                Err(self.no_match())
            };
        }

        let names = read_names(self.scan_dir())?;

        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for name in &names {
            let Some(values) = self.match_name(name) else {
                continue;
            };
            let expanded = self.expand(&values, &fixed);
            debug!("'{}' matches '{}' as '{}'", name, self, expanded);
            if seen.insert(expanded.to_string()) {
                found.push(expanded);
            }
        }

        if found.is_empty() {
            debug!(
                "No match for '{}' among {} entries of '{}'",
                self,
                names.len(),
                self.scan_dir()
            );
            return Err(self.no_match());
        }

        found.sort_by_cached_key(|pattern| pattern.to_string());
        debug!("'{}' listed {} names", self, found.len());
        Ok(found)
    }

    /// Lists with every wildcard expanded.
    pub fn list_all(&self) -> Result<Vec<NamePattern>, PatternError> {
        self.list(&[])
    }

    /// Returns true if a file with this basename matches the pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        self.match_name(file_name).is_some()
    }

    /// Matches a basename, returning its stem segments on success.
    fn match_name<'a>(&self, file_name: &'a str) -> Option<Vec<&'a str>> {
        let segments = self.segments();
        if segments.is_empty() {
            return None;
        }

        let parts: Vec<&str> = file_name.split(SEPARATOR).collect();
        if parts.len() < segments.len() {
            return None;
        }

        let stem = &parts[..segments.len()];
        segments
            .iter()
            .zip(stem)
            .all(|(segment, part)| segment.matches(part))
            .then(|| stem.to_vec())
    }

    fn expand(&self, values: &[&str], fixed: &HashSet<usize>) -> NamePattern {
        let segments = self
            .segments()
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (segment, value))| {
                if fixed.contains(&i) {
                    segment.to_template()
                } else if segment.is_wildcard() {
                    Segment::Bound {
                        label: segment.label().map(str::to_string),
                        value: value.to_string(),
                    }
                } else {
                    segment.clone()
                }
            })
            .collect();

        NamePattern::from_parts(self.dir().map(str::to_string), segments)
    }

    fn no_match(&self) -> PatternError {
        PatternError::NoMatch {
            pattern: self.to_string(),
        }
    }
}

/// Reads the basenames of a directory. A missing directory lists empty.
fn read_names(dir: &str) -> Result<Vec<String>, PatternError> {
    let io_error = |source: io::Error| PatternError::Io {
        dir: dir.to_string(),
        source,
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Directory '{}' does not exist", dir);
            return Ok(Vec::new());
        }
        Err(e) => return Err(io_error(e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_error)?;
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => debug!("Skipping non UTF-8 file name {:?}", raw),
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::{tempdir, TempDir};

    fn dir_with(files: &[&str]) -> TempDir {
        let dir = tempdir().unwrap();
        for file in files {
            File::create(dir.path().join(file)).unwrap();
        }
        dir
    }

    fn pattern_in(dir: &TempDir, stem: &str) -> NamePattern {
        NamePattern::parse(&format!("{}/{}", dir.path().display(), stem)).unwrap()
    }

    fn stems(patterns: &[NamePattern]) -> Vec<String> {
        patterns.iter().map(NamePattern::stem).collect()
    }

    #[test]
    fn test_list_expands_wildcards() {
        let dir = dir_with(&["sample.00.bwa.bam", "sample.01.bwa.bam", "sample1.bwa.csv"]);

        let listed = pattern_in(&dir, "sample.{}.bwa").list_all().unwrap();
        assert_eq!(stems(&listed), vec!["sample.00.bwa", "sample.01.bwa"]);
        assert!(listed.iter().all(NamePattern::is_concrete));
    }

    #[test]
    fn test_list_no_match() {
        let dir = dir_with(&["sample.00.bwa.bam", "sample.01.bwa.bam", "sample1.bwa.csv"]);

        let err = pattern_in(&dir, "sample.{}.bwa.sort").list_all().unwrap_err();
        assert!(matches!(err, PatternError::NoMatch { .. }));
    }

    #[test]
    fn test_list_with_fixed_wildcard_groups() {
        let dir = dir_with(&[
            "sample.00.read.1.fq",
            "sample.00.read.2.fq",
            "sample.01.read.1.fq",
        ]);

        let pattern = pattern_in(&dir, "sample.{}.read.{}");
        let grouped = pattern.list(&[Fix::Index(-1)]).unwrap();
        assert_eq!(stems(&grouped), vec!["sample.00.read.{}", "sample.01.read.{}"]);

        let all = pattern.list_all().unwrap();
        assert_eq!(
            stems(&all),
            vec!["sample.00.read.1", "sample.00.read.2", "sample.01.read.1"]
        );
    }

    #[test]
    fn test_list_all_fixed_returns_pattern() {
        let dir = dir_with(&["sample.00.read.1.fq", "sample.01.read.2.fq"]);

        let pattern = pattern_in(&dir, "sample.{}.read.{}");
        let listed = pattern.list(&[Fix::Index(0), Fix::Index(1)]).unwrap();
        assert_eq!(listed, vec![pattern.clone()]);

        let missing = pattern_in(&dir, "other.{}.read.{}");
        let err = missing.list(&[Fix::Index(0), Fix::Index(1)]).unwrap_err();
        assert!(matches!(err, PatternError::NoMatch { .. }));
    }

    #[test]
    fn test_list_strips_multi_segment_extensions() {
        let dir = dir_with(&["test.s1.read.1.fq.gz", "test.s1.read.1.txt", "test.s2.read.1"]);

        let listed = pattern_in(&dir, "test.{}.read.1").list_all().unwrap();
        assert_eq!(stems(&listed), vec!["test.s1.read.1", "test.s2.read.1"]);
    }

    #[test]
    fn test_wildcard_never_spans_separator() {
        let dir = dir_with(&[
            "test.sample1.regression.lasso",
            "test.sample1.regression.lasso.alpha10.txt",
            "test.sample_bad.sample1.regression.lasso",
        ]);

        let listed = pattern_in(&dir, "test.{}.regression.lasso").list_all().unwrap();
        assert_eq!(stems(&listed), vec!["test.sample1.regression.lasso"]);
    }

    #[test]
    fn test_list_by_label() {
        let dir = dir_with(&[
            "cohort.s1.regression.lasso.txt",
            "cohort.s2.regression.lasso.txt",
            "cohort.s1.regression.ridge.txt",
        ]);

        let pattern = pattern_in(&dir, "cohort.{sample}.regression.{model}");
        let listed = pattern.list(&[Fix::from("sample")]).unwrap();
        assert_eq!(
            stems(&listed),
            vec!["cohort.{sample}.regression.lasso", "cohort.{sample}.regression.ridge"]
        );
    }

    #[test]
    fn test_list_is_idempotent() {
        let dir = dir_with(&["a.1.x.bam", "a.1.x.bai", "a.2.x.bam"]);

        let pattern = pattern_in(&dir, "a.{}.x");
        let first = pattern.list_all().unwrap();
        let second = pattern.list_all().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_list_sees_live_directory() {
        let dir = dir_with(&["a.1.bam"]);
        let pattern = pattern_in(&dir, "a.{}");
        assert_eq!(pattern.list_all().unwrap().len(), 1);

        File::create(dir.path().join("a.2.bam")).unwrap();
        assert_eq!(pattern.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_concat_then_list() {
        let dir = dir_with(&["s.00.read.bwa.bam", "s.01.read.bwa.bam"]);

        let base = pattern_in(&dir, "s.{}.read");
        let listed = base.concat(".bwa").unwrap().list(&[]).unwrap();
        for name in &listed {
            assert_eq!(name.segments().last().and_then(|s| s.value()), Some("bwa"));
            assert!(base.matches(&name.stem()));
        }
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn test_bound_segment_matches_literally() {
        let dir = dir_with(&["s.00.read.1.fq", "s.00.read.2.fq", "s.01.read.1.fq"]);

        let group = pattern_in(&dir, "s.{}.read.{}").bind(0, "00").unwrap();
        let reads = group.list_all().unwrap();
        assert_eq!(stems(&reads), vec!["s.00.read.1", "s.00.read.2"]);
        assert_eq!(reads[0].template().stem(), "s.{}.read.{}");
    }

    #[test]
    fn test_single_file_single_result() {
        let dir = dir_with(&["run.alpha.lane.7.bam"]);

        let listed = pattern_in(&dir, "run.{}.lane.{}").list_all().unwrap();
        assert_eq!(listed, vec![pattern_in(&dir, "run.alpha.lane.7")]);
    }

    #[test]
    fn test_hidden_files_do_not_match_wildcards() {
        let dir = dir_with(&[".hidden", "x.hidden"]);

        let listed = pattern_in(&dir, "{}.hidden").list_all().unwrap();
        assert_eq!(stems(&listed), vec!["x.hidden"]);
    }

    #[test]
    fn test_directory_pattern_lists_itself() {
        let dir = tempdir().unwrap();
        let pattern = NamePattern::parse(&format!("{}/", dir.path().display())).unwrap();
        assert_eq!(pattern.list_all().unwrap(), vec![pattern.clone()]);

        let missing = NamePattern::parse(&format!("{}/nope/", dir.path().display())).unwrap();
        assert!(matches!(missing.list_all(), Err(PatternError::NoMatch { .. })));
    }

    #[test]
    fn test_missing_directory_is_no_match() {
        let dir = tempdir().unwrap();
        let pattern = NamePattern::parse(&format!("{}/absent/a.{{}}", dir.path().display())).unwrap();
        assert!(matches!(pattern.list_all(), Err(PatternError::NoMatch { .. })));
    }

    #[test]
    fn test_fix_out_of_range() {
        let dir = dir_with(&["a.1"]);
        let err = pattern_in(&dir, "a.{}").list(&[Fix::Index(3)]).unwrap_err();
        assert!(matches!(err, PatternError::FixOutOfRange { index: 3, wildcards: 1 }));
    }
}
