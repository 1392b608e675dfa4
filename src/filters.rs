//! Capture file selection
//!
//! Two filters decide which capture files take part in a run: a schedule of
//! acquisition time ranges and a list of excluded name suffixes.
//!
//! # Usage
//!
//! The CLI builds both from `--schedule` and `--exclude`; an empty schedule
//! and an empty exclusion list keep every file.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// Inclusive acquisition time range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Interval {
    pub starts: Option<DateTime<Utc>>,
    pub ends: Option<DateTime<Utc>>,
}

impl Interval {
    pub fn new(starts: DateTime<Utc>, ends: DateTime<Utc>) -> Self {
        Self {
            starts: Some(starts),
            ends: Some(ends),
        }
    }

    /// Both bounds set and in order
    pub fn is_valid(&self) -> bool {
        matches!((self.starts, self.ends), (Some(s), Some(e)) if s <= e)
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        match (self.starts, self.ends) {
            (Some(s), Some(e)) => s <= t && t <= e,
            _ => false,
        }
    }
}

/// Set of acquisition ranges to keep
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Schedule {
    #[cfg_attr(feature = "serde", serde(rename = "range"))]
    pub ranges: Vec<Interval>,
}

impl Schedule {
    pub fn new(ranges: Vec<Interval>) -> Self {
        Self { ranges }
    }

    /// True when `acquired` falls in a valid range, or when there are no
    /// ranges at all. Invalid ranges are ignored.
    pub fn keep(&self, acquired: DateTime<Utc>) -> bool {
        if self.ranges.is_empty() {
            return true;
        }
        self.ranges
            .iter()
            .filter(|r| r.is_valid())
            .any(|r| r.contains(acquired))
    }

    #[cfg(feature = "config")]
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|e| crate::MMAError::Config(e.to_string()))
    }

    #[cfg(feature = "config")]
    pub fn from_toml_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| crate::MMAError::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Name suffixes of files to leave out
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Exclude {
    names: Vec<String>,
}

impl Exclude {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Add the comma separated entries of `list`
    pub fn extend_from_list(&mut self, list: &str) {
        self.names.extend(
            list.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        );
        self.names.sort();
    }

    pub fn has(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        self.names.iter().any(|n| name.ends_with(n.as_str()))
    }
}

impl FromStr for Exclude {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut exclude = Exclude::default();
        exclude.extend_from_list(s);
        Ok(exclude)
    }
}

/// Decide whether a capture is left out of a run.
///
/// `acquired` is only checked when known; callers test names before the file
/// is opened and times after.
///
/// # Returns
/// Tuple of (should_skip, reason_description)
pub fn should_skip_capture(
    path: &Path,
    acquired: Option<DateTime<Utc>>,
    schedule: &Schedule,
    exclude: &Exclude,
) -> (bool, String) {
    if path.extension().is_some_and(|ext| ext == "bad") {
        return (true, "marked bad".to_string());
    }
    if exclude.has(path) {
        return (true, "excluded by name".to_string());
    }
    if let Some(acquired) = acquired {
        if !schedule.keep(acquired) {
            return (true, format!("acquired {} outside schedule", acquired));
        }
    }
    (false, String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_schedule_keeps_all() {
        assert!(Schedule::default().keep(at(3)));
    }

    #[test]
    fn test_schedule_bounds_are_inclusive() {
        let schedule = Schedule::new(vec![Interval::new(at(2), at(4))]);
        assert!(schedule.keep(at(2)));
        assert!(schedule.keep(at(3)));
        assert!(schedule.keep(at(4)));
        assert!(!schedule.keep(at(5)));
    }

    #[test]
    fn test_invalid_ranges_ignored() {
        let schedule = Schedule::new(vec![
            Interval::new(at(6), at(4)),
            Interval {
                starts: Some(at(0)),
                ends: None,
            },
        ]);
        // no valid range left, nothing matches
        assert!(!schedule.keep(at(5)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_schedule_from_toml() {
        let schedule = Schedule::from_toml_str(
            r#"
[[range]]
starts = "2019-03-14T02:00:00Z"
ends = "2019-03-14T04:00:00Z"

[[range]]
starts = "2019-03-14T10:00:00Z"
ends = "2019-03-14T11:00:00Z"
"#,
        )
        .unwrap();
        assert_eq!(schedule.ranges.len(), 2);
        assert!(schedule.keep(at(10)));
        assert!(!schedule.keep(at(8)));
    }

    #[test]
    fn test_exclude_suffixes() {
        let exclude: Exclude = "  _0001.dat, upi_b/ ,".parse().unwrap();
        assert_eq!(exclude.names().len(), 2);
        assert!(exclude.has(Path::new("data/MMA_X_0001.dat")));
        assert!(!exclude.has(Path::new("data/MMA_X_0002.dat")));
        assert!(!Exclude::default().has(Path::new("anything")));
    }

    #[test]
    fn test_should_skip_capture() {
        let schedule = Schedule::new(vec![Interval::new(at(2), at(4))]);
        let exclude: Exclude = "skip.dat".parse().unwrap();

        let (skip, reason) = should_skip_capture(Path::new("a.bad"), None, &schedule, &exclude);
        assert!(skip);
        assert_eq!(reason, "marked bad");

        assert!(should_skip_capture(Path::new("x_skip.dat"), None, &schedule, &exclude).0);
        assert!(should_skip_capture(Path::new("x.dat"), Some(at(9)), &schedule, &exclude).0);
        assert!(!should_skip_capture(Path::new("x.dat"), Some(at(3)), &schedule, &exclude).0);
        assert!(!should_skip_capture(Path::new("x.dat"), None, &schedule, &exclude).0);
    }
}
