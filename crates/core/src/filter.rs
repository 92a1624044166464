use chrono::{DateTime, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid name pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("empty {what} range: {min} is after {max}")]
    EmptyRange {
        what: &'static str,
        min: String,
        max: String,
    },
}

/// Selection criteria as authored. Every absent field passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Accepted extensions, with or without the leading dot.
    pub extensions: Vec<String>,
    /// Regex searched anywhere in the file name.
    pub pattern: Option<String>,
    pub prefix: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub modified_after: Option<NaiveDate>,
    /// Inclusive through the end of that day.
    pub modified_before: Option<NaiveDate>,
}

/// The facts a filter looks at.
#[derive(Debug, Clone, Copy)]
pub struct PathMeta<'a> {
    pub name: &'a str,
    pub size: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Conjunction of the sub-predicates in a [`FilterSpec`].
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    extensions: Vec<String>,
    pattern: Option<Regex>,
    prefix: Option<String>,
    min_size: Option<u64>,
    max_size: Option<u64>,
    modified_after: Option<NaiveDate>,
    modified_before: Option<NaiveDate>,
}

pub fn parse_date(value: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| FilterError::InvalidDate(value.to_string()))
}

impl FileFilter {
    /// Validates the spec. A bad pattern is an error here rather than a
    /// silent per-file miss.
    pub fn new(spec: &FilterSpec) -> Result<Self, FilterError> {
        let pattern = spec
            .pattern
            .as_deref()
            .map(|raw| {
                Regex::new(raw).map_err(|source| FilterError::InvalidPattern {
                    pattern: raw.to_string(),
                    source,
                })
            })
            .transpose()?;

        if let (Some(min), Some(max)) = (spec.min_size, spec.max_size) {
            if min > max {
                return Err(FilterError::EmptyRange {
                    what: "size",
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
        }
        if let (Some(min), Some(max)) = (spec.modified_after, spec.modified_before) {
            if min > max {
                return Err(FilterError::EmptyRange {
                    what: "date",
                    min: min.to_string(),
                    max: max.to_string(),
                });
            }
        }

        let extensions = spec
            .extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();

        Ok(Self {
            extensions,
            pattern,
            prefix: spec.prefix.clone().filter(|p| !p.is_empty()),
            min_size: spec.min_size,
            max_size: spec.max_size,
            modified_after: spec.modified_after,
            modified_before: spec.modified_before,
        })
    }

    pub fn matches(&self, meta: &PathMeta<'_>) -> bool {
        self.extension_ok(meta.name)
            && self.pattern.as_ref().is_none_or(|re| re.is_match(meta.name))
            && self
                .prefix
                .as_deref()
                .is_none_or(|prefix| meta.name.starts_with(prefix))
            && self.min_size.is_none_or(|min| meta.size >= min)
            && self.max_size.is_none_or(|max| meta.size <= max)
            && self.date_ok(meta.modified)
    }

    fn extension_ok(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let lower = name.to_lowercase();
        self.extensions.iter().any(|ext| lower.ends_with(ext.as_str()))
    }

    fn date_ok(&self, modified: Option<DateTime<Local>>) -> bool {
        if self.modified_after.is_none() && self.modified_before.is_none() {
            return true;
        }
        let Some(modified) = modified else {
            return false;
        };
        let day = modified.date_naive();
        self.modified_after.is_none_or(|after| day >= after)
            && self.modified_before.is_none_or(|before| day <= before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta(name: &str, size: u64) -> PathMeta<'_> {
        PathMeta {
            name,
            size,
            modified: None,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> Option<DateTime<Local>> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).single()
    }

    #[test]
    fn empty_spec_passes_everything() {
        let filter = FileFilter::new(&FilterSpec::default()).expect("filter");
        assert!(filter.matches(&meta("anything", 0)));
    }

    #[test]
    fn size_bound_fails_even_when_extension_matches() {
        let filter = FileFilter::new(&FilterSpec {
            extensions: vec![".png".to_string()],
            min_size: Some(1024),
            ..FilterSpec::default()
        })
        .expect("filter");

        assert!(!filter.matches(&meta("small.png", 512)));
        assert!(filter.matches(&meta("large.PNG", 2048)));
        assert!(!filter.matches(&meta("large.jpg", 2048)));
    }

    #[test]
    fn extensions_accept_missing_dot_and_multi_part() {
        let filter = FileFilter::new(&FilterSpec {
            extensions: vec!["tar.gz".to_string(), "TXT".to_string()],
            ..FilterSpec::default()
        })
        .expect("filter");
        assert!(filter.matches(&meta("backup.tar.gz", 1)));
        assert!(filter.matches(&meta("notes.txt", 1)));
        assert!(!filter.matches(&meta("notes.text", 1)));
    }

    #[test]
    fn pattern_and_prefix() {
        let filter = FileFilter::new(&FilterSpec {
            pattern: Some(r"\d{4}".to_string()),
            prefix: Some("IMG".to_string()),
            ..FilterSpec::default()
        })
        .expect("filter");
        assert!(filter.matches(&meta("IMG_2024.jpg", 1)));
        assert!(!filter.matches(&meta("img_2024.jpg", 1)));
        assert!(!filter.matches(&meta("IMG_abc.jpg", 1)));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let err = FileFilter::new(&FilterSpec {
            pattern: Some("[unclosed".to_string()),
            ..FilterSpec::default()
        })
        .expect_err("bad regex must fail");
        assert!(matches!(err, FilterError::InvalidPattern { .. }));
    }

    #[test]
    fn inverted_ranges_are_errors() {
        let err = FileFilter::new(&FilterSpec {
            min_size: Some(10),
            max_size: Some(1),
            ..FilterSpec::default()
        })
        .expect_err("inverted size range");
        assert!(matches!(err, FilterError::EmptyRange { what: "size", .. }));
    }

    #[test]
    fn date_range_is_inclusive_by_day() {
        let filter = FileFilter::new(&FilterSpec {
            modified_after: Some(parse_date("2024-01-10").expect("date")),
            modified_before: Some(parse_date("2024-01-20").expect("date")),
            ..FilterSpec::default()
        })
        .expect("filter");

        let check = |modified| {
            filter.matches(&PathMeta {
                name: "a",
                size: 0,
                modified,
            })
        };
        assert!(check(at(2024, 1, 10, 0)));
        assert!(check(at(2024, 1, 20, 23)));
        assert!(!check(at(2024, 1, 21, 0)));
        assert!(!check(at(2024, 1, 9, 23)));
        assert!(!check(None));
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(matches!(
            parse_date("10/01/2024"),
            Err(FilterError::InvalidDate(_))
        ));
    }
}
