//! Cohort (group) identifier classification.
//!
//! Lectures of the same subject are often split into parallel sections: by surname
//! range (`A-L`, `M-Z`), lettered class (`CL.A`, `A`), short codes (`AK`, `LZ`) or
//! campus (`BO`, `RN`, `IMOLA`). The upstream source encodes the section in a
//! disambiguation code such as `00819_1--CL.A`; when that is missing, the title may
//! carry a bracketed marker instead.

use regex::Regex;
use std::sync::LazyLock;

/// Separator between the module part and the section suffix of a disambiguation code.
pub const SECTION_SEPARATOR: &str = "--";

/// Longest suffix still accepted as a section identifier.
pub const MAX_GROUP_LEN: usize = 10;

/// Bucket name used for events that are common to every cohort.
pub const COMMON_GROUP: &str = "common";

// Title markers, tried in order; the first match wins.
static SINGLE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z])\)").expect("Invalid regex"));
static SHORT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z]{2,3})\)").expect("Invalid regex"));
static DOTTED_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(((?:CL|GR|G)\.\s?[A-Z0-9]{1,2})\)").expect("Invalid regex")
});
static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((BOLOGNA|CESENA|FORLI|IMOLA|RAVENNA|RIMINI)\)").expect("Invalid regex")
});

/// Derives the cohort identifier of an event.
///
/// Precedence: the suffix of `raw_code` after the last `--`, else a bracketed
/// marker in `title`, else `None` (event common to all cohorts).
/// `module_code` is the event's own module code, which never counts as a cohort.
///
/// ```
/// use timetable_sync::domain::grouping::classify;
/// assert_eq!(classify(Some("00819_1--CL.A"), "", None).as_deref(), Some("CL.A"));
/// assert_eq!(classify(Some("08793--A-L"), "", None).as_deref(), Some("A-L"));
/// assert_eq!(classify(Some("12345"), "ALGEBRA", None), None);
/// ```
pub fn classify(raw_code: Option<&str>, title: &str, module_code: Option<&str>) -> Option<String> {
    match raw_code {
        Some(code) if code.contains(SECTION_SEPARATOR) => from_raw_code(code, module_code),
        _ => from_title(title),
    }
}

/// Suffix-based extraction from a disambiguation code containing `--`.
pub fn from_raw_code(code: &str, module_code: Option<&str>) -> Option<String> {
    let (head, suffix) = code.rsplit_once(SECTION_SEPARATOR)?;
    let suffix = suffix.trim();

    if suffix.is_empty() || suffix.chars().count() > MAX_GROUP_LEN {
        return None;
    }
    if !suffix.chars().any(char::is_alphanumeric) {
        return None;
    }
    if suffix == base_module_code(head) || module_code.is_some_and(|m| m.trim() == suffix) {
        return None;
    }
    Some(suffix.to_string())
}

/// Bracketed-marker extraction from a free-text title.
pub fn from_title(title: &str) -> Option<String> {
    [&SINGLE_LETTER, &SHORT_CODE, &DOTTED_CLASS, &LOCATION]
        .into_iter()
        .find_map(|pattern| pattern.captures(title))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Module code without section or part numbers: `00819_1--CL.A` -> `00819`.
pub fn base_module_code(code: &str) -> &str {
    let head = code.split(SECTION_SEPARATOR).next().unwrap_or(code);
    head.split('_').next().unwrap_or(head).trim()
}
