//! Event name and date extraction from scraped page text.
//!
//! Scraped snapshots are mostly navigation chrome, legal boilerplate and
//! counters, with the event title somewhere near the top followed by a
//! location or metadata line. Extraction is a line scan with a short
//! lookahead; all word lists live in [`ExtractionRules`] so they can be
//! tuned from the config file without touching the scan itself.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::ExtractionOutcome;

// ============================================================================
// Extractor Contract
// ============================================================================

/// Turns a raw text blob into an [`ExtractionOutcome`].
///
/// Implementations must be pure: the same blob always yields the same
/// outcome. `Extracted` means a title line was confirmed by surrounding
/// context; `AccessDenied` means the page is a login/paywall and must never be
/// offered as a match candidate; `NoName` means the page was readable but no
/// line qualified. An empty extracted name is never used to signal failure.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, blob: &str) -> ExtractionOutcome;
}

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Month names, longest spelling first so alternation prefers it.
pub const MONTHS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December", "Sept", "Jan", "Feb", "Mar", "Apr", "Jun", "Jul", "Aug",
    "Sep", "Oct", "Nov", "Dec",
];

pub const WEEKDAYS: &[&str] = &[
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday", "Tues", "Thurs",
    "Thur", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun",
];

/// Day-month-year with optional leading weekday: "Sat, 14 June 2025", "3rd Mar 2024".
pub static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let weekdays = WEEKDAYS.join("|");
    let months = MONTHS.join("|");
    Regex::new(&format!(
        r"(?i)\b(?:(?:{weekdays})\.?,?\s+)?\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{months})\.?,?\s+\d{{4}}\b"
    ))
    .unwrap()
});

/// Lines made only of digits and separators: "1,204", "12 - 3".
pub static NUMERIC_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s.,+\-]+$").unwrap());

/// Relative and clock timestamps: "12:30", "7:00 PM - 9:00 PM", "3h", "2 days ago".
pub static TIMESTAMP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:",
        r"\d{1,2}:\d{2}(?:\s*[ap]m)?(?:\s*[-–]\s*\d{1,2}:\d{2}(?:\s*[ap]m)?)?",
        r"|\d+\s*(?:s|m|h|d|w|y|mins?|hrs?)",
        r"|\d+\s+(?:seconds?|minutes?|hours?|days?|weeks?|months?|years?)\s+ago",
        r"|just now",
        r"|yesterday(?:\s+at\s+\d{1,2}:\d{2}(?:\s*[ap]m)?)?",
        r")$"
    ))
    .unwrap()
});

/// Whole-line URLs.
pub static URL_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:[a-z][a-z0-9+.\-]*://|www\.)\S*$").unwrap());

// ============================================================================
// Extraction Rules
// ============================================================================

/// Word lists and bounds driving [`HeuristicExtractor`].
///
/// All comparisons are case-insensitive.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Substrings that mark a login wall or access-denied page.
    pub access_markers: Vec<String>,
    /// Lines equal to one of these are navigation chrome.
    pub chrome_lines: Vec<String>,
    /// Lines containing one of these are navigation chrome.
    pub chrome_substrings: Vec<String>,
    /// Marketing/legal substrings that disqualify a title candidate.
    pub boilerplate_substrings: Vec<String>,
    /// Place names that mark a location line after a title.
    pub region_tokens: Vec<String>,
    /// Substrings that mark a metadata line after a title.
    pub metadata_substrings: Vec<String>,
    /// Lines equal to one of these mark a metadata block after a title.
    pub metadata_lines: Vec<String>,
    pub min_line_len: usize,
    pub min_title_len: usize,
    pub max_title_len: usize,
    pub lookahead: usize,
}

/// Lowercase and map typographic apostrophes to `'`, so rules written with
/// either spelling match pages rendered with either.
fn fold(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}', '\u{02bc}'], "'")
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            access_markers: owned(&[
                "log in to continue",
                "you must log in",
                "log in or sign up to view",
                "this content isn't available",
                "this content isn't available right now",
                "page isn't available",
                "you're temporarily blocked",
            ]),
            chrome_lines: owned(&[
                "home", "events", "notifications", "menu", "log in", "sign up", "search",
                "create new account", "forgot account?", "see more", "see less", "discussion",
                "about", "going", "interested", "share", "more", "watch", "marketplace", "groups",
                "public", "anyone on or off the platform", "messenger", "reply", "like",
            ]),
            chrome_substrings: owned(&[
                "see all",
                "log in or sign up",
                "people responded",
                "unread notification",
                "number of unread",
            ]),
            boilerplate_substrings: owned(&[
                "privacy",
                "terms",
                "event by",
                "cookies",
                "advertising",
                "ad choices",
                "all rights reserved",
                "©",
            ]),
            region_tokens: owned(&[
                "malaysia", "singapore", "kuala lumpur", "selangor", "penang", "johor", "sabah",
                "sarawak", "perak", "melaka", "putrajaya", "indonesia", "thailand",
            ]),
            metadata_substrings: owned(&["online event"]),
            metadata_lines: owned(&["invite", "details"]),
            min_line_len: 5,
            min_title_len: 10,
            max_title_len: 200,
            lookahead: 3,
        }
    }
}

impl ExtractionRules {
    /// Fold every word list once, so matching can compare against a folded
    /// line directly.
    fn lowercased(mut self) -> Self {
        for list in [
            &mut self.access_markers,
            &mut self.chrome_lines,
            &mut self.chrome_substrings,
            &mut self.boilerplate_substrings,
            &mut self.region_tokens,
            &mut self.metadata_substrings,
            &mut self.metadata_lines,
        ] {
            for item in list.iter_mut() {
                *item = fold(item);
            }
        }
        self
    }
}

// ============================================================================
// Heuristic Extractor
// ============================================================================

/// Line-scan extractor: first title-shaped line confirmed by a metadata line
/// within the lookahead window.
#[derive(Clone, Debug)]
pub struct HeuristicExtractor {
    rules: ExtractionRules,
}

impl Default for HeuristicExtractor {
    fn default() -> Self {
        Self::new(ExtractionRules::default())
    }
}

impl HeuristicExtractor {
    pub fn new(rules: ExtractionRules) -> Self {
        Self {
            rules: rules.lowercased(),
        }
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    /// First access-denial marker found in the blob, if any.
    pub fn access_marker(&self, blob: &str) -> Option<&str> {
        let lower = fold(blob);
        self.rules
            .access_markers
            .iter()
            .find(|marker| lower.contains(marker.as_str()))
            .map(String::as_str)
    }

    /// Navigation chrome, counters, timestamps and date headers.
    pub fn is_chrome(&self, line: &str) -> bool {
        let lower = fold(line);
        self.rules.chrome_lines.iter().any(|c| *c == lower)
            || self
                .rules
                .chrome_substrings
                .iter()
                .any(|c| lower.contains(c.as_str()))
            || NUMERIC_LINE.is_match(line)
            || TIMESTAMP_LINE.is_match(line)
            || DATE_PATTERN.find(line).is_some_and(|m| m.start() == 0)
    }

    /// Title-shaped: right length, no boilerplate, not a URL.
    pub fn is_title_candidate(&self, line: &str) -> bool {
        let len = line.chars().count();
        if len < self.rules.min_title_len || len >= self.rules.max_title_len {
            return false;
        }
        let lower = fold(line);
        if self
            .rules
            .boilerplate_substrings
            .iter()
            .any(|b| lower.contains(b.as_str()))
        {
            return false;
        }
        !URL_LINE.is_match(line)
    }

    /// Location or metadata line that typically follows a title.
    pub fn is_metadata_line(&self, line: &str) -> bool {
        if line.contains(',') {
            return true;
        }
        let lower = fold(line);
        self.rules.metadata_lines.iter().any(|m| *m == lower)
            || self
                .rules
                .metadata_substrings
                .iter()
                .any(|m| lower.contains(m.as_str()))
            || self
                .rules
                .region_tokens
                .iter()
                .any(|r| lower.contains(r.as_str()))
    }

    /// Scan for a confirmed title line.
    pub fn extract_name(&self, blob: &str) -> Option<String> {
        let lines: Vec<&str> = blob
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        for (i, line) in lines.iter().enumerate() {
            if line.chars().count() < self.rules.min_line_len || self.is_chrome(line) {
                continue;
            }
            if !self.is_title_candidate(line) {
                continue;
            }
            let end = (i + 1 + self.rules.lookahead).min(lines.len());
            if lines[i + 1..end].iter().any(|next| self.is_metadata_line(next)) {
                return Some(line.to_string());
            }
        }
        None
    }
}

/// First day-month-year date in the blob, verbatim.
pub fn extract_date(blob: &str) -> Option<String> {
    blob.lines()
        .find_map(|line| DATE_PATTERN.find(line))
        .map(|m| m.as_str().to_string())
}

impl TextExtractor for HeuristicExtractor {
    fn extract(&self, blob: &str) -> ExtractionOutcome {
        if let Some(marker) = self.access_marker(blob) {
            return ExtractionOutcome::AccessDenied {
                marker: marker.to_string(),
            };
        }
        match self.extract_name(blob) {
            Some(name) => ExtractionOutcome::Extracted {
                name,
                date: extract_date(blob),
            },
            None => ExtractionOutcome::NoName,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_PAGE: &str = "\
Notifications
12
Home
Events
3h
Saturday, 14 June 2025 at 07:00
Penang Bridge Night Run 2025
Penang Bridge, George Town
Details
Event by Runners Club
1,204 people responded
Privacy · Terms · Advertising · Cookies
";

    fn outcome(blob: &str) -> ExtractionOutcome {
        HeuristicExtractor::default().extract(blob)
    }

    #[test]
    fn test_extracts_title_and_date() {
        assert_eq!(
            outcome(EVENT_PAGE),
            ExtractionOutcome::Extracted {
                name: "Penang Bridge Night Run 2025".to_string(),
                date: Some("Saturday, 14 June 2025".to_string()),
            }
        );
    }

    #[test]
    fn test_access_denied_wins_over_title() {
        let blob = format!("{EVENT_PAGE}\nYou must log in to continue.");
        assert_eq!(
            outcome(&blob),
            ExtractionOutcome::AccessDenied {
                marker: "log in to continue".to_string()
            }
        );
    }

    #[test]
    fn test_access_marker_with_typographic_apostrophe() {
        let extractor = HeuristicExtractor::default();
        assert_eq!(
            extractor.access_marker("This content isn\u{2019}t available right now"),
            Some("this content isn't available")
        );
        assert_eq!(
            extractor.access_marker("YOU\u{2019}RE TEMPORARILY BLOCKED"),
            Some("you're temporarily blocked")
        );

        // Rules written with the curly form still match a plain page
        let mut rules = ExtractionRules::default();
        rules.access_markers = vec!["Page isn\u{2019}t available".to_string()];
        let custom = HeuristicExtractor::new(rules);
        assert_eq!(
            custom.access_marker("Sorry, this page isn't available."),
            Some("page isn't available")
        );
    }

    #[test]
    fn test_no_name_without_confirming_line() {
        let blob = "Home\nEvents\nSome Very Long Title Without Context\nAnother plain line here\n";
        assert_eq!(outcome(blob), ExtractionOutcome::NoName);
    }

    #[test]
    fn test_empty_blob_is_no_name() {
        assert_eq!(outcome(""), ExtractionOutcome::NoName);
    }

    #[test]
    fn test_lookahead_markers() {
        let online = "Virtual Charity Challenge\nOnline event\n";
        let invite = "Virtual Charity Challenge\nGoing\nInvite\n";
        let region = "Virtual Charity Challenge\nShah Alam Selangor\n";
        for blob in [online, invite, region] {
            assert_eq!(
                HeuristicExtractor::default().extract_name(blob).as_deref(),
                Some("Virtual Charity Challenge"),
                "failed for {blob:?}"
            );
        }
    }

    #[test]
    fn test_lookahead_window_is_bounded() {
        let blob = "Virtual Charity Challenge\nfiller1\nfiller2\nfiller3\nKuala Lumpur, Malaysia\n";
        assert_eq!(HeuristicExtractor::default().extract_name(blob), None);
    }

    #[test]
    fn test_candidate_filters() {
        let extractor = HeuristicExtractor::default();
        assert!(!extractor.is_title_candidate("Short one"));
        assert!(!extractor.is_title_candidate("https://example.com/events/123"));
        assert!(!extractor.is_title_candidate("Event by Runners Club Malaysia"));
        assert!(!extractor.is_title_candidate(&"x".repeat(200)));
        assert!(extractor.is_title_candidate(&"x".repeat(199)));
        assert!(extractor.is_title_candidate("Sunrise Trail Run"));
    }

    #[test]
    fn test_chrome_lines() {
        let extractor = HeuristicExtractor::default();
        for line in [
            "Home",
            "EVENTS",
            "1,204",
            "12:30",
            "7:00 PM - 9:00 PM",
            "3h",
            "2 days ago",
            "See all photos",
            "Saturday, 14 June 2025 at 07:00",
        ] {
            assert!(extractor.is_chrome(line), "{line:?} should be chrome");
        }
        assert!(!extractor.is_chrome("Sunrise Trail Run"));
    }

    #[test]
    fn test_title_skipped_when_chrome_precedes_metadata() {
        // "Events" is chrome; the title is the next qualifying line
        let blob = "Events\nKL Tower Run Up 2024\nKuala Lumpur\n";
        assert_eq!(
            HeuristicExtractor::default().extract_name(blob).as_deref(),
            Some("KL Tower Run Up 2024")
        );
    }

    #[test]
    fn test_extract_date_variants() {
        assert_eq!(extract_date("Sun, 3rd Mar 2024 from 6am").as_deref(), Some("Sun, 3rd Mar 2024"));
        assert_eq!(extract_date("14 September 2025").as_deref(), Some("14 September 2025"));
        assert_eq!(extract_date("Starts 2025-06-14"), None);
    }

    #[test]
    fn test_custom_rules_from_json() {
        let rules: ExtractionRules =
            serde_json::from_str(r#"{"region_tokens": ["Atlantis"]}"#).unwrap();
        assert_eq!(rules.min_line_len, 5);
        let extractor = HeuristicExtractor::new(rules);
        assert_eq!(
            extractor.extract_name("Deep Sea Swim Meet\nATLANTIS harbour\n").as_deref(),
            Some("Deep Sea Swim Meet")
        );
        assert_eq!(extractor.extract_name("Deep Sea Swim Meet\nPenang harbour\n"), None);
    }
}
