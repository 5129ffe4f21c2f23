//! Title shortening heuristics for navigation labels.
//!
//! Upstream article titles routinely overflow the table-of-contents row
//! width on small e-ink screens. Shortening runs in stages: strip known
//! boilerplate suffixes, keep the title if it now fits, otherwise cut at
//! a natural break point, and as a last resort truncate at a word
//! boundary with an ellipsis.

use std::sync::LazyLock;

use regex::Regex;

/// Default display budget, in characters.
pub const DEFAULT_MAX_TITLE_LEN: usize = 50;

/// Default news-source marker stripped from title suffixes.
pub const DEFAULT_SOURCE_MARKER: &str = "Bloomberg";

/// Break tokens tried in priority order when a title must be cut.
const BREAK_TOKENS: [&str; 4] = [":", " - ", " – ", ", "];

/// Segments shorter than this are never kept from a break-point cut;
/// an early colon would otherwise produce a one-word title.
const MIN_BREAK_SEGMENT: usize = 20;

static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+\)\s*$").expect("valid regex"));
static SECTION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*:\s*Markets\s*Wrap\s*$").expect("valid regex"));

static DEFAULT_SHORTENER: LazyLock<Shortener> =
    LazyLock::new(|| Shortener::new(DEFAULT_SOURCE_MARKER));

/// Compiled suffix patterns for one news-source marker.
pub struct Shortener {
    dash_source: Regex,
    pipe_source: Regex,
}

impl Shortener {
    pub fn new(source_marker: &str) -> Self {
        let marker = regex::escape(source_marker);
        Self {
            dash_source: Regex::new(&format!(r"(?i)\s*[-–—]\s*{marker}.*$"))
                .expect("valid regex"),
            pipe_source: Regex::new(&format!(r"(?i)\s*\|\s*{marker}.*$")).expect("valid regex"),
        }
    }

    /// Shorten `title` to at most `max_len` display characters.
    ///
    /// Lengths are counted in `char`s: wire titles carry en dashes and
    /// typographic quotes, and a byte budget would split them.
    pub fn shorten(&self, title: &str, max_len: usize) -> String {
        let stripped = self.strip_suffixes(title);
        if char_len(&stripped) <= max_len {
            return stripped.trim().to_string();
        }

        let cut = match break_segment(&stripped, max_len) {
            Some(segment) => segment.to_string(),
            None => hard_truncate(&stripped, max_len),
        };
        // A cut can expose a suffix that was mid-string before, e.g. a
        // trailing "(2)" ahead of a colon. Stripping again keeps the
        // function idempotent.
        self.strip_suffixes(&cut).trim().to_string()
    }

    fn strip_suffixes(&self, title: &str) -> String {
        let mut current = title.to_string();
        loop {
            let mut next = self.dash_source.replace(&current, "").into_owned();
            next = self.pipe_source.replace(&next, "").into_owned();
            next = ORDINAL_SUFFIX.replace(&next, "").into_owned();
            next = SECTION_SUFFIX.replace(&next, "").into_owned();
            if next == current {
                return current;
            }
            current = next;
        }
    }
}

/// Shorten with the default source marker.
///
/// # Example
///
/// ```
/// use inkprep::title::shorten;
///
/// let short = shorten("Fed Hikes Rates - Bloomberg Markets Wrap", 50);
/// assert_eq!(short, "Fed Hikes Rates");
/// ```
pub fn shorten(title: &str, max_len: usize) -> String {
    DEFAULT_SHORTENER.shorten(title, max_len)
}

fn break_segment(title: &str, max_len: usize) -> Option<&str> {
    for token in BREAK_TOKENS {
        if let Some((first, _)) = title.split_once(token) {
            let first = first.trim();
            if (MIN_BREAK_SEGMENT..=max_len).contains(&char_len(first)) {
                return Some(first);
            }
        }
    }
    None
}

fn hard_truncate(title: &str, max_len: usize) -> String {
    let window = max_len.saturating_sub(3);
    let mut truncated: String = title.chars().take(window).collect();
    if let Some(pos) = truncated.rfind(' ') {
        // Only back up to the space when it doesn't cost too much of
        // the window.
        let chars_before_space = truncated[..pos].chars().count();
        if chars_before_space as f64 > max_len as f64 * 0.6 {
            truncated.truncate(pos);
        }
    }
    format!("{}...", truncated.trim())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
