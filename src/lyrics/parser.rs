//! LRC timeline parser
//!
//! Parses synchronized lyrics in LRC format into a flat, time-ordered
//! timeline:
//!
//! [00:12.34] Hello world
//! [00:15.00] Another line
//!
//! A line may carry several leading timestamps ([00:00.00][00:05.00]Text),
//! in which case the same text is emitted once per timestamp. Metadata
//! tags ([ti:...], [ar:...]) and lines without any timestamp produce no
//! output. Malformed input is dropped, never an error.

use serde::{Deserialize, Serialize};

/// Metadata tags that make a whole line non-lyric content.
const METADATA_TAGS: &[&str] = &["ti", "ar", "al", "au", "length", "by", "offset", "re", "ve"];

/// A single lyric line pinned to an offset from track start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedLine {
    /// Offset in milliseconds from the start of the track
    pub offset_ms: u64,
    /// The lyric text
    pub text: String,
}

impl TimedLine {
    pub fn new(offset_ms: u64, text: impl Into<String>) -> Self {
        Self {
            offset_ms,
            text: text.into(),
        }
    }
}

/// Parse LRC markup into a timeline sorted ascending by offset.
///
/// Total over arbitrary input: unparseable lines are skipped. The sort
/// is stable, so entries sharing an offset keep their input order.
pub fn parse(markup: &str) -> Vec<TimedLine> {
    let mut entries = Vec::new();

    for line in markup.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (offsets, rest) = leading_timestamps(line);
        let text = rest.trim();

        if text.is_empty() || is_metadata_line(line) {
            continue;
        }

        // One entry per timestamp; a line with no timestamp has nowhere
        // to go on the timeline and emits nothing.
        for ms in offsets {
            entries.push(TimedLine::new(ms, text));
        }
    }

    entries.sort_by_key(|l| l.offset_ms);
    entries
}

enum Token {
    Time(u64),
    /// Timestamp-shaped but numerically unusable; skip it alone.
    Malformed,
    Other,
}

/// Strip all leading timestamp tokens off a line, returning their
/// offsets and the remaining text.
fn leading_timestamps(line: &str) -> (Vec<u64>, &str) {
    let mut offsets = Vec::new();
    let mut rest = line;

    while rest.starts_with('[') {
        let Some(end) = rest.find(']') else { break };
        match classify_token(&rest[1..end]) {
            Token::Time(ms) => {
                offsets.push(ms);
                rest = &rest[end + 1..];
            }
            Token::Malformed => {
                rest = &rest[end + 1..];
            }
            Token::Other => break,
        }
    }

    (offsets, rest)
}

/// Classify the inside of a bracketed token. Timestamps are exactly
/// `MM:SS.ff`, `MM:SS:ff` or `MM:SS.fff` (two-digit minutes and
/// seconds, 2- or 3-digit fraction).
fn classify_token(token: &str) -> Token {
    let b = token.as_bytes();
    if b.len() != 8 && b.len() != 9 {
        return Token::Other;
    }
    if b[2] != b':' || (b[5] != b'.' && b[5] != b':') {
        return Token::Other;
    }

    let (minutes, seconds, fraction) = (&token[0..2], &token[3..5], &token[6..]);
    if !all_digits(minutes) || !all_digits(seconds) || !all_digits(fraction) {
        return Token::Other;
    }

    match to_millis(minutes, seconds, fraction) {
        Some(ms) => Token::Time(ms),
        None => Token::Malformed,
    }
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|c| c.is_ascii_digit())
}

/// Convert timestamp parts to milliseconds. A 2-digit fraction is
/// centiseconds, a 3-digit fraction is milliseconds.
fn to_millis(minutes: &str, seconds: &str, fraction: &str) -> Option<u64> {
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let fraction_ms: u64 = match fraction.len() {
        2 => fraction.parse::<u64>().ok()? * 10,
        3 => fraction.parse().ok()?,
        _ => return None,
    };

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds.checked_mul(1_000)?)?
        .checked_add(fraction_ms)
}

/// Whether the whole line is an LRC metadata tag like `[ti:My Song]`.
fn is_metadata_line(line: &str) -> bool {
    let Some(inner) = line.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
        return false;
    };
    let Some((tag, _)) = inner.split_once(':') else {
        return false;
    };
    METADATA_TAGS.contains(&tag)
}

/// Render an offset as an LRC timestamp `[MM:SS.cc]` (centiseconds).
pub fn to_timestamp(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!(
        "[{:02}:{:02}.{:02}]",
        total_seconds / 60,
        total_seconds % 60,
        (ms % 1000) / 10
    )
}

/// Render a timeline back to LRC markup, one line per entry.
pub fn render(lines: &[TimedLine]) -> String {
    lines
        .iter()
        .map(|l| format!("{}{}", to_timestamp(l.offset_ms), l.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centisecond_fraction_scales_by_ten() {
        let lines = parse("[00:00.96]A\n[00:04.02]B");
        assert_eq!(lines, vec![TimedLine::new(960, "A"), TimedLine::new(4020, "B")]);
    }

    #[test]
    fn millisecond_fraction_is_taken_verbatim() {
        let lines = parse("[00:01.500]Line");
        assert_eq!(lines, vec![TimedLine::new(1500, "Line")]);
    }

    #[test]
    fn colon_fraction_separator_is_accepted() {
        let lines = parse("[00:12:34]Line");
        assert_eq!(lines, vec![TimedLine::new(12_340, "Line")]);
    }

    #[test]
    fn multiple_timestamps_share_one_text() {
        let lines = parse("[00:00.00][00:05.00]Hello");
        assert_eq!(
            lines,
            vec![TimedLine::new(0, "Hello"), TimedLine::new(5000, "Hello")]
        );
    }

    #[test]
    fn metadata_lines_are_dropped() {
        assert!(parse("[ti:My Song]").is_empty());
        assert!(parse("[ar:Some Artist]\n[offset:500]\n[length:03:45]").is_empty());
    }

    #[test]
    fn plain_text_without_timestamp_is_dropped() {
        assert!(parse("just some words").is_empty());
    }

    #[test]
    fn timestamp_with_empty_text_is_dropped() {
        assert!(parse("[00:10.00]").is_empty());
        assert!(parse("[00:10.00]   ").is_empty());
    }

    #[test]
    fn output_is_sorted_regardless_of_input_order() {
        let lines = parse("[00:30.00]C\n[00:10.00]A\n[00:20.00]B");
        let offsets: Vec<u64> = lines.iter().map(|l| l.offset_ms).collect();
        assert_eq!(offsets, vec![10_000, 20_000, 30_000]);
    }

    #[test]
    fn equal_offsets_keep_input_order() {
        let lines = parse("[00:10.00]first\n[00:05.00]early\n[00:10.00]second");
        assert_eq!(lines[0].text, "early");
        assert_eq!(lines[1].text, "first");
        assert_eq!(lines[2].text, "second");
    }

    #[test]
    fn non_timestamp_bracket_ends_the_scan() {
        // [x] is not a timestamp, so everything from it on is text.
        let lines = parse("[00:01.00][x] hello");
        assert_eq!(lines, vec![TimedLine::new(1000, "[x] hello")]);
    }

    #[test]
    fn single_digit_minutes_are_not_a_timestamp() {
        assert!(parse("[0:12.34]nope").is_empty());
    }

    #[test]
    fn mixed_markup_parses_only_lyric_lines() {
        let markup = "\n[ti:Test Song]\n[ar:Test Artist]\n[00:12.34]First line\n\n[00:15.00]Second line\nstray text\n";
        let lines = parse(markup);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TimedLine::new(12_340, "First line"));
        assert_eq!(lines[1], TimedLine::new(15_000, "Second line"));
    }

    #[test]
    fn to_timestamp_renders_centiseconds() {
        assert_eq!(to_timestamp(960), "[00:00.96]");
        assert_eq!(to_timestamp(90_000), "[01:30.00]");
    }

    #[test]
    fn rendered_timeline_reparses_to_itself() {
        let original = parse("[00:00.96]One\n[00:04.02]Two\n[01:10.50]Three");
        let reparsed = parse(&render(&original));
        assert_eq!(original, reparsed);
    }
}
