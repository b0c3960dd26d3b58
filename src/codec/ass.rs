//! Advanced SubStation Alpha dialogue extraction
//!
//! Only `Dialogue:` event lines are read; script info, styles and every
//! other line are ignored. ASS stores centiseconds (`0:00:01.00`), which
//! are widened to the canonical millisecond form.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::{RawCue, strip_brace_groups};
use crate::timecode;

static DIALOGUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)Dialogue:\s\d,",
        r"(\d+:\d\d:\d\d.\d\d),",
        r"(\d+:\d\d:\d\d.\d\d),",
        r"([^,]*),",
        r"([^,]*),",
        r"(?:[^,]*,){4}",
        r"([\s\S]*)$",
    ))
    .expect("dialogue pattern is valid")
});

static LINE_BREAK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n").expect("line break pattern is valid"));

/// Widen an ASS time (`0:00:01.5`, `0:0:1.50`) to `00:00:01.500`
///
/// One-digit clock components get a leading zero; a one- or two-digit
/// fraction is right-padded to three digits.
pub fn fix_time(time: &str) -> String {
    let parts: Vec<&str> = time.split([':', '.']).collect();
    let last = parts.len().saturating_sub(1);

    parts
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if index == last && index > 0 {
                match item.len() {
                    1 => format!(".{}00", item),
                    2 => format!(".{}0", item),
                    _ => format!(".{}", item),
                }
            } else if item.len() == 1 {
                if index == 0 { format!("0{}", item) } else { format!(":0{}", item) }
            } else if index == 0 {
                item.to_string()
            } else {
                format!(":{}", item)
            }
        })
        .collect()
}

/// Clean dialogue text: drop override blocks, expand `\N`, trim each line
fn clean_text(raw: &str) -> String {
    let text = strip_brace_groups(raw).replace("\\N", "\n");

    LINE_BREAK_REGEX
        .split(text.trim())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse ASS content into raw cues
///
/// Lines that do not match the dialogue layout are dropped, as are dialogue
/// lines whose times cannot be read.
pub fn parse_ass(content: &str) -> Vec<RawCue> {
    let mut cues = Vec::new();

    for line in LINE_BREAK_REGEX.split(content) {
        let Some(caps) = DIALOGUE_REGEX.captures(line) else {
            continue;
        };

        let start = timecode::canonicalize(&fix_time(caps[1].trim()));
        let end = timecode::canonicalize(&fix_time(caps[2].trim()));

        match (start, end) {
            (Ok(start), Ok(end)) => cues.push(RawCue {
                start,
                end,
                text: clean_text(&caps[5]),
            }),
            (Err(e), _) | (_, Err(e)) => warn!("Skipping ASS dialogue with unreadable time: {}", e),
        }
    }

    debug!("Parsed {} ASS dialogue cues", cues.len());
    cues
}
