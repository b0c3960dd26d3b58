use once_cell::sync::Lazy;
use regex::Regex;

use super::{RawCue, TimedText, parse_vtt};
use crate::error::Result;

static INDEX_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\d+\s*\r?\n").expect("index line pattern is valid"));
static ASS_TAG_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\\([ibu])\}").expect("tag pattern is valid"));
static ASS_TAG_OPEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\\([ibu])1\}").expect("tag pattern is valid"));
static BRACE_TAG_OPEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([ibu])\}").expect("tag pattern is valid"));
static BRACE_TAG_CLOSE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{/([ibu])\}").expect("tag pattern is valid"));
static COMMA_MILLIS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d\d:\d\d:\d\d),(\d\d\d)").expect("timestamp pattern is valid"));

/// Rewrite SubRip text as WebVTT
///
/// Index lines are dropped, inline `{\b1}` / `{b}` style tags become HTML-like
/// markup, comma decimals become dots and any other brace group is removed.
pub fn srt_to_vtt(srt: &str) -> String {
    let text = INDEX_LINE_REGEX.replace_all(srt, "");
    let text = ASS_TAG_CLOSE_REGEX.replace_all(&text, "</${1}>");
    let text = ASS_TAG_OPEN_REGEX.replace_all(&text, "<${1}>");
    let text = BRACE_TAG_OPEN_REGEX.replace_all(&text, "<${1}>");
    let text = BRACE_TAG_CLOSE_REGEX.replace_all(&text, "</${1}>");
    let text = COMMA_MILLIS_REGEX.replace_all(&text, "${1}.${2}");
    let text = super::strip_brace_groups(&text);

    format!("WEBVTT \r\n\r\n{}\r\n\r\n", text)
}

/// Parse SubRip content into raw cues
pub fn parse_srt(content: &str) -> Result<Vec<RawCue>> {
    parse_vtt(&srt_to_vtt(content))
}

/// Serialize cues for file save
///
/// Same block layout as the WebVTT output, without the header; time codes
/// keep the dot decimal separator.
pub fn to_srt<C: TimedText>(cues: &[C]) -> String {
    cues.iter()
        .enumerate()
        .map(|(index, cue)| format!("{}\n{} --> {}\n{}\n", index + 1, cue.start(), cue.end(), cue.text()))
        .collect::<Vec<_>>()
        .join("\n")
}
