//! WebVTT parsing and the canonical serializer
//!
//! ```text
//! WEBVTT
//!
//! 1
//! 00:00:01.000 --> 00:00:04.000
//! First caption text
//!
//! 2
//! 00:00:05.500 --> 00:00:08.000
//! Second caption text
//! with multiple lines
//! ```

use tracing::debug;

use super::{RawCue, TimedText};
use crate::error::{Result, SubweaveError};
use crate::timecode;

const HEADER: &str = "WEBVTT";
const ARROW: &str = "-->";

/// Parse WebVTT content into raw cues
///
/// Blocks without a timing line (NOTE, STYLE, REGION) are skipped. Cue
/// settings after the end time are ignored. Time codes are re-rendered in
/// canonical `HH:MM:SS.mmm` form.
pub fn parse_vtt(content: &str) -> Result<Vec<RawCue>> {
    let normalized = content
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");
    let mut lines = normalized.split('\n').peekable();

    match lines.next() {
        Some(first) if first.starts_with(HEADER) => {}
        _ => {
            return Err(SubweaveError::Format(
                "WebVTT content must start with WEBVTT".to_string(),
            ));
        }
    }

    // Header metadata runs until the first blank line
    while lines.peek().is_some_and(|l| !l.trim().is_empty()) {
        lines.next();
    }

    let mut cues = Vec::new();

    loop {
        while lines.peek().is_some_and(|l| l.trim().is_empty()) {
            lines.next();
        }

        let mut block = Vec::new();
        while let Some(line) = lines.next_if(|l| !l.trim().is_empty()) {
            block.push(line);
        }

        if block.is_empty() {
            break;
        }

        let Some(timing_pos) = block.iter().position(|l| l.contains(ARROW)) else {
            debug!("Skipping WebVTT block without timing: {}", block[0]);
            continue;
        };

        let (start, end) = parse_timing_line(block[timing_pos])?;
        let text = block[timing_pos + 1..].join("\n");

        cues.push(RawCue { start, end, text });
    }

    debug!("Parsed {} WebVTT cues", cues.len());
    Ok(cues)
}

/// Parse `start --> end [settings]` into canonical start and end
fn parse_timing_line(line: &str) -> Result<(String, String)> {
    let Some((start, rest)) = line.split_once(ARROW) else {
        return Err(SubweaveError::Format(format!(
            "Expected 'start --> end' format: {}",
            line
        )));
    };

    let end = rest.split_whitespace().next().unwrap_or_default();

    Ok((timecode::canonicalize(start.trim())?, timecode::canonicalize(end)?))
}

/// Serialize cues as canonical WebVTT
///
/// Each cue is numbered by its current 1-based position.
pub fn to_vtt<C: TimedText>(cues: &[C]) -> String {
    let body = cues
        .iter()
        .enumerate()
        .map(|(index, cue)| format!("{}\n{} --> {}\n{}", index + 1, cue.start(), cue.end(), cue.text()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{}\n\n{}", HEADER, body)
}
