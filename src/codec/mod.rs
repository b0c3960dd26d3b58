// Subtitle format codecs
//
// Every input format is reduced to the same ordered list of raw cues with
// canonical time codes:
// - Vtt: WebVTT cue parser and the canonical serializer
// - Srt: SubRip, rewritten to WebVTT and read by the Vtt parser
// - Ass: Advanced SubStation Alpha `Dialogue:` lines
//
// Output is always WebVTT for the caption track, or the SRT-shaped text
// used for file save.

pub mod ass;
pub mod srt;
pub mod vtt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use ass::{fix_time, parse_ass};
pub use srt::{parse_srt, srt_to_vtt, to_srt};
pub use vtt::{parse_vtt, to_vtt};

use crate::error::Result;

static BRACE_GROUP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*?\}").expect("brace group pattern is valid"));

/// One parsed cue before it becomes part of a timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCue {
    pub start: String,
    pub end: String,
    pub text: String,
}

impl RawCue {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(start: S1, end: S2, text: S3) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            text: text.into(),
        }
    }
}

/// Anything that can be written out as a timed text block
pub trait TimedText {
    fn start(&self) -> &str;
    fn end(&self) -> &str;
    fn text(&self) -> &str;
}

impl TimedText for RawCue {
    fn start(&self) -> &str {
        &self.start
    }

    fn end(&self) -> &str {
        &self.end
    }

    fn text(&self) -> &str {
        &self.text
    }
}

/// Input formats understood by the codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleFormat {
    Srt,
    Ass,
    Vtt,
}

impl SubtitleFormat {
    /// Pick a format from a file name or URL; anything unknown is WebVTT
    pub fn from_file_name(name: &str) -> Self {
        Self::from_extension(&extension_of(name))
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "srt" => Self::Srt,
            "ass" => Self::Ass,
            _ => Self::Vtt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
            Self::Vtt => "vtt",
        }
    }
}

/// Extension of a file name or URL, lowercased, ignoring query and fragment
pub fn extension_of(name: &str) -> String {
    let name = name.split('?').next().unwrap_or(name);
    let name = name.split('#').next().unwrap_or(name);

    name.trim()
        .to_lowercase()
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// File name without its last extension
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// Remove every `{...}` group (ASS override blocks and similar)
pub fn strip_brace_groups(text: &str) -> String {
    BRACE_GROUP_REGEX.replace_all(text, "").into_owned()
}

/// Main trait for subtitle parsing
pub trait SubtitleParser: Send + Sync {
    /// Format handled by this parser
    fn format(&self) -> SubtitleFormat;

    /// Parse decoded subtitle text into raw cues in file order
    fn parse(&self, text: &str) -> Result<Vec<RawCue>>;
}

pub struct SrtParser;
pub struct AssParser;
pub struct VttParser;

impl SubtitleParser for SrtParser {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Srt
    }

    fn parse(&self, text: &str) -> Result<Vec<RawCue>> {
        parse_srt(text)
    }
}

impl SubtitleParser for AssParser {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Ass
    }

    fn parse(&self, text: &str) -> Result<Vec<RawCue>> {
        Ok(parse_ass(text))
    }
}

impl SubtitleParser for VttParser {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Vtt
    }

    /// Uploaded WebVTT has brace groups stripped before cue parsing
    fn parse(&self, text: &str) -> Result<Vec<RawCue>> {
        parse_vtt(&strip_brace_groups(text))
    }
}

/// Factory for creating parser instances
pub struct CodecFactory;

impl CodecFactory {
    /// Create the parser for a format
    pub fn create_parser(format: SubtitleFormat) -> Box<dyn SubtitleParser> {
        match format {
            SubtitleFormat::Srt => Box::new(SrtParser),
            SubtitleFormat::Ass => Box::new(AssParser),
            SubtitleFormat::Vtt => Box::new(VttParser),
        }
    }

    /// Create the parser matching a file name's extension
    pub fn parser_for_file(name: &str) -> Box<dyn SubtitleParser> {
        Self::create_parser(SubtitleFormat::from_file_name(name))
    }
}

/// Escape text for hosts that render labels as HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn unescape_html(text: &str) -> String {
    static ENTITY_REGEX: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"&amp;|&lt;|&gt;|&#39;|&quot;").expect("entity pattern is valid"));

    ENTITY_REGEX
        .replace_all(text, |caps: &regex::Captures| match &caps[0] {
            "&amp;" => "&",
            "&lt;" => "<",
            "&gt;" => ">",
            "&#39;" => "'",
            _ => "\"",
        })
        .into_owned()
}
