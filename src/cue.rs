use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::codec::{RawCue, TimedText};
use crate::error::Result;
use crate::timecode;

/// Stable identity of a cue, independent of its position in a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CueId(Uuid);

impl CueId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the string form used as a region id
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text).ok().map(Self)
    }
}

impl Default for CueId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Editable fields of a cue, as addressed by table cell edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueField {
    Start,
    End,
    Text,
}

/// One timed subtitle entry
///
/// `editing` and `highlighted` are view state: they are not persisted, take
/// no part in equality and are reset on clone. Every derived value is
/// recomputed from `start`, `end` and `text` on each call.
#[derive(Debug, Serialize, Deserialize)]
pub struct Cue {
    #[serde(skip, default)]
    id: CueId,
    pub start: String,
    pub end: String,
    pub text: String,
    #[serde(skip)]
    pub editing: bool,
    #[serde(skip)]
    pub highlighted: bool,
}

impl Cue {
    pub fn new<S1: Into<String>, S2: Into<String>, S3: Into<String>>(start: S1, end: S2, text: S3) -> Self {
        Self {
            id: CueId::new(),
            start: start.into(),
            end: end.into(),
            text: text.into(),
            editing: false,
            highlighted: false,
        }
    }

    pub fn id(&self) -> CueId {
        self.id
    }

    pub fn start_seconds(&self) -> Result<f64> {
        timecode::parse(&self.start)
    }

    pub fn end_seconds(&self) -> Result<f64> {
        timecode::parse(&self.end)
    }

    pub fn duration_seconds(&self) -> Result<f64> {
        Ok(self.end_seconds()? - self.start_seconds()?)
    }

    /// Duration with three decimals, as shown in the duration column
    pub fn duration_label(&self) -> Result<String> {
        Ok(format!("{:.3}", self.duration_seconds()?))
    }

    /// Both times readable, non-negative, start before end, and text present
    pub fn is_valid(&self) -> bool {
        match (self.start_seconds(), self.end_seconds()) {
            (Ok(start), Ok(end)) => {
                start >= 0.0 && end >= 0.0 && start < end && !self.text.trim().is_empty()
            }
            _ => false,
        }
    }

    pub fn with_start<S: Into<String>>(&self, start: S) -> Self {
        Self {
            start: start.into(),
            ..self.clone()
        }
    }

    pub fn with_end<S: Into<String>>(&self, end: S) -> Self {
        Self {
            end: end.into(),
            ..self.clone()
        }
    }

    pub fn with_text<S: Into<String>>(&self, text: S) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    pub fn with_field<S: Into<String>>(&self, field: CueField, value: S) -> Self {
        match field {
            CueField::Start => self.with_start(value),
            CueField::End => self.with_end(value),
            CueField::Text => self.with_text(value),
        }
    }

    /// Copy with a new start time in seconds (negative clamps to zero)
    pub fn with_start_seconds(&self, seconds: f64) -> Result<Self> {
        Ok(self.with_start(timecode::format(seconds)?))
    }

    /// Copy with a new end time in seconds (negative clamps to zero)
    pub fn with_end_seconds(&self, seconds: f64) -> Result<Self> {
        Ok(self.with_end(timecode::format(seconds)?))
    }

    pub fn field(&self, field: CueField) -> &str {
        match field {
            CueField::Start => &self.start,
            CueField::End => &self.end,
            CueField::Text => &self.text,
        }
    }
}

impl Clone for Cue {
    /// Value copy with the same identity and view flags cleared
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            start: self.start.clone(),
            end: self.end.clone(),
            text: self.text.clone(),
            editing: false,
            highlighted: false,
        }
    }
}

impl PartialEq for Cue {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.text == other.text
    }
}

impl Eq for Cue {}

impl From<RawCue> for Cue {
    fn from(raw: RawCue) -> Self {
        Self::new(raw.start, raw.end, raw.text)
    }
}

impl TimedText for Cue {
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
