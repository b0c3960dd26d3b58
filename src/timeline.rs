use serde::Serialize;
use std::borrow::Cow;
use tracing::debug;
use uuid::Uuid;

use crate::codec::{to_srt, to_vtt};
use crate::cue::{Cue, CueId};
use crate::error::{Result, SubweaveError};

/// A cue flagged by the legality check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    pub index: usize,
    pub id: CueId,
    pub message: String,
}

/// Loadable WebVTT buffer for the player's caption track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionTrack {
    url: String,
    content: Vec<u8>,
}

impl CaptionTrack {
    pub const MIME_TYPE: &'static str = "text/vtt";

    /// Wrap WebVTT text under a fresh object URL
    pub fn from_vtt(vtt: String) -> Self {
        Self {
            url: format!("blob:subweave/{}", Uuid::new_v4()),
            content: vtt.into_bytes(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    pub fn mime_type(&self) -> &'static str {
        Self::MIME_TYPE
    }
}

/// Ordered cue list backing the editor
///
/// Order is display order and is never re-sorted; overlapping or
/// out-of-order cues are kept and only reported by [`Timeline::validate_at`].
/// Positions shift only on insert and remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    cues: Vec<Cue>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cues(cues: Vec<Cue>) -> Self {
        Self { cues }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    pub fn position_of(&self, id: CueId) -> Option<usize> {
        self.cues.iter().position(|cue| cue.id() == id)
    }

    pub fn get_by_id(&self, id: CueId) -> Option<&Cue> {
        self.cues.iter().find(|cue| cue.id() == id)
    }

    /// Replace the whole contents, e.g. after a file load
    pub fn seed(&mut self, cues: Vec<Cue>) {
        debug!("Seeding timeline with {} cues", cues.len());
        self.cues = cues;
    }

    pub fn clear(&mut self) {
        self.cues.clear();
    }

    /// Deep copy of the cue list
    pub fn snapshot(&self) -> Vec<Cue> {
        self.cues.clone()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.cues.len() {
            Ok(())
        } else {
            Err(SubweaveError::IndexOutOfRange {
                index,
                len: self.cues.len(),
            })
        }
    }

    /// Replace the cue at `index`, returning the previous one
    pub fn update_at(&mut self, index: usize, cue: Cue) -> Result<Cue> {
        self.check_index(index)?;
        Ok(std::mem::replace(&mut self.cues[index], cue))
    }

    /// Insert before `index`; `index == len` appends
    pub fn insert_at(&mut self, index: usize, cue: Cue) -> Result<()> {
        if index > self.cues.len() {
            return Err(SubweaveError::IndexOutOfRange {
                index,
                len: self.cues.len(),
            });
        }
        self.cues.insert(index, cue);
        Ok(())
    }

    /// Remove the cue at `index`; later cues move down by one
    pub fn remove_at(&mut self, index: usize) -> Result<Cue> {
        self.check_index(index)?;
        Ok(self.cues.remove(index))
    }

    /// Mark one cue as highlighted and clear the flag on the rest
    pub fn highlight(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        for (i, cue) in self.cues.iter_mut().enumerate() {
            cue.highlighted = i == index;
        }
        Ok(())
    }

    /// Legality check for the row at `index`
    ///
    /// A cue is legal when it starts at or before the end of the cue right
    /// before it, or when it is valid on its own. Only cues failing both are
    /// flagged.
    pub fn validate_at(&self, index: usize) -> Result<Option<ValidationWarning>> {
        self.check_index(index)?;
        let cue = &self.cues[index];

        let overlaps_previous = index
            .checked_sub(1)
            .and_then(|prev| self.cues.get(prev))
            .is_some_and(|previous| match (cue.start_seconds(), previous.end_seconds()) {
                (Ok(start), Ok(prev_end)) => start <= prev_end,
                _ => false,
            });

        if overlaps_previous || cue.is_valid() {
            return Ok(None);
        }

        Ok(Some(ValidationWarning {
            index,
            id: cue.id(),
            message: format!(
                "Cue {} is invalid: '{}' --> '{}' needs readable times, start before end, and text",
                index + 1,
                cue.start,
                cue.end
            ),
        }))
    }

    /// Run the legality check on every row
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        (0..self.cues.len())
            .filter_map(|index| self.validate_at(index).ok().flatten())
            .collect()
    }

    /// Canonical WebVTT serialization
    pub fn to_vtt(&self) -> String {
        to_vtt(&self.cues)
    }

    /// SRT-shaped text for file save
    pub fn to_srt(&self) -> String {
        to_srt(&self.cues)
    }

    pub fn caption_track(&self) -> CaptionTrack {
        CaptionTrack::from_vtt(self.to_vtt())
    }
}
