// Timeline to waveform region bridge
//
// The waveform view draws one region per cue and lets the user drag and
// resize them independently of the cue table. RegionSync keeps both sides
// consistent:
// - project: clear every host region, then add one per cue
// - fold: turn a region event back into a timeline edit or a signal
//
// Regions carry the cue's stable id, so an event can never address the
// wrong cue after rows were inserted or removed.

pub mod host;
pub mod seek;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use host::{RecordingHost, WaveformHost};
pub use seek::{SeekCommand, SeekScheduler};

use crate::codec::escape_html;
use crate::config::SyncConfig;
use crate::cue::{Cue, CueId};
use crate::error::Result;
use crate::timeline::Timeline;

/// Waveform projection of one cue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Stable cue id in string form
    pub id: String,
    /// Row of the cue when the region was projected
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub label: String,
    pub color: String,
}

impl Region {
    /// Label escaped for hosts that render it as markup
    pub fn html_label(&self) -> String {
        escape_html(&self.label)
    }
}

/// Player state sampled when a region is clicked
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaybackState {
    pub playing: bool,
    pub current_time: f64,
    /// Media duration, `None` while unknown
    pub duration: Option<f64>,
}

/// User interaction reported by the waveform host
#[derive(Debug, Clone, PartialEq)]
pub enum RegionEvent {
    Entered { id: String },
    Clicked { id: String, playback: PlaybackState },
    Resized { id: String, start: f64, end: f64 },
    Moved { id: String, start: f64, end: f64 },
}

impl RegionEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Entered { id } | Self::Clicked { id, .. } => id,
            Self::Resized { id, .. } | Self::Moved { id, .. } => id,
        }
    }
}

/// Outcome reported back to the embedding application
#[derive(Debug, Clone, PartialEq)]
pub enum SyncSignal {
    /// Highlight and scroll to this table row
    Highlight { index: usize },
    /// Row was rewritten from region bounds
    CueUpdated { index: usize },
    SeekScheduled { target: f64 },
    /// Clicked cue starts after the end of the media
    SeekBeyondDuration { target: f64, duration: f64 },
}

/// What a region event asks the session to do
#[derive(Debug, Clone, PartialEq)]
pub enum FoldAction {
    /// Replace the cue at `index` through the history-recording path
    Update { index: usize, cue: Cue },
    Signal(SyncSignal),
    Seek(SeekCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Projected { generation: u64 },
}

/// Random translucent color in the `rgba(r, g, b, a)` form hosts accept
pub fn random_color(alpha: f64) -> String {
    let mut rng = rand::thread_rng();
    format!(
        "rgba({}, {}, {}, {})",
        rng.gen_range(0..=255u8),
        rng.gen_range(0..=255u8),
        rng.gen_range(0..=255u8),
        alpha
    )
}

pub struct RegionSync {
    host: Box<dyn WaveformHost>,
    config: SyncConfig,
    state: SyncState,
    regions: Vec<Region>,
}

impl RegionSync {
    pub fn new(host: Box<dyn WaveformHost>, config: SyncConfig) -> Self {
        Self {
            host,
            config,
            state: SyncState::Idle,
            regions: Vec::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Regions of the current projection
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Rebuild every host region from the timeline
    ///
    /// Cues with unreadable times get no region.
    pub fn project(&mut self, timeline: &Timeline) {
        self.host.clear_regions();
        self.regions.clear();

        for (index, cue) in timeline.cues().iter().enumerate() {
            let (Ok(start), Ok(end)) = (cue.start_seconds(), cue.end_seconds()) else {
                debug!("No region for cue {} with unreadable times", index + 1);
                continue;
            };

            let region = Region {
                id: cue.id().to_string(),
                index,
                start_seconds: start,
                end_seconds: end,
                label: cue.text.clone(),
                color: random_color(self.config.region_alpha),
            };
            self.host.add_region(region.clone());
            self.regions.push(region);
        }

        let generation = match self.state {
            SyncState::Idle => 1,
            SyncState::Projected { generation } => generation + 1,
        };
        self.state = SyncState::Projected { generation };
        debug!("Projected {} regions (generation {})", self.regions.len(), generation);
    }

    /// Remove every region and go back to idle
    pub fn reset(&mut self) {
        self.host.clear_regions();
        self.regions.clear();
        self.state = SyncState::Idle;
    }

    /// Interpret a region event against the timeline
    ///
    /// Events for regions outside the current projection are stale and yield
    /// no action.
    pub fn fold(&mut self, event: &RegionEvent, timeline: &Timeline) -> Result<Vec<FoldAction>> {
        let Some(region) = self.regions.iter().find(|r| r.id == event.id()).cloned() else {
            debug!("Dropping event for stale region {}", event.id());
            return Ok(Vec::new());
        };
        let Some((id, index)) = CueId::parse(&region.id)
            .and_then(|id| timeline.position_of(id).map(|index| (id, index)))
        else {
            debug!("Dropping event for region {} with no matching cue", region.id);
            return Ok(Vec::new());
        };

        match event {
            RegionEvent::Entered { .. } => Ok(vec![FoldAction::Signal(SyncSignal::Highlight { index })]),
            RegionEvent::Clicked { playback, .. } => Ok(self.click(&region, index, playback)),
            RegionEvent::Resized { start, end, .. } | RegionEvent::Moved { start, end, .. } => {
                let Some(current) = timeline.get_by_id(id) else {
                    return Ok(Vec::new());
                };
                let cue = current.with_start_seconds(*start)?.with_end_seconds(*end)?;
                info!("Region {} moved to {} --> {}", index + 1, cue.start, cue.end);
                Ok(vec![FoldAction::Update { index, cue }])
            }
        }
    }

    fn click(&mut self, region: &Region, index: usize, playback: &PlaybackState) -> Vec<FoldAction> {
        let mut actions = vec![FoldAction::Signal(SyncSignal::Highlight { index })];

        let color = random_color(self.config.region_alpha);
        self.host.set_region_color(&region.id, &color);
        if let Some(projected) = self.regions.iter_mut().find(|r| r.id == region.id) {
            projected.color = color;
        }

        let target = region.start_seconds + self.config.seek_epsilon;
        let Some(duration) = playback.duration else {
            debug!("Media duration unknown, not seeking");
            return actions;
        };
        if playback.playing || target <= 0.0 || target == playback.current_time {
            return actions;
        }

        if target > duration {
            actions.push(FoldAction::Signal(SyncSignal::SeekBeyondDuration { target, duration }));
        } else {
            actions.push(FoldAction::Seek(SeekCommand {
                target,
                play: self.config.play_after_seek,
            }));
        }
        actions
    }
}
