use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::codec::{CodecFactory, base_name};
use crate::config::Config;
use crate::cue::{Cue, CueField, CueId};
use crate::error::{Result, SubweaveError};
use crate::history::HistoryStack;
use crate::storage::{KeyValueStore, StoreFactory};
use crate::timecode;
use crate::sync::{FoldAction, Region, RegionEvent, RegionSync, SeekCommand, SeekScheduler, SyncSignal, WaveformHost};
use crate::timeline::{CaptionTrack, Timeline, ValidationWarning};

/// Subtitle text ready to be written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    pub file_name: String,
    pub content: String,
}

/// Engine state behind one editing surface
///
/// Every content change goes through a session method, which records undo
/// history, mirrors the cues into the store, rebuilds the waveform regions
/// and returns the regenerated caption track.
pub struct Session {
    config: Config,
    timeline: Timeline,
    history: HistoryStack,
    regions: RegionSync,
    store: Box<dyn KeyValueStore>,
    seeker: SeekScheduler,
    original_name: Option<String>,
    caption_track: Option<CaptionTrack>,
}

impl Session {
    /// Create a session, restoring cues left in the store by an earlier one
    pub fn new(config: Config, host: Box<dyn WaveformHost>, store: Box<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;

        let mut session = Self {
            timeline: Timeline::new(),
            history: HistoryStack::new(config.history.capacity),
            regions: RegionSync::new(host, config.sync.clone()),
            seeker: SeekScheduler::new(config.sync.seek_delay()),
            store,
            original_name: None,
            caption_track: None,
            config,
        };

        let restored = session.load_stored_cues()?;
        if !restored.is_empty() {
            info!("Restored {} cues from storage", restored.len());
            session.timeline.seed(restored);
            session.refresh();
        }

        Ok(session)
    }

    /// Session backed by the configured JSON file store
    pub fn with_file_store(config: Config, host: Box<dyn WaveformHost>) -> Result<Self> {
        let store = StoreFactory::create_file_store(&config.storage);
        Self::new(config, host, store)
    }

    fn load_stored_cues(&self) -> Result<Vec<Cue>> {
        let Some(value) = self.store.get(&self.config.storage.key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_value::<Vec<Cue>>(value) {
            Ok(cues) => Ok(cues),
            Err(e) => {
                warn!("Ignoring unreadable stored cues: {}", e);
                Ok(Vec::new())
            }
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn regions(&self) -> &[Region] {
        self.regions.regions()
    }

    /// Current caption track, `None` until subtitles are loaded
    pub fn caption_track(&self) -> Option<&CaptionTrack> {
        self.caption_track.as_ref()
    }

    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    /// Stream of seeks for the media player; only the first call gets it
    pub fn take_seek_receiver(&mut self) -> Option<UnboundedReceiver<SeekCommand>> {
        self.seeker.take_receiver()
    }

    /// The player finished loading the latest caption track
    pub fn caption_track_ready(&self) {
        self.seeker.notify_ready();
    }

    /// Replace the timeline with the contents of an uploaded subtitle file
    ///
    /// The format follows the file extension. On a parse error the current
    /// timeline is kept. A file without any cue is ignored and yields `None`.
    pub fn load_subtitles(&mut self, file_name: &str, text: &str) -> Result<Option<CaptionTrack>> {
        let parser = CodecFactory::parser_for_file(file_name);
        info!("Loading {} subtitles from {}", parser.format().as_str(), file_name);

        let cues: Vec<Cue> = parser.parse(text)?.into_iter().map(Cue::from).collect();
        if cues.is_empty() {
            warn!("No cues found in {}, keeping current subtitles", file_name);
            return Ok(None);
        }

        info!("Loaded {} cues from {}", cues.len(), file_name);
        self.original_name = Some(file_name.to_string());
        self.timeline.seed(cues);
        self.persist();
        Ok(Some(self.refresh()))
    }

    /// Forget everything about the previous video and its subtitles
    pub fn load_video(&mut self) {
        info!("New video loaded, clearing subtitles");
        self.seeker.cancel();
        self.timeline.clear();
        self.history.clear();
        self.regions.reset();
        self.caption_track = None;
        self.original_name = None;

        if let Err(e) = self.store.del(&self.config.storage.key) {
            warn!("Failed to delete stored cues: {}", e);
        }
    }

    fn ensure_index(&self, index: usize) -> Result<()> {
        if index < self.timeline.len() {
            Ok(())
        } else {
            Err(SubweaveError::IndexOutOfRange {
                index,
                len: self.timeline.len(),
            })
        }
    }

    fn index_of(&self, id: CueId) -> Result<usize> {
        self.timeline
            .position_of(id)
            .ok_or_else(|| SubweaveError::CueNotFound(id.to_string()))
    }

    /// Both time codes of an incoming cue must be readable
    fn check_times(cue: &Cue) -> Result<()> {
        timecode::parse(&cue.start)?;
        timecode::parse(&cue.end)?;
        Ok(())
    }

    /// Replace one cue, recording the previous state for undo
    pub fn update_at(&mut self, index: usize, cue: Cue) -> Result<CaptionTrack> {
        self.ensure_index(index)?;
        Self::check_times(&cue)?;
        self.history.push(self.timeline.cues());
        self.timeline.update_at(index, cue)?;
        debug!("Updated cue {}", index + 1);
        self.persist();
        Ok(self.refresh())
    }

    /// Same as [`Session::update_at`], addressing the cue by id
    pub fn update_cue(&mut self, id: CueId, cue: Cue) -> Result<CaptionTrack> {
        let index = self.index_of(id)?;
        self.update_at(index, cue)
    }

    /// Apply one table cell edit
    pub fn edit_cell<S: Into<String>>(&mut self, index: usize, field: CueField, value: S) -> Result<CaptionTrack> {
        let cue = self
            .timeline
            .get(index)
            .ok_or(SubweaveError::IndexOutOfRange {
                index,
                len: self.timeline.len(),
            })?
            .with_field(field, value);
        self.update_at(index, cue)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<CaptionTrack> {
        self.ensure_index(index)?;
        self.history.push(self.timeline.cues());
        let removed = self.timeline.remove_at(index)?;
        info!("Removed cue {} ({} --> {})", index + 1, removed.start, removed.end);
        self.persist();
        Ok(self.refresh())
    }

    pub fn remove_cue(&mut self, id: CueId) -> Result<CaptionTrack> {
        let index = self.index_of(id)?;
        self.remove_at(index)
    }

    /// Insert a cue before `index`; `index == len` appends
    pub fn insert_at(&mut self, index: usize, cue: Cue) -> Result<CaptionTrack> {
        if index > self.timeline.len() {
            return Err(SubweaveError::IndexOutOfRange {
                index,
                len: self.timeline.len(),
            });
        }
        Self::check_times(&cue)?;
        self.history.push(self.timeline.cues());
        self.timeline.insert_at(index, cue)?;
        info!("Inserted cue at {}", index + 1);
        self.persist();
        Ok(self.refresh())
    }

    /// Step back through history
    ///
    /// With nothing to go back to, [`SubweaveError::HistoryEmpty`] is
    /// returned and the timeline is left as is.
    pub fn undo(&mut self) -> Result<CaptionTrack> {
        let cues = self.history.pop_and_restore()?;
        info!("Undo restored {} cues", cues.len());
        self.timeline.seed(cues);
        self.persist();
        Ok(self.refresh())
    }

    pub fn validate_at(&self, index: usize) -> Result<Option<ValidationWarning>> {
        self.timeline.validate_at(index)
    }

    pub fn warnings(&self) -> Vec<ValidationWarning> {
        self.timeline.warnings()
    }

    /// SRT-shaped text named after the uploaded file
    pub fn export_srt(&self) -> SavedFile {
        let base = self
            .original_name
            .as_deref()
            .map(base_name)
            .unwrap_or(self.config.export.default_name.as_str());

        SavedFile {
            file_name: format!("{}.srt", base),
            content: self.timeline.to_srt(),
        }
    }

    /// Apply an interaction from the waveform view
    ///
    /// Region moves become ordinary cue updates with undo history. Clicks
    /// may schedule a seek, which requires a tokio runtime; without one the
    /// seek is skipped and the other signals are still returned.
    pub fn handle_region_event(&mut self, event: RegionEvent) -> Result<Vec<SyncSignal>> {
        let actions = self.regions.fold(&event, &self.timeline)?;
        let mut signals = Vec::with_capacity(actions.len());

        for action in actions {
            match action {
                FoldAction::Update { index, cue } => {
                    self.update_at(index, cue)?;
                    signals.push(SyncSignal::CueUpdated { index });
                }
                FoldAction::Signal(signal) => {
                    if let SyncSignal::Highlight { index } = signal {
                        self.timeline.highlight(index)?;
                    }
                    if let SyncSignal::SeekBeyondDuration { target, duration } = signal {
                        warn!("Cue starts at {:.3}s, beyond media duration {:.3}s", target, duration);
                    }
                    signals.push(signal);
                }
                FoldAction::Seek(command) => match self.seeker.schedule(command) {
                    Ok(()) => signals.push(SyncSignal::SeekScheduled { target: command.target }),
                    Err(e) => warn!("Seek to {:.3} not scheduled: {}", command.target, e),
                },
            }
        }

        Ok(signals)
    }

    /// Mirror the cue list into the store
    fn persist(&mut self) {
        let result = serde_json::to_value(self.timeline.cues())
            .map_err(SubweaveError::from)
            .and_then(|value| self.store.set(&self.config.storage.key, value));

        if let Err(e) = result {
            warn!("Failed to persist cues: {}", e);
        }
    }

    /// Rebuild regions and the caption track after a content change
    fn refresh(&mut self) -> CaptionTrack {
        self.regions.project(&self.timeline);
        let track = self.timeline.caption_track();
        self.caption_track = Some(track.clone());
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{JsonFileStore, MemoryStore};
    use crate::sync::host::MockWaveformHost;
    use crate::sync::{PlaybackState, RecordingHost};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const SRT: &str = "1\n00:00:01,000 --> 00:00:04,000\nFirst\n\n2\n00:00:05,000 --> 00:00:08,000\nSecond\n\n3\n00:00:09,000 --> 00:00:12,000\nThird\n";

    fn session() -> Session {
        let mut config = Config::default();
        config.sync.seek_delay_ms = 20;
        Session::new(config, Box::new(RecordingHost::default()), Box::new(MemoryStore::new())).unwrap()
    }

    fn loaded() -> Session {
        let mut session = session();
        session.load_subtitles("movie.srt", SRT).unwrap();
        session
    }

    fn texts(session: &Session) -> Vec<String> {
        session.timeline().cues().iter().map(|c| c.text.clone()).collect()
    }

    #[test]
    fn test_load_subtitles() {
        let mut session = session();
        let track = session.load_subtitles("movie.srt", SRT).unwrap().unwrap();

        assert_eq!(session.timeline().len(), 3);
        assert_eq!(session.timeline().get(0).unwrap().start, "00:00:01.000");
        assert_eq!(session.regions().len(), 3);
        assert_eq!(session.history_len(), 0);
        assert_eq!(session.original_name(), Some("movie.srt"));
        assert!(track.text().starts_with("WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000\nFirst"));
        assert_eq!(session.caption_track(), Some(&track));
    }

    #[test]
    fn test_load_projects_through_host() {
        let mut host = MockWaveformHost::new();
        host.expect_clear_regions().times(1).return_const(());
        host.expect_add_region().times(3).return_const(());

        let mut session = Session::new(Config::default(), Box::new(host), Box::new(MemoryStore::new())).unwrap();
        session.load_subtitles("movie.srt", SRT).unwrap();
    }

    #[test]
    fn test_load_ass_and_vtt() {
        let mut session = session();
        session
            .load_subtitles("show.ass", "Dialogue: 0,0:00:01.00,0:00:05.00,Default,,0,0,0,,Hello")
            .unwrap();
        assert_eq!(texts(&session), vec!["Hello"]);

        session
            .load_subtitles("show.vtt?x=1", "WEBVTT\n\n00:01.000 --> 00:02.000\n{\\an8}Hi\n")
            .unwrap();
        assert_eq!(texts(&session), vec!["Hi"]);
        assert_eq!(session.timeline().get(0).unwrap().start, "00:00:01.000");
    }

    #[test]
    fn test_failed_load_keeps_previous_timeline() {
        let mut session = loaded();
        let before = session.timeline().clone();

        let err = session
            .load_subtitles("broken.srt", "1\n00:00:xx,000 --> 00:00:02,000\nBad\n")
            .unwrap_err();
        assert!(err.is_format_error());
        assert_eq!(session.timeline(), &before);
        assert_eq!(session.original_name(), Some("movie.srt"));
    }

    #[test]
    fn test_empty_upload_is_ignored() {
        let mut session = loaded();
        let result = session.load_subtitles("empty.ass", "[Script Info]\nTitle: none\n").unwrap();
        assert!(result.is_none());
        assert_eq!(session.timeline().len(), 3);
    }

    #[test]
    fn test_update_records_history_and_persists() {
        let mut session = loaded();
        let cue = session.timeline().get(1).unwrap().with_text("Changed");

        let track = assert_ok!(session.update_at(1, cue));
        assert_eq!(session.history_len(), 1);
        assert!(track.text().contains("Changed"));
        assert_eq!(session.regions()[1].label, "Changed");

        let stored = session.store.get("subtitles").unwrap().unwrap();
        assert_eq!(stored[1]["text"], "Changed");
    }

    #[test]
    fn test_update_out_of_range_changes_nothing() {
        let mut session = loaded();
        let cue = Cue::new("00:00:01.000", "00:00:02.000", "x");

        let err = assert_err!(session.update_at(3, cue));
        assert!(err.is_precondition_violation());
        assert_eq!(session.history_len(), 0);
        assert!(session.edit_cell(9, CueField::Text, "x").is_err());
        assert!(session.remove_at(3).is_err());
        assert!(session.insert_at(4, Cue::new("", "", "")).is_err());
        assert!(matches!(
            session.remove_cue(CueId::new()),
            Err(SubweaveError::CueNotFound(_))
        ));
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn test_undo_restores_two_pushes_back() {
        let mut session = loaded();
        session.edit_cell(0, CueField::Text, "A").unwrap();
        session.edit_cell(0, CueField::Text, "B").unwrap();
        assert_eq!(session.history_len(), 2);

        session.undo().unwrap();
        assert_eq!(texts(&session)[0], "First");
        assert_eq!(session.history_len(), 1);

        let before = session.timeline().clone();
        assert!(matches!(session.undo(), Err(SubweaveError::HistoryEmpty)));
        assert_eq!(session.timeline(), &before);
    }

    #[test]
    fn test_unreadable_time_edit_changes_nothing() {
        let mut session = loaded();
        let before = session.timeline().clone();

        let err = session.edit_cell(0, CueField::Start, "garbage").unwrap_err();
        assert!(matches!(err, SubweaveError::InvalidTime(ref t) if t == "garbage"));
        assert!(session.insert_at(0, Cue::new("00:00:00.000", "soon", "x")).is_err());

        assert_eq!(session.timeline(), &before);
        assert_eq!(session.history_len(), 0);
        assert_eq!(session.regions().len(), session.timeline().len());
        let stored = session.store.get("subtitles").unwrap().unwrap();
        assert_eq!(stored[0]["start"], "00:00:01.000");
    }

    #[test]
    fn test_click_without_runtime_still_highlights() {
        let mut session = loaded();
        let id = session.regions()[1].id.clone();
        let playback = PlaybackState {
            playing: false,
            current_time: 0.0,
            duration: Some(60.0),
        };

        let signals = session
            .handle_region_event(RegionEvent::Clicked { id, playback })
            .unwrap();
        assert_eq!(signals, vec![SyncSignal::Highlight { index: 1 }]);
        assert!(session.timeline().get(1).unwrap().highlighted);
    }

    #[test]
    fn test_undo_with_no_history() {
        let mut session = loaded();
        let before = session.timeline().clone();
        assert!(matches!(session.undo(), Err(SubweaveError::HistoryEmpty)));
        assert_eq!(session.timeline(), &before);
    }

    #[test]
    fn test_history_is_capped() {
        let mut config = Config::default();
        config.history.capacity = 5;
        let mut session = Session::new(config, Box::new(RecordingHost::default()), Box::new(MemoryStore::new())).unwrap();
        session.load_subtitles("movie.srt", SRT).unwrap();

        for i in 0..8 {
            session.edit_cell(0, CueField::Text, format!("edit {}", i)).unwrap();
        }
        assert_eq!(session.history_len(), 5);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut session = loaded();
        session
            .insert_at(1, Cue::new("00:00:04.500", "00:00:04.900", "Inserted"))
            .unwrap();
        assert_eq!(texts(&session), vec!["First", "Inserted", "Second", "Third"]);
        assert_eq!(session.regions().len(), 4);

        let id = session.timeline().get(0).unwrap().id();
        session.remove_cue(id).unwrap();
        assert_eq!(texts(&session), vec!["Inserted", "Second", "Third"]);
        assert_eq!(session.regions()[0].index, 0);
        assert_eq!(session.history_len(), 2);
    }

    #[test]
    fn test_resize_folds_into_one_update() {
        let mut session = loaded();
        let id = session.regions()[2].id.clone();

        let signals = session
            .handle_region_event(RegionEvent::Resized { id, start: 9.5, end: 13.25 })
            .unwrap();

        assert_eq!(signals, vec![SyncSignal::CueUpdated { index: 2 }]);
        assert_eq!(session.history_len(), 1);

        let cue = session.timeline().get(2).unwrap();
        assert_eq!(cue.start, "00:00:09.500");
        assert_eq!(cue.end, "00:00:13.250");
        assert_eq!(cue.text, "Third");
        assert_eq!(session.regions()[2].start_seconds, 9.5);
        assert_eq!(session.regions()[2].end_seconds, 13.25);
    }

    #[test]
    fn test_region_ids_survive_removal() {
        let mut session = loaded();
        let removed_id = session.regions()[0].id.clone();
        let third_id = session.regions()[2].id.clone();

        session.remove_at(0).unwrap();

        let stale = session
            .handle_region_event(RegionEvent::Entered { id: removed_id })
            .unwrap();
        assert!(stale.is_empty());

        let signals = session
            .handle_region_event(RegionEvent::Entered { id: third_id })
            .unwrap();
        assert_eq!(signals, vec![SyncSignal::Highlight { index: 1 }]);
        assert!(session.timeline().get(1).unwrap().highlighted);
    }

    #[tokio::test]
    async fn test_click_schedules_seek() {
        let mut session = loaded();
        let mut receiver = session.take_seek_receiver().unwrap();
        let id = session.regions()[1].id.clone();
        let playback = PlaybackState {
            playing: false,
            current_time: 0.0,
            duration: Some(60.0),
        };

        let signals = session
            .handle_region_event(RegionEvent::Clicked { id, playback })
            .unwrap();
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0], SyncSignal::Highlight { index: 1 });
        assert!(matches!(signals[1], SyncSignal::SeekScheduled { target } if (target - 5.001).abs() < 1e-9));

        let command = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert!((command.target - 5.001).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_caption_track_ready_releases_seek() {
        let mut config = Config::default();
        config.sync.seek_delay_ms = 60_000;
        config.sync.play_after_seek = true;
        let mut session = Session::new(config, Box::new(RecordingHost::default()), Box::new(MemoryStore::new())).unwrap();
        session.load_subtitles("movie.srt", SRT).unwrap();
        let mut receiver = session.take_seek_receiver().unwrap();
        let id = session.regions()[0].id.clone();

        session
            .handle_region_event(RegionEvent::Clicked {
                id,
                playback: PlaybackState {
                    playing: false,
                    current_time: 30.0,
                    duration: Some(60.0),
                },
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.caption_track_ready();

        let command = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(command.play);
    }

    #[test]
    fn test_validation_through_session() {
        let mut session = loaded();
        session.edit_cell(2, CueField::End, "00:00:08.500").unwrap();

        let warnings = session.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].index, 2);
        assert!(session.validate_at(0).unwrap().is_none());
    }

    #[test]
    fn test_export_srt_names() {
        let mut session = session();
        assert_eq!(session.export_srt().file_name, "defaultName.srt");

        session.load_subtitles("holiday.en.vtt", "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHi\n").unwrap();
        let saved = session.export_srt();
        assert_eq!(saved.file_name, "holiday.en.srt");
        assert_eq!(saved.content, "1\n00:00:01.000 --> 00:00:02.000\nHi\n");
    }

    #[test]
    fn test_load_video_resets() {
        let mut session = loaded();
        session.edit_cell(0, CueField::Text, "A").unwrap();

        session.load_video();
        assert!(session.timeline().is_empty());
        assert_eq!(session.history_len(), 0);
        assert!(session.regions().is_empty());
        assert!(session.caption_track().is_none());
        assert_eq!(session.export_srt().file_name, "defaultName.srt");
        assert_eq!(session.store.get("subtitles").unwrap(), None);
    }

    #[test]
    fn test_restores_from_file_store() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.dir = temp.path().to_path_buf();

        {
            let mut first = Session::with_file_store(config.clone(), Box::new(RecordingHost::default())).unwrap();
            first.load_subtitles("movie.srt", SRT).unwrap();
            first.edit_cell(1, CueField::Text, "Kept").unwrap();
        }

        let second = Session::with_file_store(config.clone(), Box::new(RecordingHost::default())).unwrap();
        assert_eq!(texts(&second), vec!["First", "Kept", "Third"]);
        assert_eq!(second.regions().len(), 3);
        assert_eq!(second.history_len(), 0);
        assert!(second.caption_track().is_some());

        let store = JsonFileStore::new(temp.path(), "subplayer_settings");
        assert!(store.path().exists());
    }
}
