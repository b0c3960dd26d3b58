//! Subweave - Subtitle Timeline Engine
//!
//! Reads SRT, ASS and WebVTT into an ordered, editable list of cues, keeps
//! undo history, and keeps a waveform view's draggable regions in sync with
//! the cue table. Output is a WebVTT caption track or SRT-shaped text.

pub mod codec;
pub mod config;
pub mod cue;
pub mod error;
pub mod history;
pub mod logging;
pub mod session;
pub mod storage;
pub mod sync;
pub mod timecode;
pub mod timeline;

pub use config::Config;
pub use cue::{Cue, CueField, CueId};
pub use error::{Result, SubweaveError};
pub use session::{SavedFile, Session};
pub use timeline::{CaptionTrack, Timeline, ValidationWarning};
