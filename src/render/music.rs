use crate::models::Music;
use serde::Serialize;

/// Playback window of the background track. Once playback reaches `end`
/// it jumps back to `start`; an `end` of zero means "play to the end".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoopWindow {
    pub start: f64,
    pub end: f64,
}

impl LoopWindow {
    pub fn from_music(music: &Music) -> Self {
        LoopWindow { start: music.start_time, end: music.end_time }
    }

    pub fn is_bounded(&self) -> bool {
        self.end > 0.0
    }

    /// Where playback should continue from at `position`: `Some(start)` when
    /// the window end was reached, `None` to keep playing.
    pub fn next_position(&self, position: f64) -> Option<f64> {
        if self.is_bounded() && position >= self.end {
            Some(self.start)
        } else {
            None
        }
    }
}

/// Player volume in 0.0..=1.0. Zero is a muted track; unset volumes were
/// already replaced by the default when the document was decoded.
pub fn volume_fraction(volume: u8) -> f64 {
    f64::from(volume.min(100)) / 100.0
}
