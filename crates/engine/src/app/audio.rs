use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BgmTrack {
    MenuScene,
    GameScene,
    EndScene,
}

/// Requests scenes raise for the audio collaborator. Playback itself lives
/// outside the engine; sinks decide what a request means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRequest {
    ResetAudio,
    ChangeBgm(BgmTrack),
}

pub trait AudioSink {
    fn handle(&mut self, request: AudioRequest);
}

/// Sink used by headless runs: records the current track and logs requests.
#[derive(Debug, Default)]
pub struct LoggingAudioSink {
    current_bgm: Option<BgmTrack>,
    reset_count: u32,
}

impl LoggingAudioSink {
    pub fn current_bgm(&self) -> Option<BgmTrack> {
        self.current_bgm
    }

    pub fn reset_count(&self) -> u32 {
        self.reset_count
    }
}

impl AudioSink for LoggingAudioSink {
    fn handle(&mut self, request: AudioRequest) {
        match request {
            AudioRequest::ResetAudio => {
                self.reset_count = self.reset_count.saturating_add(1);
                info!("audio_reset");
            }
            AudioRequest::ChangeBgm(track) => {
                self.current_bgm = Some(track);
                info!(track = ?track, "bgm_changed");
            }
        }
    }
}
