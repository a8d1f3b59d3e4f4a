// In-memory MediaPlayer and AudioManager doubles

use crate::engine::{MediaPlayerEngine, MediaPlayerFactory};
use crate::focus::AudioFocusManager;
use parking_lot::Mutex;
use std::sync::Arc;
use tandem_core::{AudioError, Result, SessionId};

#[derive(Default)]
pub struct EngineState {
    pub calls: Vec<String>,
    pub playing: bool,
    pub duration_ms: i64,
    pub position_ms: i64,
    pub volume: Option<f32>,
    pub speed: Option<f32>,
    pub fail_data_source: bool,
    pub fail_stop: bool,
    pub fail_create: bool,
    pub created: usize,
}

impl EngineState {
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn seeks(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| c.starts_with("seek_to"))
            .cloned()
            .collect()
    }
}

pub struct FakeEngine {
    state: Arc<Mutex<EngineState>>,
}

impl FakeEngine {
    fn record(&self, call: impl Into<String>) {
        self.state.lock().calls.push(call.into());
    }
}

impl MediaPlayerEngine for FakeEngine {
    fn set_music_stream_type(&mut self) -> Result<()> {
        self.record("set_music_stream_type");
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("reset".into());
        state.playing = false;
        Ok(())
    }

    fn set_data_source(&mut self, source: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("set_data_source {}", source));
        if state.fail_data_source {
            return Err(AudioError::Native("setDataSource failed".into()));
        }
        Ok(())
    }

    fn prepare(&mut self) -> Result<()> {
        self.record("prepare");
        Ok(())
    }

    fn prepare_async(&mut self) -> Result<()> {
        self.record("prepare_async");
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("start".into());
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("pause".into());
        state.playing = false;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("stop".into());
        state.playing = false;
        if state.fail_stop {
            return Err(AudioError::Native("stop called in invalid state".into()));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.record("release");
        Ok(())
    }

    fn seek_to(&mut self, position_ms: i64) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("seek_to {}", position_ms));
        state.position_ms = position_ms;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn duration_ms(&self) -> i64 {
        self.state.lock().duration_ms
    }

    fn current_position_ms(&self) -> i64 {
        self.state.lock().position_ms
    }

    fn set_volume(&mut self, left: f32, _right: f32) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("set_volume {}", left));
        state.volume = Some(left);
        Ok(())
    }

    fn set_playback_speed(&mut self, speed: f32) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("set_playback_speed {}", speed));
        state.speed = Some(speed);
        // setPlaybackParams starts the player
        state.playing = true;
        Ok(())
    }
}

/// Hands out engines that all share one recorded state.
#[derive(Clone, Default)]
pub struct FakeFactory {
    pub state: Arc<Mutex<EngineState>>,
}

impl MediaPlayerFactory for FakeFactory {
    fn create(&self, _session: SessionId) -> Result<Box<dyn MediaPlayerEngine>> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(AudioError::Native("MediaPlayer() threw".into()));
        }
        state.created += 1;
        drop(state);
        Ok(Box::new(FakeEngine {
            state: self.state.clone(),
        }))
    }
}

pub struct FocusManagerState {
    pub grant: bool,
    pub requests: usize,
    pub abandons: usize,
    pub stream_volume: u32,
    pub sdk: u32,
    pub volume_control_stream: bool,
    pub noisy_registered: bool,
}

impl Default for FocusManagerState {
    fn default() -> Self {
        Self {
            grant: true,
            requests: 0,
            abandons: 0,
            stream_volume: 15,
            sdk: 28,
            volume_control_stream: false,
            noisy_registered: false,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeFocusManager {
    pub state: Arc<Mutex<FocusManagerState>>,
}

impl AudioFocusManager for FakeFocusManager {
    fn request_focus(&mut self, _session: SessionId) -> Result<bool> {
        let mut state = self.state.lock();
        state.requests += 1;
        Ok(state.grant)
    }

    fn abandon_focus(&mut self, _session: SessionId) -> Result<bool> {
        self.state.lock().abandons += 1;
        Ok(true)
    }

    fn music_stream_volume(&self) -> u32 {
        self.state.lock().stream_volume
    }

    fn sdk_version(&self) -> u32 {
        self.state.lock().sdk
    }

    fn set_volume_control_stream(&mut self) -> Result<()> {
        self.state.lock().volume_control_stream = true;
        Ok(())
    }

    fn register_noisy_receiver(&mut self, _session: SessionId) -> Result<()> {
        self.state.lock().noisy_registered = true;
        Ok(())
    }

    fn unregister_noisy_receiver(&mut self, _session: SessionId) -> Result<()> {
        self.state.lock().noisy_registered = false;
        Ok(())
    }
}
