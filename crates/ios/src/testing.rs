// In-memory AVPlayer and AVAudioSession doubles

use crate::audio_session::AudioSessionControl;
use crate::engine::{AvPlayerEngine, AvPlayerFactory};
use parking_lot::Mutex;
use std::sync::Arc;
use tandem_core::{AudioError, AudioSource, ItemStatus, NativeTime, Result, SessionId};

pub struct PlayerState {
    pub calls: Vec<String>,
    pub item: Option<AudioSource>,
    pub status: ItemStatus,
    pub playing: bool,
    pub position: NativeTime,
    pub duration: NativeTime,
    pub rate: f32,
    pub volume: f32,
    pub waits_to_minimize_stalling: bool,
    pub status_observers: usize,
    pub end_observers: usize,
    pub created: usize,
    pub fail_create: bool,
    pub fail_status_observer: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            item: None,
            status: ItemStatus::Unknown,
            playing: false,
            position: NativeTime::ZERO_MS,
            duration: NativeTime::ZERO_MS,
            rate: 1.0,
            volume: 1.0,
            waits_to_minimize_stalling: true,
            status_observers: 0,
            end_observers: 0,
            created: 0,
            fail_create: false,
            fail_status_observer: false,
        }
    }
}

impl PlayerState {
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == call).count()
    }

    pub fn seeks(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| c.starts_with("seek"))
            .cloned()
            .collect()
    }
}

pub struct FakeAvPlayer {
    state: Arc<Mutex<PlayerState>>,
}

impl AvPlayerEngine for FakeAvPlayer {
    fn replace_item(&mut self, source: &AudioSource) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("replace_item {}", source));
        state.item = Some(source.clone());
        state.status = ItemStatus::Unknown;
        Ok(())
    }

    fn clear_item(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("clear_item".into());
        state.item = None;
        Ok(())
    }

    fn has_item(&self) -> bool {
        self.state.lock().item.is_some()
    }

    fn item_status(&self) -> ItemStatus {
        self.state.lock().status.clone()
    }

    fn set_automatically_waits_to_minimize_stalling(&mut self, waits: bool) {
        self.state.lock().waits_to_minimize_stalling = waits;
    }

    fn add_status_observer(&mut self, _session: SessionId) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_status_observer {
            return Err(AudioError::Native("addObserver:forKeyPath: raised".into()));
        }
        state.status_observers += 1;
        Ok(())
    }

    fn remove_status_observer(&mut self, _session: SessionId) -> Result<()> {
        let mut state = self.state.lock();
        if state.status_observers == 0 {
            return Err(AudioError::Native("status observer was not registered".into()));
        }
        state.status_observers -= 1;
        Ok(())
    }

    fn add_end_observer(&mut self, _session: SessionId) -> Result<()> {
        self.state.lock().end_observers += 1;
        Ok(())
    }

    fn remove_end_observer(&mut self, _session: SessionId) -> Result<()> {
        let mut state = self.state.lock();
        state.end_observers = state.end_observers.saturating_sub(1);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("play".into());
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push("pause".into());
        state.playing = false;
        Ok(())
    }

    fn seek(&mut self, time: NativeTime) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(format!("seek {}/{}", time.value, time.timescale));
        state.position = time;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn current_time(&self) -> NativeTime {
        self.state.lock().position
    }

    fn duration(&self) -> NativeTime {
        self.state.lock().duration
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.state.lock().rate = rate;
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.state.lock().volume = volume;
        Ok(())
    }
}

/// Hands out players that all share one recorded state.
#[derive(Clone, Default)]
pub struct FakeAvFactory {
    pub state: Arc<Mutex<PlayerState>>,
}

impl AvPlayerFactory for FakeAvFactory {
    fn create(&self, _session: SessionId, source: &AudioSource) -> Result<Box<dyn AvPlayerEngine>> {
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(AudioError::Native("unsupported asset".into()));
        }
        state.created += 1;
        state.calls.push(format!("create {}", source));
        state.item = Some(source.clone());
        state.status = ItemStatus::Unknown;
        Ok(Box::new(FakeAvPlayer {
            state: self.state.clone(),
        }))
    }
}

#[derive(Default)]
pub struct AudioSessionState {
    pub port: Option<String>,
    pub calls: Vec<String>,
    pub fail_category: bool,
}

#[derive(Clone, Default)]
pub struct FakeAudioSession {
    pub state: Arc<Mutex<AudioSessionState>>,
}

impl FakeAudioSession {
    pub fn with_port(port: &str) -> Self {
        let session = Self::default();
        session.state.lock().port = Some(port.to_string());
        session
    }
}

impl AudioSessionControl for FakeAudioSession {
    fn current_output_port(&self) -> Option<String> {
        self.state.lock().port.clone()
    }

    fn set_category_play_and_record(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_category {
            return Err(AudioError::Native("AVAudioSessionErrorCodeCannotStartPlaying".into()));
        }
        state.calls.push("set_category_play_and_record".into());
        Ok(())
    }

    fn override_output_to_speaker(&mut self) -> Result<()> {
        self.state.lock().calls.push("override_output_to_speaker".into());
        Ok(())
    }

    fn set_active(&mut self, active: bool) -> Result<()> {
        self.state.lock().calls.push(format!("set_active {}", active));
        Ok(())
    }
}
