// Source readiness state management

use crate::error::{AudioError, Result};

/// Readiness of the currently loaded source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessState {
    /// No source loaded
    #[default]
    Uninitialized,
    /// Source assigned, native preparation in flight
    Preparing,
    /// Source can be played
    Ready,
    /// Preparation failed or timed out
    Error,
}

/// Identifies one source load; a stale token never affects a newer load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadToken(u64);

/// Tracks readiness across loads so that `Ready` fires exactly once per load
#[derive(Debug, Default)]
pub struct ReadinessTracker {
    state: ReadinessState,
    generation: u64,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ReadinessState::Ready
    }

    pub fn is_preparing(&self) -> bool {
        self.state == ReadinessState::Preparing
    }

    pub fn current_token(&self) -> LoadToken {
        LoadToken(self.generation)
    }

    pub fn is_current(&self, token: LoadToken) -> bool {
        token.0 == self.generation
    }

    /// Start a new load, invalidating every earlier token.
    pub fn begin_load(&mut self) -> LoadToken {
        self.generation += 1;
        self.set(ReadinessState::Preparing);
        LoadToken(self.generation)
    }

    /// Returns true only for the first ready signal of the current load.
    pub fn mark_ready(&mut self) -> bool {
        self.transition(ReadinessState::Ready).is_ok()
    }

    pub fn mark_failed(&mut self) -> bool {
        self.transition(ReadinessState::Error).is_ok()
    }

    /// Fail the load identified by `token` if it is still preparing.
    pub fn expire(&mut self, token: LoadToken) -> bool {
        self.is_current(token) && self.is_preparing() && self.mark_failed()
    }

    /// Forget the current source; outstanding tokens become stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.set(ReadinessState::Uninitialized);
    }

    fn set(&mut self, state: ReadinessState) {
        self.state = state;
        log::debug!("Readiness changed to: {:?}", state);
    }

    fn transition(&mut self, to: ReadinessState) -> Result<()> {
        Self::validate_transition(self.state, to)?;
        self.set(to);
        Ok(())
    }

    pub fn validate_transition(from: ReadinessState, to: ReadinessState) -> Result<()> {
        use ReadinessState::*;

        match (from, to) {
            (Uninitialized, Preparing) => Ok(()),
            (Preparing, Ready) => Ok(()),
            (Preparing, Error) => Ok(()),
            (Preparing, Preparing) => Ok(()),
            (Ready, Error) => Ok(()),
            (Ready, Preparing) => Ok(()),
            (Error, Preparing) => Ok(()),
            (_, Uninitialized) => Ok(()),
            _ => Err(AudioError::InvalidState(format!(
                "Invalid readiness transition from {:?} to {:?}",
                from, to
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_fires_once_per_load() {
        let mut tracker = ReadinessTracker::new();
        tracker.begin_load();
        assert!(tracker.mark_ready());
        assert!(!tracker.mark_ready());

        tracker.begin_load();
        assert!(tracker.is_preparing());
        assert!(tracker.mark_ready());
    }

    #[test]
    fn playback_errors_fail_a_ready_source() {
        let mut tracker = ReadinessTracker::new();
        let token = tracker.begin_load();
        tracker.mark_ready();
        assert!(!tracker.expire(token));
        assert!(tracker.mark_failed());
    }

    #[test]
    fn ready_requires_a_load() {
        let mut tracker = ReadinessTracker::new();
        assert!(!tracker.mark_ready());
        assert_eq!(tracker.state(), ReadinessState::Uninitialized);
    }

    #[test]
    fn stale_tokens_do_not_expire_new_loads() {
        let mut tracker = ReadinessTracker::new();
        let first = tracker.begin_load();
        let second = tracker.begin_load();

        assert!(!tracker.expire(first));
        assert!(tracker.expire(second));
        assert_eq!(tracker.state(), ReadinessState::Error);
        assert!(!tracker.mark_ready());
    }

    #[test]
    fn reset_invalidates_tokens() {
        let mut tracker = ReadinessTracker::new();
        let token = tracker.begin_load();
        tracker.reset();
        assert!(!tracker.is_current(token));
        assert_eq!(tracker.state(), ReadinessState::Uninitialized);
    }
}
