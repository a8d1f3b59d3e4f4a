// Audio-focus / audio-session negotiation state machine
//
// Platform adapters implement PriorityBroker (request/release priority from the OS)
// and feed OS focus changes into FocusNegotiator, which decides what the player does.

use crate::config::PlayerConfig;
use crate::error::Result;

/// Last focus state reported by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    None,
    Granted,
    TransientGain,
    Lost,
    LostTransient,
    LostTransientCanDuck,
}

/// Focus change signal delivered by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Gain,
    GainTransient,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

impl FocusChange {
    /// Map an `AudioManager.AUDIOFOCUS_*` constant.
    pub fn from_android(code: i32) -> Option<Self> {
        match code {
            1 => Some(FocusChange::Gain),
            2 => Some(FocusChange::GainTransient),
            -1 => Some(FocusChange::Loss),
            -2 => Some(FocusChange::LossTransient),
            -3 => Some(FocusChange::LossTransientCanDuck),
            _ => None,
        }
    }
}

/// Negotiation phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationPhase {
    #[default]
    Idle,
    Requesting,
    Granted,
    Ducked,
    Paused,
    Lost,
}

/// What the player must do in response to a focus change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusAction {
    None,
    Pause,
    /// Lower the player volume to `volume`
    Duck { volume: f32 },
    /// Restore volume (when one was saved) and resume playback
    Regain { restore_volume: Option<f32> },
}

/// Outcome of [`FocusNegotiator::acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The OS granted priority on this call
    Granted,
    /// Priority was already held; nothing was requested
    AlreadyHeld,
    /// A request is in flight elsewhere
    InProgress,
    Denied,
}

impl AcquireOutcome {
    pub fn is_held(&self) -> bool {
        matches!(self, AcquireOutcome::Granted | AcquireOutcome::AlreadyHeld)
    }
}

/// The platform half of negotiation: asks the OS for playback priority
pub trait PriorityBroker {
    /// Returns whether the OS granted priority.
    fn request(&mut self) -> Result<bool>;

    /// Gives priority back and detaches any change listener.
    fn abandon(&mut self) -> Result<()>;
}

/// Map a saved pre-duck volume back onto the normalized player scale.
///
/// Values at or above `threshold` restore full volume. Smaller values are read
/// as the decimal digits after the point, so 7 becomes 0.7 and 42 becomes 0.42.
pub fn restore_volume(saved: u32, threshold: u32) -> f32 {
    if saved >= threshold {
        return 1.0;
    }
    let digits = saved.checked_ilog10().map_or(1, |d| d + 1);
    saved as f32 / 10f32.powi(digits as i32)
}

/// Focus negotiation state for one session
#[derive(Debug, Clone)]
pub struct FocusNegotiator {
    phase: NegotiationPhase,
    state: FocusState,
    saved_volume: Option<u32>,
    duck_volume: f32,
    full_restore_threshold: u32,
}

impl FocusNegotiator {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            phase: NegotiationPhase::Idle,
            state: FocusState::None,
            saved_volume: None,
            duck_volume: config.duck_volume,
            full_restore_threshold: config.full_restore_threshold,
        }
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn saved_volume(&self) -> Option<u32> {
        self.saved_volume
    }

    /// Priority is held (possibly ducked or transiently paused).
    pub fn is_held(&self) -> bool {
        matches!(
            self.phase,
            NegotiationPhase::Granted | NegotiationPhase::Ducked | NegotiationPhase::Paused
        )
    }

    /// Request priority unless it is already held or being requested.
    pub fn acquire(&mut self, broker: &mut dyn PriorityBroker) -> Result<AcquireOutcome> {
        match self.phase {
            NegotiationPhase::Requesting => return Ok(AcquireOutcome::InProgress),
            NegotiationPhase::Idle | NegotiationPhase::Lost => {}
            _ => return Ok(AcquireOutcome::AlreadyHeld),
        }

        self.phase = NegotiationPhase::Requesting;
        match broker.request() {
            Ok(true) => {
                self.phase = NegotiationPhase::Granted;
                self.state = FocusState::Granted;
                Ok(AcquireOutcome::Granted)
            }
            Ok(false) => {
                log::error!("Failed to get audio focus.");
                self.phase = NegotiationPhase::Idle;
                Ok(AcquireOutcome::Denied)
            }
            Err(e) => {
                log::error!("Audio focus request failed: {}", e);
                self.phase = NegotiationPhase::Idle;
                Err(e)
            }
        }
    }

    /// Apply an OS focus change. `current_volume` is only read when ducking.
    pub fn on_change<F>(&mut self, change: FocusChange, current_volume: F) -> FocusAction
    where
        F: FnOnce() -> u32,
    {
        use NegotiationPhase::*;

        let action = match (change, self.phase) {
            (FocusChange::Gain, Ducked | Paused | Lost) => {
                self.phase = Granted;
                self.state = FocusState::Granted;
                let restore = self
                    .saved_volume
                    .take()
                    .map(|saved| restore_volume(saved, self.full_restore_threshold));
                FocusAction::Regain { restore_volume: restore }
            }
            (FocusChange::GainTransient, _) => {
                self.state = FocusState::TransientGain;
                FocusAction::None
            }
            (FocusChange::Loss, Granted | Ducked | Paused) => {
                self.phase = Lost;
                self.state = FocusState::Lost;
                FocusAction::Pause
            }
            (FocusChange::LossTransient, Granted | Ducked) => {
                self.phase = Paused;
                self.state = FocusState::LostTransient;
                FocusAction::Pause
            }
            (FocusChange::LossTransientCanDuck, Granted) => {
                let saved = current_volume();
                log::info!("ducking, saved volume {}", saved);
                self.saved_volume = Some(saved);
                self.phase = Ducked;
                self.state = FocusState::LostTransientCanDuck;
                FocusAction::Duck { volume: self.duck_volume }
            }
            (change, phase) => {
                log::debug!("ignoring focus change {:?} in {:?}", change, phase);
                FocusAction::None
            }
        };

        log::info!("focus change {:?} -> {:?}", change, self.phase);
        action
    }

    /// Return to `Idle`, clearing any saved volume, and abandon priority.
    pub fn release(&mut self, broker: &mut dyn PriorityBroker) -> Result<()> {
        let was_held = self.phase != NegotiationPhase::Idle;
        self.phase = NegotiationPhase::Idle;
        self.state = FocusState::None;
        self.saved_volume = None;
        if was_held {
            broker.abandon()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;

    #[derive(Default)]
    struct ScriptedBroker {
        grant: bool,
        fail: bool,
        requests: usize,
        abandons: usize,
    }

    impl PriorityBroker for ScriptedBroker {
        fn request(&mut self) -> Result<bool> {
            self.requests += 1;
            if self.fail {
                return Err(AudioError::Native("service unavailable".into()));
            }
            Ok(self.grant)
        }

        fn abandon(&mut self) -> Result<()> {
            self.abandons += 1;
            Ok(())
        }
    }

    fn granted() -> (FocusNegotiator, ScriptedBroker) {
        let mut negotiator = FocusNegotiator::new(&PlayerConfig::default());
        let mut broker = ScriptedBroker { grant: true, ..Default::default() };
        assert_eq!(negotiator.acquire(&mut broker).unwrap(), AcquireOutcome::Granted);
        (negotiator, broker)
    }

    #[test]
    fn restore_rule() {
        for v in 10..200 {
            assert_eq!(restore_volume(v, 10), 1.0);
        }
        for v in 0..10 {
            let expected: f32 = format!("0.{}", v).parse().unwrap();
            assert_eq!(restore_volume(v, 10), expected);
        }
        assert!((restore_volume(42, 100) - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn acquire_is_not_repeated_while_held() {
        let (mut negotiator, mut broker) = granted();
        assert_eq!(negotiator.acquire(&mut broker).unwrap(), AcquireOutcome::AlreadyHeld);
        assert_eq!(broker.requests, 1);
    }

    #[test]
    fn denied_request_returns_to_idle() {
        let mut negotiator = FocusNegotiator::new(&PlayerConfig::default());
        let mut broker = ScriptedBroker::default();
        assert_eq!(negotiator.acquire(&mut broker).unwrap(), AcquireOutcome::Denied);
        assert_eq!(negotiator.phase(), NegotiationPhase::Idle);

        broker.fail = true;
        assert!(negotiator.acquire(&mut broker).is_err());
        assert_eq!(negotiator.phase(), NegotiationPhase::Idle);
    }

    #[test]
    fn duck_then_regain_restores_scaled_volume() {
        let (mut negotiator, _) = granted();

        let action = negotiator.on_change(FocusChange::LossTransientCanDuck, || 7);
        assert_eq!(action, FocusAction::Duck { volume: 0.2 });
        assert_eq!(negotiator.saved_volume(), Some(7));
        assert_eq!(negotiator.state(), FocusState::LostTransientCanDuck);

        let action = negotiator.on_change(FocusChange::Gain, || unreachable!());
        assert_eq!(action, FocusAction::Regain { restore_volume: Some(0.7) });
        assert_eq!(negotiator.phase(), NegotiationPhase::Granted);
        assert_eq!(negotiator.saved_volume(), None);
    }

    #[test]
    fn loss_pauses_until_gain() {
        let (mut negotiator, _) = granted();

        assert_eq!(negotiator.on_change(FocusChange::Loss, || 0), FocusAction::Pause);
        assert_eq!(negotiator.phase(), NegotiationPhase::Lost);
        assert_eq!(negotiator.on_change(FocusChange::LossTransient, || 0), FocusAction::None);
        assert_eq!(
            negotiator.on_change(FocusChange::Gain, || 0),
            FocusAction::Regain { restore_volume: None }
        );
    }

    #[test]
    fn lost_focus_is_requested_again() {
        let (mut negotiator, mut broker) = granted();
        negotiator.on_change(FocusChange::Loss, || 0);
        assert_eq!(negotiator.acquire(&mut broker).unwrap(), AcquireOutcome::Granted);
        assert_eq!(broker.requests, 2);
    }

    #[test]
    fn transient_loss_from_granted_pauses() {
        let (mut negotiator, _) = granted();
        assert_eq!(negotiator.on_change(FocusChange::LossTransient, || 0), FocusAction::Pause);
        assert_eq!(negotiator.phase(), NegotiationPhase::Paused);
        assert!(negotiator.is_held());
    }

    #[test]
    fn gain_while_granted_is_ignored() {
        let (mut negotiator, _) = granted();
        assert_eq!(negotiator.on_change(FocusChange::Gain, || 0), FocusAction::None);
        assert_eq!(negotiator.on_change(FocusChange::GainTransient, || 0), FocusAction::None);
        assert_eq!(negotiator.state(), FocusState::TransientGain);
    }

    #[test]
    fn release_clears_saved_volume() {
        let (mut negotiator, mut broker) = granted();
        negotiator.on_change(FocusChange::LossTransientCanDuck, || 12);
        negotiator.release(&mut broker).unwrap();

        assert_eq!(negotiator.phase(), NegotiationPhase::Idle);
        assert_eq!(negotiator.saved_volume(), None);
        assert_eq!(broker.abandons, 1);

        // Releasing an idle negotiator does not touch the OS.
        negotiator.release(&mut broker).unwrap();
        assert_eq!(broker.abandons, 1);
    }

    #[test]
    fn android_codes_map() {
        assert_eq!(FocusChange::from_android(1), Some(FocusChange::Gain));
        assert_eq!(FocusChange::from_android(-3), Some(FocusChange::LossTransientCanDuck));
        assert_eq!(FocusChange::from_android(0), None);
    }
}
