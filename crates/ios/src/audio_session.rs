// AVAudioSession side of playback negotiation
//
// iOS has no focus callbacks to react to. Negotiation is a one-shot route check:
// when output goes to the earpiece receiver the session is switched to
// PlayAndRecord with a speaker override.

use tandem_core::logging::IOS_TARGET;
use tandem_core::{AudioError, PriorityBroker, Result};

const RECEIVER_PORT: &str = "Receiver";

/// Wraps `AVAudioSession.sharedInstance()`
pub trait AudioSessionControl: Send {
    /// Port type of the last output in the current route.
    fn current_output_port(&self) -> Option<String>;

    fn set_category_play_and_record(&mut self) -> Result<()>;

    fn override_output_to_speaker(&mut self) -> Result<()>;

    fn set_active(&mut self, active: bool) -> Result<()>;
}

/// Presents an [`AudioSessionControl`] as the negotiator's priority broker.
pub(crate) struct SessionBroker<'a> {
    control: &'a mut dyn AudioSessionControl,
}

impl<'a> SessionBroker<'a> {
    pub(crate) fn new(control: &'a mut dyn AudioSessionControl) -> Self {
        Self { control }
    }

    fn route_to_speaker(&mut self) -> Result<()> {
        self.control.set_category_play_and_record()?;
        self.control.override_output_to_speaker()?;
        self.control.set_active(true)
    }
}

impl PriorityBroker for SessionBroker<'_> {
    fn request(&mut self) -> Result<bool> {
        let output = self.control.current_output_port().unwrap_or_default();
        log::info!(target: IOS_TARGET, "IOSAudioSessionOutput {}", output);

        if output.contains(RECEIVER_PORT) {
            self.route_to_speaker().map_err(|e| {
                log::error!(target: IOS_TARGET, "setting audioSession category failed {}", e);
                AudioError::SessionConfiguration(e.to_string())
            })?;
            log::info!(target: IOS_TARGET, "audioSession category set and active");
        }
        Ok(true)
    }

    /// The shared session stays active; other app audio owns its lifetime.
    fn abandon(&mut self) -> Result<()> {
        log::debug!(target: IOS_TARGET, "releasing audio session");
        Ok(())
    }
}
