// AudioManager side of focus negotiation

use tandem_core::logging::ANDROID_TARGET;
use tandem_core::{PriorityBroker, Result, SessionId};

/// Wraps the system `AudioManager` and the app context it is reached through.
///
/// Focus changes and "becoming noisy" broadcasts are delivered as native signals
/// for the session id passed at registration.
pub trait AudioFocusManager: Send {
    /// `requestAudioFocus(listener, STREAM_MUSIC, AUDIOFOCUS_GAIN)`; true when granted.
    fn request_focus(&mut self, session: SessionId) -> Result<bool>;

    /// `abandonAudioFocus(listener)`; true when the OS acknowledged.
    fn abandon_focus(&mut self, session: SessionId) -> Result<bool>;

    /// Music stream level on the device's integer scale.
    fn music_stream_volume(&self) -> u32;

    /// `Build.VERSION.SDK_INT`
    fn sdk_version(&self) -> u32;

    /// Bind hardware volume keys to the music stream.
    fn set_volume_control_stream(&mut self) -> Result<()>;

    fn register_noisy_receiver(&mut self, session: SessionId) -> Result<()>;

    fn unregister_noisy_receiver(&mut self, session: SessionId) -> Result<()>;
}

/// Presents an [`AudioFocusManager`] as the negotiator's priority broker.
pub(crate) struct FocusBroker<'a> {
    manager: &'a mut dyn AudioFocusManager,
    session: SessionId,
}

impl<'a> FocusBroker<'a> {
    pub(crate) fn new(manager: &'a mut dyn AudioFocusManager, session: SessionId) -> Self {
        Self { manager, session }
    }
}

impl PriorityBroker for FocusBroker<'_> {
    fn request(&mut self) -> Result<bool> {
        self.manager.request_focus(self.session)
    }

    fn abandon(&mut self) -> Result<()> {
        if !self.manager.abandon_focus(self.session)? {
            log::error!(target: ANDROID_TARGET, "Failed to abandon audio focus.");
        }
        Ok(())
    }
}
