// Android audio player built on MediaPlayer and AudioManager focus
//
// All mutable state sits behind one mutex. Native callbacks reach the session
// through the SessionRegistry on whatever thread the platform uses; events are
// emitted only after the lock is released so listeners may call back in.

use crate::engine::{MediaPlayerEngine, MediaPlayerFactory};
use crate::focus::{AudioFocusManager, FocusBroker};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::logging::ANDROID_TARGET;
use tandem_core::options::{CompleteCallback, ErrorCallback, InfoCallback};
use tandem_core::{
    pending_load, AudioError, AudioPlayer, AudioPlayerOptions, AudioSource, CompletionInfo,
    EventData, EventStream, FocusAction, FocusChange, FocusNegotiator, FocusPolicy, FocusState,
    LoadCompleter, LoadHandle, LoadToken, NativeErrorInfo, NativeInfo, NativeSignal,
    NativeSignalSink, NativeTime, NegotiationPhase, PlayerConfig, PlayerEvent, ReadinessState,
    ReadinessTracker, Result, SessionId, SessionRegistry,
};

/// `MediaPlayer.MEDIA_ERROR_UNKNOWN`, reported for failures raised synchronously.
const MEDIA_ERROR_UNKNOWN: i32 = 1;

#[derive(Default, Clone)]
struct Callbacks {
    complete: Option<CompleteCallback>,
    error: Option<ErrorCallback>,
    info: Option<InfoCallback>,
}

impl Callbacks {
    fn from_options(options: &AudioPlayerOptions) -> Self {
        Self {
            complete: options.complete_callback.clone(),
            error: options.error_callback.clone(),
            info: options.info_callback.clone(),
        }
    }

    fn report_error(&self, info: &NativeErrorInfo) {
        log::error!(target: ANDROID_TARGET, "errorCallback {:?}", info);
        if let Some(callback) = &self.error {
            callback(info);
        }
    }
}

struct Session {
    engine: Option<Box<dyn MediaPlayerEngine>>,
    focus: Box<dyn AudioFocusManager>,
    negotiator: FocusNegotiator,
    readiness: ReadinessTracker,
    source: Option<AudioSource>,
    looping: bool,
    auto_play: bool,
    callbacks: Callbacks,
    pending: Option<(LoadToken, LoadCompleter)>,
    noisy_registered: bool,
}

impl Session {
    /// Request focus unless already held; applies the configured denial policy.
    fn negotiate(&mut self, id: SessionId, policy: FocusPolicy) -> Result<()> {
        let outcome = self
            .negotiator
            .acquire(&mut FocusBroker::new(self.focus.as_mut(), id));

        match (outcome, policy) {
            (Ok(outcome), _) if outcome.is_held() => Ok(()),
            (_, FocusPolicy::BestEffort) => {
                log::warn!(target: ANDROID_TARGET, "playing without audio focus");
                Ok(())
            }
            (Ok(_), FocusPolicy::Strict) => Err(AudioError::FocusDenied),
            (Err(e), FocusPolicy::Strict) => Err(e),
        }
    }
}

struct Shared {
    id: SessionId,
    config: PlayerConfig,
    factory: Box<dyn MediaPlayerFactory>,
    registry: Arc<SessionRegistry>,
    events: EventStream,
    session: Mutex<Session>,
}

impl Shared {
    fn play(&self) -> Result<bool> {
        {
            let mut guard = self.session.lock();
            let session = &mut *guard;

            match session.engine.as_ref() {
                None => return Ok(false),
                Some(engine) if engine.is_playing() => return Ok(false),
                Some(_) => {}
            }
            if !session.readiness.is_ready() {
                log::error!(target: ANDROID_TARGET, "play(): source is not prepared");
                return Err(AudioError::NotReady);
            }

            session.negotiate(self.id, self.config.focus_policy)?;

            if let Err(e) = session.focus.set_volume_control_stream() {
                log::warn!(target: ANDROID_TARGET, "setVolumeControlStream failed: {}", e);
            }
            if !session.noisy_registered {
                match session.focus.register_noisy_receiver(self.id) {
                    Ok(()) => session.noisy_registered = true,
                    Err(e) => log::warn!(target: ANDROID_TARGET, "noisy receiver not registered: {}", e),
                }
            }

            if let Some(engine) = session.engine.as_mut() {
                engine.start()?;
            }
        }

        self.events.emit(PlayerEvent::Started, None);
        Ok(true)
    }

    fn pause(&self) -> Result<bool> {
        {
            let mut session = self.session.lock();
            match session.engine.as_mut() {
                Some(engine) if engine.is_playing() => {
                    log::info!(target: ANDROID_TARGET, "pausing player");
                    engine.pause()?;
                }
                _ => return Ok(false),
            }
        }

        self.events.emit(PlayerEvent::Paused, None);
        Ok(true)
    }

    fn resume(&self) {
        let mut session = self.session.lock();
        if let Some(engine) = session.engine.as_mut() {
            log::info!(target: ANDROID_TARGET, "resume");
            if let Err(e) = engine.start() {
                log::error!(target: ANDROID_TARGET, "resume failed: {}", e);
            }
        }
    }

    /// Seek while holding the lock; returns the native target on success.
    fn seek_locked(&self, session: &mut Session, seconds: f64) -> Result<Option<NativeTime>> {
        let Some(engine) = session.engine.as_mut() else {
            log::error!(target: ANDROID_TARGET, "seekTo(): player does not exist");
            return Ok(None);
        };
        if !session.readiness.is_ready() {
            log::error!(target: ANDROID_TARGET, "seekTo(): item was not ready to play");
            return Ok(None);
        }

        let target = NativeTime::from_seconds(seconds, self.config.native_timescale);
        log::info!(target: ANDROID_TARGET, "seekTo ms {}", target.as_millis());
        engine.seek_to(target.as_millis())?;
        Ok(Some(target))
    }

    fn seek_to(&self, seconds: f64) -> Result<bool> {
        let target = {
            let mut session = self.session.lock();
            self.seek_locked(&mut session, seconds)?
        };

        match target {
            Some(target) => {
                self.events.emit(PlayerEvent::Seek, Some(EventData::Position(target)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn play_at_time(&self, seconds: f64) -> Result<bool> {
        let target = {
            let mut session = self.session.lock();
            self.seek_locked(&mut session, seconds)?
        };
        if target.is_none() {
            return Ok(false);
        }
        self.play()?;
        Ok(true)
    }

    fn set_volume(&self, volume: f32) {
        if volume < 0.0 {
            return;
        }
        let mut session = self.session.lock();
        if let Some(engine) = session.engine.as_mut() {
            if let Err(e) = engine.set_volume(volume, volume) {
                log::error!(target: ANDROID_TARGET, "setVolume failed: {}", e);
            }
        }
    }

    fn change_playback_speed(&self, rate: f32) -> Result<()> {
        let mut guard = self.session.lock();
        let session = &mut *guard;

        let sdk = session.focus.sdk_version();
        if sdk < self.config.min_speed_sdk {
            return Err(AudioError::UnsupportedPlatformVersion {
                required: self.config.min_speed_sdk,
                actual: sdk,
            });
        }

        let Some(engine) = session.engine.as_mut() else {
            log::warn!(target: ANDROID_TARGET, "changePlayerSpeed(): no player");
            return Ok(());
        };

        log::info!(target: ANDROID_TARGET, "setting the mediaPlayer playback speed {}", rate);
        let was_playing = engine.is_playing();
        engine.set_playback_speed(rate)?;
        if !was_playing {
            // setPlaybackParams starts a prepared player
            if let Err(e) = engine.pause() {
                log::warn!(target: ANDROID_TARGET, "pause after speed change failed: {}", e);
            }
        }
        Ok(())
    }

    /// Best-effort teardown: every step runs, the first failure is returned.
    fn dispose(&self) -> Result<()> {
        let mut first_error: Option<AudioError> = None;
        let mut record = |step: &str, result: Result<()>| {
            if let Err(e) = result {
                log::error!(target: ANDROID_TARGET, "dispose error in {}: {}", step, e);
                first_error.get_or_insert(e);
            }
        };

        let pending = {
            let mut guard = self.session.lock();
            let session = &mut *guard;

            if let Some(mut engine) = session.engine.take() {
                log::info!(target: ANDROID_TARGET, "disposing of mediaPlayer instance");
                if session.readiness.is_ready() {
                    record("stop", engine.stop());
                }
                record("reset", engine.reset());
                record("release", engine.release());
            }

            if session.noisy_registered {
                log::info!(target: ANDROID_TARGET, "unregisterBroadcastReceiver ACTION_AUDIO_BECOMING_NOISY...");
                record("unregister noisy receiver", session.focus.unregister_noisy_receiver(self.id));
                session.noisy_registered = false;
            }

            if session.negotiator.phase() != NegotiationPhase::Idle {
                log::info!(target: ANDROID_TARGET, "abandoning audio focus...");
            }
            record(
                "abandon focus",
                session
                    .negotiator
                    .release(&mut FocusBroker::new(session.focus.as_mut(), self.id)),
            );

            session.readiness.reset();
            session.source = None;
            session.callbacks = Callbacks::default();
            session.pending.take()
        };

        self.registry.unregister(self.id);
        if let Some((_, completer)) = pending {
            completer.settle(Err(AudioError::Cancelled));
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn handle_prepared(&self) {
        let (auto_play, pending) = {
            let mut session = self.session.lock();
            if !session.readiness.mark_ready() {
                log::debug!(target: ANDROID_TARGET, "ignoring prepared signal in {:?}", session.readiness.state());
                return;
            }
            (session.auto_play, session.pending.take())
        };

        log::info!(target: ANDROID_TARGET, "onPrepared {}", self.id);
        self.events.emit(PlayerEvent::Ready, None);

        if auto_play {
            log::info!(target: ANDROID_TARGET, "options.autoPlay true");
            if let Err(e) = self.play() {
                log::error!(target: ANDROID_TARGET, "autoplay failed: {}", e);
            }
        }

        if let Some((_, completer)) = pending {
            completer.settle(Ok(()));
        }
    }

    fn handle_error(&self, info: NativeErrorInfo) {
        let (callbacks, pending) = {
            let mut session = self.session.lock();
            if let Some(engine) = session.engine.as_mut() {
                if let Err(e) = engine.reset() {
                    log::warn!(target: ANDROID_TARGET, "reset after error failed: {}", e);
                }
            }
            session.readiness.mark_failed();
            (session.callbacks.clone(), session.pending.take())
        };

        callbacks.report_error(&info);
        if let Some((_, completer)) = pending {
            completer.settle(Err(AudioError::PrepareFailed {
                what: info.what,
                extra: info.extra,
            }));
        }
    }

    fn handle_completion(&self) {
        let (looping, callback) = {
            let mut guard = self.session.lock();
            let session = &mut *guard;
            let looping = session.looping && session.readiness.is_ready();
            if looping {
                if let Some(engine) = session.engine.as_mut() {
                    let offset = self.config.loop_restart_offset.as_millis() as i64;
                    if let Err(e) = engine.seek_to(offset).and_then(|_| engine.start()) {
                        log::error!(target: ANDROID_TARGET, "loop restart failed: {}", e);
                    }
                }
            }
            (looping, session.callbacks.complete.clone())
        };

        if let Some(callback) = callback {
            callback(&CompletionInfo { looped: looping });
        }
    }

    fn handle_info(&self, info: NativeInfo) {
        log::info!(target: ANDROID_TARGET, "infoCallback {:?}", info);
        let callback = self.session.lock().callbacks.info.clone();
        if let Some(callback) = callback {
            callback(&info);
        }
    }

    fn handle_focus(&self, change: FocusChange) {
        let action = {
            let mut guard = self.session.lock();
            let session = &mut *guard;
            let focus = &session.focus;
            session
                .negotiator
                .on_change(change, || focus.music_stream_volume())
        };

        match action {
            FocusAction::None => {}
            FocusAction::Pause => {
                if let Err(e) = self.pause() {
                    log::error!(target: ANDROID_TARGET, "pause on focus loss failed: {}", e);
                }
            }
            FocusAction::Duck { volume } => self.set_volume(volume),
            FocusAction::Regain { restore_volume } => {
                if let Some(volume) = restore_volume {
                    log::info!(target: ANDROID_TARGET, "restoring volume {}", volume);
                    self.set_volume(volume);
                }
                self.resume();
            }
        }
    }
}

impl NativeSignalSink for Shared {
    fn on_signal(&self, signal: NativeSignal) {
        match signal {
            NativeSignal::Prepared => self.handle_prepared(),
            NativeSignal::Error(info) => self.handle_error(info),
            NativeSignal::EndOfMedia => self.handle_completion(),
            NativeSignal::Info(info) => self.handle_info(info),
            NativeSignal::Focus(change) => self.handle_focus(change),
            NativeSignal::BecomingNoisy => {
                log::info!(target: ANDROID_TARGET, "ACTION_AUDIO_BECOMING_NOISY onReceiveCallback");
                if let Err(e) = self.pause() {
                    log::error!(target: ANDROID_TARGET, "pause on noisy output failed: {}", e);
                }
            }
            NativeSignal::ItemStatus(status) => {
                log::debug!(target: ANDROID_TARGET, "ignoring item status {:?}", status);
            }
        }
    }
}

/// Android audio player
pub struct AndroidAudioPlayer {
    shared: Arc<Shared>,
}

impl AndroidAudioPlayer {
    /// Create a player and eagerly request audio focus.
    pub fn new<F, M>(factory: F, focus: M, registry: Arc<SessionRegistry>, config: PlayerConfig) -> Self
    where
        F: MediaPlayerFactory + 'static,
        M: AudioFocusManager + 'static,
    {
        let id = SessionId::next();
        log::info!(target: ANDROID_TARGET, "Initializing Android audio player {}", id);

        let negotiator = FocusNegotiator::new(&config);
        let shared = Arc::new(Shared {
            id,
            events: EventStream::new(id),
            factory: Box::new(factory),
            registry,
            session: Mutex::new(Session {
                engine: None,
                focus: Box::new(focus),
                negotiator,
                readiness: ReadinessTracker::new(),
                source: None,
                looping: false,
                auto_play: false,
                callbacks: Callbacks::default(),
                pending: None,
                noisy_registered: false,
            }),
            config,
        });

        let player = Self { shared };
        player.attach();

        // The focus listener must be reachable before the request.
        {
            let mut guard = player.shared.session.lock();
            let session = &mut *guard;
            let granted = session
                .negotiator
                .acquire(&mut FocusBroker::new(session.focus.as_mut(), id));
            log::info!(target: ANDROID_TARGET, "_mAudioFocusGranted {:?}", granted);
        }

        player
    }

    /// Music stream level on the device's integer scale.
    pub fn stream_volume(&self) -> u32 {
        self.shared.session.lock().focus.music_stream_volume()
    }

    pub fn negotiation_phase(&self) -> NegotiationPhase {
        self.shared.session.lock().negotiator.phase()
    }

    /// Volume saved before ducking, while ducked.
    pub fn saved_volume(&self) -> Option<u32> {
        self.shared.session.lock().negotiator.saved_volume()
    }

    pub fn source(&self) -> Option<AudioSource> {
        self.shared.session.lock().source.clone()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.shared.config
    }

    fn attach(&self) {
        let sink: Arc<dyn NativeSignalSink> = self.shared.clone();
        self.shared.registry.register(self.shared.id, &sink);
    }

    fn load(&self, options: AudioPlayerOptions) -> Result<LoadHandle> {
        let shared = &self.shared;
        let source = AudioSource::resolve(&options.audio_file, shared.config.app_root.as_deref())?;
        log::info!(target: ANDROID_TARGET, "audioPath {}", source);

        // Re-attach in case an earlier dispose severed the registry entry.
        self.attach();

        let callbacks = Callbacks::from_options(&options);
        let (completer, handle) = pending_load();

        let outcome = {
            let mut guard = shared.session.lock();
            let session = &mut *guard;

            if session.engine.is_none() {
                log::info!(target: ANDROID_TARGET, "android mediaPlayer is not initialized, creating new instance");
                match shared.factory.create(shared.id) {
                    Ok(engine) => session.engine = Some(engine),
                    Err(e) => {
                        drop(guard);
                        return Err(Self::load_failed(&callbacks, e));
                    }
                }
            }
            let cancelled = session.pending.take();

            let granted = session
                .negotiator
                .acquire(&mut FocusBroker::new(session.focus.as_mut(), shared.id));
            log::info!(target: ANDROID_TARGET, "_mAudioFocusGranted {:?}", granted);

            let token = session.readiness.begin_load();
            session.source = Some(source.clone());
            session.looping = options.looping;
            session.auto_play = options.should_auto_play();
            session.callbacks = callbacks.clone();

            let prepared = match session.engine.as_mut() {
                Some(engine) => Self::prepare_source(engine.as_mut(), &source),
                None => Err(AudioError::InvalidState("media player missing".to_string())),
            };
            if prepared.is_err() {
                session.readiness.mark_failed();
            } else {
                session.pending = Some((token, completer));
            }
            (cancelled, token, prepared)
        };

        let (cancelled, token, prepared) = outcome;
        if let Some((_, previous)) = cancelled {
            previous.settle(Err(AudioError::Cancelled));
        }

        match prepared {
            Err(e) => Err(Self::load_failed(&callbacks, e)),
            Ok(synchronous) => {
                if synchronous {
                    shared.handle_prepared();
                }
                let weak = Arc::downgrade(shared);
                Ok(handle.with_timeout(shared.config.prepare_timeout, move || {
                    if let Some(shared) = weak.upgrade() {
                        let mut session = shared.session.lock();
                        if session.readiness.expire(token) {
                            log::error!(target: ANDROID_TARGET, "prepare timed out for {}", shared.id);
                            session.pending = None;
                        }
                    }
                }))
            }
        }
    }

    fn load_failed(callbacks: &Callbacks, error: AudioError) -> AudioError {
        log::error!(target: ANDROID_TARGET, "playFromFile error {}", error);
        callbacks.report_error(&NativeErrorInfo {
            what: MEDIA_ERROR_UNKNOWN,
            extra: 0,
            message: Some(error.to_string()),
        });
        error
    }

    /// Returns whether preparation already finished on this thread.
    fn prepare_source(engine: &mut dyn MediaPlayerEngine, source: &AudioSource) -> Result<bool> {
        engine.set_music_stream_type()?;
        log::info!(target: ANDROID_TARGET, "resetting mediaPlayer...");
        engine.reset()?;
        log::info!(target: ANDROID_TARGET, "setting datasource {}", source);
        engine
            .set_data_source(&source.as_native_str())
            .map_err(|e| AudioError::SourceLoad(e.to_string()))?;

        if source.prepares_synchronously() {
            log::info!(target: ANDROID_TARGET, "preparing mediaPlayer...");
            engine.prepare()?;
            Ok(true)
        } else {
            log::info!(target: ANDROID_TARGET, "preparing mediaPlayer async...");
            engine.prepare_async()?;
            Ok(false)
        }
    }
}

impl AudioPlayer for AndroidAudioPlayer {
    fn session_id(&self) -> SessionId {
        self.shared.id
    }

    fn events(&self) -> &EventStream {
        &self.shared.events
    }

    fn play_from_file(&self, options: AudioPlayerOptions) -> Result<LoadHandle> {
        self.load(options)
    }

    fn play_from_url(&self, options: AudioPlayerOptions) -> Result<LoadHandle> {
        self.load(options)
    }

    fn play(&self) -> Result<bool> {
        self.shared.play()
    }

    fn pause(&self) -> Result<bool> {
        self.shared.pause()
    }

    fn resume(&self) {
        self.shared.resume()
    }

    fn seek_to(&self, seconds: f64) -> Result<bool> {
        self.shared.seek_to(seconds)
    }

    fn play_at_time(&self, seconds: f64) -> Result<bool> {
        self.shared.play_at_time(seconds)
    }

    fn dispose(&self) -> Result<()> {
        self.shared.dispose()
    }

    fn is_playing(&self) -> bool {
        let session = self.shared.session.lock();
        session.engine.as_ref().is_some_and(|engine| engine.is_playing())
    }

    fn duration(&self) -> Duration {
        let session = self.shared.session.lock();
        match session.engine.as_ref() {
            Some(engine) if session.readiness.is_ready() => {
                Duration::from_millis(engine.duration_ms().max(0) as u64)
            }
            _ => Duration::ZERO,
        }
    }

    fn current_time(&self) -> Duration {
        let session = self.shared.session.lock();
        match session.engine.as_ref() {
            Some(engine) if session.readiness.is_ready() => {
                Duration::from_millis(engine.current_position_ms().max(0) as u64)
            }
            _ => Duration::ZERO,
        }
    }

    fn change_playback_speed(&self, rate: f32) -> Result<()> {
        self.shared.change_playback_speed(rate)
    }

    /// Music stream level; Android exposes no per-player volume getter.
    fn volume(&self) -> f32 {
        self.stream_volume() as f32
    }

    fn set_volume(&self, volume: f32) {
        self.shared.set_volume(volume)
    }

    fn readiness(&self) -> ReadinessState {
        self.shared.session.lock().readiness.state()
    }

    fn focus_state(&self) -> FocusState {
        self.shared.session.lock().negotiator.state()
    }
}

impl Drop for AndroidAudioPlayer {
    fn drop(&mut self) {
        log::info!(target: ANDROID_TARGET, "Dropping Android audio player {}", self.shared.id);
        if let Err(e) = self.shared.dispose() {
            log::debug!(target: ANDROID_TARGET, "dispose on drop failed: {}", e);
        }
    }
}
