// iOS audio player built on AVPlayer and AVAudioSession
//
// Readiness comes from key-path observation of the player item's status; the
// observer only knows the session id and reaches this player through the
// SessionRegistry.

use crate::audio_session::{AudioSessionControl, SessionBroker};
use crate::engine::{AvPlayerEngine, AvPlayerFactory};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::logging::IOS_TARGET;
use tandem_core::options::{CompleteCallback, ErrorCallback, InfoCallback};
use tandem_core::{
    pending_load, AudioError, AudioPlayer, AudioPlayerOptions, AudioSource, CompletionInfo,
    EventData, EventStream, FocusNegotiator, FocusPolicy, FocusState, ItemStatus, LoadCompleter,
    LoadHandle, LoadToken, NativeErrorInfo, NativeSignal, NativeSignalSink, NativeTime,
    PlayerConfig, PlayerEvent, ReadinessState, ReadinessTracker, Result, SessionId,
    SessionRegistry,
};

/// Reported as `what` when an item fails; AVFoundation has no numeric code here.
const ITEM_FAILED: i32 = -1;

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

    fn report_error(&self, message: String) {
        log::error!(target: IOS_TARGET, "item failed: {}", message);
        if let Some(callback) = &self.error {
            callback(&NativeErrorInfo {
                what: ITEM_FAILED,
                extra: 0,
                message: Some(message),
            });
        }
    }
}

struct Session {
    engine: Option<Box<dyn AvPlayerEngine>>,
    audio_session: Box<dyn AudioSessionControl>,
    negotiator: FocusNegotiator,
    readiness: ReadinessTracker,
    source: Option<AudioSource>,
    looping: bool,
    auto_play: bool,
    callbacks: Callbacks,
    pending: Option<(LoadToken, LoadCompleter)>,
    status_observer_active: bool,
    end_observer_active: bool,
}

impl Session {
    fn negotiate(&mut self, policy: FocusPolicy) -> Result<()> {
        let outcome = self
            .negotiator
            .acquire(&mut SessionBroker::new(self.audio_session.as_mut()));

        match (outcome, policy) {
            (Ok(outcome), _) if outcome.is_held() => Ok(()),
            (Err(e), FocusPolicy::BestEffort) => {
                log::warn!(target: IOS_TARGET, "continuing without session configuration: {}", e);
                Ok(())
            }
            (Ok(_), FocusPolicy::BestEffort) => Ok(()),
            (Ok(_), FocusPolicy::Strict) => Err(AudioError::FocusDenied),
            (Err(e), FocusPolicy::Strict) => Err(e),
        }
    }

    /// Detach observers from the current item. Every step runs.
    fn remove_observers(&mut self, id: SessionId) -> Result<()> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };

        let mut result = Ok(());
        if std::mem::take(&mut self.status_observer_active) {
            result = engine.remove_status_observer(id);
        }
        if std::mem::take(&mut self.end_observer_active) {
            result = result.and(engine.remove_end_observer(id));
        }
        result
    }

    /// Put `source` on the engine and observe its item. A failure after the
    /// load began leaves readiness in `Error`.
    fn install_item(&mut self, factory: &dyn AvPlayerFactory, id: SessionId, source: &AudioSource) -> Result<LoadToken> {
        self.remove_observers(id)?;
        match self.engine.as_mut().filter(|engine| engine.has_item()) {
            Some(engine) => engine.replace_item(source)?,
            None => {
                let mut engine = factory.create(id, source)?;
                engine.set_automatically_waits_to_minimize_stalling(false);
                self.engine = Some(engine);
            }
        }

        let token = self.readiness.begin_load();
        if let Err(e) = self.observe_item(id) {
            self.readiness.mark_failed();
            return Err(e);
        }
        Ok(token)
    }

    fn observe_item(&mut self, id: SessionId) -> Result<()> {
        if let Some(engine) = self.engine.as_mut() {
            engine.add_status_observer(id)?;
            self.status_observer_active = true;
            engine.add_end_observer(id)?;
            self.end_observer_active = true;
        }
        Ok(())
    }
}

struct Shared {
    id: SessionId,
    config: PlayerConfig,
    factory: Box<dyn AvPlayerFactory>,
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
                log::error!(target: IOS_TARGET, "play(): item was not ready to play");
                return Err(AudioError::NotReady);
            }

            session.negotiate(self.config.focus_policy)?;

            log::info!(target: IOS_TARGET, "play(): changed state from paused to playing");
            if let Some(engine) = session.engine.as_mut() {
                engine.play()?;
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
                    log::info!(target: IOS_TARGET, "pause(): pausing player");
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
        if let Some(engine) = session.engine.as_mut().filter(|engine| engine.has_item()) {
            log::info!(target: IOS_TARGET, "resume(): called");
            if let Err(e) = engine.play() {
                log::error!(target: IOS_TARGET, "resume(): {}", e);
            }
        }
    }

    fn seek_locked(&self, session: &mut Session, seconds: f64) -> Result<Option<NativeTime>> {
        let Some(engine) = session.engine.as_mut().filter(|engine| engine.has_item()) else {
            log::error!(target: IOS_TARGET, "seekTo(): player does not have an item");
            return Ok(None);
        };
        if !session.readiness.is_ready() {
            log::error!(target: IOS_TARGET, "seekTo(): item was not ready to play");
            return Ok(None);
        }

        let target = NativeTime::from_seconds(seconds, self.config.native_timescale);
        engine.seek(target)?;
        log::info!(target: IOS_TARGET, "seekTo(): seeked to {}", seconds);
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
        log::info!(target: IOS_TARGET, "playAtTime() {}", seconds);
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

    fn dispose(&self) -> Result<()> {
        let mut first_error: Option<AudioError> = None;
        let mut record = |step: &str, result: Result<()>| {
            if let Err(e) = result {
                log::error!(target: IOS_TARGET, "dispose(): {} failed: {}", step, e);
                first_error.get_or_insert(e);
            }
        };

        let pending = {
            let mut guard = self.session.lock();
            let session = &mut *guard;

            if session.engine.is_some() {
                log::info!(target: IOS_TARGET, "disposing player");
                record("remove observers", session.remove_observers(self.id));
            }
            if let Some(mut engine) = session.engine.take() {
                record("pause", engine.pause());
                // Releasing the item lets AVFoundation deallocate the player
                record("clear item", engine.clear_item());
            }

            record(
                "release audio session",
                session
                    .negotiator
                    .release(&mut SessionBroker::new(session.audio_session.as_mut())),
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

    fn handle_status(&self, status: ItemStatus) {
        match status {
            ItemStatus::ReadyToPlay => self.handle_ready(),
            ItemStatus::Failed(message) => self.handle_failed(message),
            ItemStatus::Unknown => {
                log::debug!(target: IOS_TARGET, "item status unknown");
            }
        }
    }

    fn handle_ready(&self) {
        let (auto_play, pending) = {
            let mut session = self.session.lock();
            if !session.readiness.mark_ready() {
                log::debug!(target: IOS_TARGET, "ignoring ready status in {:?}", session.readiness.state());
                return;
            }
            (session.auto_play, session.pending.take())
        };

        self.events.emit(PlayerEvent::Ready, None);

        if auto_play {
            if let Err(e) = self.play() {
                log::error!(target: IOS_TARGET, "autoplay failed: {}", e);
            }
        }

        if let Some((_, completer)) = pending {
            completer.settle(Ok(()));
        }
    }

    fn handle_failed(&self, message: Option<String>) {
        let (callbacks, pending) = {
            let mut session = self.session.lock();
            if !session.readiness.mark_failed() {
                return;
            }
            (session.callbacks.clone(), session.pending.take())
        };

        let reason = message.unwrap_or_else(|| "player item failed".to_string());
        callbacks.report_error(reason.clone());
        if let Some((_, completer)) = pending {
            completer.settle(Err(AudioError::SourceLoad(reason)));
        }
    }

    fn handle_end(&self) {
        let (looping, callback) = {
            let mut guard = self.session.lock();
            let session = &mut *guard;
            let looping = session.looping && session.readiness.is_ready();
            if looping {
                if let Some(engine) = session.engine.as_mut() {
                    let start = NativeTime::from_duration(self.config.loop_restart_offset, self.config.native_timescale);
                    if let Err(e) = engine.seek(start).and_then(|_| engine.play()) {
                        log::error!(target: IOS_TARGET, "loop restart failed: {}", e);
                    }
                }
            }
            (looping, session.callbacks.complete.clone())
        };

        if let Some(callback) = callback {
            callback(&CompletionInfo { looped: looping });
        }
    }
}

impl NativeSignalSink for Shared {
    fn on_signal(&self, signal: NativeSignal) {
        match signal {
            NativeSignal::ItemStatus(status) => self.handle_status(status),
            NativeSignal::EndOfMedia => self.handle_end(),
            NativeSignal::Info(info) => {
                let callback = self.session.lock().callbacks.info.clone();
                if let Some(callback) = callback {
                    callback(&info);
                }
            }
            NativeSignal::Error(info) => self.handle_failed(info.message),
            other => {
                log::debug!(target: IOS_TARGET, "ignoring {:?}", other);
            }
        }
    }
}

/// iOS audio player
pub struct IosAudioPlayer {
    shared: Arc<Shared>,
}

impl IosAudioPlayer {
    pub fn new<F, S>(factory: F, audio_session: S, registry: Arc<SessionRegistry>, config: PlayerConfig) -> Self
    where
        F: AvPlayerFactory + 'static,
        S: AudioSessionControl + 'static,
    {
        let id = SessionId::next();
        log::info!(target: IOS_TARGET, "Initializing iOS audio player {}", id);

        let negotiator = FocusNegotiator::new(&config);
        let player = Self {
            shared: Arc::new(Shared {
                id,
                events: EventStream::new(id),
                factory: Box::new(factory),
                registry,
                session: Mutex::new(Session {
                    engine: None,
                    audio_session: Box::new(audio_session),
                    negotiator,
                    readiness: ReadinessTracker::new(),
                    source: None,
                    looping: false,
                    auto_play: false,
                    callbacks: Callbacks::default(),
                    pending: None,
                    status_observer_active: false,
                    end_observer_active: false,
                }),
                config,
            }),
        };
        player.attach();
        player
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
        let id = shared.id;
        let source = AudioSource::resolve(&options.audio_file, shared.config.app_root.as_deref())?;
        log::info!(target: IOS_TARGET, "playFrom: {}", source);

        self.attach();
        let callbacks = Callbacks::from_options(&options);
        let (completer, handle) = pending_load();

        let outcome = {
            let mut guard = shared.session.lock();
            let session = &mut *guard;

            // Each new source is a fresh play start; re-check the output route.
            session
                .negotiator
                .release(&mut SessionBroker::new(session.audio_session.as_mut()))?;
            session.negotiate(shared.config.focus_policy)?;

            let cancelled = session.pending.take();
            let installed = session.install_item(shared.factory.as_ref(), id, &source);
            if let Ok(token) = installed {
                session.source = Some(source);
                session.looping = options.looping;
                session.auto_play = options.should_auto_play();
                session.callbacks = callbacks.clone();
                session.pending = Some((token, completer));
            }
            (cancelled, installed)
        };

        let (cancelled, installed) = outcome;
        if let Some((_, previous)) = cancelled {
            previous.settle(Err(AudioError::Cancelled));
        }

        let token = match installed {
            Ok(token) => token,
            Err(e) => {
                callbacks.report_error(e.to_string());
                return Err(e);
            }
        };
        let weak = Arc::downgrade(shared);
        Ok(handle.with_timeout(shared.config.prepare_timeout, move || {
            if let Some(shared) = weak.upgrade() {
                let mut session = shared.session.lock();
                if session.readiness.expire(token) {
                    log::error!(target: IOS_TARGET, "item did not become ready for {}", shared.id);
                    session.pending = None;
                }
            }
        }))
    }
}

impl AudioPlayer for IosAudioPlayer {
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
            Some(engine) if session.readiness.is_ready() => engine.duration().as_duration(),
            _ => Duration::ZERO,
        }
    }

    fn current_time(&self) -> Duration {
        let session = self.shared.session.lock();
        match session.engine.as_ref().filter(|engine| engine.has_item()) {
            Some(engine) => engine.current_time().as_duration(),
            None => Duration::ZERO,
        }
    }

    fn change_playback_speed(&self, rate: f32) -> Result<()> {
        let mut session = self.shared.session.lock();
        match session.engine.as_mut() {
            // A zero rate would pause behind the event stream's back
            Some(engine) if rate > 0.0 => engine.set_rate(rate),
            _ => Ok(()),
        }
    }

    fn volume(&self) -> f32 {
        let session = self.shared.session.lock();
        session.engine.as_ref().map_or(0.0, |engine| engine.volume())
    }

    fn set_volume(&self, volume: f32) {
        if volume < 0.0 {
            return;
        }
        let mut session = self.shared.session.lock();
        if let Some(engine) = session.engine.as_mut() {
            if let Err(e) = engine.set_volume(volume) {
                log::error!(target: IOS_TARGET, "setVolume failed: {}", e);
            }
        }
    }

    fn readiness(&self) -> ReadinessState {
        self.shared.session.lock().readiness.state()
    }

    fn focus_state(&self) -> FocusState {
        self.shared.session.lock().negotiator.state()
    }
}

impl Drop for IosAudioPlayer {
    fn drop(&mut self) {
        if let Err(e) = self.shared.dispose() {
            log::debug!(target: IOS_TARGET, "dispose on drop failed: {}", e);
        }
    }
}
