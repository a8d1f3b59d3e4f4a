// Function tables the Swift host fills in for AVFoundation access

use libc::{c_char, c_void};
use std::ffi::{CStr, CString};
use tandem_core::logging::IOS_TARGET;
use tandem_core::{
    AudioError, AudioSource, EventData, EventPayload, ItemStatus, NativeTime, PlayerListener,
    Result, SessionId,
};
use tandem_ios::{AudioSessionControl, AvPlayerEngine, AvPlayerFactory};

/// Host times are exchanged as seconds and converted at millisecond precision.
const HOST_TIMESCALE: i32 = 1000;

/// Largest route port name read back from the host
const PORT_BUFFER_LEN: usize = 128;

/// One `AVPlayer` owned by the host. `release` is called exactly once.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TandemAvPlayer {
    pub context: *mut c_void,
    /// Replace the current item; `remote` tells a URL from a file path
    pub replace_item: extern "C" fn(*mut c_void, *const c_char, bool) -> i32,
    pub clear_item: extern "C" fn(*mut c_void) -> i32,
    pub has_item: extern "C" fn(*mut c_void) -> bool,
    /// `AVPlayerItem.Status` raw value: 0 unknown, 1 ready, 2 failed
    pub item_status: extern "C" fn(*mut c_void) -> i32,
    pub set_waits_to_minimize_stalling: extern "C" fn(*mut c_void, bool),
    pub add_status_observer: extern "C" fn(*mut c_void, u64) -> i32,
    pub remove_status_observer: extern "C" fn(*mut c_void, u64) -> i32,
    pub add_end_observer: extern "C" fn(*mut c_void, u64) -> i32,
    pub remove_end_observer: extern "C" fn(*mut c_void, u64) -> i32,
    pub play: extern "C" fn(*mut c_void) -> i32,
    pub pause: extern "C" fn(*mut c_void) -> i32,
    /// CMTime value and timescale
    pub seek: extern "C" fn(*mut c_void, i64, i32) -> i32,
    pub is_playing: extern "C" fn(*mut c_void) -> bool,
    pub current_time: extern "C" fn(*mut c_void) -> f64,
    pub duration: extern "C" fn(*mut c_void) -> f64,
    pub set_rate: extern "C" fn(*mut c_void, f32) -> i32,
    pub volume: extern "C" fn(*mut c_void) -> f32,
    pub set_volume: extern "C" fn(*mut c_void, f32) -> i32,
    pub release: extern "C" fn(*mut c_void),
}

/// Process-side services: player creation, `AVAudioSession` and event delivery.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TandemHost {
    pub context: *mut c_void,
    /// Fill `out` with a player holding an item for the source; 0 on success
    pub create_player: extern "C" fn(*mut c_void, u64, *const c_char, bool, *mut TandemAvPlayer) -> i32,
    /// Write the last output port type into the buffer; returns its length or -1
    pub current_output_port: extern "C" fn(*mut c_void, *mut c_char, usize) -> i32,
    pub set_category_play_and_record: extern "C" fn(*mut c_void) -> i32,
    pub override_output_to_speaker: extern "C" fn(*mut c_void) -> i32,
    pub set_active: extern "C" fn(*mut c_void, bool) -> i32,
    /// Event name and position in seconds (-1 when the event has none)
    pub on_event: extern "C" fn(*mut c_void, u64, *const c_char, f64),
    /// 0 and an empty message on success, -1 and the failure otherwise
    pub on_load_settled: extern "C" fn(*mut c_void, u64, i32, *const c_char),
    pub on_complete: extern "C" fn(*mut c_void, u64, bool),
    pub on_error: extern "C" fn(*mut c_void, u64, i32, *const c_char),
}

// The host promises its tables and contexts may be used from any thread.
unsafe impl Send for TandemAvPlayer {}
unsafe impl Send for TandemHost {}
unsafe impl Sync for TandemHost {}

fn host_result(code: i32, call: &str) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(AudioError::Native(format!("{} failed with {}", call, code)))
    }
}

/// Build a C string, dropping interior NULs rather than failing.
pub(crate) fn c_string(value: &str) -> CString {
    CString::new(value.replace('\0', "")).unwrap_or_default()
}

pub(crate) fn item_status(code: i32, message: Option<String>) -> ItemStatus {
    match code {
        1 => ItemStatus::ReadyToPlay,
        2 => ItemStatus::Failed(message),
        _ => ItemStatus::Unknown,
    }
}

fn host_time(seconds: f64) -> NativeTime {
    NativeTime::from_seconds(seconds, HOST_TIMESCALE)
}

pub(crate) struct HostAvPlayer {
    vtable: TandemAvPlayer,
}

impl HostAvPlayer {
    fn ctx(&self) -> *mut c_void {
        self.vtable.context
    }
}

impl Drop for HostAvPlayer {
    fn drop(&mut self) {
        (self.vtable.release)(self.ctx());
    }
}

impl AvPlayerEngine for HostAvPlayer {
    fn replace_item(&mut self, source: &AudioSource) -> Result<()> {
        let native = c_string(&source.as_native_str());
        host_result(
            (self.vtable.replace_item)(self.ctx(), native.as_ptr(), source.is_remote()),
            "replaceCurrentItem",
        )
    }

    fn clear_item(&mut self) -> Result<()> {
        host_result((self.vtable.clear_item)(self.ctx()), "clearItem")
    }

    fn has_item(&self) -> bool {
        (self.vtable.has_item)(self.ctx())
    }

    fn item_status(&self) -> ItemStatus {
        item_status((self.vtable.item_status)(self.ctx()), None)
    }

    fn set_automatically_waits_to_minimize_stalling(&mut self, waits: bool) {
        (self.vtable.set_waits_to_minimize_stalling)(self.ctx(), waits);
    }

    fn add_status_observer(&mut self, session: SessionId) -> Result<()> {
        host_result((self.vtable.add_status_observer)(self.ctx(), session.as_raw()), "addObserver")
    }

    fn remove_status_observer(&mut self, session: SessionId) -> Result<()> {
        host_result((self.vtable.remove_status_observer)(self.ctx(), session.as_raw()), "removeObserver")
    }

    fn add_end_observer(&mut self, session: SessionId) -> Result<()> {
        host_result((self.vtable.add_end_observer)(self.ctx(), session.as_raw()), "addEndObserver")
    }

    fn remove_end_observer(&mut self, session: SessionId) -> Result<()> {
        host_result((self.vtable.remove_end_observer)(self.ctx(), session.as_raw()), "removeEndObserver")
    }

    fn play(&mut self) -> Result<()> {
        host_result((self.vtable.play)(self.ctx()), "play")
    }

    fn pause(&mut self) -> Result<()> {
        host_result((self.vtable.pause)(self.ctx()), "pause")
    }

    fn seek(&mut self, time: NativeTime) -> Result<()> {
        host_result((self.vtable.seek)(self.ctx(), time.value, time.timescale), "seek")
    }

    fn is_playing(&self) -> bool {
        (self.vtable.is_playing)(self.ctx())
    }

    fn current_time(&self) -> NativeTime {
        host_time((self.vtable.current_time)(self.ctx()))
    }

    fn duration(&self) -> NativeTime {
        host_time((self.vtable.duration)(self.ctx()))
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        host_result((self.vtable.set_rate)(self.ctx(), rate), "setRate")
    }

    fn volume(&self) -> f32 {
        (self.vtable.volume)(self.ctx())
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        host_result((self.vtable.set_volume)(self.ctx(), volume), "setVolume")
    }
}

pub(crate) struct HostFactory {
    host: TandemHost,
}

impl HostFactory {
    pub(crate) fn new(host: TandemHost) -> Self {
        Self { host }
    }
}

impl AvPlayerFactory for HostFactory {
    fn create(&self, session: SessionId, source: &AudioSource) -> Result<Box<dyn AvPlayerEngine>> {
        let native = c_string(&source.as_native_str());
        let mut vtable = std::mem::MaybeUninit::<TandemAvPlayer>::uninit();
        let code = (self.host.create_player)(
            self.host.context,
            session.as_raw(),
            native.as_ptr(),
            source.is_remote(),
            vtable.as_mut_ptr(),
        );
        if code != 0 {
            return Err(AudioError::SourceLoad(format!("could not create player for {}", source)));
        }
        // SAFETY: the host filled every field when it returned 0
        let vtable = unsafe { vtable.assume_init() };
        Ok(Box::new(HostAvPlayer { vtable }))
    }
}

pub(crate) struct HostAudioSession {
    host: TandemHost,
}

impl HostAudioSession {
    pub(crate) fn new(host: TandemHost) -> Self {
        Self { host }
    }
}

impl AudioSessionControl for HostAudioSession {
    fn current_output_port(&self) -> Option<String> {
        let mut buffer = [0 as c_char; PORT_BUFFER_LEN];
        let len = (self.host.current_output_port)(self.host.context, buffer.as_mut_ptr(), buffer.len());
        if len < 0 {
            return None;
        }
        let len = (len as usize).min(buffer.len());
        let bytes: Vec<u8> = buffer[..len].iter().map(|&c| c as u8).collect();
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn set_category_play_and_record(&mut self) -> Result<()> {
        host_result((self.host.set_category_play_and_record)(self.host.context), "setCategory")
    }

    fn override_output_to_speaker(&mut self) -> Result<()> {
        host_result((self.host.override_output_to_speaker)(self.host.context), "overrideOutputAudioPort")
    }

    fn set_active(&mut self, active: bool) -> Result<()> {
        host_result((self.host.set_active)(self.host.context, active), "setActive")
    }
}

/// Forwards a session's events and callbacks to the host.
pub(crate) struct HostListener {
    host: TandemHost,
    session: u64,
}

impl HostListener {
    pub(crate) fn new(host: TandemHost, session: SessionId) -> Self {
        Self {
            host,
            session: session.as_raw(),
        }
    }

    pub(crate) fn load_settled(&self, result: &Result<()>) {
        let (code, message) = match result {
            Ok(()) => (0, String::new()),
            Err(e) => (-1, e.to_string()),
        };
        let message = c_string(&message);
        (self.host.on_load_settled)(self.host.context, self.session, code, message.as_ptr());
    }

    pub(crate) fn complete(&self, looped: bool) {
        (self.host.on_complete)(self.host.context, self.session, looped);
    }

    pub(crate) fn error(&self, what: i32, message: Option<&str>) {
        let message = c_string(message.unwrap_or_default());
        (self.host.on_error)(self.host.context, self.session, what, message.as_ptr());
    }
}

impl PlayerListener for HostListener {
    fn on_event(&self, payload: &EventPayload) {
        let seconds = match &payload.data {
            Some(EventData::Position(time)) => time.as_seconds(),
            _ => -1.0,
        };
        let name = c_string(payload.event.name());
        log::debug!(target: IOS_TARGET, "event {} for session {}", payload.event.name(), self.session);
        (self.host.on_event)(self.host.context, self.session, name.as_ptr(), seconds);
    }
}

/// Read a host string argument.
///
/// # Safety
/// `value` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn read_c_str(value: *const c_char) -> Result<String> {
    if value.is_null() {
        return Err(AudioError::InvalidState("null string".to_string()));
    }
    CStr::from_ptr(value)
        .to_str()
        .map(str::to_owned)
        .map_err(|e| AudioError::InvalidState(format!("Invalid UTF-8: {}", e)))
}
