// Integer handles for players crossing an FFI boundary

use crate::error::{AudioError, Result};
use crate::player::AudioPlayer;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps the handle a host language holds to the player behind it.
///
/// The handle is the player's session id, so native callbacks and host calls
/// name a player the same way.
#[derive(Default)]
pub struct PlayerTable {
    players: Mutex<HashMap<i64, Arc<dyn AudioPlayer>>>,
}

impl PlayerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, player: Arc<dyn AudioPlayer>) -> i64 {
        let handle = player.session_id().as_raw() as i64;
        self.players.lock().insert(handle, player);
        log::info!("Audio player created with handle: {}", handle);
        handle
    }

    pub fn get(&self, handle: i64) -> Option<Arc<dyn AudioPlayer>> {
        self.players.lock().get(&handle).cloned()
    }

    pub fn remove(&self, handle: i64) -> Option<Arc<dyn AudioPlayer>> {
        self.players.lock().remove(&handle)
    }

    /// Run `f` against a player without holding the table lock, so events the
    /// player emits may call back across the boundary.
    pub fn with<R>(&self, handle: i64, f: impl FnOnce(&dyn AudioPlayer) -> Result<R>) -> Result<R> {
        let player = self
            .get(handle)
            .ok_or_else(|| AudioError::InvalidState(format!("Invalid player ID: {}", handle)))?;
        f(player.as_ref())
    }

    pub fn len(&self) -> usize {
        self.players.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `0` on success, `-1` on error
pub fn to_code(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            log::error!("FFI error: {}", err);
            -1
        }
    }
}

/// `1` when the call took effect, `0` when it was a no-op, `-1` on error
pub fn flag_code(result: Result<bool>) -> i32 {
    match result {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(err) => {
            log::error!("FFI error: {}", err);
            -1
        }
    }
}
