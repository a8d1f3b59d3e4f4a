// JNI bindings for Android
// Provides a bridge between Kotlin/Java and the Rust audio player
//
// Java side contract (package `com.tandem.audio`):
//
// - `NativeBridge`: declares the `native*` methods implemented in `bridge`.
// - `NativeListener(long sessionId)`: implements MediaPlayer's prepared,
//   completion, error and info listeners plus `OnAudioFocusChangeListener`,
//   forwarding each to the matching `NativeBridge.nativeOn*` method. It also
//   exposes `registerNoisyReceiver(Context)`, `unregisterNoisyReceiver(Context)`
//   and a static `bindVolumeControlStream(Context, int)`.
// - `PlayerCallbacks`: receives `onEvent(String, double)`,
//   `onLoadSettled(int, String)`, `onComplete(boolean)`, `onError(int, int)`
//   and `onInfo(int, int)`.

pub mod runtime;

#[cfg(target_os = "android")]
mod audio_focus;
#[cfg(target_os = "android")]
mod bridge;
#[cfg(target_os = "android")]
mod callbacks;
#[cfg(target_os = "android")]
mod jni_util;
#[cfg(target_os = "android")]
mod media_player;
