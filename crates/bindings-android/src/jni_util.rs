// JavaVM access, exception handling and per-session Java listeners

use jni::objects::{GlobalRef, JClass, JObject, JValue, JValueOwned};
use jni::{JNIEnv, JavaVM};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use std::collections::HashMap;
use tandem_core::{AudioError, Result, SessionId};

pub(crate) const LISTENER_CLASS: &str = "com/tandem/audio/NativeListener";

/// `AudioManager.STREAM_MUSIC`
pub(crate) const STREAM_MUSIC: i32 = 3;

static VM: OnceCell<JavaVM> = OnceCell::new();

// App classes cannot be found from natively attached threads; keep the class
// resolved on the Java thread that called nativeInit.
static LISTENER: OnceCell<GlobalRef> = OnceCell::new();

static CONTEXT: OnceCell<GlobalRef> = OnceCell::new();

static LISTENERS: Lazy<Mutex<HashMap<SessionId, GlobalRef>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub(crate) fn jni_error(err: jni::errors::Error) -> AudioError {
    AudioError::Native(err.to_string())
}

/// Capture the VM, the application context and the listener class.
pub(crate) fn initialize(env: &mut JNIEnv, context: &JObject) -> Result<()> {
    if VM.get().is_some() {
        return Ok(());
    }

    let vm = env.get_java_vm().map_err(jni_error)?;
    let context = env.new_global_ref(context).map_err(jni_error)?;
    let class = env.find_class(LISTENER_CLASS).map_err(jni_error)?;
    let class = env.new_global_ref(class).map_err(jni_error)?;

    // SAFETY: both pointers stay valid for the life of the process; the
    // context is pinned by a global reference that is never released.
    unsafe {
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            context.as_obj().as_raw().cast(),
        );
    }

    let _ = VM.set(vm);
    let _ = CONTEXT.set(context);
    let _ = LISTENER.set(class);
    Ok(())
}

pub(crate) fn vm() -> Result<&'static JavaVM> {
    VM.get()
        .ok_or_else(|| AudioError::InvalidState("nativeInit was not called".to_string()))
}

/// Application context handed over by nativeInit.
pub(crate) fn app_context() -> Result<JObject<'static>> {
    if CONTEXT.get().is_none() {
        return Err(AudioError::InvalidState("nativeInit was not called".to_string()));
    }
    let ctx = ndk_context::android_context();
    // SAFETY: the pointer is a global reference pinned in CONTEXT.
    Ok(unsafe { JObject::from_raw(ctx.context().cast()) })
}

/// Attach the current thread and run `f` with its environment.
pub(crate) fn with_env<R>(f: impl FnOnce(&mut JNIEnv) -> Result<R>) -> Result<R> {
    let mut env = vm()?.attach_current_thread().map_err(jni_error)?;
    f(&mut *env)
}

/// Call a Java method, clearing any thrown exception into an error.
pub(crate) fn call<'local>(
    env: &mut JNIEnv<'local>,
    obj: &JObject,
    name: &str,
    sig: &str,
    args: &[JValue],
) -> Result<JValueOwned<'local>> {
    env.call_method(obj, name, sig, args).map_err(|err| {
        if matches!(err, jni::errors::Error::JavaException) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        AudioError::Native(format!("{}: {}", name, err))
    })
}

fn listener_class() -> Result<&'static JClass<'static>> {
    LISTENER
        .get()
        .map(|class| class.as_obj().into())
        .ok_or_else(|| AudioError::InvalidState("nativeInit was not called".to_string()))
}

/// Call a static `NativeListener` helper.
pub(crate) fn call_listener_static(env: &mut JNIEnv, name: &str, sig: &str, args: &[JValue]) -> Result<()> {
    let class = listener_class()?;
    env.call_static_method(class, name, sig, args).map_err(|err| {
        if matches!(err, jni::errors::Error::JavaException) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        AudioError::Native(format!("{}: {}", name, err))
    })?;
    Ok(())
}

/// The Java listener bound to `session`, created on first use.
pub(crate) fn listener(env: &mut JNIEnv, session: SessionId) -> Result<GlobalRef> {
    if let Some(existing) = LISTENERS.lock().get(&session) {
        return Ok(existing.clone());
    }

    let class = listener_class()?;
    let object = env
        .new_object(class, "(J)V", &[JValue::Long(session.as_raw() as i64)])
        .map_err(jni_error)?;
    let global = env.new_global_ref(object).map_err(jni_error)?;

    LISTENERS.lock().insert(session, global.clone());
    Ok(global)
}

/// Drop the listener once its session is gone.
pub(crate) fn forget_listener(session: SessionId) {
    LISTENERS.lock().remove(&session);
}
