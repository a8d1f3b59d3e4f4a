// Forwards player events and load results to a Java PlayerCallbacks object

use crate::jni_util::{call, jni_error, with_env};
use jni::objects::{GlobalRef, JObject, JValue};
use jni::JNIEnv;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tandem_core::logging::ANDROID_TARGET;
use tandem_core::{
    AudioPlayerOptions, EventData, EventPayload, LoadHandle, PlayerListener, Result,
};

/// Callbacks bound at `nativeCreate`, keyed by player handle
static CALLBACKS: Lazy<Mutex<HashMap<i64, Arc<JniPlayerCallbacks>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub(crate) fn register(handle: i64, callbacks: Arc<JniPlayerCallbacks>) {
    CALLBACKS.lock().insert(handle, callbacks);
}

pub(crate) fn lookup(handle: i64) -> Option<Arc<JniPlayerCallbacks>> {
    CALLBACKS.lock().get(&handle).cloned()
}

pub(crate) fn unregister(handle: i64) {
    CALLBACKS.lock().remove(&handle);
}

pub(crate) struct JniPlayerCallbacks {
    callbacks: GlobalRef,
}

impl JniPlayerCallbacks {
    pub(crate) fn new(env: &mut JNIEnv, callbacks: &JObject) -> Result<Arc<Self>> {
        let callbacks = env.new_global_ref(callbacks).map_err(jni_error)?;
        Ok(Arc::new(Self { callbacks }))
    }

    fn invoke<F>(&self, name: &str, sig: &str, args: F)
    where
        F: for<'local> FnOnce(&mut JNIEnv<'local>) -> Result<Vec<JValueArg<'local>>>,
    {
        let result = with_env(|env| {
            let args = args(env)?;
            let values: Vec<JValue> = args.iter().map(JValueArg::as_value).collect();
            call(env, self.callbacks.as_obj(), name, sig, &values)?;
            Ok(())
        });
        if let Err(e) = result {
            log::error!(target: ANDROID_TARGET, "PlayerCallbacks.{} failed: {}", name, e);
        }
    }

    /// Wire the options' complete/error/info callbacks to this object.
    pub(crate) fn attach(self: &Arc<Self>, options: AudioPlayerOptions) -> AudioPlayerOptions {
        let complete = self.clone();
        let error = self.clone();
        let info = self.clone();
        options
            .on_complete(move |c| {
                complete.invoke("onComplete", "(Z)V", |_| Ok(vec![JValueArg::Bool(c.looped)]))
            })
            .on_error(move |e| {
                error.invoke("onError", "(II)V", |_| {
                    Ok(vec![JValueArg::Int(e.what), JValueArg::Int(e.extra)])
                })
            })
            .on_info(move |i| {
                info.invoke("onInfo", "(II)V", |_| {
                    Ok(vec![JValueArg::Int(i.what), JValueArg::Int(i.extra)])
                })
            })
    }

    /// Report the load result through `onLoadSettled(code, message)`.
    pub(crate) fn report_load(self: &Arc<Self>, handle: &LoadHandle) {
        let this = self.clone();
        handle.on_settled(move |result| {
            let (code, message) = match result {
                Ok(()) => (0, String::new()),
                Err(e) => (-1, e.to_string()),
            };
            this.invoke("onLoadSettled", "(ILjava/lang/String;)V", |env| {
                let message = env.new_string(message).map_err(jni_error)?;
                Ok(vec![JValueArg::Int(code), JValueArg::Object(message.into())])
            });
        });
    }
}

impl PlayerListener for JniPlayerCallbacks {
    fn on_event(&self, payload: &EventPayload) {
        let seconds = match &payload.data {
            Some(EventData::Position(time)) => time.as_seconds(),
            _ => -1.0,
        };
        let name = payload.event.name();
        self.invoke("onEvent", "(Ljava/lang/String;D)V", |env| {
            let name = env.new_string(name).map_err(jni_error)?;
            Ok(vec![JValueArg::Object(name.into()), JValueArg::Double(seconds)])
        });
    }
}

/// Owned argument; `JValue` only borrows objects.
enum JValueArg<'local> {
    Bool(bool),
    Int(i32),
    Double(f64),
    Object(JObject<'local>),
}

impl JValueArg<'_> {
    fn as_value(&self) -> JValue<'_, '_> {
        match self {
            JValueArg::Bool(v) => JValue::Bool(u8::from(*v)),
            JValueArg::Int(v) => JValue::Int(*v),
            JValueArg::Double(v) => JValue::Double(*v),
            JValueArg::Object(o) => JValue::Object(o),
        }
    }
}
