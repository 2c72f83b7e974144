//! # In-memory sdk
//!
//! A small stand-in for the vendor client, in the spirit of an in-memory key/value
//! store: enough state to answer the common `Utils`, `Localplayer`, `Achievement`
//! and `Cloud` calls, plus manual event firing. Used by tests and the demo binary.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use wirepack::Value;

use crate::ledger::CallbackType;
use crate::sdk::InitError;
use crate::sdk::Listener;
use crate::sdk::NativeSubscription;
use crate::sdk::SdkClient;
use crate::sdk::SdkInit;
use crate::sdk::SdkInterface;

/// Vendor text reported when no app id can be determined.
pub const NO_APP_ID_FAILURE: &str = "SteamAPI_Init() failed; no appID found. Either launch the game from Steam, or put the file steam_appid.txt containing the correct appID in your game folder.";

#[derive(Debug)]
struct State {
    app_id: u32,
    user: String,
    steam_id: u64,
    level: u32,
    rich_presence: BTreeMap<String, String>,
    achievements: BTreeMap<String, bool>,
    cloud_enabled: bool,
    files: BTreeMap<String, String>,
}

type Shared = Arc<Mutex<State>>;

fn lock(state: &Shared) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

type SharedListener = Arc<dyn Fn(Vec<Value>) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    by_type: HashMap<CallbackType, Vec<(u64, SharedListener)>>,
}

/// In-memory sdk client.
pub struct MemorySdk {
    state: Shared,
    listeners: Arc<Mutex<Listeners>>,
    next_token: AtomicU64,
    utils: Utils,
    localplayer: Localplayer,
    achievement: Achievement,
    cloud: Cloud,
}

impl MemorySdk {
    /// Creates a client for `app_id` with a single logged-in user.
    pub fn new(app_id: u32, user: impl Into<String>) -> Self {
        let state = Arc::new(Mutex::new(State {
            app_id,
            user: user.into(),
            steam_id: 76561197960287930,
            level: 1,
            rich_presence: BTreeMap::new(),
            achievements: BTreeMap::new(),
            cloud_enabled: true,
            files: BTreeMap::new(),
        }));

        Self {
            utils: Utils { state: state.clone() },
            localplayer: Localplayer { state: state.clone() },
            achievement: Achievement { state: state.clone() },
            cloud: Cloud { state: state.clone() },
            state,
            listeners: Arc::new(Mutex::new(Listeners::default())),
            next_token: AtomicU64::new(1),
        }
    }

    /// Adds achievements known to the app, all locked.
    pub fn with_achievements<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = lock(&self.state);
            for name in names {
                state.achievements.insert(name.into(), false);
            }
        }
        self
    }

    pub fn app_id(&self) -> u32 {
        lock(&self.state).app_id
    }

    fn set_app_id(&self, app_id: u32) {
        lock(&self.state).app_id = app_id;
    }

    /// Returns a snapshot of the rich presence keys.
    pub fn rich_presence(&self) -> BTreeMap<String, String> {
        lock(&self.state).rich_presence.clone()
    }

    /// Fires a native event. Returns how many listeners received it.
    ///
    /// Listeners are cloned out of the table before they run, so a listener may
    /// subscribe or disconnect without deadlocking.
    pub fn fire(&self, callback: CallbackType, args: Vec<Value>) -> usize {
        let targets: Vec<SharedListener> = {
            let listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
            listeners
                .by_type
                .get(&callback)
                .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
                .unwrap_or_default()
        };

        for listener in &targets {
            listener(args.clone());
        }
        targets.len()
    }

    /// Number of live native subscriptions across every callback type.
    pub fn listener_count(&self) -> usize {
        let listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        listeners.by_type.values().map(Vec::len).sum()
    }
}

impl SdkClient for MemorySdk {
    fn interface(&self, name: &str) -> Option<&dyn SdkInterface> {
        match name {
            "Utils" => Some(&self.utils),
            "Localplayer" => Some(&self.localplayer),
            "Achievement" => Some(&self.achievement),
            "Cloud" => Some(&self.cloud),
            _ => None,
        }
    }

    fn subscribe(&self, callback: CallbackType, listener: Listener) -> Box<dyn NativeSubscription> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
            listeners
                .by_type
                .entry(callback)
                .or_default()
                .push((token, Arc::from(listener)));
        }
        Box::new(MemorySubscription {
            listeners: self.listeners.clone(),
            callback,
            token,
        })
    }
}

struct MemorySubscription {
    listeners: Arc<Mutex<Listeners>>,
    callback: CallbackType,
    token: u64,
}

impl NativeSubscription for MemorySubscription {
    fn disconnect(self: Box<Self>) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(list) = listeners.by_type.get_mut(&self.callback) {
            list.retain(|(token, _)| *token != self.token);
            if list.is_empty() {
                listeners.by_type.remove(&self.callback);
            }
        }
    }
}

fn str_arg<'a>(args: &'a [Value], index: usize, method: &str) -> Result<&'a str, String> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{}: argument {} must be a string", method, index))
}

fn unsupported(interface: &str, method: &str) -> Result<Value, String> {
    Err(format!("{}.{} is not available in this environment", interface, method))
}

struct Utils {
    state: Shared,
}

#[async_trait::async_trait]
impl SdkInterface for Utils {
    async fn invoke(&self, method: &str, _args: Vec<Value>) -> Result<Value, String> {
        match method {
            "getAppId" => Ok(Value::from(lock(&self.state).app_id)),
            "getServerRealTime" => {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map_err(|e| e.to_string())?;
                Ok(Value::Int(now.as_secs() as i64))
            }
            "isSteamRunningOnSteamDeck" => Ok(Value::Bool(false)),
            other => unsupported("Utils", other),
        }
    }
}

struct Localplayer {
    state: Shared,
}

#[async_trait::async_trait]
impl SdkInterface for Localplayer {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, String> {
        match method {
            "getName" => Ok(Value::from(lock(&self.state).user.clone())),
            "getSteamId" => {
                let steam_id = lock(&self.state).steam_id;
                Ok(Value::Map(vec![
                    ("steamId64".into(), Value::UInt(steam_id)),
                    ("accountId".into(), Value::from(steam_id as u32)),
                ]))
            }
            "getLevel" => Ok(Value::from(lock(&self.state).level)),
            "getIpCountry" => Ok(Value::from("NL")),
            "setRichPresence" => {
                let key = str_arg(&args, 0, method)?.to_string();
                let mut state = lock(&self.state);
                match args.get(1).and_then(Value::as_str) {
                    Some(value) => state.rich_presence.insert(key, value.to_string()),
                    None => state.rich_presence.remove(&key),
                };
                Ok(Value::Null)
            }
            other => unsupported("Localplayer", other),
        }
    }
}

struct Achievement {
    state: Shared,
}

#[async_trait::async_trait]
impl SdkInterface for Achievement {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, String> {
        let mut state = lock(&self.state);
        match method {
            "names" => Ok(Value::from(state.achievements.keys().cloned().collect::<Vec<_>>())),
            "activate" | "clear" | "isActivated" => {
                let name = str_arg(&args, 0, method)?;
                let Some(unlocked) = state.achievements.get_mut(name) else {
                    return Err(format!("Achievement '{}' does not exist", name));
                };
                match method {
                    "activate" => *unlocked = true,
                    "clear" => *unlocked = false,
                    _ => return Ok(Value::Bool(*unlocked)),
                }
                Ok(Value::Bool(true))
            }
            other => unsupported("Achievement", other),
        }
    }
}

struct Cloud {
    state: Shared,
}

#[async_trait::async_trait]
impl SdkInterface for Cloud {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, String> {
        let mut state = lock(&self.state);
        match method {
            "isEnabledForAccount" => Ok(Value::Bool(true)),
            "isEnabledForApp" => Ok(Value::Bool(state.cloud_enabled)),
            "setEnabledForApp" => {
                state.cloud_enabled = args.first().and_then(Value::as_bool).unwrap_or(false);
                Ok(Value::Null)
            }
            "readFile" => {
                let name = str_arg(&args, 0, method)?;
                state
                    .files
                    .get(name)
                    .map(|content| Value::from(content.clone()))
                    .ok_or_else(|| format!("File '{}' does not exist", name))
            }
            "writeFile" => {
                let name = str_arg(&args, 0, method)?.to_string();
                let content = str_arg(&args, 1, method)?.to_string();
                state.files.insert(name, content);
                Ok(Value::Bool(true))
            }
            "deleteFile" => {
                let name = str_arg(&args, 0, method)?;
                Ok(Value::Bool(state.files.remove(name).is_some()))
            }
            "fileExists" => {
                let name = str_arg(&args, 0, method)?;
                Ok(Value::Bool(state.files.contains_key(name)))
            }
            "listFiles" => {
                let files = state
                    .files
                    .iter()
                    .map(|(name, content)| {
                        Value::Map(vec![
                            ("name".into(), Value::from(name.as_str())),
                            ("size".into(), Value::UInt(content.len() as u64)),
                        ])
                    })
                    .collect();
                Ok(Value::List(files))
            }
            other => unsupported("Cloud", other),
        }
    }
}

/// How a simulated launch of the vendor sdk plays out.
pub enum MemoryLaunch {
    /// Initialization succeeds with this client. An explicit app id overrides its own.
    Ready(Arc<MemorySdk>),
    /// The vendor library refuses to start with this message.
    VendorFailure(String),
    /// Initialization fails in a way the vendor library never reports.
    Crash(String),
}

impl SdkInit for MemoryLaunch {
    fn init(&self, app_id: Option<u32>) -> Result<Arc<dyn SdkClient>, InitError> {
        match self {
            Self::Ready(sdk) => {
                if let Some(app_id) = app_id {
                    sdk.set_app_id(app_id);
                }
                Ok(sdk.clone())
            }
            Self::VendorFailure(msg) => Err(InitError::Vendor(msg.clone())),
            Self::Crash(msg) => Err(InitError::Fatal(anyhow::anyhow!(msg.clone()))),
        }
    }
}
