//! # Availability classifier
//!
//! Runs once at host startup. A vendor init failure is classified by its message text
//! and the host keeps running without an sdk client; any other init failure aborts
//! startup.

use std::sync::Arc;

use crate::sdk::InitError;
use crate::sdk::SdkClient;
use crate::sdk::SdkInit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvailabilityState {
    Available,
    Unknown,
    NoAppId,
    NotRunning,
    NotLoggedIn,
}

impl AvailabilityState {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Console text shown to the guest when the sdk is not available.
    pub fn warning_message(&self) -> Option<&'static str> {
        let message = match self {
            Self::Available => return None,
            Self::NoAppId => {
                "No steam appid was specified. Launch with --appid=<your app id> if you wish to make calls to the steamworks sdk. This is only required during development. When launched through steam, the appid will automatically be determined."
            }
            Self::NotRunning => {
                "Steam doesn't appear to be running. Make sure to launch Steam if you wish to make calls to the steamworks sdk."
            }
            Self::NotLoggedIn => {
                "No user appears to be logged in in the Steam client. Log in to Steam if you wish to make calls to the steamworks sdk."
            }
            Self::Unknown => "An unknown error occurred while initializing the steamworks sdk.",
        };
        Some(message)
    }
}

impl std::fmt::Display for AvailabilityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Available => "available",
            Self::Unknown => "unknown",
            Self::NoAppId => "no-app-id",
            Self::NotRunning => "not-running",
            Self::NotLoggedIn => "not-logged-in",
        };
        f.write_str(name)
    }
}

const NO_APP_ID: &[&str] = &["no appid", "no app id", "steam_appid.txt"];
const NOT_RUNNING: &[&str] = &["running instance of steam", "steam is not running", "steam must be running"];
const NOT_LOGGED_IN: &[&str] = &["logged in", "logged on"];

/// Classifies a vendor init failure message. Matching is case-insensitive.
pub fn classify(message: &str) -> AvailabilityState {
    let message = message.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| message.contains(p));

    if matches(NO_APP_ID) {
        AvailabilityState::NoAppId
    } else if matches(NOT_RUNNING) {
        AvailabilityState::NotRunning
    } else if matches(NOT_LOGGED_IN) {
        AvailabilityState::NotLoggedIn
    } else {
        AvailabilityState::Unknown
    }
}

/// Sdk init failed in a way that is not a known vendor condition.
#[derive(Debug)]
pub struct StartupFatal(pub anyhow::Error);

impl std::fmt::Display for StartupFatal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fatal error while initializing the sdk: {:#}", self.0)
    }
}

impl std::error::Error for StartupFatal {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Outcome of startup: the state and, when available, the client.
///
/// Never changes after construction.
pub struct Availability {
    state: AvailabilityState,
    client: Option<Arc<dyn SdkClient>>,
}

impl Availability {
    /// Initializes the sdk once and classifies the outcome.
    pub fn probe(init: &dyn SdkInit, app_id: Option<u32>) -> Result<Self, StartupFatal> {
        match init.init(app_id) {
            Ok(client) => {
                tracing::info!(?app_id, "sdk initialized");
                Ok(Self::from_client(client))
            }
            Err(InitError::Vendor(message)) => {
                let state = classify(&message);
                tracing::warn!(%state, vendor = %message, "sdk unavailable");
                Ok(Self::unavailable(state))
            }
            Err(InitError::Fatal(e)) => Err(StartupFatal(e)),
        }
    }

    pub fn from_client(client: Arc<dyn SdkClient>) -> Self {
        Self {
            state: AvailabilityState::Available,
            client: Some(client),
        }
    }

    /// No client. `state` should not be `Available`.
    pub fn unavailable(state: AvailabilityState) -> Self {
        Self { state, client: None }
    }

    pub fn state(&self) -> AvailabilityState {
        self.state
    }

    pub fn client(&self) -> Option<&Arc<dyn SdkClient>> {
        self.client.as_ref()
    }

    pub fn warning(&self) -> Option<String> {
        if self.client.is_some() {
            return None;
        }
        let state = match self.state {
            AvailabilityState::Available => AvailabilityState::Unknown,
            other => other,
        };
        state.warning_message().map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sdk::MemoryLaunch;
    use crate::sdk::MemorySdk;
    use crate::sdk::memory::NO_APP_ID_FAILURE;

    #[test]
    fn test_classify_vendor_messages() {
        assert_eq!(classify(NO_APP_ID_FAILURE), AvailabilityState::NoAppId);
        assert_eq!(
            classify("SteamAPI_Init() failed; SteamAPI_IsSteamRunning() did not locate a running instance of Steam."),
            AvailabilityState::NotRunning
        );
        assert_eq!(
            classify("Steam client is not logged in: no user logged on"),
            AvailabilityState::NotLoggedIn
        );
        assert_eq!(classify("Something else entirely"), AvailabilityState::Unknown);
    }

    #[test]
    fn test_probe_success() {
        let availability = Availability::probe(&MemoryLaunch::Ready(Arc::new(MemorySdk::new(480, "Gordon"))), None).unwrap();
        assert!(availability.state().is_available());
        assert!(availability.client().is_some());
        assert_eq!(availability.warning(), None);
    }

    #[test]
    fn test_probe_vendor_failure_degrades() {
        let launch = MemoryLaunch::VendorFailure("Steam is not running".into());
        let availability = Availability::probe(&launch, Some(480)).unwrap();
        assert_eq!(availability.state(), AvailabilityState::NotRunning);
        assert!(availability.client().is_none());
        assert!(availability.warning().unwrap().starts_with("Steam doesn't appear to be running."));
    }

    #[test]
    fn test_probe_crash_is_fatal() {
        let launch = MemoryLaunch::Crash("library missing".into());
        let err = Availability::probe(&launch, None).err().expect("expected fatal");
        assert!(err.to_string().contains("library missing"));
    }

    #[test]
    fn test_every_unavailable_state_has_a_warning() {
        for state in [
            AvailabilityState::Unknown,
            AvailabilityState::NoAppId,
            AvailabilityState::NotRunning,
            AvailabilityState::NotLoggedIn,
        ] {
            assert!(state.warning_message().is_some());
        }
        assert!(AvailabilityState::Available.warning_message().is_none());
    }
}
