//! # Startup handoff
//!
//! The only data the host gives the guest before any frame can flow. It travels as
//! a single `--bridge-handoff=<json>` process argument.

use serde::Deserialize;
use serde::Serialize;

/// Argument prefix carrying the handoff.
pub const ARG_PREFIX: &str = "--bridge-handoff=";

#[derive(Debug)]
pub enum Error {
    /// No argument carried the handoff.
    Missing,
    /// The argument was present but did not parse.
    Malformed(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "No {} argument was found", ARG_PREFIX.trim_end_matches('=')),
            Self::Malformed(e) => write!(f, "Malformed startup handoff: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            Self::Missing => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Debug flag and availability warning, fixed for the lifetime of the guest.
///
/// The sdk is available exactly when `availability_warning` is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupHandoff {
    pub debug: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_warning: Option<String>,
}

impl StartupHandoff {
    pub fn is_available(&self) -> bool {
        self.availability_warning.is_none()
    }

    pub fn to_arg(&self) -> Result<String> {
        Ok(format!("{}{}", ARG_PREFIX, serde_json::to_string(self)?))
    }

    /// Finds and parses the handoff among process arguments.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            if let Some(json) = arg.as_ref().strip_prefix(ARG_PREFIX) {
                return Ok(serde_json::from_str(json)?);
            }
        }
        Err(Error::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_round_trip() {
        let handoff = StartupHandoff {
            debug: true,
            availability_warning: Some("Steam doesn't appear to be running.".into()),
        };
        let arg = handoff.to_arg().unwrap();
        assert!(arg.contains("\"availabilityWarning\""));

        let args = vec!["app".to_string(), "--url=https://example.com".to_string(), arg];
        assert_eq!(StartupHandoff::from_args(&args).unwrap(), handoff);
    }

    #[test]
    fn test_available_handoff_omits_warning() {
        let arg = StartupHandoff { debug: false, availability_warning: None }.to_arg().unwrap();
        assert_eq!(arg, "--bridge-handoff={\"debug\":false}");
        assert!(StartupHandoff::from_args([arg]).unwrap().is_available());
    }

    #[test]
    fn test_missing_and_malformed() {
        assert!(matches!(StartupHandoff::from_args(["--debug-dev"]), Err(Error::Missing)));
        assert!(matches!(
            StartupHandoff::from_args(["--bridge-handoff={not json"]),
            Err(Error::Malformed(_))
        ));
    }
}
