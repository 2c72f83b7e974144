//! # Call dispatcher
//!
//! Resolves `interface.method` against the ledger and the live client, then invokes it.
//! Calls may have side effects on the sdk and are never retried.

use std::sync::Arc;

use wirepack::Value;

use crate::host::Error;
use crate::host::Result;
use crate::ledger;
use crate::sdk::SdkClient;

pub struct Dispatcher {
    client: Option<Arc<dyn SdkClient>>,
}

impl Dispatcher {
    /// `client` is `None` when the sdk never initialized.
    pub fn new(client: Option<Arc<dyn SdkClient>>) -> Self {
        Self { client }
    }

    pub async fn call(&self, interface: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        // Checked before anything else, so an uninitialized host reveals nothing about its surface.
        let client = self.client.as_ref().ok_or(Error::NotInitialized)?;

        let schema = ledger::interface(interface)
            .ok_or_else(|| Error::UnknownInterface(interface.to_string()))?;
        if !schema.has_method(method) {
            return Err(Error::NoSuchMember {
                interface: interface.to_string(),
                method: method.to_string(),
            });
        }

        let target = client
            .interface(schema.name)
            .ok_or_else(|| Error::UnknownInterface(interface.to_string()))?;

        tracing::trace!(interface, method, args = args.len(), "dispatching call");
        target.invoke(method, args).await.map_err(Error::Invocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sdk::MemorySdk;

    fn dispatcher() -> Dispatcher {
        let sdk = MemorySdk::new(480, "Gordon").with_achievements(["ACH_WIN_ONE_GAME"]);
        Dispatcher::new(Some(Arc::new(sdk)))
    }

    #[tokio::test]
    async fn test_call_returns_value() {
        let value = dispatcher().call("Utils", "getAppId", vec![]).await;
        assert_eq!(value, Ok(Value::Int(480)));
    }

    #[tokio::test]
    async fn test_uninitialized_fails_before_lookup() {
        let dispatcher = Dispatcher::new(None);
        assert_eq!(dispatcher.call("Utils", "getAppId", vec![]).await, Err(Error::NotInitialized));
        assert_eq!(dispatcher.call("Nope", "nope", vec![]).await, Err(Error::NotInitialized));
    }

    #[tokio::test]
    async fn test_lookup_failures() {
        let dispatcher = dispatcher();
        assert_eq!(
            dispatcher.call("Nope", "getAppId", vec![]).await,
            Err(Error::UnknownInterface("Nope".into()))
        );
        assert!(matches!(
            dispatcher.call("Utils", "constructor", vec![]).await,
            Err(Error::NoSuchMember { .. })
        ));
        // Exposed by the ledger but not provided by this client.
        assert_eq!(
            dispatcher.call("Workshop", "subscribe", vec![]).await,
            Err(Error::UnknownInterface("Workshop".into()))
        );
    }

    #[tokio::test]
    async fn test_invocation_error_is_verbatim() {
        let err = dispatcher()
            .call("Achievement", "activate", vec!["MISSING".into()])
            .await
            .unwrap_err();
        assert_eq!(err, Error::Invocation("Achievement 'MISSING' does not exist".into()));
        assert_eq!(err.to_fault().message, "Achievement 'MISSING' does not exist");
    }
}
