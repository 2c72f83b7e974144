//! # Callback relay
//!
//! Turns guest registrations into native subscriptions and forwards every firing as a
//! `Fired` frame. The subscription table belongs to the relay and is emptied by
//! `shutdown`.

use std::sync::Arc;

use dashmap::DashMap;
use wirerpc::FiredFrame;
use wirerpc::Frame;

use crate::host::Error;
use crate::host::Result;
use crate::ledger::CallbackType;
use crate::outbox;
use crate::outbox::Outbox;
use crate::sdk::NativeSubscription;
use crate::sdk::SdkClient;

pub struct CallbackRelay {
    client: Option<Arc<dyn SdkClient>>,
    outbox: Outbox,
    subscriptions: DashMap<u64, Box<dyn NativeSubscription>>,
}

impl CallbackRelay {
    pub fn new(client: Option<Arc<dyn SdkClient>>, outbox: Outbox) -> Self {
        Self {
            client,
            outbox,
            subscriptions: DashMap::new(),
        }
    }

    /// Subscribes guest callback `id` to the native event named `callback_type`.
    ///
    /// Firings are queued on the outbox from inside the native listener, so frames for
    /// one subscription keep the native firing order.
    pub fn register(&self, callback_type: &str, id: u64) -> Result<()> {
        let client = self.client.as_ref().ok_or(Error::NotInitialized)?;
        let callback = CallbackType::from_name(callback_type)
            .ok_or_else(|| Error::UnknownCallbackType(callback_type.to_string()))?;

        let outbox = self.outbox.clone();
        let subscription = client.subscribe(
            callback,
            Box::new(move |args| {
                match outbox.push(&Frame::Fired(FiredFrame { id, args })) {
                    Ok(()) => {}
                    Err(e @ outbox::Error::Encode(_)) => {
                        tracing::warn!(id, error = %e, "callback arguments could not be encoded, dropping firing");
                    }
                    Err(e @ outbox::Error::Closed) => {
                        tracing::debug!(id, error = %e, "dropping callback firing");
                    }
                }
            }),
        );

        if let Some(previous) = self.subscriptions.insert(id, subscription) {
            tracing::warn!(id, "callback id registered twice, replacing the old subscription");
            previous.disconnect();
        }
        tracing::debug!(id, %callback, "callback registered");
        Ok(())
    }

    /// Tears down subscription `id`. Unknown or already disconnected ids are ignored.
    ///
    /// Returns whether a subscription was removed.
    pub fn disconnect(&self, id: u64) -> bool {
        match self.subscriptions.remove(&id) {
            Some((_, subscription)) => {
                subscription.disconnect();
                tracing::debug!(id, "callback disconnected");
                true
            }
            None => false,
        }
    }

    /// Disconnects every live subscription.
    pub fn shutdown(&self) {
        let ids: Vec<u64> = self.subscriptions.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.disconnect(id);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
