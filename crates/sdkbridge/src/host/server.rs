//! # Host bridge
//!
//! The serving loop of the privileged side. Frames are taken off the transport and
//! handled strictly one at a time, in arrival order, so the sdk client is never
//! entered twice concurrently.

use std::sync::Arc;

use wirepack::Value;
use wirerpc::ConsoleFrame;
use wirerpc::Fault;
use wirerpc::FaultKind;
use wirerpc::Frame;
use wirerpc::LogLevel;
use wirerpc::ReplyFrame;
use wirerpc::decode_seq;

use crate::config::HostConfig;
use crate::handoff::StartupHandoff;
use crate::host::Availability;
use crate::host::CallbackRelay;
use crate::host::Dispatcher;
use crate::host::Reflection;
use crate::host::StartupFatal;
use crate::outbox;
use crate::outbox::Outbox;
use crate::sdk::SdkInit;
use crate::transport;
use crate::transport::Transport;

pub struct HostBridge {
    dispatcher: Dispatcher,
    relay: CallbackRelay,
    /// Present only in debug mode.
    reflection: Option<Reflection>,
    outbox: Outbox,
    transport: Arc<dyn Transport>,
    handoff: StartupHandoff,
}

impl HostBridge {
    /// Builds the host side over `transport`. Must be called inside a tokio runtime.
    pub fn new(availability: &Availability, debug: bool, transport: Arc<dyn Transport>) -> Self {
        let client = availability.client().cloned();
        let outbox = Outbox::spawn("host", transport.clone());

        Self {
            dispatcher: Dispatcher::new(client.clone()),
            relay: CallbackRelay::new(client.clone(), outbox.clone()),
            reflection: debug.then(|| Reflection::new(client.is_some())),
            outbox,
            transport,
            handoff: StartupHandoff {
                debug,
                availability_warning: availability.warning(),
            },
        }
    }

    /// Probes the sdk with the configured app id and builds the host.
    pub fn start(config: &HostConfig, init: &dyn SdkInit, transport: Arc<dyn Transport>) -> Result<Self, StartupFatal> {
        let availability = Availability::probe(init, config.app_id)?;
        Ok(Self::new(&availability, config.debug, transport))
    }

    /// The one-shot startup data for the guest.
    pub fn handoff(&self) -> &StartupHandoff {
        &self.handoff
    }

    pub fn relay(&self) -> &CallbackRelay {
        &self.relay
    }

    /// Logs `message` locally and shows it in the guest console.
    pub fn console(&self, level: LogLevel, message: &str) -> outbox::Result<()> {
        match level {
            LogLevel::Log => tracing::info!(target: "guest_console", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "guest_console", "{}", message),
            LogLevel::Error => tracing::error!(target: "guest_console", "{}", message),
        }
        self.outbox.push(&Frame::Console(ConsoleFrame {
            level,
            message: message.to_string(),
        }))
    }

    /// Serves guest frames until the transport closes, then drops every native subscription.
    pub async fn serve(&self) -> transport::Result<()> {
        let result = loop {
            match self.transport.recv().await {
                Ok(Some(bytes)) => self.handle(&bytes).await,
                Ok(None) => break Ok(()),
                Err(e) => {
                    tracing::error!(error = %e, "host transport failed");
                    break Err(e);
                }
            }
        };

        self.relay.shutdown();
        tracing::debug!("host bridge stopped");
        result
    }

    async fn handle(&self, bytes: &[u8]) {
        let frame = match Frame::from_bytes(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "malformed frame from guest");
                if let Ok(seq) = decode_seq(bytes) {
                    self.reply(seq, Err(Fault::new(FaultKind::Protocol, e.to_string())));
                }
                return;
            }
        };

        match frame {
            Frame::Call(call) => {
                let outcome = self
                    .dispatcher
                    .call(&call.interface, &call.method, call.args)
                    .await
                    .map_err(|e| e.to_fault());
                self.reply(call.seq, outcome);
            }
            Frame::Register(register) => {
                let outcome = self
                    .relay
                    .register(&register.callback_type, register.id)
                    .map(|()| Value::Null)
                    .map_err(|e| e.to_fault());
                self.reply(register.seq, outcome);
            }
            Frame::Disconnect { id } => {
                self.relay.disconnect(id);
            }
            Frame::Reflect(reflect) => {
                let outcome = match &self.reflection {
                    Some(reflection) => Ok(Value::from(reflection.query(&reflect.path))),
                    None => Err(Fault::new(FaultKind::UnknownOperation, "reflect is not available")),
                };
                self.reply(reflect.seq, outcome);
            }
            Frame::Reply(_) | Frame::Fired(_) | Frame::Console(_) => {
                tracing::warn!("guest sent a host-only frame, ignoring");
            }
        }
    }

    /// Every request gets exactly one reply. A result that cannot be encoded is
    /// replaced by a `Protocol` fault under the same seq.
    fn reply(&self, seq: u64, outcome: Result<Value, Fault>) {
        let fallback = match self.outbox.push(&Frame::Reply(ReplyFrame { seq, outcome })) {
            Ok(()) => return,
            Err(outbox::Error::Encode(e)) => {
                tracing::warn!(seq, error = %e, "reply could not be encoded");
                Fault::new(FaultKind::Protocol, e.to_string())
            }
            Err(e @ outbox::Error::Closed) => {
                tracing::debug!(seq, error = %e, "reply dropped");
                return;
            }
        };

        if let Err(e) = self.outbox.push(&Frame::Reply(ReplyFrame { seq, outcome: Err(fallback) })) {
            tracing::debug!(seq, error = %e, "reply dropped");
        }
    }
}
