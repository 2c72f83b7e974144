//! Debug-only member listing.

use std::sync::Arc;

use wirepack::Value;
use wirerpc::Frame;
use wirerpc::ReflectFrame;

use crate::guest::peer;
use crate::guest::peer::Peer;

/// Lists member names on the host surface.
///
/// Only a guest started in debug mode has one; there is no other way to send a
/// `Reflect` frame.
pub struct Reflector {
    peer: Arc<Peer>,
}

impl Reflector {
    pub(crate) fn new(peer: Arc<Peer>) -> Self {
        Self { peer }
    }

    /// Member names at `path`, e.g. `[]`, `["Utils"]`, `["Callback", "SteamCallback"]`.
    pub async fn members<S: AsRef<str>>(&self, path: &[S]) -> peer::Result<Vec<String>> {
        let path: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        let value = self
            .peer
            .request(|seq| Frame::Reflect(ReflectFrame { seq, path }))
            .wait()
            .await?;

        let names = match value {
            Value::List(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(name) => Some(name),
                    _ => None,
                })
                .collect(),
            other => {
                tracing::debug!(?other, "reflect answered with a non-list value");
                Vec::new()
            }
        };
        Ok(names)
    }
}
