//! Runs a host and a guest in one process over the in-memory transport, backed by
//! the in-memory sdk.
//!
//! ```text
//! cargo run --bin sdkbridge-demo -- --appid 480 --debug-dev
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wirerpc::LogLevel;

use sdkbridge::GuestBridge;
use sdkbridge::HostBridge;
use sdkbridge::HostConfig;
use sdkbridge::StartupHandoff;
use sdkbridge::Value;
use sdkbridge::guest::TracingConsole;
use sdkbridge::ledger::CallbackType;
use sdkbridge::sdk::MemoryLaunch;
use sdkbridge::sdk::MemorySdk;
use sdkbridge::sdk::memory::NO_APP_ID_FAILURE;
use sdkbridge::transport::DuplexChannelTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = HostConfig::from_args(std::env::args())?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_filter).context("invalid log filter")?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Without an app id the in-memory sdk fails the way the vendor library does.
    let sdk = Arc::new(MemorySdk::new(480, "Gordon").with_achievements(["ACH_WIN_ONE_GAME"]));
    let launch = match config.app_id {
        Some(_) => MemoryLaunch::Ready(sdk.clone()),
        None => MemoryLaunch::VendorFailure(NO_APP_ID_FAILURE.to_string()),
    };

    let (host_side, guest_side) = DuplexChannelTransport::pair();
    let host = Arc::new(HostBridge::start(&config, &launch, Arc::new(host_side))?);

    // The handoff crosses the process boundary as an argument.
    let arg = host.handoff().to_arg()?;
    let handoff = StartupHandoff::from_args([arg])?;

    let serving = host.clone();
    let server = tokio::spawn(async move { serving.serve().await });

    let guest = GuestBridge::connect(handoff, Arc::new(guest_side), Arc::new(TracingConsole));
    host.console(LogLevel::Log, "guest connected")?;

    match guest.sdk() {
        Some(surface) => {
            let utils = surface.interface("Utils").context("Utils not exposed")?;
            let app_id = utils.call("getAppId", vec![]).await?;
            tracing::info!(?app_id, "called Utils.getAppId");

            let handle = surface.callback().register("PersonaStateChange", |args: &[Value]| {
                tracing::info!(?args, "PersonaStateChange fired");
            });
            handle.confirmed().await?;
            sdk.fire(CallbackType::PersonaStateChange, vec![Value::from("Gordon")]);

            if let Some(reflector) = guest.reflector() {
                let interfaces = reflector.members::<&str>(&[]).await?;
                tracing::info!(?interfaces, "reflected interfaces");
            }

            // Round trip so the firing above is delivered before teardown.
            let name = surface
                .interface("Localplayer")
                .context("Localplayer not exposed")?
                .call("getName", vec![])
                .await?;
            tracing::info!(?name, "called Localplayer.getName");
            handle.disconnect();
        }
        None => tracing::info!("sdk unavailable, continuing without it"),
    }

    guest.shutdown();
    drop(guest);
    server.await??;
    Ok(())
}
