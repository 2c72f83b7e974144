//! Host command-line configuration.
//!
//! The log filter can also come from `SDKBRIDGE_LOG`.

use clap::Parser;

/// Command-line arguments of the host process.
#[derive(Debug, Clone, Parser)]
#[clap(version, about)]
pub struct HostConfig {
    /// Development mode. Installs the reflect operation and keeps running after errors.
    #[clap(long = "debug-dev")]
    pub debug: bool,

    /// Steam app id. Only needed when not launched through Steam.
    #[clap(long = "appid")]
    pub app_id: Option<u32>,

    /// Page loaded into the guest context.
    #[clap(long)]
    pub url: Option<String>,

    /// tracing filter directives.
    #[clap(long, env = "SDKBRIDGE_LOG", default_value = "info")]
    pub log_filter: String,
}

impl HostConfig {
    /// Parses an explicit argument list. The first item is the program name.
    pub fn from_args<I, S>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString> + Clone,
    {
        Self::try_parse_from(args)
    }
}
