use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use reverseip_core::{ClientParams, DEFAULT_PAGE_LIMIT};

/// Query the Reverse IP/DNS API for domains hosted on an IP address.
#[derive(Parser, Debug)]
#[command(name = "reverseip", version, about)]
pub struct Cli {
    /// API key of the Reverse IP/DNS service.
    #[arg(long, env = "REVERSEIP_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Override the service endpoint.
    #[arg(long, env = "REVERSEIP_BASE_URL")]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch and print one page of domains.
    Lookup {
        #[command(flatten)]
        target: Target,

        /// Resume after this domain name.
        #[arg(long)]
        from: Option<String>,

        /// Also print the response body as received.
        #[arg(long)]
        show_raw: bool,
    },

    /// Follow the pagination cursor until the last page.
    All {
        #[command(flatten)]
        target: Target,

        /// Records per page; a shorter page ends the walk.
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        page_limit: usize,
    },

    /// Print the response body verbatim.
    Raw {
        #[command(flatten)]
        target: Target,

        /// JSON or XML.
        #[arg(long, default_value = "JSON")]
        format: String,

        #[arg(long)]
        from: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct Target {
    /// IPv4 or IPv6 address to look up.
    pub ip: String,
}

impl Cli {
    pub fn client_params(&self) -> ClientParams {
        ClientParams {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            ..ClientParams::default()
        }
    }
}
