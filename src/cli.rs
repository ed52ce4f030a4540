use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVER_URL};

#[derive(Parser)]
#[command(
    name = "factfinder-agent",
    about = "FactFinder Agent - YouTube transcript service",
    long_about = "A local HTTP service that fetches YouTube caption transcripts for the FactFinder browser extension, plus a small client for trying it from the terminal.",
    after_help = "EXAMPLES:\n    # Start the transcript server on 127.0.0.1:8000\n    factfinder-agent serve\n\n    # Listen on another port\n    factfinder-agent serve --port 9000\n\n    # Fetch a transcript through a running server\n    factfinder-agent fetch dQw4w9WgXcQ\n\n    # Full links work too, and --json prints the raw response\n    factfinder-agent fetch https://youtu.be/dQw4w9WgXcQ --json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "serve")]
    Serve {
        #[arg(long, env = "FACTFINDER_HOST", default_value = DEFAULT_HOST)]
        host: String,

        #[arg(long, env = "FACTFINDER_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    #[command(name = "fetch")]
    Fetch {
        /// Video id or YouTube link
        video: String,

        #[arg(long, default_value = DEFAULT_SERVER_URL)]
        server_url: String,

        /// Print the raw JSON response instead of timestamped lines
        #[arg(long)]
        json: bool,
    },
}
