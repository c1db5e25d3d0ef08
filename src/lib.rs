//! PlawAI: a streaming chat relay in front of Groq with optional Brave web
//! search, plus a chat client that talks to it.
pub mod ai;
pub mod client;
pub mod config;
pub mod search;
pub mod server;
pub mod theme;
pub mod types;

use tracing_subscriber::EnvFilter;

/// Loads `.env` from the working directory if present. Variables already in
/// the environment win.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Installs the fmt subscriber, filtered by `RUST_LOG` or `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
