use std::time::Duration;

use clap::Parser;

pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://localhost:8003";
pub const DEFAULT_SUPABASE_URL: &str = "http://localhost:54321";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
pub const DEFAULT_START_URL: &str = "https://example.com";
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime configuration for the dashboard server.
///
/// Every field can be given as a flag or through the environment (a `.env`
/// file is loaded before parsing). Components receive the parts they need at
/// construction instead of reading the environment themselves.
#[derive(Debug, Clone, Parser)]
#[command(name = "isomind-dashboard", version, about = "Operator dashboard for the IsoMind orchestrator")]
pub struct Config {
    /// Base URL of the orchestrator HTTP/SSE API.
    #[arg(long = "orchestrator-url", env = "ORCHESTRATOR_URL", default_value = DEFAULT_ORCHESTRATOR_URL)]
    pub orchestrator_base_url: String,

    /// Base URL of the Supabase project (auth + tables).
    #[arg(long, env = "SUPABASE_URL", default_value = DEFAULT_SUPABASE_URL)]
    pub supabase_url: String,

    #[arg(long, env = "SUPABASE_ANON_KEY", default_value = "", hide_env_values = true)]
    pub supabase_anon_key: String,

    /// Public origin of this dashboard, used for auth redirects.
    #[arg(long, env = "DASHBOARD_PUBLIC_URL", default_value = DEFAULT_PUBLIC_URL)]
    pub public_url: String,

    /// First port to try; the next nine are tried if it is taken.
    #[arg(long, env = "DASHBOARD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Page the agent opens before replaying a blueprint.
    #[arg(long = "start-url", env = "DASHBOARD_START_URL", default_value = DEFAULT_START_URL)]
    pub default_start_url: String,

    #[arg(long, env = "DASHBOARD_ENVIRONMENT", default_value = "development")]
    pub environment: String,

    /// Timeout for collaborator calls, in seconds. The execute stream is exempt.
    #[arg(long = "request-timeout", env = "DASHBOARD_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orchestrator_base_url: DEFAULT_ORCHESTRATOR_URL.to_string(),
            supabase_url: DEFAULT_SUPABASE_URL.to_string(),
            supabase_anon_key: String::new(),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            port: DEFAULT_PORT,
            default_start_url: DEFAULT_START_URL.to_string(),
            environment: "development".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Where the identity provider sends users who asked for a password reset.
    pub fn password_reset_redirect(&self) -> String {
        join_url(&self.public_url, "/dashboard/reset-password")
    }

    pub fn secure_cookies(&self) -> bool {
        self.public_url.starts_with("https://")
    }
}

/// Joins a base URL and an absolute path, ignoring a trailing slash on the base.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}
