use clap::Parser;

// CLI / environment configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "readmigo-edge")]
#[command(about = "Authenticated rate-limiting proxy in front of the Readmigo API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "EDGE_PORT", default_value_t = 8080)]
    pub port: u16,

    // Upstream API base URL
    #[arg(
        short,
        long,
        env = "EDGE_UPSTREAM_URL",
        default_value = "http://localhost:3001/api/v1"
    )]
    pub upstream_url: String,

    // Secret the auth service signs session cookies with
    #[arg(long, env = "EDGE_SESSION_SECRET", hide_env_values = true)]
    pub session_secret: String,

    // Name of the session cookie
    #[arg(long, env = "EDGE_SESSION_COOKIE", default_value = "readmigo_session")]
    pub session_cookie: String,

    // Budget for auth/login and auth/register routes per window
    #[arg(long, env = "EDGE_AUTH_LIMIT", default_value_t = 10)]
    pub auth_limit: u32,

    // Budget for all other routes per window
    #[arg(long, env = "EDGE_GENERAL_LIMIT", default_value_t = 100)]
    pub general_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "EDGE_RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Upstream call timeout in seconds
    #[arg(long, env = "EDGE_UPSTREAM_TIMEOUT", default_value_t = 30)]
    pub upstream_timeout: u64,
}
