/// Application name
pub const APP_NAME: &str = "Barakholka";

/// Maximum chat message length in characters (after trimming)
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Primary key of the single `site_statistics` row
pub const STATS_ROW_ID: i64 = 1;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Sustained chat messages per second allowed for a single user
pub const DEFAULT_MESSAGE_RATE: f64 = 1.0;

/// Burst of chat messages a single user may send before being throttled
pub const DEFAULT_MESSAGE_BURST: f64 = 10.0;

/// Header set by the upstream auth gateway with the authenticated user's id
pub const USER_ID_HEADER: &str = "x-user-id";
