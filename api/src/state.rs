use std::sync::Arc;

use chrono_tz::Tz;
use sqlx::PgPool;

use crate::ai::CompletionClient;

/// Shared state for every handler: the record store pool, the injected
/// completion client, and the timezone day boundaries are computed in.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub ai: Arc<dyn CompletionClient>,
    pub tz: Tz,
}

/// Timezone used for "today" and day bucketing, from `NOSH_TIMEZONE`
/// (IANA name, default UTC).
pub fn service_timezone() -> Tz {
    match std::env::var("NOSH_TIMEZONE") {
        Ok(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = %name, "NOSH_TIMEZONE is not a valid IANA name, using UTC");
            Tz::UTC
        }),
        Err(_) => Tz::UTC,
    }
}
