//! Liveness endpoint
//!
//! `GET /ping` answers as long as the process is up. It never touches the
//! upstream API, so it succeeds regardless of credential validity.

pub async fn ping() -> &'static str {
    "ok"
}
