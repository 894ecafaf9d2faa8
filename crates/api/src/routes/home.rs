//! Welcome endpoint.

/// GET /: returns a short plain-text greeting.
pub async fn index() -> &'static str {
    "Welcome to the order ledger API"
}
