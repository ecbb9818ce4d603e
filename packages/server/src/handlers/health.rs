pub const BANNER: &str = "FIR ledger gateway running";

/// Liveness banner.
pub async fn banner() -> &'static str {
    BANNER
}
