//! Header names used by the API.

/// Payment authorization from the caller.
pub const PAYMENT_SIGNATURE_HEADER: &str = "PAYMENT-SIGNATURE";

/// Alternate spelling of [`PAYMENT_SIGNATURE_HEADER`], checked second.
pub const X_PAYMENT_SIGNATURE_HEADER: &str = "X-PAYMENT-SIGNATURE";

/// Payment challenge on a 402.
pub const PAYMENT_REQUIRED_HEADER: &str = "PAYMENT-REQUIRED";

/// Settlement acknowledgement on a paid response.
pub const PAYMENT_RESPONSE_HEADER: &str = "PAYMENT-RESPONSE";

/// Caller wallet, preferred over the IP as rate-limit key.
pub const X_WALLET_ADDRESS_HEADER: &str = "X-Wallet-Address";

/// Proxy chain; the first entry is the client IP.
pub const X_FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

/// Window budget.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "X-RateLimit-Limit";

/// Requests left in the window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "X-RateLimit-Remaining";

/// Window reset, epoch seconds.
pub const RATE_LIMIT_RESET_HEADER: &str = "X-RateLimit-Reset";

/// Seconds until the window resets, on a 429.
pub const RETRY_AFTER_HEADER: &str = "Retry-After";

/// Headers browsers must be allowed to read.
pub const EXPOSED_HEADERS: [&str; 6] = [
    PAYMENT_REQUIRED_HEADER,
    PAYMENT_RESPONSE_HEADER,
    RATE_LIMIT_LIMIT_HEADER,
    RATE_LIMIT_REMAINING_HEADER,
    RATE_LIMIT_RESET_HEADER,
    RETRY_AFTER_HEADER,
];
