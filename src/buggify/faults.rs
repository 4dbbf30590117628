//! Named fault injection points.
//!
//! Fault IDs are plain strings so they can be counted and reported without
//! a registry. Probabilities live with whoever injects the fault.

/// Faults injected around list-store calls
pub mod list_store {
    /// LPUSH fails with a connection error
    pub const PUSH_FAIL: &str = "list_store.push_fail";
    /// LTRIM fails with a response error
    pub const TRIM_FAIL: &str = "list_store.trim_fail";
    /// LRANGE fails with a response error
    pub const RANGE_FAIL: &str = "list_store.range_fail";
    /// LLEN fails with a response error
    pub const LEN_FAIL: &str = "list_store.len_fail";
    /// QUIT fails
    pub const CLOSE_FAIL: &str = "list_store.close_fail";
    /// Any call times out before reaching the store
    pub const TIMEOUT: &str = "list_store.timeout";
    /// Connection is dropped after the command was applied (reply lost)
    pub const REPLY_LOST: &str = "list_store.reply_lost";
}

