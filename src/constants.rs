//! # Constants
//!
//! Fixed names and defaults shared across the compute resource environment.

/// Name of the central repository directory created under the build directory
pub const CENTRAL_REPO_DIR: &str = "repo";

/// Grace period granted to running tasks after shutdown before they are abandoned
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD_MS: u64 = 5_000;

/// Capacity of an actor mailbox channel
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1_000;

/// Capacity of the result channel created by `ChannelTicketSource::channel`
pub const DEFAULT_RESULT_CHANNEL_CAPACITY: usize = 1_000;

/// Prefix for environment variable configuration overrides (`CRE_THREAD_COUNT`, ...)
pub const ENV_PREFIX: &str = "CRE";

/// Error type labels attached to failed ticket results
pub mod error_types {
    pub const EXECUTOR_ERROR: &str = "executor_error";
    pub const EXECUTOR_PANIC: &str = "executor_panic";
    pub const EXECUTOR_TIMEOUT: &str = "executor_timeout";
    pub const SCRATCH_DIR_FAILED: &str = "scratch_dir_failed";
    pub const CANCELLED: &str = "cancelled";
    pub const DISCARDED: &str = "discarded";
}
