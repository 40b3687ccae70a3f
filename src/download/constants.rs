//! Constants for the download module (timeouts, pacing, file naming).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout: longest idle gap between body chunks (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default fixed wait between attempts of one file (2 seconds).
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Default pause a worker takes after finishing a task (1 second).
pub const DEFAULT_COURTESY_DELAY: Duration = Duration::from_secs(1);

/// Suffix appended to a file name while its bytes are still arriving.
pub const PART_SUFFIX: &str = ".part";
