/// Session lifecycle configuration constants.
///
/// This module defines the timers governing match lifetime: the reconnection
/// grace window, idle-match expiry, terminal-result retention, and the reaper
/// sweep interval.
pub const RECONNECT_GRACE_SECS: u64 = 30; // Window after a disconnect during which rebinding succeeds.

/// Time (in seconds) without activity before a match is expired by the reaper.
pub const IDLE_MATCH_EXPIRY_SECS: u64 = 3600;

/// Interval (in seconds) between reaper sweeps.
pub const REAPER_INTERVAL_SECS: u64 = 60;

/// Time (in seconds) a finished match is retained so late acknowledgements
/// still resolve before removal.
pub const RESULT_RETENTION_SECS: u64 = 30;
