/// Matchmaking configuration constants.
///
/// This module defines parameters for the matchmaking queue, such as how long
/// an entry may wait before the reaper purges it.
pub const QUEUE_MAX_AGE_SECS: u64 = 120; // Max time a player waits in queue before timing out.
