/// Matchmaking queue.
///
/// One strict FIFO per game type. The pairing check happens inside
/// `enqueue`, in the same call that would append the entry, so two requests
/// arriving back to back can never both see an empty queue and end up
/// waiting when a pairing was possible. The coordinator actor serializes all
/// calls, which makes the check-and-pair step atomic.
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::game::types::GameType;
use crate::server::coordinator::types::{ConnectionId, PlayerId, PlayerIdentity};
use crate::server::error::CoordinatorError;

/// A waiting player. Created on a matchmaking request and destroyed the
/// moment it is consumed by pairing, cancelled, or purged.
#[derive(Clone, Debug)]
pub struct QueueEntry {
    pub player: PlayerIdentity,
    pub game_type: GameType,
    pub connection: ConnectionId,
    pub enqueued_at: Instant,
}

#[derive(Default)]
pub struct MatchmakingQueue {
    waiting: HashMap<GameType, VecDeque<QueueEntry>>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_queued(&self, player: PlayerId) -> bool {
        self.waiting
            .values()
            .any(|slot| slot.iter().any(|entry| entry.player.id == player))
    }

    /// Append `entry`, or pair it with the oldest waiting entry of the same
    /// game type. On pairing both entries leave the queue and are returned
    /// with the earlier-enqueued one first (it decides any "who starts"
    /// tie-break).
    pub fn enqueue(
        &mut self,
        entry: QueueEntry,
    ) -> Result<Option<(QueueEntry, QueueEntry)>, CoordinatorError> {
        if self.is_queued(entry.player.id) {
            return Err(CoordinatorError::AlreadyQueued);
        }
        let slot = self.waiting.entry(entry.game_type).or_default();
        match slot.pop_front() {
            Some(opponent) => {
                debug!(
                    "[Queue] Paired {} with {} for {:?}",
                    opponent.player.id, entry.player.id, entry.game_type
                );
                Ok(Some((opponent, entry)))
            }
            None => {
                debug!(
                    "[Queue] Player {} waiting for {:?}",
                    entry.player.id, entry.game_type
                );
                slot.push_back(entry);
                Ok(None)
            }
        }
    }

    /// Remove any entry owned by `connection`. No-op if absent.
    pub fn cancel(&mut self, connection: ConnectionId) -> Option<QueueEntry> {
        for slot in self.waiting.values_mut() {
            if let Some(pos) = slot.iter().position(|entry| entry.connection == connection) {
                let entry = slot.remove(pos);
                if let Some(entry) = &entry {
                    debug!("[Queue] Entry for player {} cancelled", entry.player.id);
                }
                return entry;
            }
        }
        None
    }

    /// Remove entries older than `max_age` and return them so the caller can
    /// notify each timed-out player. Entries are in enqueue order, so only
    /// the front of each slot needs checking.
    pub fn purge_stale(&mut self, max_age: Duration) -> Vec<QueueEntry> {
        let now = Instant::now();
        let mut removed = Vec::new();
        for slot in self.waiting.values_mut() {
            while slot
                .front()
                .is_some_and(|entry| now.duration_since(entry.enqueued_at) > max_age)
            {
                if let Some(entry) = slot.pop_front() {
                    removed.push(entry);
                }
            }
        }
        removed
    }
}
