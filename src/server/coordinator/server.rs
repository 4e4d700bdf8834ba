/// Coordinator actor.
///
/// The single authoritative owner of all session state: the connection
/// registry, the matchmaking queue, the session store, and the presence map.
/// Every connection event, matchmaking request, move, and disconnect flows
/// through this actor's mailbox, which totally orders all mutations; only
/// the delivery of outbound frames happens concurrently, inside the
/// per-connection session actors.
///
/// All timer-driven behavior lives here as cancellable scheduled tasks:
/// one grace task per detached player, one retention task per finished
/// match, and the periodic reaper sweep.
use actix::prelude::*;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::matchmaking::QUEUE_MAX_AGE_SECS;
use crate::config::session::{
    IDLE_MATCH_EXPIRY_SECS, REAPER_INTERVAL_SECS, RECONNECT_GRACE_SECS, RESULT_RETENTION_SECS,
};
use crate::game::types::{GameType, GridMove, TerminalResult};
use crate::server::coordinator::presence::PresenceManager;
use crate::server::coordinator::queue::{MatchmakingQueue, QueueEntry};
use crate::server::coordinator::registry::ConnectionRegistry;
use crate::server::coordinator::store::{ForfeitOutcome, SessionStore};
use crate::server::coordinator::types::{ConnectionId, MatchId, PlayerId, PlayerIdentity};
use crate::server::error::CoordinatorError;
use crate::server::messages::{
    ClientEvent, ClientWsMessage, Connect, Disconnect, MatchConcluded, ServerWsMessage,
};

pub struct Coordinator {
    registry: ConnectionRegistry,
    queue: MatchmakingQueue,
    store: SessionStore,
    presence: PresenceManager,
    /// One pending grace-expiry task per detached player.
    grace_timers: HashMap<PlayerId, SpawnHandle>,
    /// One pending post-terminal removal task per finished match.
    retention_timers: HashMap<MatchId, SpawnHandle>,
    /// Optional external persistence collaborator for finished matches.
    result_sink: Option<Recipient<MatchConcluded>>,
}

impl Coordinator {
    pub fn new(result_sink: Option<Recipient<MatchConcluded>>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            queue: MatchmakingQueue::new(),
            store: SessionStore::new(),
            presence: PresenceManager::new(),
            grace_timers: HashMap::new(),
            retention_timers: HashMap::new(),
            result_sink,
        }
    }

    /// Deliver `msg` to `connection`, treating a failed send as an implicit
    /// disconnect for that connection. The peer is unaffected either way.
    fn send_or_detach(
        &mut self,
        connection: ConnectionId,
        msg: ServerWsMessage,
        ctx: &mut Context<Self>,
    ) {
        if !self.registry.send(connection, msg) {
            warn!(
                "[Coordinator] Send to connection {} failed, treating as disconnect",
                connection
            );
            self.handle_disconnect(connection, ctx);
        }
    }

    fn report_error(
        &mut self,
        connection: ConnectionId,
        err: CoordinatorError,
        ctx: &mut Context<Self>,
    ) {
        debug!("[Coordinator] Rejected request on {}: {}", connection, err);
        let msg = match &err {
            CoordinatorError::RecoveryFailed(reason) => ServerWsMessage::RecoveryFailed {
                reason: reason.to_string(),
            },
            other => ServerWsMessage::Error {
                message: other.to_string(),
            },
        };
        self.send_or_detach(connection, msg, ctx);
    }

    /// Hand the result record to the persistence collaborator, if any.
    /// Fire-and-forget: a full mailbox or dead sink never affects the match.
    fn conclude(
        &self,
        match_id: MatchId,
        game_type: GameType,
        participants: Vec<PlayerIdentity>,
        result: TerminalResult,
        forfeit: bool,
    ) {
        if let Some(sink) = &self.result_sink {
            sink.do_send(MatchConcluded {
                match_id,
                game_type,
                participants,
                result,
                forfeit,
            });
        }
    }

    /// Drop presence records and pending timers tied to a removed match.
    fn clear_match_bookkeeping(
        &mut self,
        match_id: MatchId,
        players: &[PlayerId],
        ctx: &mut Context<Self>,
    ) {
        for &player in players {
            self.presence.remove(player);
            if let Some(handle) = self.grace_timers.remove(&player) {
                ctx.cancel_future(handle);
            }
        }
        if let Some(handle) = self.retention_timers.remove(&match_id) {
            ctx.cancel_future(handle);
        }
    }

    fn handle_disconnect(&mut self, connection: ConnectionId, ctx: &mut Context<Self>) {
        self.registry.deregister(connection);
        self.queue.cancel(connection);
        if let Some((match_id, player)) = self.store.detach_connection(connection) {
            self.presence.touch(player);
            // Terminal matches are already under retention; only in-progress
            // ones get a grace window.
            let in_progress = self
                .store
                .get(match_id)
                .map(|snapshot| snapshot.result.is_none())
                .unwrap_or(false);
            if in_progress {
                if let Some(previous) = self.grace_timers.remove(&player) {
                    ctx.cancel_future(previous);
                }
                let handle = ctx.run_later(
                    Duration::from_secs(RECONNECT_GRACE_SECS),
                    move |act, ctx| {
                        act.expire_grace(player, match_id, ctx);
                    },
                );
                self.grace_timers.insert(player, handle);
                info!(
                    "[Coordinator] Player {} detached from match {}, grace window started",
                    player, match_id
                );
            }
        }
    }

    /// Decide and apply the state changes for an elapsed grace window:
    /// settle the forfeit and clear every presence record of the removed
    /// match. Returns `None` when a rebind superseded the window, the match
    /// is already gone, or it finished while the player was detached (the
    /// retention task owns removal then). Takes no context so the timer
    /// callback stays a thin shell around it.
    fn settle_grace_expiry(
        &mut self,
        player: PlayerId,
        match_id: MatchId,
    ) -> Option<ForfeitOutcome> {
        if self.presence.match_of(player) != Some(match_id) {
            // Superseded binding; whoever superseded it owns the cleanup.
            return None;
        }
        match self.store.get(match_id) {
            Err(_) => {
                self.presence.remove(player);
                return None;
            }
            Ok(snapshot) if snapshot.result.is_some() => {
                return None;
            }
            Ok(_) => {}
        }
        info!(
            "[Coordinator] Grace window for player {} on match {} elapsed, forfeiting",
            player, match_id
        );
        let outcome = self.store.remove_with_forfeit(match_id, player)?;
        for p in &outcome.participants {
            self.presence.remove(p.id);
        }
        Some(outcome)
    }

    /// The grace window for a detached player elapsed without a rebind.
    fn expire_grace(&mut self, player: PlayerId, match_id: MatchId, ctx: &mut Context<Self>) {
        self.grace_timers.remove(&player);
        if let Some(outcome) = self.settle_grace_expiry(player, match_id) {
            if let Some(conn) = outcome.winner_connection {
                self.send_or_detach(
                    conn,
                    ServerWsMessage::OpponentLeft {
                        win_by_default: true,
                    },
                    ctx,
                );
            }
            let players: Vec<PlayerId> = outcome.participants.iter().map(|p| p.id).collect();
            self.clear_match_bookkeeping(outcome.match_id, &players, ctx);
            self.conclude(
                outcome.match_id,
                outcome.game_type,
                outcome.participants,
                outcome.result,
                true,
            );
        }
    }

    fn join_matchmaking(
        &mut self,
        connection: ConnectionId,
        game_type: GameType,
        player: PlayerIdentity,
        ctx: &mut Context<Self>,
    ) {
        // One queue entry or one match per identity, never both.
        if self.store.contains_player(player.id) {
            self.report_error(connection, CoordinatorError::AlreadyQueued, ctx);
            return;
        }
        let entry = QueueEntry {
            player,
            game_type,
            connection,
            enqueued_at: Instant::now(),
        };
        match self.queue.enqueue(entry) {
            Ok(Some((first, second))) => {
                let snapshot = self.store.create_match(
                    game_type,
                    (first.player, first.connection),
                    (second.player, second.connection),
                );
                for view in &snapshot.participants {
                    self.presence.bind(view.identity.id, snapshot.match_id);
                }
                let found = ServerWsMessage::MatchFound {
                    match_id: snapshot.match_id,
                    game_type: snapshot.game_type,
                    participants: snapshot.participants.clone(),
                    initial_state: snapshot.state.clone(),
                    current_turn: snapshot.current_turn,
                };
                for conn in self.store.connections(snapshot.match_id) {
                    self.send_or_detach(conn, found.clone(), ctx);
                }
            }
            Ok(None) => {}
            Err(err) => self.report_error(connection, err, ctx),
        }
    }

    fn game_move(
        &mut self,
        connection: ConnectionId,
        match_id: MatchId,
        game_move: GridMove,
        ctx: &mut Context<Self>,
    ) {
        if let Err(err) = self.store.apply_move(match_id, connection, &game_move) {
            self.report_error(connection, err, ctx);
            return;
        }
        let Ok(snapshot) = self.store.get(match_id) else {
            return;
        };
        let update = ServerWsMessage::GameUpdate {
            state: snapshot.state.clone(),
            last_move: game_move,
            current_turn: snapshot.current_turn,
            result: snapshot.result,
        };
        for conn in self.store.connections(match_id) {
            self.send_or_detach(conn, update.clone(), ctx);
        }
        if let Some(result) = snapshot.result {
            self.conclude(
                match_id,
                snapshot.game_type,
                snapshot
                    .participants
                    .iter()
                    .map(|p| p.identity.clone())
                    .collect(),
                result,
                false,
            );
            // Retain the finished match briefly so late acknowledgements
            // still resolve, then remove it.
            let handle = ctx.run_later(
                Duration::from_secs(RESULT_RETENTION_SECS),
                move |act, ctx| {
                    act.remove_retained(match_id, ctx);
                },
            );
            self.retention_timers.insert(match_id, handle);
        }
    }

    fn remove_retained(&mut self, match_id: MatchId, ctx: &mut Context<Self>) {
        self.retention_timers.remove(&match_id);
        if let Some(m) = self.store.remove(match_id) {
            let players: Vec<PlayerId> = m.participants.iter().map(|p| p.identity.id).collect();
            self.clear_match_bookkeeping(match_id, &players, ctx);
            debug!("[Coordinator] Retention over, match {} cleaned up", match_id);
        }
    }

    fn leave_game(
        &mut self,
        connection: ConnectionId,
        match_id: MatchId,
        ctx: &mut Context<Self>,
    ) {
        // Idempotent: leaving an unknown match is a quiet no-op.
        let Some(outcome) = self.store.leave(match_id, connection) else {
            return;
        };
        info!(
            "[Coordinator] Connection {} left match {}",
            connection, match_id
        );
        let players: Vec<PlayerId> = outcome.participants.iter().map(|p| p.id).collect();
        self.clear_match_bookkeeping(outcome.match_id, &players, ctx);
        if outcome.forfeited {
            if let Some(conn) = outcome.winner_connection {
                self.send_or_detach(
                    conn,
                    ServerWsMessage::OpponentLeft {
                        win_by_default: true,
                    },
                    ctx,
                );
            }
            self.conclude(
                match_id,
                outcome.game_type,
                outcome.participants,
                outcome.result,
                true,
            );
        }
    }

    fn recover_session(
        &mut self,
        connection: ConnectionId,
        player: PlayerIdentity,
        match_id: MatchId,
        ctx: &mut Context<Self>,
    ) {
        match self.presence.match_of(player.id) {
            None => {
                self.report_error(
                    connection,
                    CoordinatorError::RecoveryFailed("no session recorded for player"),
                    ctx,
                );
                return;
            }
            Some(bound) if bound != match_id => {
                self.report_error(
                    connection,
                    CoordinatorError::RecoveryFailed("player is not bound to that match"),
                    ctx,
                );
                return;
            }
            Some(_) => {}
        }
        let Some((snapshot, replaced)) = self.store.rebind(match_id, player.id, connection) else {
            self.presence.remove(player.id);
            self.report_error(
                connection,
                CoordinatorError::RecoveryFailed("match no longer exists"),
                ctx,
            );
            return;
        };
        // Rebinding cancels exactly the one pending expiry task, if any.
        if let Some(handle) = self.grace_timers.remove(&player.id) {
            ctx.cancel_future(handle);
        }
        self.presence.touch(player.id);
        if let Some(old) = replaced {
            if old != connection {
                // A second connection for the same player supersedes the
                // first; the old socket is closed, not left to linger.
                self.registry
                    .close(old, "session superseded by a newer connection");
            }
        }
        let found = ServerWsMessage::MatchFound {
            match_id: snapshot.match_id,
            game_type: snapshot.game_type,
            participants: snapshot.participants.clone(),
            initial_state: snapshot.state.clone(),
            current_turn: snapshot.current_turn,
        };
        self.send_or_detach(connection, found, ctx);
    }

    /// Matches eligible for idle expiry. A match with any participant inside
    /// an active grace window is never reaped, regardless of idleness; the
    /// grace timer settles it first.
    fn expirable_matches(&self, threshold: Duration) -> Vec<MatchId> {
        self.store
            .idle_matches(threshold)
            .into_iter()
            .filter(|&match_id| {
                let Ok(snapshot) = self.store.get(match_id) else {
                    return false;
                };
                !snapshot
                    .participants
                    .iter()
                    .any(|p| self.grace_timers.contains_key(&p.identity.id))
            })
            .collect()
    }

    /// Periodic sweep: purge stale queue entries, expire idle matches.
    fn sweep(&mut self, ctx: &mut Context<Self>) {
        for entry in self
            .queue
            .purge_stale(Duration::from_secs(QUEUE_MAX_AGE_SECS))
        {
            info!(
                "[Reaper] Matchmaking entry for player {} timed out",
                entry.player.id
            );
            self.send_or_detach(entry.connection, ServerWsMessage::MatchmakingTimedOut, ctx);
        }

        for match_id in self.expirable_matches(Duration::from_secs(IDLE_MATCH_EXPIRY_SECS)) {
            info!("[Reaper] Match {} expired after inactivity", match_id);
            for conn in self.store.connections(match_id) {
                self.send_or_detach(conn, ServerWsMessage::MatchExpired { match_id }, ctx);
            }
            if let Some(m) = self.store.remove(match_id) {
                let players: Vec<PlayerId> =
                    m.participants.iter().map(|p| p.identity.id).collect();
                self.clear_match_bookkeeping(match_id, &players, ctx);
            }
        }
    }
}

impl Actor for Coordinator {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("[Coordinator] Started, reaper every {}s", REAPER_INTERVAL_SECS);
        ctx.run_interval(Duration::from_secs(REAPER_INTERVAL_SECS), |act, ctx| {
            act.sweep(ctx);
        });
    }
}

impl Handler<Connect> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        self.registry.register(msg.connection, msg.session, msg.close);
    }
}

impl Handler<Disconnect> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, ctx: &mut Self::Context) -> Self::Result {
        self.handle_disconnect(msg.connection, ctx);
    }
}

impl Handler<ClientEvent> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: ClientEvent, ctx: &mut Self::Context) -> Self::Result {
        let connection = msg.connection;
        match msg.message {
            ClientWsMessage::JoinMatchmaking {
                game_type,
                player_identity,
            } => self.join_matchmaking(connection, game_type, player_identity, ctx),
            ClientWsMessage::CancelMatchmaking => {
                self.queue.cancel(connection);
            }
            ClientWsMessage::GameMove {
                match_id,
                game_move,
            } => self.game_move(connection, match_id, game_move, ctx),
            ClientWsMessage::LeaveGame { match_id } => {
                self.leave_game(connection, match_id, ctx)
            }
            ClientWsMessage::RecoverSession {
                player_identity,
                match_id,
            } => self.recover_session(connection, player_identity, match_id, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity(name: &str) -> PlayerIdentity {
        PlayerIdentity {
            id: Uuid::new_v4(),
            display_name: name.to_string(),
        }
    }

    struct Fixture {
        coordinator: Coordinator,
        match_id: MatchId,
        a: PlayerIdentity,
        b: PlayerIdentity,
        conn_a: ConnectionId,
        conn_b: ConnectionId,
    }

    /// A match with both presence records bound, as `join_matchmaking`
    /// leaves it after pairing.
    fn new_match() -> Fixture {
        let mut coordinator = Coordinator::new(None);
        let a = identity("alice");
        let b = identity("bob");
        let conn_a = Uuid::new_v4();
        let conn_b = Uuid::new_v4();
        let snapshot = coordinator.store.create_match(
            GameType::Grid3,
            (a.clone(), conn_a),
            (b.clone(), conn_b),
        );
        coordinator.presence.bind(a.id, snapshot.match_id);
        coordinator.presence.bind(b.id, snapshot.match_id);
        Fixture {
            coordinator,
            match_id: snapshot.match_id,
            a,
            b,
            conn_a,
            conn_b,
        }
    }

    impl Fixture {
        fn conn_of(&self, player: PlayerId) -> ConnectionId {
            if player == self.a.id {
                self.conn_a
            } else {
                self.conn_b
            }
        }

        /// Drive a full win (line 0-1-2 against 3-4) for whoever starts.
        fn play_out_win(&mut self) {
            let mv = |position| GridMove {
                position,
                symbol: None,
            };
            let snapshot = self.coordinator.store.get(self.match_id).unwrap();
            let first = snapshot.current_turn.unwrap();
            let second = if first == self.a.id { self.b.id } else { self.a.id };
            let plays = [(first, 0), (second, 3), (first, 1), (second, 4), (first, 2)];
            for (player, position) in plays {
                self.coordinator
                    .store
                    .apply_move(self.match_id, self.conn_of(player), &mv(position))
                    .unwrap();
            }
        }
    }

    #[test]
    fn test_grace_expiry_settles_forfeit_and_clears_both_presence_records() {
        let mut fx = new_match();
        fx.coordinator.store.detach_connection(fx.conn_a).unwrap();

        let outcome = fx
            .coordinator
            .settle_grace_expiry(fx.a.id, fx.match_id)
            .unwrap();
        assert!(outcome.forfeited);
        assert_eq!(outcome.winner.id, fx.b.id);

        // The match is gone and neither player has a presence record left,
        // so a later recovery attempt by either of them fails.
        assert!(fx.coordinator.store.get(fx.match_id).is_err());
        assert_eq!(fx.coordinator.presence.match_of(fx.a.id), None);
        assert_eq!(fx.coordinator.presence.match_of(fx.b.id), None);
        assert!(fx
            .coordinator
            .store
            .rebind(fx.match_id, fx.a.id, Uuid::new_v4())
            .is_none());
    }

    #[test]
    fn test_grace_expiry_ignores_superseded_binding() {
        let mut fx = new_match();
        fx.coordinator.presence.bind(fx.a.id, Uuid::new_v4());

        assert!(fx
            .coordinator
            .settle_grace_expiry(fx.a.id, fx.match_id)
            .is_none());
        assert!(fx.coordinator.store.get(fx.match_id).is_ok());
    }

    #[test]
    fn test_grace_expiry_clears_presence_when_match_already_gone() {
        let mut fx = new_match();
        fx.coordinator.store.remove(fx.match_id).unwrap();

        assert!(fx
            .coordinator
            .settle_grace_expiry(fx.a.id, fx.match_id)
            .is_none());
        assert_eq!(fx.coordinator.presence.match_of(fx.a.id), None);
    }

    #[test]
    fn test_grace_expiry_defers_to_retention_for_finished_match() {
        let mut fx = new_match();
        fx.play_out_win();
        fx.coordinator.store.detach_connection(fx.conn_a).unwrap();

        assert!(fx
            .coordinator
            .settle_grace_expiry(fx.a.id, fx.match_id)
            .is_none());
        // The finished match stays for the retention window.
        assert!(fx.coordinator.store.get(fx.match_id).is_ok());
        assert_eq!(
            fx.coordinator.presence.match_of(fx.a.id),
            Some(fx.match_id)
        );
    }

    #[test]
    fn test_idle_match_with_participant_in_grace_is_not_reaped() {
        let mut fx = new_match();
        fx.coordinator
            .grace_timers
            .insert(fx.a.id, SpawnHandle::default());

        // Idle past any threshold, but protected by the grace window.
        assert!(fx
            .coordinator
            .expirable_matches(Duration::ZERO)
            .is_empty());

        fx.coordinator.grace_timers.remove(&fx.a.id);
        assert_eq!(
            fx.coordinator.expirable_matches(Duration::ZERO),
            vec![fx.match_id]
        );
    }
}
