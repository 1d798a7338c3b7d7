//! Deferred cleanup: disconnect grace per player and empty-room grace per room
//!
//! Every timer carries an id. A firing only acts if the id stored on the player
//! or room still matches, so a timer that was cancelled and replaced while it
//! waited for the registry lock does nothing.

use super::{AppState, Room};
use crate::outbox::Outbox;
use crate::types::{RoomCode, Token};
use std::sync::atomic::Ordering;
use tokio::task::AbortHandle;

#[derive(Debug)]
pub struct PendingTimer {
    id: u64,
    handle: AbortHandle,
}

impl PendingTimer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl AppState {
    fn next_timer_id(&self) -> u64 {
        self.timer_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Start the disconnect grace period for `token`. No-op if one is pending.
    pub(crate) fn schedule_removal(&self, room: &mut Room, token: &str) {
        let Some(player) = room.players.get_mut(token) else {
            return;
        };
        if player.removal.is_some() {
            return;
        }

        let id = self.next_timer_id();
        let state = self.clone();
        let code = room.code.clone();
        let token = token.to_string();
        let grace = self.config.reconnect_grace;
        tracing::debug!(room = %code, "Scheduling removal of {} in {:?}", token, grace);

        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            state.fire_player_removal(&code, &token, id).await;
        });
        player.removal = Some(PendingTimer {
            id,
            handle: task.abort_handle(),
        });
    }

    pub(crate) fn cancel_removal(room: &mut Room, token: &str) {
        if let Some(timer) = room.players.get_mut(token).and_then(|p| p.removal.take()) {
            timer.cancel();
        }
    }

    /// Start the empty-room grace period. No-op if one is pending.
    pub(crate) fn schedule_empty_room(&self, room: &mut Room) {
        if room.empty_timer.is_some() {
            return;
        }

        let id = self.next_timer_id();
        let state = self.clone();
        let code = room.code.clone();
        let grace = self.config.empty_room_grace;
        tracing::debug!(room = %code, "Room empty, deleting in {:?}", grace);

        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            state.fire_empty_room(&code, id).await;
        });
        room.empty_timer = Some(PendingTimer {
            id,
            handle: task.abort_handle(),
        });
    }

    pub(crate) fn cancel_empty_room(room: &mut Room) {
        if let Some(timer) = room.empty_timer.take() {
            timer.cancel();
        }
    }

    /// Remove the player if they are still offline when the grace period ends
    pub async fn fire_player_removal(&self, code: &RoomCode, token: &Token, timer_id: u64) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(code) else {
            tracing::debug!(room = %code, "Removal timer fired for a deleted room");
            return;
        };
        let Some(player) = room.players.get_mut(token) else {
            return;
        };
        if player.removal.as_ref().map(PendingTimer::id) != Some(timer_id) {
            tracing::debug!(room = %code, "Ignoring stale removal timer for {}", token);
            return;
        }
        player.removal = None;
        if player.online {
            return;
        }

        tracing::info!(room = %code, "Removing {} after disconnect grace", token);
        let mut out = Outbox::default();
        room.remove_player(token, &mut out);
        if room.players.is_empty() {
            self.schedule_empty_room(room);
        }
        self.deliver(Some(&*room), out).await;
    }

    /// Delete the room if nobody joined during the grace period
    pub async fn fire_empty_room(&self, code: &RoomCode, timer_id: u64) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(code) else {
            return;
        };
        if room.empty_timer.as_ref().map(PendingTimer::id) != Some(timer_id) {
            tracing::debug!(room = %code, "Ignoring stale empty-room timer");
            return;
        }
        room.empty_timer = None;
        if !room.players.is_empty() {
            return;
        }

        if let Some(room) = rooms.remove(code) {
            tracing::info!(room = %code, created_at = %room.created_at, "Deleted empty room");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::Catalog;
    use crate::config::ServerConfig;
    use crate::state::AppState;
    use crate::types::GameType;
    use std::sync::Arc;
    use std::time::Duration;

    fn state() -> Arc<AppState> {
        let config = ServerConfig {
            reconnect_grace: Duration::from_secs(10),
            empty_room_grace: Duration::from_secs(5),
            ..Default::default()
        };
        Arc::new(AppState::new(config, Catalog::embedded().unwrap()))
    }

    async fn room_with_guest(state: &AppState) -> (String, String, String) {
        let (master_conn, _rx) = state.hub.register().await;
        let (guest_conn, _rx2) = state.hub.register().await;
        let created = state
            .create_room(&master_conn, None, "pw", "Ana", GameType::Ranking, "tok-ana")
            .await
            .unwrap();
        state
            .join_room(&guest_conn, &created.code, "pw", "Bea", "tok-bea", None)
            .await
            .unwrap();
        (created.code, guest_conn, master_conn)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_before_grace_keeps_player() {
        let state = state();
        let (code, guest_conn, _) = room_with_guest(&state).await;

        state.handle_disconnect(&guest_conn).await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let (new_conn, _rx) = state.hub.register().await;
        let joined = state
            .join_room(&new_conn, &code, "", "Bea", "tok-bea", None)
            .await;
        assert!(joined.is_err(), "wrong password without session key");

        let key = state.session_key_of(&code, "tok-bea").await.unwrap();
        state
            .join_room(&new_conn, &code, "", "Bea", "tok-bea", Some(&key))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(state.has_player(&code, "tok-bea").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_player_is_removed_after_grace() {
        let state = state();
        let (code, guest_conn, _) = room_with_guest(&state).await;

        state.handle_disconnect(&guest_conn).await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(!state.has_player(&code, "tok-bea").await);
        assert!(state.session_key_of(&code, "tok-bea").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_id_is_ignored() {
        let state = state();
        let (code, guest_conn, _) = room_with_guest(&state).await;
        state.handle_disconnect(&guest_conn).await;

        state
            .fire_player_removal(&code, &"tok-bea".to_string(), u64::MAX)
            .await;
        assert!(state.has_player(&code, "tok-bea").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_master_failover_and_empty_room_deletion() {
        let state = state();
        let (code, guest_conn, master_conn) = room_with_guest(&state).await;

        state.handle_disconnect(&master_conn).await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(
            state.master_of(&code).await,
            Some("tok-bea".to_string())
        );

        state.handle_disconnect(&guest_conn).await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(state.room_exists(&code).await);
        assert_eq!(state.master_of(&code).await, None);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(!state.room_exists(&code).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_cancels_empty_room_deletion() {
        let state = state();
        let (code, guest_conn, master_conn) = room_with_guest(&state).await;
        state.handle_disconnect(&master_conn).await;
        state.handle_disconnect(&guest_conn).await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        let (conn, _rx) = state.hub.register().await;
        state
            .join_room(&conn, &code, "pw", "Cid", "tok-cid", None)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(state.room_exists(&code).await);
        assert_eq!(state.master_of(&code).await, Some("tok-cid".to_string()));
    }
}
