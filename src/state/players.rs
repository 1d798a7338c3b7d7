use super::timers::PendingTimer;
use crate::protocol::PlayerRef;
use crate::types::*;

/// One seat in a room, keyed by the client's token
#[derive(Debug)]
pub struct Player {
    pub token: Token,
    pub name: String,
    /// Current connection, None while offline
    pub conn: Option<ConnId>,
    pub online: bool,
    pub session_key: SessionKey,
    /// Pending disconnect-grace removal
    pub removal: Option<PendingTimer>,
}

impl Player {
    pub fn new(token: Token, name: String, conn: ConnId, session_key: SessionKey) -> Self {
        Self {
            token,
            name,
            conn: Some(conn),
            online: true,
            session_key,
            removal: None,
        }
    }
}

/// Players of one room in join order.
///
/// Join order is the tie-break for master failover and the display order of
/// every roster the games publish.
#[derive(Debug, Default)]
pub struct PlayerStore {
    players: Vec<Player>,
}

impl PlayerStore {
    pub fn get(&self, token: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.token == token)
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.token == token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.get(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    pub fn is_online(&self, token: &str) -> bool {
        self.get(token).is_some_and(|p| p.online)
    }

    /// Online tokens in join order
    pub fn online_tokens(&self) -> Vec<Token> {
        self.players
            .iter()
            .filter(|p| p.online)
            .map(|p| p.token.clone())
            .collect()
    }

    pub fn name_of(&self, token: &str) -> String {
        self.get(token)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| DEPARTED_PLAYER_NAME.to_string())
    }

    pub fn player_ref(&self, token: &str) -> PlayerRef {
        PlayerRef {
            token: token.to_string(),
            name: self.name_of(token),
        }
    }

    pub fn token_for_conn(&self, conn: &str) -> Option<Token> {
        self.players
            .iter()
            .find(|p| p.conn.as_deref() == Some(conn))
            .map(|p| p.token.clone())
    }

    pub fn insert(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn remove(&mut self, token: &str) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.token == token)?;
        Some(self.players.remove(idx))
    }

    /// First online player, else the first remaining one
    pub fn failover_candidate(&self) -> Option<Token> {
        self.players
            .iter()
            .find(|p| p.online)
            .or_else(|| self.players.first())
            .map(|p| p.token.clone())
    }

    pub fn connections(&self) -> Vec<ConnId> {
        self.players.iter().filter_map(|p| p.conn.clone()).collect()
    }
}
