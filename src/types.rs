use serde::{Deserialize, Serialize};

/// Opaque ID types
pub type Token = String;
pub type RoomCode = String;
pub type ConnId = String;
pub type SessionKey = String;

/// Which game a room is hosting. Fixed at room creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    /// Everyone gets a secret number and the table sorts itself
    #[default]
    #[serde(alias = "ito")]
    Ranking,
    /// Players write characters for each other and guess their own
    #[serde(alias = "quem-sou-eu")]
    WhoAmI,
    /// One player answers a slightly different question
    #[serde(alias = "impostor")]
    Spy,
    /// One player knows only the theme, not the concept
    #[serde(alias = "infiltrado")]
    Infiltrator,
    /// Guess the secret 1-10 rating of the current target
    #[serde(alias = "e-a-nota-e")]
    Rating,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Ranking => "ranking",
            GameType::WhoAmI => "who_am_i",
            GameType::Spy => "spy",
            GameType::Infiltrator => "infiltrator",
            GameType::Rating => "rating",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankingPhase {
    #[default]
    Lobby,
    Distributed,
    Revealed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WhoAmIPhase {
    #[default]
    Lobby,
    Writing,
    Playing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpyPhase {
    #[default]
    Lobby,
    Answering,
    Voting,
    Revealed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InfiltratorPhase {
    #[default]
    Lobby,
    Round1,
    Round2,
    Round3,
    Voting,
    Revealed,
}

impl InfiltratorPhase {
    /// Discussion round number, if this is one
    pub fn round(&self) -> Option<u8> {
        match self {
            InfiltratorPhase::Round1 => Some(1),
            InfiltratorPhase::Round2 => Some(2),
            InfiltratorPhase::Round3 => Some(3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RatingPhase {
    #[default]
    Lobby,
    Guessing,
    Revealed,
}

/// Fallback display name for players that joined without one
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Name shown for tokens that already left the room
pub const DEPARTED_PLAYER_NAME: &str = "(disconnected)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_accepts_legacy_names() {
        let gt: GameType = serde_json::from_str("\"quem-sou-eu\"").unwrap();
        assert_eq!(gt, GameType::WhoAmI);
        let gt: GameType = serde_json::from_str("\"e-a-nota-e\"").unwrap();
        assert_eq!(gt, GameType::Rating);
        let gt: GameType = serde_json::from_str("\"infiltrator\"").unwrap();
        assert_eq!(gt, GameType::Infiltrator);
    }

    #[test]
    fn test_game_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&GameType::WhoAmI).unwrap(),
            "\"who_am_i\""
        );
        assert_eq!(GameType::default(), GameType::Ranking);
    }

    #[test]
    fn test_infiltrator_rounds() {
        assert_eq!(InfiltratorPhase::Round2.round(), Some(2));
        assert_eq!(InfiltratorPhase::Voting.round(), None);
        assert_eq!(
            serde_json::to_string(&InfiltratorPhase::Round3).unwrap(),
            "\"round3\""
        );
    }
}
