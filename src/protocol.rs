use crate::types::*;
use serde::{Deserialize, Serialize};

/// Version announced in the welcome message
pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        /// Requested code, generated when omitted
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        password: String,
        #[serde(default)]
        master_name: String,
        #[serde(default)]
        game_type: GameType,
        #[serde(default)]
        player_token: String,
    },
    JoinRoom {
        code: String,
        #[serde(default)]
        password: String,
        #[serde(default)]
        player_name: String,
        #[serde(default)]
        player_token: String,
        /// Reconnection secret from an earlier join, skips the password
        #[serde(default)]
        session_key: Option<SessionKey>,
    },
    /// Ban a player for the lifetime of the room (master only)
    KickPlayer {
        code: String,
        target_token: Token,
    },
    /// Leave voluntarily; the master leaving closes the room
    LeaveRoom {
        code: String,
    },
    CloseRoom {
        code: String,
    },

    // Ranking
    RankingDistribute {
        code: String,
    },
    RankingReveal {
        code: String,
    },

    // Who-Am-I
    WhoAmIStart {
        code: String,
    },
    WhoAmISubmit {
        code: String,
        text: String,
    },
    WhoAmICloseWriting {
        code: String,
    },
    /// Show one player the character written for them
    WhoAmIRevealTo {
        code: String,
        target_token: Token,
    },

    // Spy
    SpyStart {
        code: String,
    },
    SpySubmitAnswer {
        code: String,
        text: String,
    },
    SpyRevealAnswers {
        code: String,
    },
    SpyVote {
        code: String,
        target_token: Token,
    },
    SpyRevealSpy {
        code: String,
    },

    // Infiltrator
    InfiltratorStart {
        code: String,
    },
    InfiltratorNextRound {
        code: String,
    },
    InfiltratorVote {
        code: String,
        target_token: Token,
    },
    InfiltratorReveal {
        code: String,
    },
    InfiltratorRevealConcept {
        code: String,
    },

    // Rating
    RatingStartTurn {
        code: String,
    },
    /// Guess as sent by the client: a number or a numeric string
    RatingSubmitGuess {
        code: String,
        guess: serde_json::Value,
    },
    RatingReveal {
        code: String,
    },
    RatingNextTurn {
        code: String,
    },
    RatingResetScores {
        code: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        conn_id: ConnId,
        server_now: String,
    },
    RoomCreated {
        code: RoomCode,
        game_type: GameType,
        session_key: SessionKey,
    },
    Joined {
        code: RoomCode,
        game_type: GameType,
        session_key: SessionKey,
    },
    /// Sent privately to whoever currently holds the master role
    Master {
        code: RoomCode,
    },
    PlayersUpdate {
        code: RoomCode,
        players: Vec<PlayerInfo>,
        master: Option<Token>,
        game_type: GameType,
    },
    Kicked {
        code: RoomCode,
        reason: String,
    },
    RoomClosed {
        code: RoomCode,
        reason: String,
    },
    Left {
        code: RoomCode,
    },
    /// Room-wide notice, e.g. a tied vote
    Notice {
        code: String,
        msg: String,
    },
    RoundCancelled {
        game: GameType,
        reason: String,
    },
    /// Sent to a voter when their vote was stored
    VoteAccepted {
        target: Token,
    },

    // Ranking
    RankingNewRound,
    RankingNumber {
        value: u32,
    },
    RankingAllNumbers {
        entries: Vec<RankingEntry>,
    },
    RankingState {
        phase: RankingPhase,
        holders: Vec<PlayerRef>,
    },

    // Who-Am-I
    WhoAmINewRound,
    /// Who the receiver writes a character for
    WhoAmIYourTarget {
        target: PlayerRef,
    },
    WhoAmISubmitted,
    WhoAmIState {
        phase: WhoAmIPhase,
        players: Vec<WritingStatus>,
    },
    /// Everyone else's character, the receiver's own is left out
    WhoAmIOthers {
        characters: Vec<CharacterInfo>,
    },
    WhoAmIExcluded {
        reason: String,
    },
    WhoAmIYourCharacter {
        character: String,
    },
    WhoAmIRevealed {
        player: PlayerRef,
    },

    // Spy
    SpyNewRound,
    SpyQuestion {
        question: String,
    },
    SpyAnswerAccepted,
    SpyState {
        phase: SpyPhase,
        players: Vec<AnswerStatus>,
        /// Main question, published once answers are revealed
        question: Option<String>,
        answers: Vec<AnswerInfo>,
        votes_cast: usize,
    },
    SpyRevealed {
        spy: PlayerRef,
        principal: String,
        decoy: String,
        top: PlayerRef,
        tally: Vec<TallyEntry>,
    },

    // Infiltrator
    InfiltratorSecret {
        theme: String,
        is_infiltrator: bool,
        /// Never sent to the infiltrator
        concept: Option<String>,
        /// Only sent to the infiltrator
        hint: Option<String>,
    },
    InfiltratorRound {
        round: u8,
        question: String,
        order: Vec<PlayerRef>,
    },
    InfiltratorState {
        phase: InfiltratorPhase,
        theme: Option<String>,
        active: Vec<PlayerRef>,
        votes_cast: usize,
        concept_revealed: bool,
    },
    InfiltratorRevealed {
        infiltrator: PlayerRef,
        top: PlayerRef,
        caught: bool,
        tally: Vec<TallyEntry>,
    },
    InfiltratorConcept {
        theme: String,
        concept: String,
    },

    // Rating
    RatingCycleStarted {
        order: Vec<PlayerRef>,
    },
    RatingTurnStarted {
        target: PlayerRef,
        turn: usize,
        of: usize,
    },
    /// Sent only to the target
    RatingSecret {
        rating: u8,
    },
    RatingPromptGuess {
        target: PlayerRef,
    },
    RatingGuessAccepted {
        guess: u8,
    },
    RatingResults {
        target: PlayerRef,
        rating: u8,
        hits: usize,
        guesses: Vec<GuessResult>,
        scoreboard: Vec<ScoreEntry>,
    },
    RatingState {
        phase: RatingPhase,
        target: Option<PlayerRef>,
        order: Vec<PlayerRef>,
        guessed: Vec<Token>,
        scoreboard: Vec<ScoreEntry>,
    },

    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

impl From<&crate::error::RoomError> for ServerMessage {
    fn from(e: &crate::error::RoomError) -> Self {
        ServerMessage::error(e.code(), e.to_string())
    }
}

/// Token plus display name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRef {
    pub token: Token,
    pub name: String,
}

/// Roster entry in a players update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerInfo {
    pub token: Token,
    pub name: String,
    pub is_master: bool,
    pub online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankingEntry {
    pub token: Token,
    pub name: String,
    /// None for players that joined after distribution
    pub value: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WritingStatus {
    pub token: Token,
    pub name: String,
    pub online: bool,
    pub active: bool,
    pub submitted: bool,
    pub revealed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterInfo {
    pub token: Token,
    pub name: String,
    pub character: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerStatus {
    pub token: Token,
    pub name: String,
    pub online: bool,
    pub active: bool,
    pub answered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerInfo {
    pub token: Token,
    pub name: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TallyEntry {
    pub token: Token,
    pub name: String,
    pub votes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessResult {
    pub token: Token,
    pub name: String,
    pub guess: u8,
    pub hit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntry {
    pub token: Token,
    pub name: String,
    pub points: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_room_defaults() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"create_room","password":"pw","master_name":"Ana","player_token":"tok"}"#,
        )
        .unwrap();

        match msg {
            ClientMessage::CreateRoom {
                code, game_type, ..
            } => {
                assert!(code.is_none());
                assert_eq!(game_type, GameType::Ranking);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_guess_keeps_raw_value() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"rating_submit_guess","code":"ABCDEF","guess":"7"}"#)
                .unwrap();
        match msg {
            ClientMessage::RatingSubmitGuess { guess, .. } => {
                assert_eq!(guess, serde_json::json!("7"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_server_message_tagging() {
        let json = serde_json::to_value(ServerMessage::RankingNumber { value: 42 }).unwrap();
        assert_eq!(json["t"], "ranking_number");
        assert_eq!(json["value"], 42);

        let json = serde_json::to_value(ServerMessage::error("ROOM_FULL", "Room is full")).unwrap();
        assert_eq!(json["t"], "error");
        assert_eq!(json["code"], "ROOM_FULL");
    }
}
