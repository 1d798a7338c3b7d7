//! Error taxonomy for room and game actions
//!
//! Every rejected action maps to exactly one [`RoomError`]. The dispatch layer
//! uses [`RoomError::kind`] to decide who hears about it: the caller alone, or
//! the whole room for round failures.

/// Result type for room and game operations
pub type RoomResult<T> = Result<T, RoomError>;

/// How a failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, reported to the caller
    Validation,
    /// Caller is not allowed to do this, reported to the caller
    Authorization,
    /// Room is full, reported to the caller
    Capacity,
    /// Action does not fit the current phase, reported to the caller
    StateConflict,
    /// Collective game state cannot proceed, broadcast to the room
    RoundFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Invalid room code. Use 6 characters (A-Z and 2-9).")]
    InvalidCode,

    #[error("Missing {0}")]
    MissingField(&'static str),

    #[error("Invalid player token. Reload the page.")]
    InvalidToken,

    #[error("Type something before sending.")]
    EmptyText,

    #[error("Text too long. Use at most {0} characters.")]
    TextTooLong(usize),

    #[error("Invalid guess. Use a whole number from 1 to 10.")]
    InvalidGuess,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Only the master can {0}")]
    NotMaster(&'static str),

    #[error("You were kicked from this room.")]
    Banned,

    #[error("Room is full")]
    RoomFull,

    #[error("That room code is already in use. Pick another one.")]
    CodeTaken,

    #[error("Room does not exist")]
    RoomNotFound,

    #[error("This room is not playing that game")]
    WrongGame,

    #[error("{0}")]
    WrongPhase(&'static str),

    #[error("You are not active in this round.")]
    NotActive,

    #[error("That player is not part of this round.")]
    TargetNotActive,

    #[error("No character assigned to that player.")]
    NoCharacter,

    #[error("Voting for yourself is not allowed.")]
    SelfVote,

    #[error("The target cannot guess their own rating.")]
    TargetCannotGuess,

    #[error("Caller is not a player in this room")]
    UnknownCaller,

    #[error("At least 2 online players are needed.")]
    NotEnoughPlayers,

    #[error("Nobody voted yet.")]
    NoVotes,

    #[error("Tied vote! Someone has to change their vote until there is a single most voted player.")]
    VoteTie,
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        use RoomError::*;

        match self {
            InvalidCode | MissingField(_) | InvalidToken | EmptyText | TextTooLong(_)
            | InvalidGuess => ErrorKind::Validation,
            WrongPassword | NotMaster(_) | Banned => ErrorKind::Authorization,
            RoomFull => ErrorKind::Capacity,
            CodeTaken | RoomNotFound | WrongGame | WrongPhase(_) | NotActive
            | TargetNotActive | NoCharacter | SelfVote | TargetCannotGuess | UnknownCaller => {
                ErrorKind::StateConflict
            }
            NotEnoughPlayers | NoVotes | VoteTie => ErrorKind::RoundFailure,
        }
    }

    /// Stable wire code sent alongside the human readable message
    pub fn code(&self) -> &'static str {
        use RoomError::*;

        match self {
            InvalidCode => "INVALID_CODE",
            MissingField(_) => "MISSING_FIELD",
            InvalidToken => "INVALID_TOKEN",
            EmptyText => "EMPTY_TEXT",
            TextTooLong(_) => "TEXT_TOO_LONG",
            InvalidGuess => "INVALID_GUESS",
            WrongPassword => "WRONG_PASSWORD",
            NotMaster(_) => "NOT_MASTER",
            Banned => "BANNED",
            RoomFull => "ROOM_FULL",
            CodeTaken => "CODE_TAKEN",
            RoomNotFound => "ROOM_NOT_FOUND",
            WrongGame => "WRONG_GAME",
            WrongPhase(_) => "WRONG_PHASE",
            NotActive => "NOT_ACTIVE",
            TargetNotActive => "TARGET_NOT_ACTIVE",
            NoCharacter => "NO_CHARACTER",
            SelfVote => "SELF_VOTE",
            TargetCannotGuess => "TARGET_CANNOT_GUESS",
            UnknownCaller => "UNKNOWN_CALLER",
            NotEnoughPlayers => "NOT_ENOUGH_PLAYERS",
            NoVotes => "NO_VOTES",
            VoteTie => "VOTE_TIE",
        }
    }

    /// Actions from connections that map to no player are dropped without a reply
    pub fn is_silent(&self) -> bool {
        matches!(self, RoomError::UnknownCaller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_failures_are_broadcast_kind() {
        assert_eq!(RoomError::VoteTie.kind(), ErrorKind::RoundFailure);
        assert_eq!(RoomError::NoVotes.kind(), ErrorKind::RoundFailure);
        assert_eq!(RoomError::NotEnoughPlayers.kind(), ErrorKind::RoundFailure);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(RoomError::RoomFull.kind(), ErrorKind::Capacity);
        assert_eq!(RoomError::WrongPassword.kind(), ErrorKind::Authorization);
        assert_eq!(RoomError::TextTooLong(60).kind(), ErrorKind::Validation);
        assert_eq!(
            RoomError::WrongPhase("not now").kind(),
            ErrorKind::StateConflict
        );
        assert!(RoomError::UnknownCaller.is_silent());
        assert!(!RoomError::NotActive.is_silent());
    }

    #[test]
    fn test_messages_carry_details() {
        assert_eq!(
            RoomError::TextTooLong(80).to_string(),
            "Text too long. Use at most 80 characters."
        );
        assert_eq!(
            RoomError::NotMaster("kick players").to_string(),
            "Only the master can kick players"
        );
        assert_eq!(RoomError::WrongPhase("Voting is not open.").code(), "WRONG_PHASE");
    }
}
