//! Vote tally resolution for the Spy and Infiltrator games

use crate::error::{RoomError, RoomResult};
use crate::types::Token;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Outcome of a resolved vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteResult {
    pub top: Token,
    pub count: usize,
    /// Votes per target, counting only active voters and targets
    pub tally: BTreeMap<Token, usize>,
}

/// Count the votes cast by active voters for active targets.
///
/// Fails with [`RoomError::NoVotes`] when nothing counts and with
/// [`RoomError::VoteTie`] when the two highest counts are equal.
pub fn resolve(
    votes: &HashMap<Token, Token>,
    active: &HashSet<Token>,
) -> RoomResult<VoteResult> {
    let mut tally: BTreeMap<Token, usize> = BTreeMap::new();
    for (voter, target) in votes {
        if active.contains(voter) && active.contains(target) {
            *tally.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(&Token, &usize)> = tally.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1));

    let (top, count) = match ranked.first() {
        Some((top, count)) => ((*top).clone(), **count),
        None => return Err(RoomError::NoVotes),
    };
    if ranked.get(1).is_some_and(|(_, second)| **second == count) {
        return Err(RoomError::VoteTie);
    }

    Ok(VoteResult { top, count, tally })
}
