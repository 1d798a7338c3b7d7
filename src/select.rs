//! Randomized selection helpers shared by the game engines

use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashMap;
use std::hash::Hash;

/// Shuffle attempts before falling back to a rotation
const DERANGEMENT_ATTEMPTS: usize = 50;

/// Uniformly shuffled copy of `items`; the input is left untouched
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(&mut rand::rng());
    out
}

/// Uniform random element, `None` on empty input
pub fn pick_one<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::rng())
}

/// Up to `n` distinct elements in random order
pub fn pick_distinct<T: Clone>(items: &[T], n: usize) -> Vec<T> {
    let mut out = shuffle(items);
    out.truncate(n);
    out
}

/// Random bijection over `ids` in which no id maps to itself.
///
/// Returns `None` for fewer than two ids. After [`DERANGEMENT_ATTEMPTS`]
/// failed shuffles the ids are rotated by one instead.
pub fn derangement<T>(ids: &[T]) -> Option<HashMap<T, T>>
where
    T: Clone + Eq + Hash,
{
    if ids.len() < 2 {
        return None;
    }

    let mut rng = rand::rng();
    let mut candidate = ids.to_vec();
    for _ in 0..DERANGEMENT_ATTEMPTS {
        candidate.shuffle(&mut rng);
        if ids.iter().zip(&candidate).all(|(a, b)| a != b) {
            return Some(ids.iter().cloned().zip(candidate).collect());
        }
    }

    Some(rotate_by_one(ids))
}

fn rotate_by_one<T>(ids: &[T]) -> HashMap<T, T>
where
    T: Clone + Eq + Hash,
{
    ids.iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), ids[(i + 1) % ids.len()].clone()))
        .collect()
}
