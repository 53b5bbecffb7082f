use rand::Rng;

use flashdeck_core::model::{Card, Deck};

use super::config::OrderMode;

/// Builds the fixed card sequence for one session.
///
/// Cards are sorted ascending by `order`; `Random` then applies a uniform
/// permutation drawn from `rng`.
pub fn playback_sequence<R: Rng + ?Sized>(deck: &Deck, mode: OrderMode, rng: &mut R) -> Vec<Card> {
    let ordered = deck.sorted_cards();
    match mode {
        OrderMode::Ordered => ordered,
        OrderMode::Random => shuffle(ordered, rng),
    }
}

/// Fisher-Yates: walks from the last index down to 1, swapping each slot with
/// a uniformly chosen index in `[0, i]`.
pub fn shuffle<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> Vec<T> {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
    items
}
