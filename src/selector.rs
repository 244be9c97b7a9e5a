use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::{SliceRandom, index};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Item {
            id: id.into(),
            name: name.into().trim().to_string(),
        }
    }
}

pub fn validate(pool_size: usize, quantity: usize, allow_repeat: bool) -> Result<(), ValidationError> {
    if pool_size == 0 {
        return Err(ValidationError::EmptyItems);
    }
    if quantity == 0 {
        return Err(ValidationError::InvalidQuantity);
    }
    if !allow_repeat && quantity > pool_size {
        return Err(ValidationError::QuantityExceedsPool {
            requested: quantity,
            available: pool_size,
        });
    }
    Ok(())
}

/// Draws `quantity` winners from `items`.
///
/// The pool is shuffled first; without repetition each draw removes the
/// picked item, with repetition every draw is an independent uniform pick.
pub fn select<R: Rng + ?Sized>(
    items: &[Item],
    quantity: usize,
    allow_repeat: bool,
    rng: &mut R,
) -> Result<Vec<Item>, ValidationError> {
    validate(items.len(), quantity, allow_repeat)?;

    let mut pool = items.to_vec();
    pool.shuffle(rng);

    let mut winners = Vec::with_capacity(quantity);
    for _ in 0..quantity {
        let idx = rng.random_range(0..pool.len());
        if allow_repeat {
            winners.push(pool[idx].clone());
        } else {
            winners.push(pool.swap_remove(idx));
        }
    }
    Ok(winners)
}

/// Picks `winners.len()` distinct slots out of `total_slots` to host the
/// winners; every other slot stays blank. Extra winners beyond the slot
/// count are dropped.
pub fn assign_to_slots<R: Rng + ?Sized>(
    winners: &[Item],
    total_slots: usize,
    rng: &mut R,
) -> BTreeMap<usize, Item> {
    let amount = winners.len().min(total_slots);
    index::sample(rng, total_slots, amount)
        .into_iter()
        .zip(winners.iter().cloned())
        .collect()
}
