//! Event container types.

use crate::hit::{RawHit, RecHit};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All hits recorded for one trigger.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event<H = RawHit> {
    /// Event number.
    pub id: u32,
    /// Hits belonging to this event, in readout order.
    pub hits: Vec<H>,
}

impl<H> Event<H> {
    /// Creates an empty event.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            hits: Vec::new(),
        }
    }

    /// Creates an event with pre-allocated capacity.
    pub fn with_capacity(id: u32, capacity: usize) -> Self {
        Self {
            id,
            hits: Vec::with_capacity(capacity),
        }
    }

    /// Adds a hit to the event.
    pub fn push(&mut self, hit: H) {
        self.hits.push(hit);
    }

    /// Returns the number of hits in the event.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the event has no hits.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Returns an iterator over the hits.
    pub fn iter(&self) -> impl Iterator<Item = &H> {
        self.hits.iter()
    }
}

impl<H: RecHit> Event<H> {
    /// Returns the distinct layers hit in this event, ascending.
    pub fn layers(&self) -> Vec<i16> {
        let mut layers: Vec<i16> = self.hits.iter().map(RecHit::layer).collect();
        layers.sort_unstable();
        layers.dedup();
        layers
    }
}
