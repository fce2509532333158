//! Derived market events.

use citrine_reactor::SimEvent;
use citrine_types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::option::OptionId;
use crate::price::PxSize2;
use crate::pricing::Greeks;

/// Best-bid-and-offer update for one option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BboTick {
    pub tm: Timestamp,
    pub id: OptionId,
    pub pxz: PxSize2,
}

impl BboTick {
    pub fn new(tm: Timestamp, id: OptionId, pxz: PxSize2) -> Self {
        Self { tm, id, pxz }
    }
}

impl SimEvent for BboTick {
    fn tm(&self) -> Timestamp {
        self.tm
    }
}

/// Model greeks update for one option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksEvent {
    pub tm: Timestamp,
    pub id: OptionId,
    pub greeks: Greeks,
}

impl SimEvent for GreeksEvent {
    fn tm(&self) -> Timestamp {
        self.tm
    }
}
