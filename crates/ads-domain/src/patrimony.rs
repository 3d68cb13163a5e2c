//! Asset inventory attached to a beneficiary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::*;

/// A single asset line: what it is and what it is worth.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatrimonyItem {
    #[serde(rename = "descrizione", default)]
    pub description: String,
    #[serde(rename = "valore", default, deserialize_with = "lenient_amount")]
    pub value: f64,
}

impl PatrimonyItem {
    pub fn new(description: impl Into<String>, value: f64) -> Self {
        Self {
            description: description.into(),
            value,
        }
    }
}

impl Amounted for PatrimonyItem {
    fn amount(&self) -> f64 {
        finite_or_zero(self.value)
    }
}

impl Described for PatrimonyItem {
    fn description(&self) -> Option<&str> {
        non_blank(Some(&self.description))
    }
}

/// The three ordered asset lists tracked for every beneficiary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Patrimony {
    #[serde(rename = "beniImmobili", default)]
    pub real_estate: Vec<PatrimonyItem>,
    #[serde(rename = "beniMobili", default)]
    pub movable_goods: Vec<PatrimonyItem>,
    #[serde(rename = "titoliConti", default)]
    pub financial: Vec<PatrimonyItem>,
}

impl Patrimony {
    pub fn items(&self, kind: PatrimonyKind) -> &[PatrimonyItem] {
        match kind {
            PatrimonyKind::RealEstate => &self.real_estate,
            PatrimonyKind::MovableGoods => &self.movable_goods,
            PatrimonyKind::Financial => &self.financial,
        }
    }

    pub fn items_mut(&mut self, kind: PatrimonyKind) -> &mut Vec<PatrimonyItem> {
        match kind {
            PatrimonyKind::RealEstate => &mut self.real_estate,
            PatrimonyKind::MovableGoods => &mut self.movable_goods,
            PatrimonyKind::Financial => &mut self.financial,
        }
    }

    pub fn is_empty(&self) -> bool {
        PatrimonyKind::ALL
            .iter()
            .all(|kind| self.items(*kind).is_empty())
    }
}

/// Identifies one of the patrimony lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatrimonyKind {
    RealEstate,
    MovableGoods,
    Financial,
}

impl PatrimonyKind {
    pub const ALL: [PatrimonyKind; 3] = [
        PatrimonyKind::RealEstate,
        PatrimonyKind::MovableGoods,
        PatrimonyKind::Financial,
    ];
}

impl fmt::Display for PatrimonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatrimonyKind::RealEstate => "Beni immobili",
            PatrimonyKind::MovableGoods => "Beni mobili",
            PatrimonyKind::Financial => "Titoli e conti",
        };
        f.write_str(label)
    }
}
