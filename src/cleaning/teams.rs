//! Team-name normalization.

use crate::models::{Delivery, Match};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Rewrites historical franchise names to their current form.
///
/// Rename chains (`A -> B`, `B -> C`) are collapsed when the normalizer is
/// built, so every name maps straight to its final spelling and applying
/// the normalizer a second time changes nothing. Names caught in a cycle
/// are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TeamNormalizer {
    renames: BTreeMap<String, String>,
}

impl TeamNormalizer {
    /// Build a normalizer from an `old name -> new name` table.
    pub fn new(table: &BTreeMap<String, String>) -> Self {
        let mut renames = BTreeMap::new();

        for from in table.keys() {
            let mut seen = BTreeSet::new();
            seen.insert(from.as_str());
            let mut current = from.as_str();
            let mut cyclic = false;

            while let Some(next) = table.get(current) {
                if next == current {
                    break;
                }
                if !seen.insert(next.as_str()) {
                    cyclic = true;
                    break;
                }
                current = next.as_str();
            }

            if cyclic {
                warn!("Ignoring cyclic team rename starting at '{}'", from);
            } else if current != from {
                renames.insert(from.clone(), current.to_string());
            }
        }

        Self { renames }
    }

    /// Returns the normalized spelling of a team name.
    pub fn normalize<'a>(&'a self, name: &'a str) -> &'a str {
        self.renames.get(name).map(String::as_str).unwrap_or(name)
    }

    fn normalize_in_place(&self, name: &mut String) {
        if self.renames.contains_key(name.as_str()) {
            *name = self.normalize(name).to_string();
        }
    }

    /// Normalize every team column of a match.
    pub fn apply_to_match(&self, record: &mut Match) {
        self.normalize_in_place(&mut record.team1);
        self.normalize_in_place(&mut record.team2);
        if let Some(ref mut toss_winner) = record.toss_winner {
            self.normalize_in_place(toss_winner);
        }
        if let Some(ref mut winner) = record.winner {
            self.normalize_in_place(winner);
        }
    }

    /// Normalize every team column of a delivery.
    pub fn apply_to_delivery(&self, record: &mut Delivery) {
        self.normalize_in_place(&mut record.batting_team);
        self.normalize_in_place(&mut record.bowling_team);
    }

    /// Number of effective renames.
    pub fn len(&self) -> usize {
        self.renames.len()
    }

    /// Returns true if no name is rewritten.
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }
}
