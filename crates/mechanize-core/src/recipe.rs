//! Machine rule tables.
//!
//! Per-machine production rules are static data consumed by a generic
//! matching algorithm, not hand-written per item. A [`RuleSetBuilder`]
//! registers items and rules, then freezes into an immutable [`RuleSet`]
//! shared by every factory group. A station kind with no registered rules is
//! a data defect and surfaces as [`EngineError::MissingRule`] at match time.

use crate::error::EngineError;
use crate::id::{ItemTypeId, Quality, Tile};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// An optional speed-up ingredient. After the primary consume, one catalyst
/// item may be taken per application, each shaving `minutes_off` from the
/// timer -- but never below `floor`, and the threshold is re-checked before
/// every application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalyst {
    pub item: ItemTypeId,
    pub minutes_off: u32,
    pub floor: u32,
}

/// One production rule for a station kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRule {
    pub name: String,
    pub input: ItemTypeId,
    pub input_count: u32,
    pub output: ItemTypeId,
    pub output_quality: Quality,
    pub output_count: u32,
    /// In-world minutes until the output is ready.
    pub minutes: u32,
    pub catalyst: Option<Catalyst>,
    /// Restart the same rule immediately when the output is collected,
    /// without consuming new input (tappers, traps).
    pub auto_restart: bool,
}

/// Builder for an immutable rule set. Register everything up front, then
/// `build()` validates cross-references and freezes.
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    items: Vec<String>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    rules: HashMap<String, Vec<MachineRule>>,
    non_shippable: HashSet<ItemTypeId>,
}

impl RuleSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item name. Returns its ID.
    pub fn register_item(&mut self, name: &str) -> ItemTypeId {
        if let Some(id) = self.item_name_to_id.get(name) {
            return *id;
        }
        let id = ItemTypeId(self.items.len() as u32);
        self.items.push(name.to_string());
        self.item_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a production rule under a station kind.
    pub fn register_rule(&mut self, kind: &str, rule: MachineRule) {
        self.rules.entry(kind.to_string()).or_default().push(rule);
    }

    /// Mark an item as not accepted by shipping bins.
    pub fn mark_non_shippable(&mut self, item: ItemTypeId) {
        self.non_shippable.insert(item);
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    /// Validate item references and freeze.
    pub fn build(self) -> Result<RuleSet, EngineError> {
        let item_count = self.items.len() as u32;
        for rules in self.rules.values() {
            for rule in rules {
                for id in [rule.input, rule.output]
                    .into_iter()
                    .chain(rule.catalyst.as_ref().map(|c| c.item))
                {
                    if id.0 >= item_count {
                        return Err(EngineError::UnknownItem(format!(
                            "item id {} in rule '{}'",
                            id.0, rule.name
                        )));
                    }
                }
                // The catalyst loop re-checks its threshold after every
                // application; a zero shave would never terminate it against
                // a large enough supply.
                if let Some(catalyst) = &rule.catalyst {
                    if catalyst.minutes_off == 0 {
                        return Err(EngineError::InvalidRule {
                            name: rule.name.clone(),
                            reason: "catalyst minutes_off must be positive".to_string(),
                        });
                    }
                }
            }
        }
        Ok(RuleSet {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            rules: self.rules,
            non_shippable: self.non_shippable,
        })
    }
}

/// Immutable rule set. Frozen after build.
#[derive(Debug)]
pub struct RuleSet {
    items: Vec<String>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    rules: HashMap<String, Vec<MachineRule>>,
    non_shippable: HashSet<ItemTypeId>,
}

impl RuleSet {
    /// Rules for a station kind, or the fatal missing-table error. `tile`
    /// only feeds the error context.
    pub fn rules_for(&self, kind: &str, tile: Tile) -> Result<&[MachineRule], EngineError> {
        self.rules
            .get(kind)
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::MissingRule {
                kind: kind.to_string(),
                tile,
            })
    }

    pub fn has_rules_for(&self, kind: &str) -> bool {
        self.rules.contains_key(kind)
    }

    pub fn shippable(&self, item: ItemTypeId) -> bool {
        !self.non_shippable.contains(&item)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn item_name(&self, id: ItemTypeId) -> Option<&str> {
        self.items.get(id.0 as usize).map(String::as_str)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
