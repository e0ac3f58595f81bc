//! Data-driven rule loading from JSON.
//!
//! Feature-gated behind `data-loader`. Machine rules are content, not code:
//! hosts ship them as data files and build a [`RuleSet`] here. Items are
//! referenced by name in the file and resolved to ids during the build.

use crate::error::EngineError;
use crate::id::Quality;
use crate::recipe::{Catalyst, MachineRule, RuleSet, RuleSetBuilder};

// ---------------------------------------------------------------------------
// JSON data structures
// ---------------------------------------------------------------------------

/// Top-level rules document.
#[derive(Debug, serde::Deserialize)]
pub struct RulesDoc {
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub non_shippable: Vec<String>,
    #[serde(default)]
    pub machines: Vec<MachineDoc>,
}

/// Rules for one machine kind.
#[derive(Debug, serde::Deserialize)]
pub struct MachineDoc {
    pub kind: String,
    pub rules: Vec<RuleDoc>,
}

/// One production rule; items referenced by name.
#[derive(Debug, serde::Deserialize)]
pub struct RuleDoc {
    pub name: String,
    pub input: String,
    #[serde(default = "one")]
    pub input_count: u32,
    pub output: String,
    #[serde(default)]
    pub output_quality: Quality,
    #[serde(default = "one")]
    pub output_count: u32,
    pub minutes: u32,
    #[serde(default)]
    pub catalyst: Option<CatalystDoc>,
    #[serde(default)]
    pub auto_restart: bool,
}

#[derive(Debug, serde::Deserialize)]
pub struct CatalystDoc {
    pub item: String,
    pub minutes_off: u32,
    pub floor: u32,
}

fn one() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Build a rule set from a JSON string.
pub fn load_rules_json(json: &str) -> Result<RuleSet, EngineError> {
    let doc: RulesDoc =
        serde_json::from_str(json).map_err(|e| EngineError::DataLoad(e.to_string()))?;
    build_rules(doc)
}

/// Build a rule set from JSON bytes.
pub fn load_rules_json_bytes(bytes: &[u8]) -> Result<RuleSet, EngineError> {
    let doc: RulesDoc =
        serde_json::from_slice(bytes).map_err(|e| EngineError::DataLoad(e.to_string()))?;
    build_rules(doc)
}

fn build_rules(doc: RulesDoc) -> Result<RuleSet, EngineError> {
    let mut builder = RuleSetBuilder::new();
    for name in &doc.items {
        builder.register_item(name);
    }
    let resolve = |builder: &RuleSetBuilder, name: &str| {
        builder
            .item_id(name)
            .ok_or_else(|| EngineError::UnknownItem(name.to_string()))
    };
    for name in &doc.non_shippable {
        let id = resolve(&builder, name)?;
        builder.mark_non_shippable(id);
    }
    for machine in &doc.machines {
        for rule in &machine.rules {
            let catalyst = rule
                .catalyst
                .as_ref()
                .map(|c| {
                    Ok::<_, EngineError>(Catalyst {
                        item: resolve(&builder, &c.item)?,
                        minutes_off: c.minutes_off,
                        floor: c.floor,
                    })
                })
                .transpose()?;
            let rule = MachineRule {
                name: rule.name.clone(),
                input: resolve(&builder, &rule.input)?,
                input_count: rule.input_count,
                output: resolve(&builder, &rule.output)?,
                output_quality: rule.output_quality,
                output_count: rule.output_count,
                minutes: rule.minutes,
                catalyst,
                auto_restart: rule.auto_restart,
            };
            builder.register_rule(&machine.kind, rule);
        }
    }
    builder.build()
}
