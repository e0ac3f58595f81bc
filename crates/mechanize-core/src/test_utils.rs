//! Shared test helpers for integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available to unit tests and, via the `test-utils` feature, to the
//! integration-test crate.

use crate::id::{ItemTypeId, Quality};
use crate::item::{Container, ContainerRef, ItemStack};
use crate::recipe::{Catalyst, MachineRule, RuleSet, RuleSetBuilder};
use crate::world::WorldClock;

// ===========================================================================
// Item constructors
// ===========================================================================

// Ids follow the registration order in `basic_rules`.

pub fn wheat() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn flour() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn copper_ore() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn copper_bar() -> ItemTypeId {
    ItemTypeId(3)
}
pub fn coal() -> ItemTypeId {
    ItemTypeId(4)
}
pub fn sap() -> ItemTypeId {
    ItemTypeId(5)
}
pub fn maple_syrup() -> ItemTypeId {
    ItemTypeId(6)
}

// ===========================================================================
// Rule sets and world context
// ===========================================================================

/// A small farm economy: a mill, a catalyst-capable furnace, and an
/// auto-restarting tapper. Sap never ships.
pub fn basic_rules() -> RuleSet {
    let mut b = RuleSetBuilder::new();
    let wheat = b.register_item("wheat");
    let flour = b.register_item("flour");
    let ore = b.register_item("copper ore");
    let bar = b.register_item("copper bar");
    let coal = b.register_item("coal");
    let sap = b.register_item("sap");
    let syrup = b.register_item("maple syrup");

    b.register_rule(
        "mill",
        MachineRule {
            name: "grind wheat".to_string(),
            input: wheat,
            input_count: 1,
            output: flour,
            output_quality: Quality::Normal,
            output_count: 1,
            minutes: 0,
            catalyst: None,
            auto_restart: false,
        },
    );
    b.register_rule(
        "furnace",
        MachineRule {
            name: "smelt copper".to_string(),
            input: ore,
            input_count: 5,
            output: bar,
            output_quality: Quality::Normal,
            output_count: 1,
            minutes: 120,
            catalyst: Some(Catalyst {
                item: coal,
                minutes_off: 30,
                floor: 30,
            }),
            auto_restart: false,
        },
    );
    b.register_rule(
        "tapper",
        MachineRule {
            name: "tap maple".to_string(),
            input: sap,
            input_count: 0,
            output: syrup,
            output_quality: Quality::Normal,
            output_count: 1,
            minutes: 540,
            catalyst: None,
            auto_restart: true,
        },
    );
    b.mark_non_shippable(sap);
    b.build().expect("basic rules are well-formed")
}

/// The clock used across the test suite; pinned so seeded draws stay stable.
pub fn clock() -> WorldClock {
    WorldClock {
        game_id: 192_837_465,
        days_played: 1,
        daily_luck: -0.02,
    }
}

// ===========================================================================
// Containers
// ===========================================================================

/// A 12-slot chest with the usual 99-per-slot limit, pre-filled.
pub fn chest(stacks: &[ItemStack]) -> ContainerRef {
    let chest = Container::new(12, 99).into_ref();
    for stack in stacks {
        let overflow = chest.borrow_mut().accept(stack.clone());
        assert_eq!(overflow, 0, "test chest overflowed during setup");
    }
    chest
}

pub fn stack(item: ItemTypeId, count: u32) -> ItemStack {
    ItemStack::new(item, count)
}
