//! The world the engine automates.
//!
//! The engine is a guest in somebody else's simulation: entities own their
//! timers, growth stages, and flag arrays, and the host advances them
//! through [`World::advance_minutes`] / [`World::start_day`]. The scheduler
//! only observes the resulting states and moves items around. Everything is
//! headless and deterministic, so the whole model is exercised from plain
//! tests.

use crate::id::{AreaId, EntityId, Tile};
use crate::item::{Container, ContainerRef, HeldSlot, ItemStack, held_slot};
use crate::machines::{OutputQueue, output_queue};
use crate::recipe::{MachineRule, RuleSet};
use slotmap::SlotMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Read-only time and luck context, passed explicitly wherever draws or
/// day-based seeds are computed. Never an ambient global.
#[derive(Debug, Clone, Copy)]
pub struct WorldClock {
    pub game_id: u64,
    pub days_played: u32,
    /// Today's luck in `[-0.1, 0.1]`; feeds disposal-bin draw odds.
    pub daily_luck: f64,
}

/// Per-day disposal-bin flags plus the lifetime check counter. Owned by the
/// world; disposal machines hold a shared handle.
#[derive(Debug, Default)]
pub struct DisposalState {
    pub checked_today: Vec<bool>,
    pub cans_checked: u32,
}

impl DisposalState {
    pub fn with_bins(count: usize) -> Self {
        Self {
            checked_today: vec![false; count],
            cans_checked: 0,
        }
    }
}

pub type DisposalFlags = Rc<RefCell<DisposalState>>;

// ---------------------------------------------------------------------------
// Entity state
// ---------------------------------------------------------------------------

/// A crafting station: one held-output slot and a minutes timer.
pub struct StationState {
    pub kind: String,
    pub enabled: bool,
    pub held: HeldSlot,
    pub minutes_left: u32,
    /// The rule that produced `held`'s contents; consulted on collection for
    /// auto-restart.
    pub current_rule: Option<MachineRule>,
}

impl StationState {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            enabled: true,
            held: held_slot(),
            minutes_left: 0,
            current_rule: None,
        }
    }

    pub fn into_ref(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    fn advance_minutes(&mut self, minutes: u32) {
        self.minutes_left = self.minutes_left.saturating_sub(minutes);
    }
}

/// A harvestable plant. Grows one stage per day; once grown it offers its
/// produce, and collecting either sets the stage back (regrowing crops) or
/// spends the plant.
pub struct PlantState {
    pub produce: ItemStack,
    pub stages: u32,
    pub stage: u32,
    /// Stage setback applied when the harvest is collected; `None` means the
    /// plant is spent after one harvest.
    pub regrow_setback: Option<u32>,
    /// Struck by weather or blight; out of play until the host clears it.
    pub struck: bool,
    pub spent: bool,
    pub held: HeldSlot,
}

impl PlantState {
    pub fn new(produce: ItemStack, stages: u32, regrow_setback: Option<u32>) -> Self {
        Self {
            produce,
            stages,
            stage: 0,
            regrow_setback,
            struck: false,
            spent: false,
            held: held_slot(),
        }
    }

    pub fn into_ref(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    pub fn grown(&self) -> bool {
        self.stage >= self.stages
    }

    fn grow_day(&mut self) {
        if self.struck || self.spent {
            return;
        }
        if !self.grown() {
            self.stage += 1;
        }
        if self.grown() && self.held.borrow().is_none() {
            *self.held.borrow_mut() = Some(self.produce.clone());
        }
    }
}

/// What a shipping bin has swallowed, merged by item identity.
#[derive(Debug, Default)]
pub struct ShippingLedger {
    shipped: Vec<ItemStack>,
}

impl ShippingLedger {
    pub fn record(&mut self, stack: ItemStack) {
        if stack.count == 0 {
            return;
        }
        if let Some(entry) = self.shipped.iter_mut().find(|e| e.matches(&stack)) {
            entry.count += stack.count;
        } else {
            self.shipped.push(stack);
        }
    }

    pub fn shipped(&self) -> &[ItemStack] {
        &self.shipped
    }

    pub fn total_of(&self, sample: &ItemStack) -> u32 {
        self.shipped
            .iter()
            .filter(|e| e.matches(sample))
            .map(|e| e.count)
            .sum()
    }

    pub fn into_ref(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }
}

/// A batch converter: a fixed-slot input hopper plus a FIFO output queue.
/// Conversion happens overnight in [`World::start_day`].
pub struct MillState {
    pub kind: String,
    pub hopper: ContainerRef,
    pub output: OutputQueue,
}

impl MillState {
    pub fn new(kind: &str, hopper_slots: usize, slot_capacity: u32) -> Self {
        Self {
            kind: kind.to_string(),
            hopper: Container::new(hopper_slots, slot_capacity).into_ref(),
            output: output_queue(),
        }
    }

    pub fn into_ref(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Convert whole input batches to queued output. Partial batches stay in
    /// the hopper.
    fn grind(&mut self, rules: &[MachineRule]) {
        let slot_count = self.hopper.borrow().slots().len();
        for index in 0..slot_count {
            let Some(stack) = self.hopper.borrow().slots()[index].clone() else {
                continue;
            };
            // Zero-input rules (timer-only, tapper style) have no batch size.
            let Some(rule) = rules
                .iter()
                .find(|r| r.input_count > 0 && r.input == stack.item_type)
            else {
                continue;
            };
            let batches = stack.count / rule.input_count;
            if batches == 0 {
                continue;
            }
            let consumed = batches * rule.input_count;
            let removed = self.hopper.borrow_mut().reduce_slot(index, consumed);
            debug_assert_eq!(removed, consumed);
            self.output.borrow_mut().push_back(ItemStack::with_quality(
                rule.output,
                rule.output_quality,
                batches * rule.output_count,
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

pub enum EntityKind {
    /// Plain storage; becomes a pipe, not a machine.
    Chest(ContainerRef),
    Station(Rc<RefCell<StationState>>),
    Plant(Rc<RefCell<PlantState>>),
    ShippingBin(Rc<RefCell<ShippingLedger>>),
    /// Index into the world's `checked_today` flag array.
    DisposalBin { index: usize },
    Mill(Rc<RefCell<MillState>>),
}

pub struct PlacedEntity {
    pub tile: Tile,
    /// User-assigned link name; entities sharing one are grouped even
    /// without a spatial path.
    pub link: Option<String>,
    pub kind: EntityKind,
}

impl PlacedEntity {
    pub fn new(tile: Tile, kind: EntityKind) -> Self {
        Self {
            tile,
            link: None,
            kind,
        }
    }

    pub fn linked(tile: Tile, link: &str, kind: EntityKind) -> Self {
        Self {
            tile,
            link: Some(link.to_string()),
            kind,
        }
    }
}

/// One map of the world: a bounded tile grid with blocked tiles and placed
/// entities.
pub struct Area {
    pub name: String,
    width: i32,
    height: i32,
    blocked: HashSet<Tile>,
    pub entities: SlotMap<EntityId, PlacedEntity>,
}

impl Area {
    pub fn new(name: &str, width: i32, height: i32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            blocked: HashSet::new(),
            entities: SlotMap::with_key(),
        }
    }

    pub fn block(&mut self, tile: Tile) {
        self.blocked.insert(tile);
    }

    pub fn in_bounds(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    pub fn passable(&self, tile: Tile) -> bool {
        self.in_bounds(tile) && !self.blocked.contains(&tile)
    }

    pub fn place(&mut self, entity: PlacedEntity) -> EntityId {
        self.entities.insert(entity)
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

pub struct World {
    pub clock: WorldClock,
    pub areas: SlotMap<AreaId, Area>,
    disposal: DisposalFlags,
}

impl World {
    pub fn new(clock: WorldClock, disposal_bins: usize) -> Self {
        Self {
            clock,
            areas: SlotMap::with_key(),
            disposal: Rc::new(RefCell::new(DisposalState::with_bins(disposal_bins))),
        }
    }

    pub fn add_area(&mut self, area: Area) -> AreaId {
        self.areas.insert(area)
    }

    /// Shared handle to the disposal flags; cheap to clone into machines.
    pub fn disposal(&self) -> DisposalFlags {
        Rc::clone(&self.disposal)
    }

    /// Advance in-world time, counting down every station timer.
    pub fn advance_minutes(&mut self, minutes: u32) {
        for area in self.areas.values() {
            for entity in area.entities.values() {
                if let EntityKind::Station(station) = &entity.kind {
                    station.borrow_mut().advance_minutes(minutes);
                }
            }
        }
    }

    /// Overnight rollover: bump the day, clear the per-day disposal flags,
    /// grow plants, grind mill hoppers.
    pub fn start_day(&mut self, rules: &RuleSet) {
        self.clock.days_played += 1;
        for flag in &mut self.disposal.borrow_mut().checked_today {
            *flag = false;
        }
        for area in self.areas.values() {
            for entity in area.entities.values() {
                match &entity.kind {
                    EntityKind::Plant(plant) => plant.borrow_mut().grow_day(),
                    EntityKind::Mill(mill) => {
                        let mut mill = mill.borrow_mut();
                        // An unregistered mill kind simply does not grind;
                        // the scheduler reports it when it tries to feed.
                        if let Ok(mill_rules) = rules.rules_for(&mill.kind, entity.tile) {
                            mill.grind(mill_rules);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Quality;
    use crate::recipe::RuleSetBuilder;

    fn clock() -> WorldClock {
        WorldClock {
            game_id: 192_837_465,
            days_played: 1,
            daily_luck: -0.02,
        }
    }

    fn mill_rules() -> RuleSet {
        let mut b = RuleSetBuilder::new();
        let wheat = b.register_item("wheat");
        let flour = b.register_item("flour");
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
        b.build().unwrap()
    }

    #[test]
    fn station_timer_saturates_at_zero() {
        let station = StationState::new("furnace").into_ref();
        station.borrow_mut().minutes_left = 30;
        let mut world = World::new(clock(), 0);
        let mut area = Area::new("farm", 8, 8);
        area.place(PlacedEntity::new(
            Tile::new(1, 1),
            EntityKind::Station(Rc::clone(&station)),
        ));
        world.add_area(area);

        world.advance_minutes(20);
        assert_eq!(station.borrow().minutes_left, 10);
        world.advance_minutes(100);
        assert_eq!(station.borrow().minutes_left, 0);
    }

    #[test]
    fn plant_grows_daily_and_offers_produce_when_grown() {
        let produce = ItemStack::new(crate::id::ItemTypeId(0), 3);
        let plant = PlantState::new(produce.clone(), 3, Some(1)).into_ref();
        let mut world = World::new(clock(), 0);
        let mut area = Area::new("farm", 8, 8);
        area.place(PlacedEntity::new(
            Tile::new(2, 2),
            EntityKind::Plant(Rc::clone(&plant)),
        ));
        world.add_area(area);
        let rules = mill_rules();

        world.start_day(&rules);
        world.start_day(&rules);
        assert!(!plant.borrow().grown());
        assert!(plant.borrow().held.borrow().is_none());
        world.start_day(&rules);
        assert!(plant.borrow().grown());
        assert_eq!(
            plant.borrow().held.borrow().as_ref().map(|s| s.count),
            Some(3)
        );
    }

    #[test]
    fn struck_plant_stops_growing() {
        let plant = PlantState::new(ItemStack::new(crate::id::ItemTypeId(0), 1), 2, None).into_ref();
        plant.borrow_mut().struck = true;
        let mut world = World::new(clock(), 0);
        let mut area = Area::new("farm", 4, 4);
        area.place(PlacedEntity::new(
            Tile::new(0, 0),
            EntityKind::Plant(Rc::clone(&plant)),
        ));
        world.add_area(area);

        for _ in 0..5 {
            world.start_day(&mill_rules());
        }
        assert_eq!(plant.borrow().stage, 0);
    }

    #[test]
    fn mill_grinds_whole_batches_overnight() {
        let rules = mill_rules();
        let wheat = rules.item_id("wheat").unwrap();
        let flour = rules.item_id("flour").unwrap();

        let mill = MillState::new("mill", 4, 100).into_ref();
        assert_eq!(
            mill.borrow().hopper.borrow_mut().accept(ItemStack::new(wheat, 25)),
            0
        );
        let mut world = World::new(clock(), 0);
        let mut area = Area::new("farm", 4, 4);
        area.place(PlacedEntity::new(
            Tile::new(1, 0),
            EntityKind::Mill(Rc::clone(&mill)),
        ));
        world.add_area(area);

        world.start_day(&rules);
        let mill = mill.borrow();
        assert_eq!(mill.hopper.borrow().total(), 0);
        let queue = mill.output.borrow();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front().unwrap().item_type, flour);
        assert_eq!(queue.front().unwrap().count, 25);
    }

    #[test]
    fn mill_ignores_timer_only_rules() {
        let mut b = RuleSetBuilder::new();
        let sap = b.register_item("sap");
        let syrup = b.register_item("maple syrup");
        b.register_rule(
            "mill",
            MachineRule {
                name: "tap".to_string(),
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
        let rules = b.build().unwrap();

        let mill = MillState::new("mill", 4, 100).into_ref();
        assert_eq!(
            mill.borrow().hopper.borrow_mut().accept(ItemStack::new(sap, 10)),
            0
        );
        let mut world = World::new(clock(), 0);
        let mut area = Area::new("farm", 4, 4);
        area.place(PlacedEntity::new(
            Tile::new(1, 0),
            EntityKind::Mill(Rc::clone(&mill)),
        ));
        world.add_area(area);

        world.start_day(&rules);
        let mill = mill.borrow();
        assert_eq!(mill.hopper.borrow().total(), 10);
        assert!(mill.output.borrow().is_empty());
    }

    #[test]
    fn start_day_resets_disposal_flags() {
        let mut world = World::new(clock(), 3);
        world.disposal().borrow_mut().checked_today[1] = true;
        world.disposal().borrow_mut().cans_checked = 7;

        world.start_day(&mill_rules());
        let flags = world.disposal();
        let state = flags.borrow();
        assert!(state.checked_today.iter().all(|f| !f));
        assert_eq!(state.cans_checked, 7, "lifetime stat survives the day");
        assert_eq!(world.clock.days_played, 2);
    }

    #[test]
    fn ledger_merges_identical_identities() {
        let mut ledger = ShippingLedger::default();
        let a = ItemStack::new(crate::id::ItemTypeId(0), 4);
        ledger.record(a.clone());
        ledger.record(a.with_count(6));
        ledger.record(ItemStack::with_quality(
            crate::id::ItemTypeId(0),
            Quality::Gold,
            2,
        ));
        assert_eq!(ledger.shipped().len(), 2);
        assert_eq!(ledger.total_of(&a), 10);
    }
}
