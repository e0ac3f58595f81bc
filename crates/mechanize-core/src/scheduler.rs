//! The per-tick two-pass scheduler.
//!
//! For every factory group: collect finished output into the group's
//! storage, then let hungry machines pull ingredients from the *same*
//! pre-collect snapshot. The snapshot is what enforces the one-tick
//! propagation delay: a sibling's freshly stored output is invisible until
//! the next tick, so item flow settles in deterministic waves instead of
//! cascading within one tick.

use crate::connectivity::{FactoryGroup, build_groups};
use crate::error::EngineError;
use crate::machine::{Machine, MachineState};
use crate::machines;
use crate::pipe::Pipe;
use crate::recipe::RuleSet;
use crate::storage::Storage;
use crate::world::{EntityKind, World};
use std::rc::Rc;

/// Owns the current connectivity epoch and drives ticks across it.
#[derive(Default)]
pub struct Automaton {
    groups: Vec<FactoryGroup>,
}

impl Automaton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute every area's factory groups. Called when topology changes
    /// (entity placed, removed, moved, area loaded) -- not per tick.
    pub fn rebuild(&mut self, world: &World) {
        self.groups.clear();
        for (area_id, area) in &world.areas {
            self.groups.extend(build_groups(area_id, area));
        }
        tracing::debug!(groups = self.groups.len(), "connectivity rebuilt");
    }

    pub fn groups(&self) -> &[FactoryGroup] {
        &self.groups
    }

    /// Run one tick. A fatal error aborts its own group's remaining work;
    /// the other groups still process.
    pub fn process_tick(&self, world: &World, rules: &RuleSet) {
        for group in &self.groups {
            if let Err(err) = process_group(world, rules, group) {
                tracing::error!(error = %err, "factory group aborted for this tick");
            }
        }
    }
}

fn process_group(world: &World, rules: &RuleSet, group: &FactoryGroup) -> Result<(), EngineError> {
    // A group can outlive its area or entities between rebuilds; stale
    // references are skipped, never an error.
    let Some(area) = world.areas.get(group.area) else {
        return Ok(());
    };
    let flags = world.disposal();
    let mut machines_in_group: Vec<Box<dyn Machine + '_>> = Vec::new();
    let mut pipes = Vec::new();
    for id in &group.members {
        let Some(entity) = area.entities.get(*id) else {
            continue;
        };
        match &entity.kind {
            EntityKind::Chest(container) => pipes.push(Pipe::new(Rc::clone(container))),
            _ => {
                if let Some(machine) = machines::for_entity(entity, rules, world.clock, &flags) {
                    machines_in_group.push(machine);
                }
            }
        }
    }
    let storage = Storage::with_snapshot(pipes);

    // Collect pass. An undrained remainder is backpressure: the machine
    // keeps its output and stays Done until storage frees up.
    for machine in &mut machines_in_group {
        if machine.state() != MachineState::Done {
            continue;
        }
        if let Some(mut output) = machine.output() {
            storage.store(&mut output);
            if output.count() > 0 {
                tracing::debug!(
                    machine = machine.id(),
                    tile = ?machine.tile(),
                    stuck = output.count(),
                    "storage full, output held back"
                );
            }
        }
    }

    // Feed pass, against the pre-collect snapshot.
    for machine in &mut machines_in_group {
        if matches!(
            machine.state(),
            MachineState::Done | MachineState::Disabled
        ) {
            continue;
        }
        if let Err(err) = machine.set_input(&storage) {
            tracing::error!(
                machine = machine.id(),
                tile = ?machine.tile(),
                error = %err,
                "machine failed to take input"
            );
            return Err(err);
        }
    }
    Ok(())
}
