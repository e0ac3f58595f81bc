//! Mechanize -- a tick-driven automation engine for farm worlds.
//!
//! This crate wires machines (crafting stations, plants, mills, shipping and
//! disposal bins) to nearby containers and moves items between them, one
//! deterministic tick at a time. It is a guest inside a host simulation: the
//! host owns time, entities, and terrain; the engine only observes entity
//! state and transfers items.
//!
//! # Tick Pipeline
//!
//! Each call to [`scheduler::Automaton::process_tick`] runs, per factory
//! group:
//!
//! 1. **Snapshot** -- Build a [`storage::Storage`] over the group's chests,
//!    capturing per-slot counts.
//! 2. **Collect** -- Every `Done` machine's output is stored; what does not
//!    fit stays on the machine (backpressure).
//! 3. **Feed** -- Every hungry machine pulls ingredients, seeing at most the
//!    pre-collect snapshot, so produced items propagate with a one-tick
//!    delay.
//!
//! Groups come from [`connectivity::build_groups`]: a 4-directional flood
//! fill over passable or occupied tiles, merged by user-assigned link names,
//! rebuilt only when topology changes.
//!
//! # Key Types
//!
//! - [`scheduler::Automaton`] -- Owns the current connectivity epoch and
//!   drives ticks.
//! - [`machine::Machine`] -- The four-state contract every machine wrapper
//!   implements.
//! - [`tracked::TrackedStack`] -- Non-owning, mutation-forwarding view over
//!   items in containers, held slots, and output queues.
//! - [`storage::Storage`] / [`pipe::Pipe`] -- Aggregate and single-container
//!   item-exchange endpoints with a take/store role split.
//! - [`recipe::RuleSet`] -- Immutable machine-rule tables (frozen at
//!   startup).
//! - [`rng::NetRandom`] -- Bit-exact .NET `System.Random` reproduction
//!   backing the disposal-bin loot draws.
//! - [`world::World`] -- The headless host-world model the engine observes.

pub mod connectivity;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod error;
pub mod id;
pub mod item;
pub mod machine;
pub mod machines;
pub mod pipe;
pub mod query;
pub mod recipe;
pub mod rng;
pub mod scheduler;
pub mod storage;
pub mod tracked;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
