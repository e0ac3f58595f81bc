//! The machine contract shared by every automatable entity.
//!
//! A machine wrapper is a short-lived adapter over a world entity; it holds
//! no state of its own and re-derives [`MachineState`] from the entity on
//! every call. Wrappers are constructed per tick by the scheduler (see
//! `machines::for_entity`) and discarded afterwards.

use crate::error::EngineError;
use crate::id::Tile;
use crate::storage::Storage;
use crate::tracked::TrackedStack;

/// The four externally visible machine states.
///
/// Transitions are driven by the entity's own timers and by the scheduler
/// draining output / feeding input; the wrapper never caches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MachineState {
    /// Switched off or otherwise unable to participate this tick.
    Disabled,
    /// Idle and ready for input.
    Empty,
    /// Working; a timer is counting down.
    Processing,
    /// Finished output is waiting for collection.
    Done,
}

pub trait Machine {
    /// Stable machine-kind identifier, used for rule lookup and log context.
    fn id(&self) -> &str;

    fn tile(&self) -> Tile;

    fn state(&self) -> MachineState;

    /// A live view of the finished output, or `None` unless [`Done`].
    ///
    /// Fully draining the view resets the entity and applies its
    /// post-collection effects (regrowth, auto-restart, stat bumps). A
    /// partially drained view leaves the machine `Done`; the scheduler
    /// retries next tick.
    ///
    /// [`Done`]: MachineState::Done
    fn output(&mut self) -> Option<TrackedStack>;

    /// Try to pull ingredients from `storage` and begin processing.
    ///
    /// Returns `Ok(true)` when something was consumed. A plain `Ok(false)`
    /// means no suitable ingredients were available, which is not an error.
    /// Consumption is all-or-nothing per attempt unless the variant
    /// documents otherwise.
    fn set_input(&mut self, storage: &Storage) -> Result<bool, EngineError>;
}
