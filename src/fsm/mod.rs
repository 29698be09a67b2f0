//! Function-pointer finite state machine engine for one capture session.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                    │
//! │  ┌──────────────┬───────────┬──────────┬──────────────────────┐ │
//! │  │ StateId      │ on_enter  │ on_exit  │ on_update            │ │
//! │  ├──────────────┼───────────┼──────────┼──────────────────────┤ │
//! │  │ Idle         │     -     │    -     │ fn(ctx)->Result<Id>  │ │
//! │  │ PhotoCapture │ fn(ctx)   │    -     │ fn(ctx)->Result<Id>  │ │
//! │  │ VideoCapture │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Result<Id>  │ │
//! │  │ FalseAlarm   │     -     │    -     │ fn(ctx)->Result<Id>  │ │
//! │  │ Convert      │     -     │    -     │ fn(ctx)->Result<Id>  │ │
//! │  │ Thumbnail    │     -     │    -     │ fn(ctx)->Result<Id>  │ │
//! │  │ Notify       │     -     │    -     │ fn(ctx)->Result<Id>  │ │
//! │  └──────────────┴───────────┴──────────┴──────────────────────┘ │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.  If
//! it returns a different `StateId`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next, and updates the current
//! pointer.  Returning the current id stays put.  An `Err` leaves the
//! pointer where it is; the caller aborts the session and forces the
//! machine back to `Idle`, which still runs the `on_exit` of the state
//! that failed.

pub mod context;
pub mod states;

use context::SessionContext;

use crate::app::events::AppEvent;
use crate::error::SessionError;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every state of the capture controller.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Idle = 0,
    PhotoCapture = 1,
    VideoCapture = 2,
    FalseAlarm = 3,
    Convert = 4,
    Thumbnail = 5,
    Notify = 6,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 7;

    /// Convert an index back to `StateId`.  Out-of-range indices assert in
    /// debug builds and map to `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::PhotoCapture,
            2 => Self::VideoCapture,
            3 => Self::FalseAlarm,
            4 => Self::Convert,
            5 => Self::Thumbnail,
            6 => Self::Notify,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
/// These run exactly once on each state transition and cannot fail.
pub type StateActionFn = fn(&mut SessionContext<'_>);

/// Signature for the per-tick update handler.
pub type StateUpdateFn = fn(&mut SessionContext<'_>) -> Result<StateId, SessionError>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The capture state machine.  Rests in `Idle` between sessions.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Advance the machine by one tick.
    ///
    /// 1. Call `on_update` for the current state.
    /// 2. If it names another state, execute the transition:
    ///    `on_exit(current)` → update pointer → `on_enter(next)`.
    pub fn tick(&mut self, ctx: &mut SessionContext<'_>) -> Result<(), SessionError> {
        let next = (self.table[self.current].on_update)(ctx)?;
        if next as usize != self.current {
            self.transition(next, ctx);
        }
        Ok(())
    }

    /// Jump to `next` regardless of what `on_update` would return.  Used
    /// to unwind an aborted session back to `Idle`.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut SessionContext<'_>) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut SessionContext<'_>) {
        let next_idx = next_id as usize;
        let from = self.current_state();

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        ctx.emit(AppEvent::StateChanged { from, to: next_id });

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
