//! Session state machine for one voice query.
//!
//! Split per the reducer pattern: [`state`] holds the tagged union and
//! the input/command vocabulary, [`reducer`] is the pure transition
//! function, and [`runtime`] executes commands against the real world.

pub mod reducer;
pub mod runtime;
pub mod state;

pub use reducer::{Reducer, ReducerConfig, next_unrated_index};
pub use runtime::{RuntimeConfig, SessionHandle, SessionRuntime};
pub use state::{Command, Event, Intent, QueryResult, Rating, SessionInput, SessionState};
