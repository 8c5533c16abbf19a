//! Mock implementations of the decoder's collaborators.
//!
//! [`MockEdgeSource`] simulates a Wiegand interface driven by a handle, and
//! [`ManualTimer`] records timer calls so tests can fire ticks themselves.

mod edges;
mod timer;

pub use edges::{MockEdgeHandle, MockEdgeSource};
pub use timer::ManualTimer;
