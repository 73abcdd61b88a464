//! # Frame Synchronization Primitives
//!
//! The world is single-threaded, but work posted during a frame must not be
//! observed by the drain that is running in that same frame.
//!
//! ## The Solution: Double Buffering
//!
//! ```text
//! Frame N:
//!   Producers push into Buffer A
//!   Drain consumes Buffer B
//!
//! Frame N+1:
//!   SWITCH (index flip)
//!   Producers push into Buffer B
//!   Drain consumes Buffer A
//! ```
//!
//! Events posted while a drain runs land in the next cycle, never in the
//! buffer being drained.

mod switchable;

pub use switchable::SwitchableContainer;
