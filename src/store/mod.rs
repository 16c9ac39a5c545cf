//! Storage handlers for the bus.

pub mod fixture;
pub mod memory;

pub use fixture::{Fixture, FixtureChannel};
pub use memory::{generate_short_uid, MemoryStore};
