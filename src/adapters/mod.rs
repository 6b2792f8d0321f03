// Adapters layer: concrete implementations of the domain ports (storage, clock).

pub mod clock;
pub mod memory;
