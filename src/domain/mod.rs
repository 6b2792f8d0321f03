// Domain layer: scheduling models and the ports the core consumes.

pub mod model;
pub mod ports;
