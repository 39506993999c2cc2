//! Core telemetry types

pub mod frame;

pub use frame::{
    Acceleration, ControlSurfaces, Engine, Environment, FG_NET_FDM_VERSION, MAX_ENGINES,
    MAX_TANKS, MAX_WHEELS, Position, Stall, TelemetryFrame, Velocity, Wheel,
};
