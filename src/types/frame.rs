//! Host-native telemetry frame
//!
//! The frame mirrors FlightGear's `FGNetFDM` record field for field, but groups the
//! per-engine and per-wheel arrays into entry structs. Every type here is `#[repr(C)]`
//! and `Copy` with an all-zero default, so a frame can live inside the shared ring
//! channel and a zero-filled region is a valid (empty) frame.

/// Native-FDM protocol version understood by this bridge.
pub const FG_NET_FDM_VERSION: u32 = 24;

/// Maximum number of engines carried in one frame.
pub const MAX_ENGINES: usize = 4;

/// Maximum number of fuel tanks carried in one frame.
pub const MAX_TANKS: usize = 4;

/// Maximum number of landing-gear wheels carried in one frame.
pub const MAX_WHEELS: usize = 3;

/// Geodetic position and attitude
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub longitude: f64, // radians
    pub latitude: f64,  // radians
    pub altitude: f64,  // meters above sea level
    pub agl: f32,       // meters above ground level
    pub phi: f32,       // roll (radians)
    pub theta: f32,     // pitch (radians)
    pub psi: f32,       // true heading (radians)
    pub alpha: f32,     // angle of attack (radians)
    pub beta: f32,      // side slip (radians)
}

/// Angular rates and linear velocities
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub phidot: f32,   // roll rate (radians/sec)
    pub thetadot: f32, // pitch rate (radians/sec)
    pub psidot: f32,   // yaw rate (radians/sec)
    pub vcas: f32,     // calibrated airspeed
    pub climb_rate: f32,
    pub v_north: f32,
    pub v_east: f32,
    pub v_down: f32,
    pub v_body_u: f32,
    pub v_body_v: f32,
    pub v_body_w: f32,
}

/// Pilot-station accelerations in the body frame
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Acceleration {
    pub x_pilot: f32,
    pub y_pilot: f32,
    pub z_pilot: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stall {
    /// 0.0 - 1.0 amount of stall
    pub warning: f32,
    /// Slip ball deflection
    pub slip_deg: f32,
}

/// One engine entry of the engines group
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Engine {
    /// Off, cranking, running
    pub state: u32,
    pub rpm: f32,
    pub fuel_flow: f32,
    pub fuel_px: f32,
    pub egt: f32,
    pub cht: f32,
    pub mp_osi: f32,
    pub tit: f32,
    pub oil_temp: f32,
    pub oil_px: f32,
}

/// One wheel entry of the landing-gear group
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Wheel {
    /// Weight on wheel
    pub wow: u32,
    pub position: f32,
    pub steer: f32,
    pub compression: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Environment {
    /// Unix time in seconds
    pub cur_time: u32,
    /// Offset in seconds to unix time
    pub warp: i32,
    /// Visibility in meters
    pub visibility: f32,
}

/// Normalized control surface positions
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlSurfaces {
    pub elevator: f32,
    pub elevator_trim_tab: f32,
    pub left_flap: f32,
    pub right_flap: f32,
    pub left_aileron: f32,
    pub right_aileron: f32,
    pub rudder: f32,
    pub nose_wheel: f32,
    pub speedbrake: f32,
    pub spoilers: f32,
}

/// One decoded telemetry snapshot.
///
/// Repeated groups are fixed-capacity arrays with a separate count. Entries at or
/// beyond the count were never decoded and hold no meaningful data; use
/// [`engines`](Self::engines), [`tanks`](Self::tanks) and [`wheels`](Self::wheels)
/// to get only the populated entries.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryFrame {
    pub version: u32,
    pub position: Position,
    pub velocity: Velocity,
    pub acceleration: Acceleration,
    pub stall: Stall,

    pub num_engines: u32,
    pub engine: [Engine; MAX_ENGINES],

    pub num_tanks: u32,
    pub fuel_quantity: [f32; MAX_TANKS],

    pub num_wheels: u32,
    pub wheel: [Wheel; MAX_WHEELS],

    pub environment: Environment,
    pub controls: ControlSurfaces,
}

impl TelemetryFrame {
    /// Populated engine entries.
    pub fn engines(&self) -> &[Engine] {
        &self.engine[..bounded(self.num_engines, MAX_ENGINES)]
    }

    /// Populated fuel tank quantities.
    pub fn tanks(&self) -> &[f32] {
        &self.fuel_quantity[..bounded(self.num_tanks, MAX_TANKS)]
    }

    /// Populated wheel entries.
    pub fn wheels(&self) -> &[Wheel] {
        &self.wheel[..bounded(self.num_wheels, MAX_WHEELS)]
    }
}

fn bounded(count: u32, max: usize) -> usize {
    usize::try_from(count).map_or(max, |count| count.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_has_empty_groups() {
        let frame = TelemetryFrame::default();
        assert!(frame.engines().is_empty());
        assert!(frame.tanks().is_empty());
        assert!(frame.wheels().is_empty());
    }

    #[test]
    fn group_accessors_follow_counts() {
        let mut frame = TelemetryFrame { num_engines: 2, num_tanks: 4, ..Default::default() };
        frame.engine[1].rpm = 2400.0;
        frame.engine[2].rpm = 9999.0;

        assert_eq!(frame.engines().len(), 2);
        assert_eq!(frame.engines()[1].rpm, 2400.0);
        assert_eq!(frame.tanks().len(), MAX_TANKS);
    }

    #[test]
    fn oversized_counts_are_clamped() {
        let frame = TelemetryFrame { num_wheels: 200, ..Default::default() };
        assert_eq!(frame.wheels().len(), MAX_WHEELS);
    }
}
