//! Test utilities: frame fixtures, scripted datagram sources and unique region names
//!
//! Shared by unit tests and the criterion benches (`benchmark` feature).

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use crate::provider::DatagramSource;
use crate::types::{
    Acceleration, ControlSurfaces, Engine, Environment, FG_NET_FDM_VERSION, MAX_ENGINES,
    MAX_TANKS, MAX_WHEELS, Position, Stall, TelemetryFrame, Velocity, Wheel,
};

/// A light twin in cruise: two running engines, two tanks, gear retracted.
pub fn sample_frame() -> TelemetryFrame {
    let mut frame = TelemetryFrame {
        version: FG_NET_FDM_VERSION,
        position: Position {
            longitude: -2.137_204_5,
            latitude: 0.654_321_9,
            altitude: 1524.0,
            agl: 1212.5,
            phi: 0.02,
            theta: 0.05,
            psi: 1.57,
            alpha: 0.04,
            beta: -0.001,
        },
        velocity: Velocity {
            phidot: 0.001,
            thetadot: -0.002,
            psidot: 0.0,
            vcas: 142.0,
            climb_rate: 1.5,
            v_north: 0.4,
            v_east: 240.1,
            v_down: -1.5,
            v_body_u: 240.0,
            v_body_v: 0.3,
            v_body_w: 9.6,
        },
        acceleration: Acceleration { x_pilot: 0.1, y_pilot: 0.0, z_pilot: -32.2 },
        stall: Stall { warning: 0.0, slip_deg: 0.25 },
        num_engines: 2,
        num_tanks: 2,
        num_wheels: 3,
        environment: Environment { cur_time: 1_700_000_000, warp: 0, visibility: 16_093.0 },
        controls: ControlSurfaces { elevator: -0.05, elevator_trim_tab: 0.1, ..Default::default() },
        ..Default::default()
    };

    for (i, engine) in frame.engine.iter_mut().take(2).enumerate() {
        let side = i as f32;
        *engine = Engine {
            state: 2,
            rpm: 2400.0 + 25.0 * side,
            fuel_flow: 9.2,
            fuel_px: 28.0,
            egt: 1350.0 + side,
            cht: 380.0,
            mp_osi: 24.0,
            tit: 0.0,
            oil_temp: 185.0,
            oil_px: 72.0 - side,
        };
    }
    frame.fuel_quantity[..2].copy_from_slice(&[38.5, 37.75]);
    for wheel in &mut frame.wheel {
        *wheel = Wheel { wow: 0, position: 0.0, steer: 0.0, compression: 0.0 };
    }
    frame
}

/// Every group filled to its maximum with distinct values.
pub fn max_groups_frame() -> TelemetryFrame {
    let mut frame = TelemetryFrame {
        num_engines: MAX_ENGINES as u32,
        num_tanks: MAX_TANKS as u32,
        num_wheels: MAX_WHEELS as u32,
        ..sample_frame()
    };
    for (i, engine) in frame.engine.iter_mut().enumerate() {
        let n = i as f32 + 1.0;
        *engine = Engine { state: 2, rpm: 2000.0 * n, egt: 1300.0 + n, oil_px: 70.0 - n, ..Default::default() };
    }
    for (i, quantity) in frame.fuel_quantity.iter_mut().enumerate() {
        *quantity = 10.0 * (i as f32 + 1.0);
    }
    for (i, wheel) in frame.wheel.iter_mut().enumerate() {
        let n = i as f32 + 1.0;
        *wheel = Wheel { wow: 1, position: 1.0, steer: 0.1 * n, compression: 0.05 * n };
    }
    frame.environment.warp = -7200;
    frame
}

/// A shared memory name unique to this process and call.
pub fn unique_region_name(tag: &str) -> String {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("/fgfdm-test-{}-{tag}-{n}", std::process::id())
}

/// One scripted receive result
#[derive(Debug, Clone)]
pub enum Step {
    Datagram(Vec<u8>),
    /// Wait before the next step.
    Silence(Duration),
    Fail(io::ErrorKind),
}

/// Datagram source replaying a fixed script, then waiting forever.
///
/// A silence keeps its deadline across cancelled receives, so a receive timeout
/// shorter than the silence does not cut it short.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    silent_until: Option<Instant>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self { steps: steps.into_iter().collect(), silent_until: None }
    }
}

#[async_trait::async_trait]
impl DatagramSource for ScriptedSource {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if let Some(deadline) = self.silent_until {
                tokio::time::sleep_until(deadline).await;
                self.silent_until = None;
            }

            match self.steps.pop_front() {
                Some(Step::Datagram(bytes)) => {
                    let len = bytes.len().min(buf.len());
                    buf[..len].copy_from_slice(&bytes[..len]);
                    return Ok(len);
                }
                Some(Step::Silence(duration)) => self.silent_until = Some(Instant::now() + duration),
                Some(Step::Fail(kind)) => return Err(kind.into()),
                None => std::future::pending::<()>().await,
            }
        }
    }
}
