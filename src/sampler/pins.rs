//! Output cells for every telemetry field
//!
//! Names follow `<prefix>.<group>.<field>` for scalars and
//! `<prefix>.<group>.<index>.<field>` for repeated-group entries, e.g.
//! `fgfdm.pos.longitude`, `fgfdm.engine.2.rpm`, `fgfdm.cons.0.fuel_quantity`.
//! Every entry up to the group maximum gets its cells, whatever the current count.

use crate::Result;
use crate::outputs::{OutputPin, OutputRegistry};
use crate::ring::BufferSlot;
use crate::types::{MAX_ENGINES, MAX_TANKS, MAX_WHEELS, TelemetryFrame};

type Float = OutputPin<f64>;

/// Registers `<prefix>.<group>.<field>` cells for a list of struct fields.
macro_rules! register_fields {
    ($registry:expr, $base:expr, $pins:ident { $($field:ident: $name:literal),+ $(,)? }) => {
        $pins { $($field: $registry.register(format!("{}.{}", $base, $name))?),+ }
    };
}

#[derive(Debug)]
struct PositionPins {
    longitude: Float,
    latitude: Float,
    altitude: Float,
    agl: Float,
    phi: Float,
    theta: Float,
    psi: Float,
    alpha: Float,
    beta: Float,
}

#[derive(Debug)]
struct VelocityPins {
    phidot: Float,
    thetadot: Float,
    psidot: Float,
    vcas: Float,
    climb_rate: Float,
    v_north: Float,
    v_east: Float,
    v_down: Float,
    v_body_u: Float,
    v_body_v: Float,
    v_body_w: Float,
}

#[derive(Debug)]
struct AccelerationPins {
    x_pilot: Float,
    y_pilot: Float,
    z_pilot: Float,
}

#[derive(Debug)]
struct StallPins {
    warning: Float,
    slip_deg: Float,
}

#[derive(Debug)]
struct EnginePins {
    state: OutputPin<u32>,
    rpm: Float,
    fuel_flow: Float,
    fuel_px: Float,
    egt: Float,
    cht: Float,
    mp_osi: Float,
    tit: Float,
    oil_temp: Float,
    oil_px: Float,
}

#[derive(Debug)]
struct WheelPins {
    wow: OutputPin<u32>,
    position: Float,
    steer: Float,
    compression: Float,
}

#[derive(Debug)]
struct EnvironmentPins {
    cur_time: OutputPin<u32>,
    warp: OutputPin<i32>,
    visibility: Float,
}

#[derive(Debug)]
struct ControlPins {
    elevator: Float,
    elevator_trim_tab: Float,
    left_flap: Float,
    right_flap: Float,
    left_aileron: Float,
    right_aileron: Float,
    rudder: Float,
    nose_wheel: Float,
    speedbrake: Float,
    spoilers: Float,
}

/// All sampler outputs: slot status plus one cell per telemetry field
#[derive(Debug)]
pub struct FrameOutputs {
    data_valid: OutputPin<bool>,
    timestamp: OutputPin<u32>,
    msgno: OutputPin<u32>,

    position: PositionPins,
    velocity: VelocityPins,
    acceleration: AccelerationPins,
    stall: StallPins,

    num_engines: OutputPin<u32>,
    engines: Vec<EnginePins>,
    num_tanks: OutputPin<u32>,
    fuel_quantity: Vec<Float>,
    num_wheels: OutputPin<u32>,
    wheels: Vec<WheelPins>,

    environment: EnvironmentPins,
    controls: ControlPins,
}

impl FrameOutputs {
    /// Registers every output under `prefix`.
    ///
    /// # Errors
    ///
    /// Fails on the first name the registry rejects (duplicate or malformed).
    pub fn register(registry: &mut OutputRegistry, prefix: &str) -> Result<Self> {
        let pos = format!("{prefix}.pos");
        let velo = format!("{prefix}.velo");
        let accel = format!("{prefix}.accel");
        let stall = format!("{prefix}.stall");
        let env = format!("{prefix}.env");
        let ctrl = format!("{prefix}.ctrl");

        let mut engines = Vec::with_capacity(MAX_ENGINES);
        for i in 0..MAX_ENGINES {
            let base = format!("{prefix}.engine.{i}");
            engines.push(register_fields!(registry, base, EnginePins {
                state: "eng_state",
                rpm: "rpm",
                fuel_flow: "fuel_flow",
                fuel_px: "fuel_px",
                egt: "egt",
                cht: "cht",
                mp_osi: "mp_osi",
                tit: "tit",
                oil_temp: "oil_temp",
                oil_px: "oil_px",
            }));
        }

        let mut fuel_quantity = Vec::with_capacity(MAX_TANKS);
        for i in 0..MAX_TANKS {
            fuel_quantity.push(registry.register(format!("{prefix}.cons.{i}.fuel_quantity"))?);
        }

        let mut wheels = Vec::with_capacity(MAX_WHEELS);
        for i in 0..MAX_WHEELS {
            let base = format!("{prefix}.gear.{i}");
            wheels.push(register_fields!(registry, base, WheelPins {
                wow: "wow",
                position: "gear_pos",
                steer: "gear_steer",
                compression: "gear_compression",
            }));
        }

        Ok(Self {
            data_valid: registry.register(format!("{prefix}.data-valid"))?,
            timestamp: registry.register(format!("{prefix}.timestamp"))?,
            msgno: registry.register(format!("{prefix}.msgno"))?,
            position: register_fields!(registry, pos, PositionPins {
                longitude: "longitude",
                latitude: "latitude",
                altitude: "altitude",
                agl: "agl",
                phi: "phi",
                theta: "theta",
                psi: "psi",
                alpha: "alpha",
                beta: "beta",
            }),
            velocity: register_fields!(registry, velo, VelocityPins {
                phidot: "phidot",
                thetadot: "thetadot",
                psidot: "psidot",
                vcas: "vcas",
                climb_rate: "climb_rate",
                v_north: "v_north",
                v_east: "v_east",
                v_down: "v_down",
                v_body_u: "v_body_u",
                v_body_v: "v_body_v",
                v_body_w: "v_body_w",
            }),
            acceleration: register_fields!(registry, accel, AccelerationPins {
                x_pilot: "A_X_pilot",
                y_pilot: "A_Y_pilot",
                z_pilot: "A_Z_pilot",
            }),
            stall: register_fields!(registry, stall, StallPins {
                warning: "stall_warning",
                slip_deg: "slip_deg",
            }),
            num_engines: registry.register(format!("{prefix}.engine.num_engines"))?,
            engines,
            num_tanks: registry.register(format!("{prefix}.cons.num_tanks"))?,
            fuel_quantity,
            num_wheels: registry.register(format!("{prefix}.gear.num_wheels"))?,
            wheels,
            environment: register_fields!(registry, env, EnvironmentPins {
                cur_time: "cur_time",
                warp: "warp",
                visibility: "visibility",
            }),
            controls: register_fields!(registry, ctrl, ControlPins {
                elevator: "elevator",
                elevator_trim_tab: "elevator_trim_tab",
                left_flap: "left_flap",
                right_flap: "right_flap",
                left_aileron: "left_aileron",
                right_aileron: "right_aileron",
                rudder: "rudder",
                nose_wheel: "nose_wheel",
                speedbrake: "speedbrake",
                spoilers: "spoilers",
            }),
        })
    }

    pub fn set_data_valid(&self, valid: bool) {
        self.data_valid.set(valid);
    }

    pub fn data_valid(&self) -> bool {
        self.data_valid.get()
    }

    /// Publishes the slot's delivery metadata.
    pub fn publish_status(&self, slot: &BufferSlot) {
        self.data_valid.set(slot.valid);
        self.timestamp.set(slot.timestamp);
        self.msgno.set(slot.sequence);
    }

    /// Copies every telemetry field. Group entries past the decoded count keep
    /// their previous values.
    pub fn publish_frame(&self, frame: &TelemetryFrame) {
        let (p, pos) = (&self.position, &frame.position);
        p.longitude.set(pos.longitude);
        p.latitude.set(pos.latitude);
        p.altitude.set(pos.altitude);
        p.agl.set(pos.agl.into());
        p.phi.set(pos.phi.into());
        p.theta.set(pos.theta.into());
        p.psi.set(pos.psi.into());
        p.alpha.set(pos.alpha.into());
        p.beta.set(pos.beta.into());

        let (v, velo) = (&self.velocity, &frame.velocity);
        v.phidot.set(velo.phidot.into());
        v.thetadot.set(velo.thetadot.into());
        v.psidot.set(velo.psidot.into());
        v.vcas.set(velo.vcas.into());
        v.climb_rate.set(velo.climb_rate.into());
        v.v_north.set(velo.v_north.into());
        v.v_east.set(velo.v_east.into());
        v.v_down.set(velo.v_down.into());
        v.v_body_u.set(velo.v_body_u.into());
        v.v_body_v.set(velo.v_body_v.into());
        v.v_body_w.set(velo.v_body_w.into());

        self.acceleration.x_pilot.set(frame.acceleration.x_pilot.into());
        self.acceleration.y_pilot.set(frame.acceleration.y_pilot.into());
        self.acceleration.z_pilot.set(frame.acceleration.z_pilot.into());

        self.stall.warning.set(frame.stall.warning.into());
        self.stall.slip_deg.set(frame.stall.slip_deg.into());

        self.num_engines.set(frame.num_engines);
        for (pins, engine) in self.engines.iter().zip(frame.engines()) {
            pins.state.set(engine.state);
            pins.rpm.set(engine.rpm.into());
            pins.fuel_flow.set(engine.fuel_flow.into());
            pins.fuel_px.set(engine.fuel_px.into());
            pins.egt.set(engine.egt.into());
            pins.cht.set(engine.cht.into());
            pins.mp_osi.set(engine.mp_osi.into());
            pins.tit.set(engine.tit.into());
            pins.oil_temp.set(engine.oil_temp.into());
            pins.oil_px.set(engine.oil_px.into());
        }

        self.num_tanks.set(frame.num_tanks);
        for (pin, quantity) in self.fuel_quantity.iter().zip(frame.tanks()) {
            pin.set((*quantity).into());
        }

        self.num_wheels.set(frame.num_wheels);
        for (pins, wheel) in self.wheels.iter().zip(frame.wheels()) {
            pins.wow.set(wheel.wow);
            pins.position.set(wheel.position.into());
            pins.steer.set(wheel.steer.into());
            pins.compression.set(wheel.compression.into());
        }

        let env = &frame.environment;
        self.environment.cur_time.set(env.cur_time);
        self.environment.warp.set(env.warp);
        self.environment.visibility.set(env.visibility.into());

        let (c, ctrl) = (&self.controls, &frame.controls);
        c.elevator.set(ctrl.elevator.into());
        c.elevator_trim_tab.set(ctrl.elevator_trim_tab.into());
        c.left_flap.set(ctrl.left_flap.into());
        c.right_flap.set(ctrl.right_flap.into());
        c.left_aileron.set(ctrl.left_aileron.into());
        c.right_aileron.set(ctrl.right_aileron.into());
        c.rudder.set(ctrl.rudder.into());
        c.nose_wheel.set(ctrl.nose_wheel.into());
        c.speedbrake.set(ctrl.speedbrake.into());
        c.spoilers.set(ctrl.spoilers.into());
    }
}
