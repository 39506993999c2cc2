//! Native-FDM wire layout and byte-order conversion
//!
//! The simulator sends one fixed-size record per datagram, every scalar in network
//! byte order:
//!
//! 1. **Header** (120 bytes) - version, padding word, position, velocities,
//!    accelerations and stall data
//! 2. **Engines** (164 bytes) - count followed by ten 4-entry arrays
//!    (structure-of-arrays, one array per engine field)
//! 3. **Tanks** (20 bytes) - count followed by 4 quantities
//! 4. **Wheels** (52 bytes) - count followed by four 3-entry arrays
//! 5. **Environment and controls** (52 bytes)
//!
//! Doubles travel as two big-endian 32-bit halves, high half first. They are
//! converted half by half and joined as raw bits, so an unconverted pattern is never
//! interpreted as a float.
//!
//! Group counts are read before their entries and only `count` entries are
//! converted. A count above the group maximum is rejected.

use crate::error::{DecodeError, FrameGroup};
use crate::types::{FG_NET_FDM_VERSION, MAX_ENGINES, MAX_TANKS, MAX_WHEELS, TelemetryFrame};

/// Size of one native-FDM datagram in bytes.
pub const FRAME_SIZE: usize = 408;

// Header
const VERSION: usize = 0;
const LONGITUDE: usize = 8; // offset 4 is a padding word
const LATITUDE: usize = 16;
const ALTITUDE: usize = 24;
const AGL: usize = 32;
const PHI: usize = 36;
const THETA: usize = 40;
const PSI: usize = 44;
const ALPHA: usize = 48;
const BETA: usize = 52;
const PHIDOT: usize = 56;
const THETADOT: usize = 60;
const PSIDOT: usize = 64;
const VCAS: usize = 68;
const CLIMB_RATE: usize = 72;
const V_NORTH: usize = 76;
const V_EAST: usize = 80;
const V_DOWN: usize = 84;
const V_BODY_U: usize = 88;
const V_BODY_V: usize = 92;
const V_BODY_W: usize = 96;
const A_X_PILOT: usize = 100;
const A_Y_PILOT: usize = 104;
const A_Z_PILOT: usize = 108;
const STALL_WARNING: usize = 112;
const SLIP_DEG: usize = 116;

// Engines: each field is an array of MAX_ENGINES words
const NUM_ENGINES: usize = 120;
const ENG_STATE: usize = 124;
const RPM: usize = ENG_STATE + ENGINE_ARRAY;
const FUEL_FLOW: usize = RPM + ENGINE_ARRAY;
const FUEL_PX: usize = FUEL_FLOW + ENGINE_ARRAY;
const EGT: usize = FUEL_PX + ENGINE_ARRAY;
const CHT: usize = EGT + ENGINE_ARRAY;
const MP_OSI: usize = CHT + ENGINE_ARRAY;
const TIT: usize = MP_OSI + ENGINE_ARRAY;
const OIL_TEMP: usize = TIT + ENGINE_ARRAY;
const OIL_PX: usize = OIL_TEMP + ENGINE_ARRAY;
const ENGINE_ARRAY: usize = 4 * MAX_ENGINES;

// Consumables
const NUM_TANKS: usize = OIL_PX + ENGINE_ARRAY;
const FUEL_QUANTITY: usize = NUM_TANKS + 4;

// Gear: each field is an array of MAX_WHEELS words
const NUM_WHEELS: usize = FUEL_QUANTITY + 4 * MAX_TANKS;
const WOW: usize = NUM_WHEELS + 4;
const GEAR_POS: usize = WOW + WHEEL_ARRAY;
const GEAR_STEER: usize = GEAR_POS + WHEEL_ARRAY;
const GEAR_COMPRESSION: usize = GEAR_STEER + WHEEL_ARRAY;
const WHEEL_ARRAY: usize = 4 * MAX_WHEELS;

// Environment
const CUR_TIME: usize = GEAR_COMPRESSION + WHEEL_ARRAY;
const WARP: usize = CUR_TIME + 4;
const VISIBILITY: usize = WARP + 4;

// Control surfaces
const ELEVATOR: usize = VISIBILITY + 4;
const ELEVATOR_TRIM_TAB: usize = ELEVATOR + 4;
const LEFT_FLAP: usize = ELEVATOR_TRIM_TAB + 4;
const RIGHT_FLAP: usize = LEFT_FLAP + 4;
const LEFT_AILERON: usize = RIGHT_FLAP + 4;
const RIGHT_AILERON: usize = LEFT_AILERON + 4;
const RUDDER: usize = RIGHT_AILERON + 4;
const NOSE_WHEEL: usize = RUDDER + 4;
const SPEEDBRAKE: usize = NOSE_WHEEL + 4;
const SPOILERS: usize = SPEEDBRAKE + 4;
const LAYOUT_END: usize = SPOILERS + 4;

const _: () = assert!(LAYOUT_END == FRAME_SIZE);

/// Decode one datagram into a validated host-native frame.
///
/// Fails without looking at the payload when the length is wrong, and right after
/// the first word when the version is not [`FG_NET_FDM_VERSION`].
pub fn decode(raw: &[u8]) -> Result<TelemetryFrame, DecodeError> {
    let data: &[u8; FRAME_SIZE] = raw
        .try_into()
        .map_err(|_| DecodeError::LengthMismatch { actual: raw.len(), expected: FRAME_SIZE })?;

    let version = read_u32(data, VERSION);
    if version != FG_NET_FDM_VERSION {
        return Err(DecodeError::VersionMismatch { found: version, expected: FG_NET_FDM_VERSION });
    }

    let mut frame = TelemetryFrame::default();
    convert(&mut Reader { data }, &mut frame)?;
    Ok(frame)
}

/// Encode a frame into its wire form.
///
/// Only the first `count` entries of each group are written (clamped to the group
/// maximum); the remaining entries and the padding word are zero. Counts are written
/// as given, so a frame with an oversized count encodes to a datagram that
/// [`decode`] rejects.
pub fn encode(frame: &TelemetryFrame) -> [u8; FRAME_SIZE] {
    let mut data = [0u8; FRAME_SIZE];
    let mut frame = *frame;
    // Writer::count never fails
    let _ = convert(&mut Writer { data: &mut data }, &mut frame);
    data
}

/// One direction of the conversion between wire bytes and frame fields.
trait Direction {
    fn u32(&mut self, offset: usize, value: &mut u32);
    fn i32(&mut self, offset: usize, value: &mut i32);
    fn f32(&mut self, offset: usize, value: &mut f32);
    fn f64(&mut self, offset: usize, value: &mut f64);

    /// Convert a group count and return how many entries follow it.
    fn count(
        &mut self,
        offset: usize,
        value: &mut u32,
        group: FrameGroup,
        max: usize,
    ) -> Result<usize, DecodeError>;
}

struct Reader<'a> {
    data: &'a [u8; FRAME_SIZE],
}

impl Direction for Reader<'_> {
    fn u32(&mut self, offset: usize, value: &mut u32) {
        *value = read_u32(self.data, offset);
    }

    fn i32(&mut self, offset: usize, value: &mut i32) {
        *value = read_u32(self.data, offset) as i32;
    }

    fn f32(&mut self, offset: usize, value: &mut f32) {
        *value = f32::from_bits(read_u32(self.data, offset));
    }

    fn f64(&mut self, offset: usize, value: &mut f64) {
        let high = read_u32(self.data, offset);
        let low = read_u32(self.data, offset + 4);
        *value = f64::from_bits((u64::from(high) << 32) | u64::from(low));
    }

    fn count(
        &mut self,
        offset: usize,
        value: &mut u32,
        group: FrameGroup,
        max: usize,
    ) -> Result<usize, DecodeError> {
        let count = read_u32(self.data, offset);
        match usize::try_from(count) {
            Ok(entries) if entries <= max => {
                *value = count;
                Ok(entries)
            }
            _ => Err(DecodeError::GroupOverflow { group, count, max }),
        }
    }
}

struct Writer<'a> {
    data: &'a mut [u8; FRAME_SIZE],
}

impl Direction for Writer<'_> {
    fn u32(&mut self, offset: usize, value: &mut u32) {
        write_u32(self.data, offset, *value);
    }

    fn i32(&mut self, offset: usize, value: &mut i32) {
        write_u32(self.data, offset, *value as u32);
    }

    fn f32(&mut self, offset: usize, value: &mut f32) {
        write_u32(self.data, offset, value.to_bits());
    }

    fn f64(&mut self, offset: usize, value: &mut f64) {
        let bits = value.to_bits();
        write_u32(self.data, offset, (bits >> 32) as u32);
        write_u32(self.data, offset + 4, bits as u32);
    }

    fn count(
        &mut self,
        offset: usize,
        value: &mut u32,
        _group: FrameGroup,
        max: usize,
    ) -> Result<usize, DecodeError> {
        write_u32(self.data, offset, *value);
        Ok(usize::try_from(*value).map_or(max, |count| count.min(max)))
    }
}

/// Walk every field of the frame in wire order.
fn convert<D: Direction>(wire: &mut D, frame: &mut TelemetryFrame) -> Result<(), DecodeError> {
    wire.u32(VERSION, &mut frame.version);

    let pos = &mut frame.position;
    wire.f64(LONGITUDE, &mut pos.longitude);
    wire.f64(LATITUDE, &mut pos.latitude);
    wire.f64(ALTITUDE, &mut pos.altitude);
    wire.f32(AGL, &mut pos.agl);
    wire.f32(PHI, &mut pos.phi);
    wire.f32(THETA, &mut pos.theta);
    wire.f32(PSI, &mut pos.psi);
    wire.f32(ALPHA, &mut pos.alpha);
    wire.f32(BETA, &mut pos.beta);

    let velo = &mut frame.velocity;
    wire.f32(PHIDOT, &mut velo.phidot);
    wire.f32(THETADOT, &mut velo.thetadot);
    wire.f32(PSIDOT, &mut velo.psidot);
    wire.f32(VCAS, &mut velo.vcas);
    wire.f32(CLIMB_RATE, &mut velo.climb_rate);
    wire.f32(V_NORTH, &mut velo.v_north);
    wire.f32(V_EAST, &mut velo.v_east);
    wire.f32(V_DOWN, &mut velo.v_down);
    wire.f32(V_BODY_U, &mut velo.v_body_u);
    wire.f32(V_BODY_V, &mut velo.v_body_v);
    wire.f32(V_BODY_W, &mut velo.v_body_w);

    wire.f32(A_X_PILOT, &mut frame.acceleration.x_pilot);
    wire.f32(A_Y_PILOT, &mut frame.acceleration.y_pilot);
    wire.f32(A_Z_PILOT, &mut frame.acceleration.z_pilot);

    wire.f32(STALL_WARNING, &mut frame.stall.warning);
    wire.f32(SLIP_DEG, &mut frame.stall.slip_deg);

    let engines =
        wire.count(NUM_ENGINES, &mut frame.num_engines, FrameGroup::Engines, MAX_ENGINES)?;
    for (i, engine) in frame.engine.iter_mut().enumerate().take(engines) {
        let at = 4 * i;
        wire.u32(ENG_STATE + at, &mut engine.state);
        wire.f32(RPM + at, &mut engine.rpm);
        wire.f32(FUEL_FLOW + at, &mut engine.fuel_flow);
        wire.f32(FUEL_PX + at, &mut engine.fuel_px);
        wire.f32(EGT + at, &mut engine.egt);
        wire.f32(CHT + at, &mut engine.cht);
        wire.f32(MP_OSI + at, &mut engine.mp_osi);
        wire.f32(TIT + at, &mut engine.tit);
        wire.f32(OIL_TEMP + at, &mut engine.oil_temp);
        wire.f32(OIL_PX + at, &mut engine.oil_px);
    }

    let tanks = wire.count(NUM_TANKS, &mut frame.num_tanks, FrameGroup::Tanks, MAX_TANKS)?;
    for (i, quantity) in frame.fuel_quantity.iter_mut().enumerate().take(tanks) {
        wire.f32(FUEL_QUANTITY + 4 * i, quantity);
    }

    let wheels = wire.count(NUM_WHEELS, &mut frame.num_wheels, FrameGroup::Wheels, MAX_WHEELS)?;
    for (i, wheel) in frame.wheel.iter_mut().enumerate().take(wheels) {
        let at = 4 * i;
        wire.u32(WOW + at, &mut wheel.wow);
        wire.f32(GEAR_POS + at, &mut wheel.position);
        wire.f32(GEAR_STEER + at, &mut wheel.steer);
        wire.f32(GEAR_COMPRESSION + at, &mut wheel.compression);
    }

    wire.u32(CUR_TIME, &mut frame.environment.cur_time);
    wire.i32(WARP, &mut frame.environment.warp);
    wire.f32(VISIBILITY, &mut frame.environment.visibility);

    let ctrl = &mut frame.controls;
    wire.f32(ELEVATOR, &mut ctrl.elevator);
    wire.f32(ELEVATOR_TRIM_TAB, &mut ctrl.elevator_trim_tab);
    wire.f32(LEFT_FLAP, &mut ctrl.left_flap);
    wire.f32(RIGHT_FLAP, &mut ctrl.right_flap);
    wire.f32(LEFT_AILERON, &mut ctrl.left_aileron);
    wire.f32(RIGHT_AILERON, &mut ctrl.right_aileron);
    wire.f32(RUDDER, &mut ctrl.rudder);
    wire.f32(NOSE_WHEEL, &mut ctrl.nose_wheel);
    wire.f32(SPEEDBRAKE, &mut ctrl.speedbrake);
    wire.f32(SPOILERS, &mut ctrl.spoilers);

    Ok(())
}

fn read_u32(data: &[u8; FRAME_SIZE], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[offset..offset + 4]);
    u32::from_be_bytes(word)
}

fn write_u32(data: &mut [u8; FRAME_SIZE], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{max_groups_frame, sample_frame};
    use proptest::prelude::*;

    #[test]
    fn group_offsets_match_native_layout() {
        assert_eq!(NUM_ENGINES, 120);
        assert_eq!(NUM_TANKS, 284);
        assert_eq!(NUM_WHEELS, 304);
        assert_eq!(CUR_TIME, 356);
        assert_eq!(SPOILERS, 404);
    }

    #[test]
    fn decodes_hand_built_big_endian_fields() {
        let mut raw = [0u8; FRAME_SIZE];
        raw[0..4].copy_from_slice(&24u32.to_be_bytes());
        raw[LONGITUDE..LONGITUDE + 8].copy_from_slice(&(-2.1372f64).to_be_bytes());
        raw[AGL..AGL + 4].copy_from_slice(&152.5f32.to_be_bytes());
        raw[NUM_ENGINES..NUM_ENGINES + 4].copy_from_slice(&1u32.to_be_bytes());
        raw[RPM..RPM + 4].copy_from_slice(&2350.0f32.to_be_bytes());
        raw[WARP..WARP + 4].copy_from_slice(&(-3600i32).to_be_bytes());

        let frame = decode(&raw).expect("valid frame");

        assert_eq!(frame.version, FG_NET_FDM_VERSION);
        assert_eq!(frame.position.longitude, -2.1372);
        assert_eq!(frame.position.agl, 152.5);
        assert_eq!(frame.engines().len(), 1);
        assert_eq!(frame.engines()[0].rpm, 2350.0);
        assert_eq!(frame.environment.warp, -3600);
    }

    #[test]
    fn double_halves_are_ordered_high_word_first() {
        let frame = TelemetryFrame {
            version: FG_NET_FDM_VERSION,
            position: crate::types::Position { altitude: 1.0, ..Default::default() },
            ..Default::default()
        };
        let raw = encode(&frame);

        // 1.0f64 is 0x3FF0_0000_0000_0000
        assert_eq!(&raw[ALTITUDE..ALTITUDE + 4], &[0x3F, 0xF0, 0x00, 0x00]);
        assert_eq!(&raw[ALTITUDE + 4..ALTITUDE + 8], &[0, 0, 0, 0]);
    }

    #[test]
    fn entries_beyond_count_are_not_converted() {
        let mut raw = encode(&sample_frame());
        // Only 1 of the 2 engines is announced; the second must come back zeroed.
        raw[NUM_ENGINES..NUM_ENGINES + 4].copy_from_slice(&1u32.to_be_bytes());

        let frame = decode(&raw).expect("valid frame");
        assert_eq!(frame.num_engines, 1);
        assert_eq!(frame.engine[1], Default::default());
    }

    #[test]
    fn rejects_wrong_length_before_anything_else() {
        let raw = [0u8; 10];
        assert_eq!(
            decode(&raw),
            Err(DecodeError::LengthMismatch { actual: 10, expected: FRAME_SIZE })
        );
        assert!(matches!(decode(&[]), Err(DecodeError::LengthMismatch { actual: 0, .. })));
    }

    #[test]
    fn rejects_group_count_above_maximum() {
        let frame = TelemetryFrame { num_wheels: 5, ..sample_frame() };
        assert_eq!(
            decode(&encode(&frame)),
            Err(DecodeError::GroupOverflow { group: FrameGroup::Wheels, count: 5, max: MAX_WHEELS })
        );

        let mut raw = encode(&sample_frame());
        raw[NUM_TANKS..NUM_TANKS + 4].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(matches!(
            decode(&raw),
            Err(DecodeError::GroupOverflow { group: FrameGroup::Tanks, count: u32::MAX, .. })
        ));
    }

    #[test]
    fn maximum_and_empty_groups_round_trip() {
        let full = max_groups_frame();
        assert_eq!(decode(&encode(&full)), Ok(full));

        let empty = TelemetryFrame { version: FG_NET_FDM_VERSION, ..Default::default() };
        assert_eq!(decode(&encode(&empty)), Ok(empty));
    }

    fn finite() -> impl Strategy<Value = f32> {
        -1.0e6f32..1.0e6f32
    }

    prop_compose! {
        fn arb_frame()(
            num_engines in 0u32..=MAX_ENGINES as u32,
            num_tanks in 0u32..=MAX_TANKS as u32,
            num_wheels in 0u32..=MAX_WHEELS as u32,
            longitude in -std::f64::consts::PI..std::f64::consts::PI,
            latitude in -1.6f64..1.6f64,
            altitude in -500.0f64..20_000.0f64,
            attitude in prop::array::uniform6(finite()),
            rates in prop::array::uniform11(finite()),
            engine_state in prop::array::uniform4(0u32..3),
            engine_values in prop::array::uniform4(prop::array::uniform9(finite())),
            tanks in prop::array::uniform4(finite()),
            wheels in prop::array::uniform3((0u32..2, finite(), finite(), finite())),
            cur_time in any::<u32>(),
            warp in any::<i32>(),
            controls in prop::array::uniform10(finite()),
        ) -> TelemetryFrame {
            let mut frame = TelemetryFrame {
                version: FG_NET_FDM_VERSION,
                num_engines,
                num_tanks,
                num_wheels,
                ..Default::default()
            };
            frame.position.longitude = longitude;
            frame.position.latitude = latitude;
            frame.position.altitude = altitude;
            [frame.position.agl, frame.position.phi, frame.position.theta,
             frame.position.psi, frame.position.alpha, frame.position.beta] = attitude;
            let v = &mut frame.velocity;
            [v.phidot, v.thetadot, v.psidot, v.vcas, v.climb_rate, v.v_north,
             v.v_east, v.v_down, v.v_body_u, v.v_body_v, v.v_body_w] = rates;
            for i in 0..num_engines as usize {
                let e = &mut frame.engine[i];
                e.state = engine_state[i];
                [e.rpm, e.fuel_flow, e.fuel_px, e.egt, e.cht, e.mp_osi, e.tit,
                 e.oil_temp, e.oil_px] = engine_values[i];
            }
            frame.fuel_quantity[..num_tanks as usize].copy_from_slice(&tanks[..num_tanks as usize]);
            for i in 0..num_wheels as usize {
                let (wow, position, steer, compression) = wheels[i];
                frame.wheel[i] = crate::types::Wheel { wow, position, steer, compression };
            }
            frame.environment.cur_time = cur_time;
            frame.environment.warp = warp;
            let c = &mut frame.controls;
            [c.elevator, c.elevator_trim_tab, c.left_flap, c.right_flap, c.left_aileron,
             c.right_aileron, c.rudder, c.nose_wheel, c.speedbrake, c.spoilers] = controls;
            frame
        }
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(frame in arb_frame()) {
            prop_assert_eq!(decode(&encode(&frame)), Ok(frame));
        }

        #[test]
        fn any_other_version_is_rejected(version in any::<u32>(), frame in arb_frame()) {
            prop_assume!(version != FG_NET_FDM_VERSION);
            let mut raw = encode(&frame);
            raw[0..4].copy_from_slice(&version.to_be_bytes());
            prop_assert_eq!(
                decode(&raw),
                Err(DecodeError::VersionMismatch { found: version, expected: FG_NET_FDM_VERSION })
            );
        }

        #[test]
        fn any_other_length_is_rejected(len in 0usize..1024, fill in any::<u8>()) {
            prop_assume!(len != FRAME_SIZE);
            let mut raw = vec![fill; len];
            if len >= 4 {
                raw[0..4].copy_from_slice(&FG_NET_FDM_VERSION.to_be_bytes());
            }
            prop_assert_eq!(
                decode(&raw),
                Err(DecodeError::LengthMismatch { actual: len, expected: FRAME_SIZE })
            );
        }
    }
}
