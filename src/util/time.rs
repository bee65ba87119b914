//! Tick timing for the host simulation

use std::time::Duration;

/// Default simulation rate
pub const SIMULATION_TPS: u32 = 60;

/// Fastest rate whose tick is still at least one microsecond
pub const MAX_TICK_RATE: u32 = 1_000_000;

/// Wall-clock length of one tick, never shorter than a microsecond
pub fn tick_duration(ticks_per_second: u32) -> Duration {
    let micros = 1_000_000 / ticks_per_second.max(1) as u64;
    Duration::from_micros(micros.max(1))
}

/// Delta time for one tick (in seconds)
pub fn tick_delta(ticks_per_second: u32) -> f32 {
    1.0 / ticks_per_second.max(1) as f32
}
