//! Arc fade animation.
//!
//! Opacity pulses from 0.3 up to 1.0 at mid-life and back down to 0.3:
//!
//! ```text
//! opacity(t) = sin(min(t / D, 1) · π) · 0.7 + 0.3
//! ```

use std::time::Duration;

/// Lifetime of every arc.
pub const ARC_DURATION: Duration = Duration::from_millis(2000);

/// Opacity floor at birth and death.
pub const MIN_OPACITY: f32 = 0.3;

/// Amplitude added at the pulse peak.
pub const PULSE_AMPLITUDE: f32 = 0.7;

/// Fraction of `duration` that has elapsed, clamped to `[0, 1]`.
pub fn progress(elapsed: Duration, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
}

/// Opacity after `elapsed` of an arc living for `duration`.
pub fn opacity(elapsed: Duration, duration: Duration) -> f32 {
    let p = progress(elapsed, duration);
    (p * std::f64::consts::PI).sin() as f32 * PULSE_AMPLITUDE + MIN_OPACITY
}

/// Whether an arc of `duration` is done after `elapsed`.
pub fn expired(elapsed: Duration, duration: Duration) -> bool {
    elapsed >= duration
}
