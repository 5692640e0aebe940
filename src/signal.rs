// Time-parametrised reference signals fed to the cascade simulator.
//
// Implemented as a tagged enum rather than a `dyn Trait` object: there are
// exactly four shapes, they're Copy, and the simulator calls `value`/
// `derivative` in the hottest loop in the crate.

use std::f64::consts::PI;

/// A scalar signal of time, with an analytically exact derivative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// A fixed value, independent of time.
    Constant { offset: f64 },
    /// `offset + amplitude * sin(2*pi*frequency*t + phase)`.
    Sine {
        frequency: f64,
        phase: f64,
        amplitude: f64,
        offset: f64,
    },
    /// A two-level square wave alternating between `offset` and `offset + amplitude`.
    Square {
        frequency: f64,
        phase: f64,
        amplitude: f64,
        offset: f64,
    },
    /// A triangle wave ranging over `[offset, offset + amplitude]`.
    Triangle {
        frequency: f64,
        phase: f64,
        amplitude: f64,
        offset: f64,
    },
}

impl Signal {
    pub fn constant(offset: f64) -> Self {
        Signal::Constant { offset }
    }

    pub fn sine(frequency: f64, phase: f64, amplitude: f64, offset: f64) -> Self {
        Signal::Sine {
            frequency,
            phase,
            amplitude,
            offset,
        }
    }

    pub fn square(frequency: f64, phase: f64, amplitude: f64, offset: f64) -> Self {
        Signal::Square {
            frequency,
            phase,
            amplitude,
            offset,
        }
    }

    pub fn triangle(frequency: f64, phase: f64, amplitude: f64, offset: f64) -> Self {
        Signal::Triangle {
            frequency,
            phase,
            amplitude,
            offset,
        }
    }

    /// Signal value at time `t`, seconds.
    pub fn value(&self, t: f64) -> f64 {
        match *self {
            Signal::Constant { offset } => offset,
            Signal::Sine {
                frequency,
                phase,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * PI * frequency * t + phase).sin(),
            Signal::Square {
                frequency,
                phase,
                amplitude,
                offset,
            } => {
                let s = (2.0 * PI * frequency * t + phase).sin();
                offset + amplitude * (s.signum() / 2.0 + 0.5)
            }
            Signal::Triangle {
                frequency,
                phase,
                amplitude,
                offset,
            } => {
                let x = frequency * t + phase / (2.0 * PI);
                offset + amplitude * 2.0 * (x - round_half_down(x)).abs()
            }
        }
    }

    /// Time derivative of the signal at time `t`, seconds. Defined almost
    /// everywhere; at the discontinuities of `Square` and `Triangle` it
    /// returns the one-sided value approached from below.
    pub fn derivative(&self, t: f64) -> f64 {
        match *self {
            Signal::Constant { .. } => 0.0,
            Signal::Sine {
                frequency,
                phase,
                amplitude,
                ..
            } => {
                let w = 2.0 * PI * frequency;
                amplitude * w * (w * t + phase).cos()
            }
            Signal::Square { .. } => 0.0,
            Signal::Triangle {
                frequency,
                phase,
                amplitude,
                ..
            } => Signal::Square {
                frequency,
                phase,
                amplitude: 4.0 * amplitude,
                offset: -2.0 * amplitude,
            }
            .value(t),
        }
    }
}

/// `floor(x + 0.5)`, the "round half down" convention used to fold the
/// triangle wave's phase into a single period without a branch.
fn round_half_down(x: f64) -> f64 {
    (x + 0.5).floor()
}
