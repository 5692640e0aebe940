// Clarke-Park coordinate transforms and space-vector PWM, amplitude-invariant
// convention throughout.

use std::f64::consts::PI;

/// Clarke-Park forward transform: three-phase currents/voltages to the
/// rotor-synchronous (d, q) frame.
///
/// # Arguments
/// * `theta_el` - electrical angle, radians
/// * `phase` - `[a, b, c]` phase quantities
///
/// # Returns
/// `[d, q]` in the rotating frame.
pub fn clarke_park_forward(theta_el: f64, phase: [f64; 3]) -> [f64; 2] {
    let alpha = (2.0 / 3.0) * (phase[0] - 0.5 * phase[1] - 0.5 * phase[2]);
    let beta = (2.0 / 3.0) * (3f64.sqrt() / 2.0 * phase[1] - 3f64.sqrt() / 2.0 * phase[2]);

    let (sin_t, cos_t) = theta_el.sin_cos();
    let d = cos_t * alpha + sin_t * beta;
    let q = -sin_t * alpha + cos_t * beta;
    [d, q]
}

/// Clarke-Park inverse transform: (d, q) command to three-phase quantities.
///
/// # Arguments
/// * `theta_el` - electrical angle, radians
/// * `dq` - `[d, q]` in the rotating frame
///
/// # Returns
/// `[a, b, c]` phase quantities.
pub fn clarke_park_inverse(theta_el: f64, dq: [f64; 2]) -> [f64; 3] {
    let (sin_t, cos_t) = theta_el.sin_cos();
    let alpha = cos_t * dq[0] - sin_t * dq[1];
    let beta = sin_t * dq[0] + cos_t * dq[1];

    let a = 1.5 * (2.0 / 3.0 * alpha);
    let b = 1.5 * (-alpha / 3.0 + 3f64.sqrt() / 3.0 * beta);
    let c = 1.5 * (-alpha / 3.0 - 3f64.sqrt() / 3.0 * beta);
    [a, b, c]
}

/// Space-vector PWM: resolve a desired (d, q) voltage command into balanced
/// three-phase voltages, recentred for zero common mode.
///
/// Derived from the SimpleFOC presentation of SVPWM
/// (<https://docs.simplefoc.com/foc_theory>).
///
/// # Arguments
/// * `theta_el` - electrical angle, radians
/// * `vdq` - `[vd, vq]` target voltage, V
/// * `vdc` - DC bus voltage, V
///
/// # Returns
/// `[va, vb, vc]` phase voltages, V, summing to zero.
pub fn svpwm(theta_el: f64, vdq: [f64; 2], vdc: f64) -> [f64; 3] {
    let magnitude = (vdq[0] * vdq[0] + vdq[1] * vdq[1]).sqrt();
    let u_out = (3f64.sqrt() * magnitude / vdc).min(1.0);

    let angle = (theta_el + vdq[1].atan2(vdq[0])).rem_euclid(2.0 * PI);
    let sector = (angle / (PI / 3.0)).floor() + 1.0;

    let t1 = 3f64.sqrt() * (sector * PI / 3.0 - angle).sin() * u_out;
    let t2 = 3f64.sqrt() * (angle - (sector - 1.0) * PI / 3.0).sin() * u_out;
    let t0 = 1.0 - t1 - t2;
    let half_t0 = t0 / 2.0;

    let (ta, tb, tc) = match sector as i32 {
        1 => (t1 + t2 + half_t0, t2 + half_t0, half_t0),
        2 => (t1 + half_t0, t1 + t2 + half_t0, half_t0),
        3 => (half_t0, t1 + t2 + half_t0, t2 + half_t0),
        4 => (half_t0, t1 + half_t0, t1 + t2 + half_t0),
        5 => (t2 + half_t0, half_t0, t1 + t2 + half_t0),
        _ => (t1 + t2 + half_t0, half_t0, t1 + half_t0),
    };

    let average = (ta + tb + tc) / 3.0;
    [
        (ta - average) * vdc / 3f64.sqrt(),
        (tb - average) * vdc / 3f64.sqrt(),
        (tc - average) * vdc / 3f64.sqrt(),
    ]
}
