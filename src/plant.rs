// Explicit-Euler integration of the coupled electromechanical plant: one
// mechanical DOF (inertia + viscous friction) driven by three stator phase
// currents through the motor's torque constant.

use crate::motor::Motor;
use crate::signal::Signal;
use crate::transforms::{clarke_park_forward, svpwm};

/// Five-state plant: `[theta_m, dtheta_m, i_a, i_b, i_c]`, all in the motor
/// (not articular) frame for the angle, stator frame for the currents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantState {
    pub theta_m: f64,
    pub dtheta_m: f64,
    pub iphase: [f64; 3],
}

impl PlantState {
    pub fn zero() -> Self {
        PlantState {
            theta_m: 0.0,
            dtheta_m: 0.0,
            iphase: [0.0; 3],
        }
    }
}

/// Back-EMF unit vector at electrical angle `theta_el`.
fn bemf(theta_el: f64) -> [f64; 3] {
    [
        theta_el.sin(),
        (theta_el - 2.0 * std::f64::consts::PI / 3.0).sin(),
        (theta_el + 2.0 * std::f64::consts::PI / 3.0).sin(),
    ]
}

/// Stepper for the coupled electromechanical plant. Owns the mechanical
/// parameters and the load-torque signal; the motor and the current state
/// are supplied/returned explicitly so the cascade simulator can observe
/// them between steps.
pub struct Plant<'a> {
    motor: &'a Motor,
    inertia: f64,
    friction: f64,
    dt: f64,
    load_torque: &'a Signal,
}

impl<'a> Plant<'a> {
    pub fn new(motor: &'a Motor, inertia: f64, friction: f64, dt: f64, load_torque: &'a Signal) -> Self {
        Plant {
            motor,
            inertia,
            friction,
            dt,
            load_torque,
        }
    }

    fn dynamics(&self, t: f64, state: &PlantState, vphase: [f64; 3]) -> (f64, f64, [f64; 3]) {
        let motor = self.motor;
        let theta_el = motor.np() * motor.rho() * state.theta_m;
        let idq = clarke_park_forward(theta_el, state.iphase);
        let tau = motor.kt_q_art() * idq[1] - self.load_torque.value(t);

        let ddtheta = (tau - self.friction * state.dtheta_m) / self.inertia;
        let bemf_vec = bemf(theta_el);
        let mut di = [0.0; 3];
        for k in 0..3 {
            di[k] = (-motor.r() * state.iphase[k]
                + motor.ke() * motor.rho() * state.dtheta_m * bemf_vec[k]
                + vphase[k])
                / motor.l();
        }
        (state.dtheta_m, ddtheta, di)
    }

    /// Advance `state` by one step `dt`, at simulation time `t`, applying
    /// `vdq_target` through space-vector PWM. Returns the phase voltages
    /// that were actually applied, for bookkeeping by the caller.
    pub fn step(&self, t: f64, state: &mut PlantState, vdq_target: [f64; 2]) -> [f64; 3] {
        let theta_el = self.motor.np() * self.motor.rho() * state.theta_m;
        let vphase = svpwm(theta_el, vdq_target, self.motor.u());

        let (dtheta, ddtheta, di) = self.dynamics(t, state, vphase);

        state.theta_m += self.dt * dtheta;
        state.dtheta_m += self.dt * ddtheta;
        for k in 0..3 {
            state.iphase[k] += self.dt * di[k];
        }

        vphase
    }
}
