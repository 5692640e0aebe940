// Cascade position/velocity/current simulator: drives the plant (§plant)
// through a classical cascade PI stack and space-vector PWM.

use crate::error::SimulationError;
use crate::motor::Motor;
use crate::pi::{PiController, VectorPi};
use crate::plant::{Plant, PlantState};
use crate::signal::Signal;
use crate::transforms::clarke_park_forward;

/// Which reference the cascade tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    Position,
    Velocity,
    Current,
}

/// Full time-indexed trajectory of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub time: Vec<f64>,
    pub motor: Motor,
    pub control_type: ControlType,

    pub theta: Vec<f64>,
    pub dtheta: Vec<f64>,
    pub pos_target: Vec<f64>,
    pub vel_target: Vec<f64>,
    pub load_torque: Vec<f64>,

    /// `[a, b, c]` per sample, indexed `iphase[phase][sample]`.
    pub iphase: [Vec<f64>; 3],
    pub vphase: [Vec<f64>; 3],
    /// `[d, q]` per sample, indexed `idq[axis][sample]`.
    pub idq: [Vec<f64>; 2],
    pub idq_target: [Vec<f64>; 2],
    pub vdq: [Vec<f64>; 2],
    pub vdq_target: [Vec<f64>; 2],

    /// The `commutation_frequency` this run was configured with. Unused by
    /// the plant (see `SimulationConfig::commutation_frequency`); kept on
    /// the result so a caller can confirm it round-tripped unchanged.
    commutation_frequency: f64,
}

impl SimulationResult {
    fn new(time: Vec<f64>, motor: Motor, control_type: ControlType, commutation_frequency: f64) -> Self {
        let n = time.len();
        SimulationResult {
            time,
            motor,
            control_type,
            theta: vec![0.0; n],
            dtheta: vec![0.0; n],
            pos_target: vec![0.0; n],
            vel_target: vec![0.0; n],
            load_torque: vec![0.0; n],
            iphase: [vec![0.0; n], vec![0.0; n], vec![0.0; n]],
            vphase: [vec![0.0; n], vec![0.0; n], vec![0.0; n]],
            idq: [vec![0.0; n], vec![0.0; n]],
            idq_target: [vec![0.0; n], vec![0.0; n]],
            vdq: [vec![0.0; n], vec![0.0; n]],
            vdq_target: [vec![0.0; n], vec![0.0; n]],
            commutation_frequency,
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// The `commutation_frequency` the run was configured with (see
    /// `SimulationConfig::commutation_frequency`).
    pub fn commutation_frequency(&self) -> f64 {
        self.commutation_frequency
    }
}

/// Gains and control-loop parameters for a [`simulate`] run.
pub struct SimulationConfig<'a> {
    pub motor: Motor,
    pub control_type: ControlType,
    pub target_signal: &'a Signal,
    pub duration: f64,
    pub system_inertia: f64,
    pub system_friction: f64,
    pub current_controller: VectorPi,
    pub velocity_controller: PiController,
    pub position_controller: PiController,
    pub control_loop_frequency: f64,
    /// Reserved for future sub-stepping of the plant between control-loop
    /// ticks; accepted but not yet used to advance the plant faster than
    /// `control_loop_frequency`.
    pub commutation_frequency: f64,
    pub current_direct_target: &'a Signal,
    pub load_torque_signal: &'a Signal,
}

impl<'a> SimulationConfig<'a> {
    pub fn new(
        motor: Motor,
        control_type: ControlType,
        target_signal: &'a Signal,
        duration: f64,
        system_inertia: f64,
        system_friction: f64,
        current_controller: VectorPi,
    ) -> Self {
        static ZERO: Signal = Signal::Constant { offset: 0.0 };
        SimulationConfig {
            motor,
            control_type,
            target_signal,
            duration,
            system_inertia,
            system_friction,
            current_controller,
            velocity_controller: PiController::new(0.0, 0.0, 0.0),
            position_controller: PiController::new(0.0, 0.0, 0.0),
            control_loop_frequency: 1000.0,
            commutation_frequency: 10_000.0,
            current_direct_target: &ZERO,
            load_torque_signal: &ZERO,
        }
    }
}

/// Simulate the motor tracking `config.target_signal` under a classical
/// cascade PI controller (position -> velocity -> current -> SVPWM -> plant).
///
/// The mechanical equation is `I * ddtheta = tau - nu * dtheta`.
pub fn simulate(mut config: SimulationConfig) -> Result<SimulationResult, SimulationError> {
    config.current_controller.reset_integral(0.0);
    config.velocity_controller.reset_integral(0.0);
    config.position_controller.reset_integral(0.0);

    let dt = 1.0 / config.control_loop_frequency;
    let steps = (config.duration / dt).ceil() as usize + 1;
    let time: Vec<f64> = (0..steps).map(|i| i as f64 * dt).collect();

    let mut result = SimulationResult::new(
        time.clone(),
        config.motor,
        config.control_type,
        config.commutation_frequency,
    );

    let t0 = 0.0;
    match config.control_type {
        ControlType::Position => {
            result.pos_target[0] = config.target_signal.value(t0);
            result.vel_target[0] = config.target_signal.derivative(t0);
        }
        ControlType::Velocity => {
            result.vel_target[0] = config.target_signal.value(t0);
        }
        ControlType::Current => {
            result.idq_target[1][0] = config.target_signal.value(t0);
        }
    }
    result.idq_target[0][0] = config.current_direct_target.value(t0);
    result.load_torque[0] = config.load_torque_signal.value(t0);

    let motor = config.motor;
    let plant = Plant::new(
        &motor,
        config.system_inertia,
        config.system_friction,
        dt,
        config.load_torque_signal,
    );
    let mut state = PlantState::zero();

    let mut current_controller = config.current_controller;
    let mut velocity_controller = config.velocity_controller;
    let mut position_controller = config.position_controller;

    for i in 1..time.len() {
        let t = result.time[i];

        let mut target_position = 0.0;
        let mut target_velocity = 0.0;
        let mut idq_target = [config.current_direct_target.value(t), 0.0];

        match config.control_type {
            ControlType::Position => {
                target_position = config.target_signal.value(t);
                target_velocity = config.target_signal.derivative(t);
                let vel_cmd = position_controller.compute(result.theta[i - 1] - target_position, dt);
                idq_target[1] = velocity_controller
                    .compute(result.dtheta[i - 1] - vel_cmd - target_velocity, dt);
            }
            ControlType::Velocity => {
                target_velocity = config.target_signal.value(t);
                idq_target[1] = velocity_controller.compute(result.dtheta[i - 1] - target_velocity, dt);
            }
            ControlType::Current => {
                idq_target[1] = config.target_signal.value(t);
            }
        }

        // Saturate, giving priority to the quadrature current.
        idq_target[1] = idq_target[1].clamp(-motor.iq_max(), motor.iq_max());
        let id_max = (motor.iq_max().powi(2) - idq_target[1].powi(2)).max(0.0).sqrt();
        idq_target[0] = idq_target[0].clamp(-id_max, id_max);

        let idq_measured = [result.idq[0][i - 1], result.idq[1][i - 1]];
        let error = [idq_measured[0] - idq_target[0], idq_measured[1] - idq_target[1]];
        let vdq_target = current_controller.compute(error, dt);

        let vphase = plant.step(t, &mut state, vdq_target);

        let theta_el = motor.np() * motor.rho() * state.theta_m;
        let idq = clarke_park_forward(theta_el, state.iphase);
        let vdq = clarke_park_forward(theta_el, vphase);

        result.theta[i] = state.theta_m;
        result.dtheta[i] = state.dtheta_m;
        for k in 0..3 {
            result.iphase[k][i] = state.iphase[k];
            result.vphase[k][i] = vphase[k];
        }
        for k in 0..2 {
            result.idq[k][i] = idq[k];
            result.vdq[k][i] = vdq[k];
            result.idq_target[k][i] = idq_target[k];
            result.vdq_target[k][i] = vdq_target[k];
        }
        result.pos_target[i] = target_position;
        result.vel_target[i] = target_velocity;
        result.load_torque[i] = config.load_torque_signal.value(t);

        let max_current = state.iphase.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if max_current > 10.0 * motor.iq_max() {
            return Err(SimulationError::Diverged {
                step: i,
                time: t,
                reason: "excessive current; adjust gains or control frequency",
            });
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_motor() -> Motor {
        let ke = 60.0 / (2.0 * std::f64::consts::PI * 3f64.sqrt() * 60.0);
        Motor::new(28, 0.165, 0.095e-3, ke, 8.0, 4.0, 24.0, 6.0).unwrap()
    }

    #[test]
    fn current_mode_tracks_a_constant_target() {
        let motor = reference_motor();
        let target = Signal::constant(1.0);
        let mut config = SimulationConfig::new(
            motor,
            ControlType::Current,
            &target,
            0.5,
            0.1,
            0.2,
            VectorPi::new(2.0, 500.0, 30.0),
        );
        config.control_loop_frequency = 20_000.0;

        let result = simulate(config).expect("simulation should not diverge");
        let last = result.len() - 1;
        assert_relative_eq!(result.idq[1][last], 1.0, epsilon = 0.05);
        assert_relative_eq!(result.idq[0][last], 0.0, epsilon = 0.05);
    }

    #[test]
    fn velocity_mode_settles_under_constant_load() {
        let motor = reference_motor();
        let target = Signal::constant(2.0);
        let load = Signal::constant(0.3);
        let mut config = SimulationConfig::new(
            motor,
            ControlType::Velocity,
            &target,
            0.3,
            0.1,
            1.0,
            VectorPi::new(2.0, 500.0, 30.0),
        );
        config.velocity_controller = PiController::new(30.0, 5.0, 10.0);
        config.control_loop_frequency = 20_000.0;
        config.load_torque_signal = &load;

        let result = simulate(config).expect("simulation should not diverge");
        let last = result.len() - 1;
        // In steady state, torque balances viscous friction: kt*iq ~= nu*dtheta.
        let kt = result.motor.kt_q_art();
        let nu = 1.0;
        assert_relative_eq!(kt * result.idq[1][last], nu * result.dtheta[last], epsilon = 0.1);
    }

    #[test]
    fn velocity_mode_tracks_a_sine_target() {
        let motor = reference_motor();
        let target = Signal::sine(2.0, 0.0, 1.0, 0.0);
        let mut config = SimulationConfig::new(
            motor,
            ControlType::Velocity,
            &target,
            0.4,
            0.1,
            1.0,
            VectorPi::new(2.0, 500.0, 30.0),
        );
        config.velocity_controller = PiController::new(30.0, 5.0, 10.0);
        let freq = 20_000.0;
        config.control_loop_frequency = freq;

        let result = simulate(config).expect("simulation should not diverge");

        for i in 0..result.len() {
            assert_relative_eq!(
                result.vel_target[i],
                target.value(result.time[i]),
                epsilon = 1e-12
            );
        }

        let settle_idx = (0.1 * freq).round() as usize;
        for i in settle_idx..result.len() {
            let expected = target.value(result.time[i]);
            assert!(
                (result.dtheta[i] - expected).abs() <= 0.05,
                "i={i} dtheta={} target={}",
                result.dtheta[i],
                expected
            );
        }
    }

    #[test]
    fn position_mode_tracks_a_sine_target() {
        let motor = reference_motor();
        let target = Signal::sine(0.2, 0.0, 1.0, 0.0);
        let mut config = SimulationConfig::new(
            motor,
            ControlType::Position,
            &target,
            0.4,
            0.1,
            1.0,
            VectorPi::new(2.0, 500.0, 30.0),
        );
        config.velocity_controller = PiController::new(100.0, 0.0, 10.0);
        config.position_controller = PiController::new(10.0, 2.0, 10.0);
        let freq = 20_000.0;
        config.control_loop_frequency = freq;

        let result = simulate(config).expect("simulation should not diverge");

        for i in 0..result.len() {
            assert_relative_eq!(
                result.pos_target[i],
                target.value(result.time[i]),
                epsilon = 1e-12
            );
            assert_relative_eq!(
                result.vel_target[i],
                target.derivative(result.time[i]),
                epsilon = 1e-12
            );
        }

        let settle_idx = (0.2 * freq).round() as usize;
        let amplitude = 1.0;
        for i in settle_idx..result.len() {
            let expected = target.value(result.time[i]);
            assert!(
                (result.theta[i] - expected).abs() / amplitude <= 1e-2,
                "i={i} theta={} target={}",
                result.theta[i],
                expected
            );
        }
    }

    #[test]
    fn motion_integration_matches_dtheta_finite_difference() {
        let motor = reference_motor();
        let target = Signal::constant(1.0);
        let mut config = SimulationConfig::new(
            motor,
            ControlType::Current,
            &target,
            0.5,
            0.1,
            0.2,
            VectorPi::new(2.0, 500.0, 30.0),
        );
        let freq = 20_000.0;
        config.control_loop_frequency = freq;

        let result = simulate(config).expect("simulation should not diverge");

        for i in 1..result.len() {
            let finite_difference = (result.theta[i] - result.theta[i - 1]) * freq;
            assert!(
                (finite_difference - result.dtheta[i]).abs() <= 1e-3,
                "i={i} fd={finite_difference} dtheta={}",
                result.dtheta[i]
            );
        }
    }

    #[test]
    fn electrical_power_balances_mechanical_output_plus_copper_losses() {
        let motor = reference_motor();
        let target = Signal::constant(1.0);
        let mut config = SimulationConfig::new(
            motor,
            ControlType::Current,
            &target,
            0.5,
            0.1,
            0.2,
            VectorPi::new(2.0, 500.0, 30.0),
        );
        let freq = 20_000.0;
        config.control_loop_frequency = freq;

        let result = simulate(config).expect("simulation should not diverge");
        let kt = result.motor.kt_q_art();
        let r = result.motor.r();

        let settle_idx = (0.1 * freq).round() as usize;
        for i in settle_idx..result.len() {
            let p_elec: f64 = (0..3).map(|k| result.iphase[k][i] * result.vphase[k][i]).sum();
            let p_mech = kt * result.dtheta[i] * result.idq[1][i];
            let p_copper = 1.5 * r * (result.idq[0][i].powi(2) + result.idq[1][i].powi(2));
            let relative_error = (p_elec - (p_mech + p_copper)).abs() / p_elec.abs().max(1e-9);
            assert!(
                relative_error <= 1e-3,
                "i={i} p_elec={p_elec} p_mech={p_mech} p_copper={p_copper}"
            );
        }
    }

    #[test]
    fn commutation_frequency_round_trips_through_the_result() {
        let motor = reference_motor();
        let target = Signal::constant(0.0);
        let mut config = SimulationConfig::new(
            motor,
            ControlType::Current,
            &target,
            0.01,
            0.1,
            0.2,
            VectorPi::new(2.0, 500.0, 30.0),
        );
        config.commutation_frequency = 12_345.0;

        let result = simulate(config).expect("simulation should not diverge");
        assert_eq!(result.commutation_frequency(), 12_345.0);
    }

    #[test]
    fn runaway_gains_trigger_the_stability_guard() {
        let motor = reference_motor();
        let target = Signal::constant(1.0);
        let config = SimulationConfig::new(
            motor,
            ControlType::Current,
            &target,
            0.1,
            0.1,
            0.2,
            VectorPi::new(1.0e6, 0.0, 1.0e9),
        );
        let result = simulate(config);
        assert!(matches!(result, Err(SimulationError::Diverged { .. })));
    }
}
