// Thevenin-equivalent battery model: a constant voltage source in series
// with an internal resistance, used to approximate voltage sag under load.
// Independent of the closed-loop simulator, which always assumes an ideal
// bus voltage; this feeds the motor model's power-domain queries only.

/// A DC source with an internal series resistance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatterySource {
    /// Open-circuit voltage, V.
    pub voltage: f64,
    /// Internal series resistance, Ohm.
    pub resistance: f64,
}

impl BatterySource {
    pub fn new(voltage: f64, resistance: f64) -> Self {
        BatterySource { voltage, resistance }
    }

    /// Terminal voltage and current drawn when the source delivers power
    /// `p` to its load. Returns `(terminal_voltage, current)`.
    ///
    /// Solves `P = I * (U_bat - R_bat * I)` for the smaller (physical) root:
    /// the source can't sustain a power draw exceeding `U_bat^2 / (4*R_bat)`,
    /// at which point the result is `NAN`.
    pub fn terminal_state(&self, p: f64) -> (f64, f64) {
        let discriminant = self.voltage.powi(2) - 4.0 * self.resistance * p;
        if discriminant < 0.0 {
            return (f64::NAN, f64::NAN);
        }
        let current = (self.voltage - discriminant.sqrt()) / (2.0 * self.resistance);
        (self.voltage - self.resistance * current, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_load_draws_no_current() {
        let battery = BatterySource::new(48.0, 0.05);
        let (voltage, current) = battery.terminal_state(0.0);
        assert_eq!(voltage, 48.0);
        assert_eq!(current, 0.0);
    }

    #[test]
    fn load_sags_the_terminal_voltage() {
        let battery = BatterySource::new(48.0, 0.05);
        let (voltage, current) = battery.terminal_state(500.0);
        assert!(voltage < 48.0);
        assert!(current > 0.0);
        assert!((voltage * current - 500.0).abs() < 1e-6);
    }

    #[test]
    fn exceeding_the_power_ceiling_is_infeasible() {
        let battery = BatterySource::new(48.0, 0.05);
        let ceiling = 48.0f64.powi(2) / (4.0 * 0.05);
        let (voltage, _current) = battery.terminal_state(ceiling * 1.5);
        assert!(voltage.is_nan());
    }
}
