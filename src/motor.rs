// PMSM motor model: fundamental parameters, derived constants, and the
// torque/speed/thermal envelope queries built on top of them.

use crate::error::MotorError;

/// A permanent-magnet synchronous motor, described by its fundamental
/// electromechanical parameters plus a reduction ratio to the articular
/// (output-shaft) frame.
///
/// Magnetic saturation is not modelled, and saliency is assumed to be 1
/// (`Lq = Ld`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motor {
    /// Pole pairs (`n / 2`).
    np: f64,
    /// Per-phase resistance, star equivalent, Ohm.
    r: f64,
    /// Per-phase inductance, star equivalent, H.
    l: f64,
    /// Back-EMF constant of one phase, V*s/rad (electrical).
    ke: f64,
    /// Peak quadrature current, A.
    iq_max: f64,
    /// Continuous quadrature current, A.
    iq_nominal: f64,
    /// DC bus voltage, V.
    u: f64,
    /// Mechanical reduction ratio (motor / articular).
    rho: f64,

    kt_q_art: f64,
    i_rms_max: f64,
    tau_max: f64,
    ke_phasetophase: f64,
    w_max_no_load: f64,
    w_max_at_max_torque: f64,
    k_m_art: f64,
    r_deflux: f64,
    nominal_power: f64,
}

/// A partial update to a [`Motor`]'s fundamental parameters. Fields left as
/// `None` keep their current value. This is the only way to mutate a
/// `Motor` after construction: every field that changes, changes through
/// here, so the derived constants can never go stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotorUpdate {
    pub n: Option<u32>,
    pub r: Option<f64>,
    pub l: Option<f64>,
    pub ke: Option<f64>,
    pub iq_max: Option<f64>,
    pub iq_nominal: Option<f64>,
    pub u: Option<f64>,
    pub rho: Option<f64>,
}

impl Motor {
    /// Construct a motor from its fundamental parameters.
    ///
    /// # Arguments
    /// * `n` - number of poles (even, >= 2)
    /// * `r` - per-phase resistance, Ohm
    /// * `l` - per-phase inductance, H
    /// * `ke` - back-EMF constant of one phase, V*s/rad
    /// * `iq_max` - peak quadrature current, A
    /// * `iq_nominal` - continuous quadrature current, A (<= iq_max)
    /// * `u` - DC bus voltage, V
    /// * `rho` - mechanical reduction ratio
    ///
    /// # Returns
    /// A motor with every derived constant already computed, or a
    /// [`MotorError::InvalidParameter`] if a fundamental is out of range.
    pub fn new(
        n: u32,
        r: f64,
        l: f64,
        ke: f64,
        iq_max: f64,
        iq_nominal: f64,
        u: f64,
        rho: f64,
    ) -> Result<Self, MotorError> {
        let mut motor = Motor {
            np: 0.0,
            r: 0.0,
            l: 0.0,
            ke: 0.0,
            iq_max: 0.0,
            iq_nominal: 0.0,
            u: 0.0,
            rho: 0.0,
            kt_q_art: 0.0,
            i_rms_max: 0.0,
            tau_max: 0.0,
            ke_phasetophase: 0.0,
            w_max_no_load: 0.0,
            w_max_at_max_torque: 0.0,
            k_m_art: 0.0,
            r_deflux: 0.0,
            nominal_power: 0.0,
        };
        motor.update_constants(MotorUpdate {
            n: Some(n),
            r: Some(r),
            l: Some(l),
            ke: Some(ke),
            iq_max: Some(iq_max),
            iq_nominal: Some(iq_nominal),
            u: Some(u),
            rho: Some(rho),
        })?;
        Ok(motor)
    }

    /// Apply a partial update to the motor's fundamental parameters and
    /// recompute every derived constant. Rejected (with the motor left
    /// unchanged) if the resulting parameter set would be invalid.
    pub fn update_constants(&mut self, update: MotorUpdate) -> Result<(), MotorError> {
        let mut next = *self;

        if let Some(n) = update.n {
            if n < 2 || n % 2 != 0 {
                return Err(MotorError::InvalidParameter {
                    field: "n",
                    reason: "number of poles must be even and at least 2",
                });
            }
            next.np = n as f64 / 2.0;
        }
        if let Some(r) = update.r {
            if !(r > 0.0) {
                return Err(MotorError::InvalidParameter {
                    field: "r",
                    reason: "resistance must be positive",
                });
            }
            next.r = r;
        }
        if let Some(l) = update.l {
            if !(l > 0.0) {
                return Err(MotorError::InvalidParameter {
                    field: "l",
                    reason: "inductance must be positive",
                });
            }
            next.l = l;
        }
        if let Some(ke) = update.ke {
            if !(ke > 0.0) {
                return Err(MotorError::InvalidParameter {
                    field: "ke",
                    reason: "back-EMF constant must be positive",
                });
            }
            next.ke = ke;
        }
        if let Some(iq_max) = update.iq_max {
            if !(iq_max > 0.0) {
                return Err(MotorError::InvalidParameter {
                    field: "iq_max",
                    reason: "peak quadrature current must be positive",
                });
            }
            next.iq_max = iq_max;
        }
        if let Some(iq_nominal) = update.iq_nominal {
            next.iq_nominal = iq_nominal;
        }
        if let Some(u) = update.u {
            if !(u > 0.0) {
                return Err(MotorError::InvalidParameter {
                    field: "u",
                    reason: "bus voltage must be positive",
                });
            }
            next.u = u;
        }
        if let Some(rho) = update.rho {
            if !(rho > 0.0) {
                return Err(MotorError::InvalidParameter {
                    field: "rho",
                    reason: "reduction ratio must be positive",
                });
            }
            next.rho = rho;
        }

        if !(next.iq_nominal > 0.0 && next.iq_nominal <= next.iq_max) {
            return Err(MotorError::InvalidParameter {
                field: "iq_nominal",
                reason: "nominal current must be in (0, iq_max]",
            });
        }

        next.compute_derived_constants();
        *self = next;
        Ok(())
    }

    fn compute_derived_constants(&mut self) {
        self.kt_q_art = 1.5 * self.rho * self.ke;
        self.i_rms_max = self.iq_max / std::f64::consts::SQRT_2;
        self.tau_max = self.kt_q_art * self.iq_max;

        self.ke_phasetophase = 3f64.sqrt() * self.ke;
        self.w_max_no_load = self.u / self.ke_phasetophase / self.rho;
        self.w_max_at_max_torque = self.compute_max_speed_no_deflux(self.tau_max);

        self.k_m_art = (2.0 / 3.0f64).sqrt() * self.kt_q_art / self.r.sqrt();

        self.r_deflux = self.np * self.l * self.iq_max / self.ke;
        let tau_n = self.kt_q_art * self.iq_nominal;
        self.nominal_power = self.compute_max_speed_no_deflux(tau_n) * tau_n;
    }

    /// Maximum articular speed reachable at the given articular torque with
    /// no field weakening (`id = 0`). Returns `NAN` for an infeasible point.
    pub fn compute_max_speed_no_deflux(&self, tau: f64) -> f64 {
        let iq = tau / self.kt_q_art;

        let a = self.rho.powi(2) * ((self.np * self.l * iq).powi(2) + self.ke.powi(2));
        let b = 2.0 * self.rho * self.r * self.ke * iq;
        let c = (self.r * iq).powi(2) - self.u.powi(2) / 3.0;

        larger_root(a, b, c)
    }

    /// Minimum (most negative) direct-axis current needed to satisfy the
    /// voltage envelope at the operating point `(tau, w)`. Clamped at zero
    /// from above: defluxing current is never positive.
    pub fn compute_defluxing_current(&self, tau: f64, w: f64) -> f64 {
        let iq = tau / self.kt_q_art;

        let a = self.r.powi(2) + (self.rho * w * self.np * self.l).powi(2);
        let b = 2.0 * self.np * self.l * self.ke * (self.rho * w).powi(2);
        let c = (self.rho * w * self.np * self.l * iq).powi(2)
            + 2.0 * self.r * iq * self.ke * self.rho * w
            + (self.r * iq).powi(2)
            + (self.ke * self.rho * w).powi(2)
            - self.u.powi(2) / 3.0;

        larger_root(a, b, c).min(0.0)
    }

    /// Maximum articular speed reachable at the given articular torque with
    /// field weakening enabled. Never below [`Motor::compute_max_speed_no_deflux`].
    pub fn compute_max_speed_deflux(&self, tau: f64) -> f64 {
        let iq = tau / self.kt_q_art;
        let id = (-(2.0 * self.i_rms_max.powi(2) - iq.powi(2)).max(0.0).sqrt())
            .max(-self.ke / self.np / self.l);

        let a = (self.rho * self.np * self.l * iq).powi(2)
            + self.rho.powi(2) * (self.np * self.l * id + self.ke).powi(2);
        let b = 2.0 * self.rho * self.r * iq * self.ke;
        let c = self.r.powi(2) * (id.powi(2) + iq.powi(2)) - self.u.powi(2) / 3.0;

        larger_root(a, b, c).max(self.compute_max_speed_no_deflux(tau))
    }

    /// Copper losses (`1.5 * R * (id^2 + iq^2)`) at the operating point
    /// `(tau, w)`. The motor will deflux as needed unless `force_no_defluxing`
    /// is set. Does not validate feasibility: an infinite torque request
    /// yields infinite power.
    pub fn compute_thermal_power(&self, tau: f64, w: f64, force_no_defluxing: bool) -> f64 {
        let iq = tau / self.kt_q_art;
        let id = if force_no_defluxing {
            0.0
        } else {
            self.compute_defluxing_current(tau, w)
        };
        1.5 * self.r * (id.powi(2) + iq.powi(2))
    }

    /// Total power (mechanical + thermal) required to sustain `(w, tau)`,
    /// assuming no defluxing.
    pub fn get_power(&self, w: f64, tau: f64) -> f64 {
        w * tau + tau.powi(2) / self.k_m_art.powi(2)
    }

    pub fn np(&self) -> f64 {
        self.np
    }
    pub fn r(&self) -> f64 {
        self.r
    }
    pub fn l(&self) -> f64 {
        self.l
    }
    pub fn ke(&self) -> f64 {
        self.ke
    }
    pub fn iq_max(&self) -> f64 {
        self.iq_max
    }
    pub fn iq_nominal(&self) -> f64 {
        self.iq_nominal
    }
    pub fn u(&self) -> f64 {
        self.u
    }
    pub fn rho(&self) -> f64 {
        self.rho
    }
    pub fn kt_q_art(&self) -> f64 {
        self.kt_q_art
    }
    pub fn i_rms_max(&self) -> f64 {
        self.i_rms_max
    }
    pub fn tau_max(&self) -> f64 {
        self.tau_max
    }
    pub fn ke_phasetophase(&self) -> f64 {
        self.ke_phasetophase
    }
    pub fn w_max_no_load(&self) -> f64 {
        self.w_max_no_load
    }
    pub fn w_max_at_max_torque(&self) -> f64 {
        self.w_max_at_max_torque
    }
    pub fn k_m_art(&self) -> f64 {
        self.k_m_art
    }
    pub fn r_deflux(&self) -> f64 {
        self.r_deflux
    }
    pub fn nominal_power(&self) -> f64 {
        self.nominal_power
    }

    /// Snapshot this motor into a persistable [`crate::library::MotorRecord`]
    /// under the given display `name`/`color`.
    pub fn to_record(
        &self,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> crate::library::MotorRecord {
        crate::library::MotorRecord::new(name, color, self)
    }
}

/// Larger real root of `a*x^2 + b*x + c = 0`, or `NAN` if the discriminant
/// is negative (the operating point is infeasible).
fn larger_root(a: f64, b: f64, c: f64) -> f64 {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return f64::NAN;
    }
    (-b + discriminant.sqrt()) / (2.0 * a)
}

/// Scalar-to-slice broadcasting adapters, mirroring the array-broadcast
/// convenience of the envelope queries without baking it into the scalar
/// contract.
pub mod broadcast {
    use super::Motor;

    pub fn max_speed_no_deflux_many(motor: &Motor, taus: &[f64], out: &mut [f64]) {
        for (tau, w) in taus.iter().zip(out.iter_mut()) {
            *w = motor.compute_max_speed_no_deflux(*tau);
        }
    }

    pub fn max_speed_deflux_many(motor: &Motor, taus: &[f64], out: &mut [f64]) {
        for (tau, w) in taus.iter().zip(out.iter_mut()) {
            *w = motor.compute_max_speed_deflux(*tau);
        }
    }
}
