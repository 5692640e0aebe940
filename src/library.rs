// Motor library loading and single-motor persistence.
//
// The on-disk schema mirrors the original project's JSON format: inductance
// is stored in mH (converted to H on load), and a nominal current absent
// from an entry falls back to that entry's peak current.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{LibraryError, MotorError};
use crate::motor::Motor;

const DEFAULT_LIBRARY_JSON: &str = include_str!("../assets/motor_library.json");

/// Wire schema for a single motor entry, shared by library documents and
/// single-motor persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MotorFields {
    np: u32,
    #[serde(rename = "R")]
    r: f64,
    /// Inductance, in **mH** on the wire.
    #[serde(rename = "L")]
    l_mh: f64,
    ke: f64,
    i_quadrature_max: f64,
    #[serde(default)]
    i_quadrature_nominal: Option<f64>,
    #[serde(rename = "U")]
    u: f64,
    reduction_ratio: f64,
}

impl MotorFields {
    fn into_motor(self) -> Result<Motor, MotorError> {
        let iq_nominal = self.i_quadrature_nominal.unwrap_or(self.i_quadrature_max);
        Motor::new(
            self.np,
            self.r,
            self.l_mh / 1000.0,
            self.ke,
            self.i_quadrature_max,
            iq_nominal,
            self.u,
            self.reduction_ratio,
        )
    }

    /// Wire-schema view of a live motor, `L` converted back to mH. Per
    /// SPEC_FULL.md's resolution of the original `to_dict`'s duplicate-`L`
    /// bug, this is the single, canonical `L` key: mH, emitted once.
    fn from_motor(motor: &Motor) -> Self {
        MotorFields {
            np: (2.0 * motor.np()).round() as u32,
            r: motor.r(),
            l_mh: motor.l() * 1000.0,
            ke: motor.ke(),
            i_quadrature_max: motor.iq_max(),
            i_quadrature_nominal: Some(motor.iq_nominal()),
            u: motor.u(),
            reduction_ratio: motor.rho(),
        }
    }
}

/// A single persisted motor: the library schema plus display metadata. The
/// `color` field is an opaque string a GUI consumer interprets (a hex code,
/// a named color, ...); this crate never parses it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorRecord {
    pub name: String,
    pub color: String,
    #[serde(flatten)]
    fields: MotorFields,
}

impl MotorRecord {
    /// Build a persistable record from a live motor plus display metadata.
    pub fn new(name: impl Into<String>, color: impl Into<String>, motor: &Motor) -> Self {
        MotorRecord {
            name: name.into(),
            color: color.into(),
            fields: MotorFields::from_motor(motor),
        }
    }

    pub fn motor(&self) -> Result<Motor, MotorError> {
        self.fields.clone().into_motor()
    }

    /// Serialize to the on-disk JSON schema (`L` in mH, written once).
    pub fn to_json_str(&self) -> Result<String, LibraryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A named collection of motors, as loaded from a JSON library document.
#[derive(Debug, Clone, Default)]
pub struct MotorLibrary {
    motors: HashMap<String, Motor>,
}

impl MotorLibrary {
    pub fn new() -> Self {
        MotorLibrary {
            motors: HashMap::new(),
        }
    }

    /// Parse a JSON library document. Entries missing a required field are
    /// skipped with a logged warning rather than failing the whole load;
    /// the document itself must be valid JSON or the load fails outright.
    pub fn from_json_str(source: &str) -> Result<Self, LibraryError> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(source)?;
        let mut motors = HashMap::with_capacity(raw.len());

        for (name, value) in raw {
            match serde_json::from_value::<MotorFields>(value).map(MotorFields::into_motor) {
                Ok(Ok(motor)) => {
                    motors.insert(name, motor);
                }
                Ok(Err(err)) => {
                    tracing::warn!(motor = %name, error = %err, "failed to load motor: invalid parameters");
                }
                Err(err) => {
                    tracing::warn!(motor = %name, error = %err, "failed to load motor: missing or malformed field");
                }
            }
        }

        Ok(MotorLibrary { motors })
    }

    pub fn get(&self, name: &str) -> Option<&Motor> {
        self.motors.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, motor: Motor) {
        self.motors.insert(name.into(), motor);
    }

    pub fn len(&self) -> usize {
        self.motors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.motors.keys().map(String::as_str)
    }

    /// Serialize the library back to the on-disk JSON schema, each motor's
    /// `L` re-emitted in mH.
    pub fn to_json_str(&self) -> Result<String, LibraryError> {
        let wire: HashMap<&str, MotorFields> = self
            .motors
            .iter()
            .map(|(name, motor)| (name.as_str(), MotorFields::from_motor(motor)))
            .collect();
        Ok(serde_json::to_string_pretty(&wire)?)
    }
}

static DEFAULT_LIBRARY: OnceLock<MotorLibrary> = OnceLock::new();

/// The bundled default motor library, parsed once on first use and cached
/// thereafter. Replaces the eager import-time global of the original
/// implementation with explicit, lazy, thread-safe construction.
pub fn default_library() -> &'static MotorLibrary {
    DEFAULT_LIBRARY.get_or_init(|| {
        MotorLibrary::from_json_str(DEFAULT_LIBRARY_JSON)
            .expect("bundled default motor library is valid JSON")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_library_loads_the_reference_actuator() {
        let lib = default_library();
        let m = lib.get("MyActuator RMD-X6 V2").expect("reference actuator present");
        assert_eq!(m.np(), 14.0);
        assert!((2.0 * m.r() - 0.33).abs() < 1e-9);
        assert!((2.0 * m.l() - 0.19e-3).abs() < 1e-9);
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let json = r#"{
            "good": {"np": 14, "R": 0.1, "L": 0.1, "ke": 0.05, "i_quadrature_max": 5.0, "U": 24.0, "reduction_ratio": 1.0},
            "missing_field": {"np": 14, "R": 0.1}
        }"#;
        let lib = MotorLibrary::from_json_str(json).unwrap();
        assert_eq!(lib.len(), 1);
        assert!(lib.get("good").is_some());
        assert!(lib.get("missing_field").is_none());
    }

    #[test]
    fn invalid_json_document_fails_to_load() {
        let err = MotorLibrary::from_json_str("not json");
        assert!(err.is_err());
    }

    #[test]
    fn a_live_motor_round_trips_through_a_record() {
        let motor = Motor::new(28, 0.165, 0.095e-3, 0.09188815, 8.0, 4.0, 24.0, 6.0).unwrap();
        let record = motor.to_record("bench motor", "#ff0000");
        let json = record.to_json_str().unwrap();

        assert_eq!(json.matches("\"L\"").count(), 1, "L must appear exactly once");

        let loaded: MotorRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.name, "bench motor");
        assert_eq!(loaded.color, "#ff0000");
        let reloaded = loaded.motor().unwrap();
        assert_eq!(reloaded.np(), motor.np());
        assert!((reloaded.l() - motor.l()).abs() < 1e-12);
        assert!((reloaded.ke() - motor.ke()).abs() < 1e-12);
    }

    #[test]
    fn a_library_round_trips_through_json() {
        let mut lib = MotorLibrary::new();
        lib.insert(
            "m1",
            Motor::new(28, 0.165, 0.095e-3, 0.09188815, 8.0, 4.0, 24.0, 6.0).unwrap(),
        );
        lib.insert(
            "m2",
            Motor::new(14, 0.17, 0.057e-3, 0.0452, 30.0, 9.0, 24.0, 9.0).unwrap(),
        );

        let json = lib.to_json_str().unwrap();
        let reloaded = MotorLibrary::from_json_str(&json).unwrap();

        assert_eq!(reloaded.len(), lib.len());
        for name in lib.names() {
            let original = lib.get(name).unwrap();
            let back = reloaded.get(name).expect("round-tripped motor present");
            assert!((back.l() - original.l()).abs() < 1e-12);
            assert!((back.ke() - original.ke()).abs() < 1e-12);
            assert_eq!(back.np(), original.np());
        }
    }

    #[test]
    fn nominal_current_defaults_to_peak_current() {
        let json = r#"{
            "m": {"np": 14, "R": 0.1, "L": 0.1, "ke": 0.05, "i_quadrature_max": 5.0, "U": 24.0, "reduction_ratio": 1.0}
        }"#;
        let lib = MotorLibrary::from_json_str(json).unwrap();
        assert_eq!(lib.get("m").unwrap().iq_nominal(), 5.0);
    }
}
