// PMSM motor physics engine and closed-loop simulator.
//
// The motor model (`motor`) derives the electromechanical operating
// envelope from a handful of fundamental parameters; the simulator
// (`simulate`, built on `signal`, `pi`, `transforms`, and `plant`) steps a
// cascade-controlled motor through a discrete-time electrical/mechanical
// ODE. `library` and `battery` round out the surface a desktop application
// needs: loading/saving motors and modelling the voltage source feeding
// them.

pub mod battery;
pub mod error;
pub mod library;
pub mod motor;
pub mod pi;
pub mod plant;
pub mod signal;
pub mod simulate;
pub mod transforms;

pub use battery::BatterySource;
pub use error::{LibraryError, MotorError, SimulationError};
pub use library::{MotorLibrary, MotorRecord};
pub use motor::{Motor, MotorUpdate};
pub use pi::{PiController, VectorPi};
pub use signal::Signal;
pub use simulate::{simulate, ControlType, SimulationConfig, SimulationResult};
