//! # Piecewise quadrotor flight dynamics
//!
//! Integrates the 12-state rigid-body model of a quadrotor (position, velocity,
//! Euler attitude, body rates) across a sequence of flight segments, each with
//! a constant collective thrust and commanded angular acceleration.
//!
//! ```no_run
//! use nalgebra::Vector3;
//! use quadsim::{ConfigOverrides, FlightSegment, Quadcopter};
//!
//! let mut quad = Quadcopter::new(true, &ConfigOverrides::default())?;
//! let hover = quad.config().mass * quad.config().gravity;
//! let trajectory = quad.update_state(&[
//!     FlightSegment::new(hover * 1.1, Vector3::zeros(), 0.5),
//!     FlightSegment::new(hover, Vector3::new(0.0, 0.0, 0.2), 0.5),
//! ])?;
//! println!("{} samples, z = {}", trajectory.len(), quad.state().position[2]);
//! # Ok::<(), quadsim::QuadError>(())
//! ```
pub mod config;
pub mod dynamics;
pub mod error;
pub mod integrator;
pub mod mixer;
pub mod rotation;
pub mod runner;

pub use config::{ConfigOverrides, PhysicalConfig};
pub use dynamics::{Quadcopter, QuadcopterOde, VehicleState, DEFAULT_STEP_SIZE};
pub use error::{QuadError, Result};
pub use integrator::{FastOdeIntegrator, Integrator, Rk4Integrator};
pub use mixer::ActuatorMixer;
pub use runner::{sample_times, FlightSegment, SegmentOutcome, Trajectory};
