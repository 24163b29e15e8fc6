use thiserror::Error;

/// Errors surfaced by model construction and by [`Quadcopter::update_state`].
///
/// [`Quadcopter::update_state`]: crate::dynamics::Quadcopter::update_state
#[derive(Debug, Error)]
pub enum QuadError {
    /// A physical constant is outside its valid range.
    #[error("invalid configuration: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },
    /// The Euler-rate matrix could not be inverted (gimbal lock).
    #[error("singular Euler-rate matrix at phi={phi}, theta={theta}, psi={psi}")]
    SingularEulerRateMatrix { phi: f64, theta: f64, psi: f64 },
    /// The solver gave up before reaching the end of a sample interval.
    #[error("integration failed between t={t0} and t={t1}")]
    IntegrationFailed { t0: f64, t1: f64 },
    /// The solver returned NaN or infinite state components.
    #[error("non-finite state at t={t}")]
    NonFiniteState { t: f64 },
    #[error("config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),
}

pub type Result<T> = std::result::Result<T, QuadError>;
