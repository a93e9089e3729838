//! Error types for circuit construction and render-time measurement.

/// Construction-time failures. These always indicate a topology bug and are
/// never downgraded to warnings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    #[error("missing pin reference")]
    MissingPinRef,
    #[error("pin not found: {0}")]
    PinNotFound(String),
    #[error("component not found: {0}")]
    ComponentNotFound(String),
    #[error("unknown scope: {0}")]
    UnknownScope(String),
    #[error("identifier already registered: {0}")]
    DuplicateId(String),
    #[error("component is not a source: {0}")]
    NotASource(String),
}

/// Failures of best-effort cosmetic work done after propagation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("element is not attached to the scene")]
    Detached,
    #[error("element has no measurable content")]
    EmptyBounds,
    #[error("render callback failed: {0}")]
    Callback(String),
}

impl From<CircuitError> for RenderError {
    fn from(value: CircuitError) -> Self {
        Self::Callback(value.to_string())
    }
}
