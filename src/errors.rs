use thiserror::Error;

/// A lightweight tag identifying which stage of a calculation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Construction,
    Integration,
    NoClosedForm,
    Evaluation,
    Domain,
    Io,
}

/// Every way a curve/surface calculation can fail. Each calculator reports exactly one of these
/// instead of a value, never a partial result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// The expression text could not be tokenized or parsed. `position` is the byte offset in
    /// the original text where the problem was detected.
    #[error("parse error at {position}: {message}")]
    Parse { position: usize, message: String },

    /// Building a derived object (derivative, vector, mesh, parameter set) failed
    #[error("construction failed: {0}")]
    Construction(String),

    /// The numerical integration did not produce a usable value
    #[error("integration failed: {0}")]
    Integration(String),

    /// The closed-form integrator has no rule for the integrand
    #[error("no closed-form antiderivative: {0}")]
    NoClosedForm(String),

    /// Evaluating an expression produced a non-finite number
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A parameter interval was not usable
    #[error("invalid domain: {0}")]
    Domain(String),

    /// Writing an output file failed
    #[error("i/o failed: {0}")]
    Io(String),
}

impl CalcError {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        CalcError::Parse {
            position,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::Parse { .. } => ErrorKind::Parse,
            CalcError::Construction(_) => ErrorKind::Construction,
            CalcError::Integration(_) => ErrorKind::Integration,
            CalcError::NoClosedForm(_) => ErrorKind::NoClosedForm,
            CalcError::Evaluation(_) => ErrorKind::Evaluation,
            CalcError::Domain(_) => ErrorKind::Domain,
            CalcError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for CalcError {
    fn from(value: std::io::Error) -> Self {
        CalcError::Io(value.to_string())
    }
}
