use std::cell::Cell;

/// Status codes of the rendering core.
///
/// `Unsupported` is produced by backends declining an optional operation. It is
/// absorbed by surface dispatch and the compositor, and never returned by the
/// public `Context` API.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum Error {
    #[error("out of memory")]
    NoMemory,
    #[error("restore without matching save")]
    InvalidRestore,
    #[error("no current point")]
    NoCurrentPoint,
    #[error("invalid matrix (not invertible)")]
    InvalidMatrix,
    #[error("required object missing")]
    NullPointer,
    #[error("invalid value for a dash setting")]
    InvalidDash,
    #[error("invalid value (typically too big) for the size of the input")]
    InvalidSize,
    #[error("invalid value for an input format")]
    InvalidFormat,
    #[error("the target surface has been finished")]
    SurfaceFinished,
    #[error("the surface type is not appropriate for the operation")]
    SurfaceTypeMismatch,
    #[error("the pattern type is not appropriate for the operation")]
    PatternTypeMismatch,
    #[error("operation not supported by backend")]
    Unsupported,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::NoMemory
    }
}

/// First-error-wins status cell.
///
/// Once an error is recorded it is never overwritten, every later `check()`
/// returns it.
#[derive(Debug, Default, Clone)]
pub struct Sticky(Cell<Option<Error>>);

impl Sticky {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(err: Error) -> Self {
        let r = Self::new();
        r.set(err);
        r
    }

    pub fn check(&self) -> Result<()> {
        match self.0.get() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn error(&self) -> Option<Error> {
        self.0.get()
    }

    /// Record `err` unless an error is already recorded, returns the error
    /// now held by the cell.
    pub fn set(&self, err: Error) -> Error {
        debug_assert_ne!(err, Error::Unsupported, "Unsupported is never sticky");
        match self.0.get() {
            Some(first) => first,
            None => {
                self.0.set(Some(err));
                err
            }
        }
    }

    /// Pass `r` through, recording its error if any.
    pub fn record<T>(&self, r: Result<T>) -> Result<T> {
        r.map_err(|e| if e == Error::Unsupported { e } else { self.set(e) })
    }
}
