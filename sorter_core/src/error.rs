use thiserror::Error;

/// Why a resolution cannot be answered yet. Expected during start-up;
/// callers should refuse new work rather than fail hard.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    #[error("total cart count is not locked yet (ring is still auto-learning)")]
    CartCountNotLocked,
    #[error("head cart position is not known yet (no origin pass seen)")]
    HeadPositionNotReady,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    #[error("chute {chute_id} is not configured")]
    ChuteNotConfigured { chute_id: u32 },
}

/// Configuration drift or a calibration bug. Must never be swallowed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    #[error(
        "chute {chute_id} base cart number {base} is outside [1, {total}] (cart_number_at_head_one)"
    )]
    ChuteBaseOutOfRange { chute_id: u32, base: i32, total: i32 },
    #[error("head cart number {head} is outside [1, {total}]")]
    HeadCartOutOfRange { head: i64, total: i32 },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cart state not ready: {0}")]
    NotReady(NotReadyReason),
    #[error("not found: {0}")]
    NotFound(NotFoundReason),
    #[error("invalid ring state: {0}")]
    Invalid(InvalidReason),
}

impl ResolveError {
    pub fn is_not_ready(&self) -> bool {
        matches!(self, ResolveError::NotReady(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindError {
    #[error("cannot bind package {package_id} to chute {chute_id}: cart state not ready")]
    CartStateNotReady {
        package_id: String,
        chute_id: u32,
        #[source]
        source: ResolveError,
    },
    #[error("unexpected error binding package {package_id} to chute {chute_id}")]
    Unexpected {
        package_id: String,
        chute_id: u32,
        #[source]
        source: ResolveError,
    },
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

impl BindError {
    /// The resolver failure behind this binding error, if any.
    pub fn resolve_error(&self) -> Option<&ResolveError> {
        match self {
            BindError::CartStateNotReady { source, .. } | BindError::Unexpected { source, .. } => {
                Some(source)
            }
            BindError::Argument(_) => None,
        }
    }
}

/// Missing or malformed input at a public entry point (programmer error).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("package id must not be empty")]
    EmptyPackageId,
    #[error("cart spacing must be > 0 mm, got {0}")]
    NonPositiveCartSpacing(f64),
    #[error("cart count must be > 0 for geometric mapping, got {0}")]
    NonPositiveCartCount(i32),
    #[error("chute width must be >= 0 mm, got {0}")]
    NegativeChuteWidth(f64),
    #[error("pitch tolerance must be in (0.0, 1.0], got {0}")]
    PitchTolerance(f64),
    #[error("position tolerance must be >= 0 mm, got {0}")]
    PositionTolerance(f64),
    #[error("loop count must be >= 1")]
    ZeroLoopCount,
    #[error("cannot lock a cart count of {0}; must be > 0")]
    NonPositiveLockCount(i32),
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("ring configuration store failed")]
    Persistence(#[source] sorter_traits::BoxError),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing ring configuration store")]
    MissingStore,
    #[error("missing chute configuration source")]
    MissingChuteSource,
    #[error("missing topology")]
    MissingTopology,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
