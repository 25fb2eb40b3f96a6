pub mod double_exponential;
pub mod smooth_point;

pub use double_exponential::{
    DoubleExponentialSmoother, SmoothingParameters, SmoothingState, DEFAULT_INFERRED_SCALE,
    JITTER_EPSILON,
};
pub use smooth_point::SmoothPoint;
