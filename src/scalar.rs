use nalgebra::RealField;
use num_traits::{Float, FromPrimitive, ToPrimitive};

/// The floating-point type the core is generic over.
///
/// The source switches between single- and double-precision arithmetic with
/// a build-time flag; here the switch is a type parameter instead, so both
/// precisions can live in the same compiled artifact (and the same test
/// binary). `Scalar` is implemented for `f32` and `f64` only.
pub trait Scalar: RealField + Float + FromPrimitive + ToPrimitive + Copy + Send + Sync + 'static {
    /// Default absolute tolerance for this precision (1e-14 for f64, 1e-6 for f32).
    fn default_atol() -> Self;
    /// Default relative tolerance for this precision.
    fn default_rtol() -> Self;
}

impl Scalar for f64 {
    fn default_atol() -> Self {
        1e-14
    }
    fn default_rtol() -> Self {
        1e-8
    }
}

impl Scalar for f32 {
    fn default_atol() -> Self {
        1e-6
    }
    fn default_rtol() -> Self {
        1e-4
    }
}
