use num::{traits::CheckedNeg, NumCast, PrimInt, Signed};
use rand::distributions::uniform::SampleUniform;
use std::{
    fmt::{Debug, Display},
    hash::Hash,
    iter::Sum,
    ops::{AddAssign, SubAssign},
};

/// Signed integer coordinate type. Every backend computes with exact integer arithmetic,
/// so results of different backends can be compared bit for bit.
///
/// The type has to be wide enough to hold the squared-distance sum of one point, which is
/// why only 64 and 128 bit integers are provided.
pub trait Primitive: PrimInt + Signed + CheckedNeg + NumCast + AddAssign + SubAssign + Sum + SampleUniform
                + Hash + Default + Display + Debug + Sync + Send + 'static {}
impl Primitive for i64 {}
impl Primitive for i128 {}

/// Converts a point count into the coordinate type, for use as divisor.
#[inline(always)]
pub(crate) fn count_as<T: Primitive>(count: usize) -> T {
    // usize always fits into i64/i128
    T::from(count).unwrap_or_else(T::max_value)
}
