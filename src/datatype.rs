//! Element datatype trait.
//!
//! This module provides the [`Datatype`] trait, a sealed trait for the
//! primitive element types that can travel through a mailbox. Every payload is
//! moved as raw bytes; the trait supplies the element-wise combine used by
//! reductions.
//!
//! # Supported Types
//!
//! | Rust Type | SUM semantics       |
//! |-----------|---------------------|
//! | `f32`     | IEEE addition       |
//! | `f64`     | IEEE addition       |
//! | `i32`     | wrapping addition   |
//! | `i64`     | wrapping addition   |
//! | `u8`      | wrapping addition   |
//! | `u32`     | wrapping addition   |
//! | `u64`     | wrapping addition   |

use crate::ReduceOp;

/// Internal module to seal the trait — prevents external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Trait for types that can be used in communication operations.
///
/// This is a **sealed trait** — it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
///
/// # Example
///
/// ```
/// use threadmpi::{Datatype, ReduceOp};
///
/// assert_eq!(2i32.combine(3, ReduceOp::Sum), 5);
/// assert_eq!(u8::MAX.combine(1, ReduceOp::Sum), 0);
/// ```
pub trait Datatype: sealed::Sealed + bytemuck::Pod + Send + Sync + 'static {
    /// Combine two elements with a reduction operation.
    fn combine(self, other: Self, op: ReduceOp) -> Self;
}

macro_rules! impl_datatype {
    ($ty:ty, |$a:ident, $b:ident| $sum:expr) => {
        impl sealed::Sealed for $ty {}
        impl Datatype for $ty {
            #[inline]
            fn combine(self, other: Self, op: ReduceOp) -> Self {
                let ($a, $b) = (self, other);
                match op {
                    ReduceOp::Sum => $sum,
                }
            }
        }
    };
}

impl_datatype!(f32, |a, b| a + b);
impl_datatype!(f64, |a, b| a + b);
impl_datatype!(i32, |a, b| a.wrapping_add(b));
impl_datatype!(i64, |a, b| a.wrapping_add(b));
impl_datatype!(u8, |a, b| a.wrapping_add(b));
impl_datatype!(u32, |a, b| a.wrapping_add(b));
impl_datatype!(u64, |a, b| a.wrapping_add(b));

/// Fold `other` into `acc` element-wise.
pub(crate) fn fold_into<T: Datatype>(acc: &mut [T], other: &[T], op: ReduceOp) {
    for (a, &b) in acc.iter_mut().zip(other) {
        *a = a.combine(b, op);
    }
}
