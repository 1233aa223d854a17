//! Numeric element types the harness is instantiated for.

use std::{
    fmt::Debug,
    ops::{Add, Mul},
    str::FromStr,
};

use num_complex::Complex;
use num_traits::{One, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::problem::Multiplier;

pub type Complex32 = Complex<f32>;
pub type Complex64 = Complex<f64>;

/// Tag for the four SYMM precisions (`s`, `d`, `c`, `z` in BLAS naming).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Single,
    Double,
    SingleComplex,
    DoubleComplex,
}

impl ElementKind {
    pub const ALL: [ElementKind; 4] = [
        ElementKind::Single,
        ElementKind::Double,
        ElementKind::SingleComplex,
        ElementKind::DoubleComplex,
    ];

    pub fn routine(self) -> &'static str {
        match self {
            ElementKind::Single => "ssymm",
            ElementKind::Double => "dsymm",
            ElementKind::SingleComplex => "csymm",
            ElementKind::DoubleComplex => "zsymm",
        }
    }

    /// Double-precision kinds need native f64 support on the device.
    pub fn is_double(self) -> bool {
        matches!(self, ElementKind::Double | ElementKind::DoubleComplex)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ElementKind::SingleComplex | ElementKind::DoubleComplex)
    }

    /// Multiplies and adds performed per multiply-accumulate of two elements.
    pub fn op_factor(self) -> u64 {
        if self.is_complex() {
            8
        } else {
            2
        }
    }

    pub fn size_of(self) -> usize {
        match self {
            ElementKind::Single => 4,
            ElementKind::Double | ElementKind::SingleComplex => 8,
            ElementKind::DoubleComplex => 16,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown element kind '{0}' (expected one of s, d, c, z)")]
pub struct UnknownElementKind(pub String);

impl FromStr for ElementKind {
    type Err = UnknownElementKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "s" | "ssymm" | "f32" => Ok(ElementKind::Single),
            "d" | "dsymm" | "f64" => Ok(ElementKind::Double),
            "c" | "csymm" | "c32" => Ok(ElementKind::SingleComplex),
            "z" | "zsymm" | "c64" => Ok(ElementKind::DoubleComplex),
            _ => Err(UnknownElementKind(value.to_string())),
        }
    }
}

/// Scalar type a SYMM case is monomorphized over.
pub trait Element:
    bytemuck::Pod
    + Debug
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + Mul<Output = Self>
    + Send
    + Sync
    + 'static
{
    const KIND: ElementKind;

    /// Real element types keep only the real part of the multiplier.
    fn from_multiplier(multiplier: Multiplier) -> Self;

    /// Draws a value from the symmetric unit interval (per component).
    fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

macro_rules! impl_real_element {
    ($ty:ty, $kind:expr) => {
        impl Element for $ty {
            const KIND: ElementKind = $kind;

            fn from_multiplier(multiplier: Multiplier) -> Self {
                multiplier.re as $ty
            }

            fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
                rng.gen_range(-1.0..=1.0)
            }
        }
    };
}

macro_rules! impl_complex_element {
    ($ty:ty, $kind:expr) => {
        impl Element for Complex<$ty> {
            const KIND: ElementKind = $kind;

            fn from_multiplier(multiplier: Multiplier) -> Self {
                Complex::new(multiplier.re as $ty, multiplier.im as $ty)
            }

            fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
                Complex::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0))
            }
        }
    };
}

impl_real_element!(f32, ElementKind::Single);
impl_real_element!(f64, ElementKind::Double);
impl_complex_element!(f32, ElementKind::SingleComplex);
impl_complex_element!(f64, ElementKind::DoubleComplex);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_sizes_match_rust_layout() {
        assert_eq!(f32::KIND.size_of(), std::mem::size_of::<f32>());
        assert_eq!(f64::KIND.size_of(), std::mem::size_of::<f64>());
        assert_eq!(Complex32::KIND.size_of(), std::mem::size_of::<Complex32>());
        assert_eq!(Complex64::KIND.size_of(), std::mem::size_of::<Complex64>());
    }

    #[test]
    fn real_types_drop_imaginary_multiplier() {
        let m = Multiplier { re: 1.5, im: -2.0 };
        assert_eq!(f64::from_multiplier(m), 1.5);
        assert_eq!(Complex64::from_multiplier(m), Complex::new(1.5, -2.0));
    }

    #[test]
    fn parses_blas_prefixes() {
        assert_eq!("z".parse::<ElementKind>().unwrap(), ElementKind::DoubleComplex);
        assert_eq!("SSYMM".parse::<ElementKind>().unwrap(), ElementKind::Single);
        assert!("q".parse::<ElementKind>().is_err());
        assert_eq!(ElementKind::SingleComplex.op_factor(), 8);
        assert!(ElementKind::DoubleComplex.is_double());
    }
}
