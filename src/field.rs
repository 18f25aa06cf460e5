use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use anyhow::ensure;
use rand::Rng;

use crate::Result;

/// Binary tower field GF(2^n), identified by its width alone. Arithmetic is
/// defined through the recursive tower basis GF(2^{2k}) = GF(2^k)[x]/(x^2 + x*b + 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinaryField {
    bit_length: u32,
}

pub const BF1: BinaryField = BinaryField { bit_length: 1 };
pub const BF2: BinaryField = BinaryField { bit_length: 2 };
pub const BF4: BinaryField = BinaryField { bit_length: 4 };
pub const BF8: BinaryField = BinaryField { bit_length: 8 };
pub const BF16: BinaryField = BinaryField { bit_length: 16 };
pub const BF32: BinaryField = BinaryField { bit_length: 32 };
pub const BF64: BinaryField = BinaryField { bit_length: 64 };
pub const BF128: BinaryField = BinaryField { bit_length: 128 };

impl BinaryField {
    pub fn new(bit_length: u32) -> Result<Self> {
        ensure!(
            matches!(bit_length, 1 | 2 | 4 | 8 | 16 | 32 | 64 | 128),
            "no binary tower field of width {bit_length}"
        );
        Ok(Self { bit_length })
    }

    pub fn bit_length(&self) -> u32 {
        self.bit_length
    }

    /// Mask selecting the value range; numerically equal to the order of the
    /// multiplicative group.
    pub fn mask(&self) -> u128 {
        u128::MAX >> (128 - self.bit_length)
    }

    pub fn order(&self) -> u128 {
        self.mask()
    }

    pub fn zero(&self) -> FieldElement {
        self.elem(0)
    }

    pub fn one(&self) -> FieldElement {
        self.elem(1)
    }

    pub fn elem(&self, value: u128) -> FieldElement {
        assert!(value <= self.mask(), "value {value:#x} out of range for {self}");
        FieldElement { field: *self, value }
    }

    pub fn random_element<R: Rng>(&self, rng: &mut R) -> FieldElement {
        self.elem(rng.gen_range(0..=self.mask()))
    }

    pub fn is_extension_of(&self, other: &BinaryField) -> bool {
        self.bit_length % other.bit_length == 0
    }

    /// Degree of self as a vector space over the given subfield.
    pub fn degree(&self, subfield: BinaryField) -> usize {
        assert!(self.is_extension_of(&subfield), "{self} does not extend {subfield}");
        (self.bit_length / subfield.bit_length) as usize
    }

    /// Join in the subfield lattice: the extension among two nested fields.
    /// Resolves the output field of mixed-width operations.
    pub fn join(&self, other: BinaryField) -> BinaryField {
        if self.is_extension_of(&other) { *self } else { other }
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        (self.bit_length as u16).to_le_bytes()
    }

    /// Assemble an element from subfield coordinates, least significant
    /// chunk first. The coordinates must fill the width exactly.
    pub fn from_unpacked(&self, elems: &[FieldElement]) -> FieldElement {
        let total: u32 = elems.iter().map(|e| e.field.bit_length).sum();
        assert_eq!(total, self.bit_length, "coordinates must fill {self} exactly");
        let mut value = 0u128;
        let mut shift = 0u32;
        for e in elems {
            value |= e.value << shift;
            shift += e.field.bit_length;
        }
        self.elem(value)
    }

    /// Reinterpret a uniform slice as elements of this field, packing or
    /// unpacking as the widths demand.
    pub fn cast_slice(&self, elems: &[FieldElement]) -> Vec<FieldElement> {
        let Some(first) = elems.first() else {
            return Vec::new();
        };
        let src = first.field;
        assert!(elems.iter().all(|e| e.field == src), "cast_slice needs a uniform slice");
        if src == *self {
            return elems.to_vec();
        }
        if self.is_extension_of(&src) {
            let width = self.degree(src);
            assert_eq!(
                elems.len() % width,
                0,
                "slice of {} {src} elements does not fill whole {self} elements",
                elems.len()
            );
            elems.chunks(width).map(|chunk| self.from_unpacked(chunk)).collect()
        } else {
            elems.iter().flat_map(|e| e.unpack_into(*self)).collect()
        }
    }
}

impl fmt::Display for BinaryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GF(2^{})", self.bit_length)
    }
}

/// Element of a binary tower field; addition is XOR, negation the identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldElement {
    field: BinaryField,
    value: u128,
}

impl FieldElement {
    pub fn field(&self) -> BinaryField {
        self.field
    }

    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Subfield coordinates, least significant chunk first.
    pub fn unpack_into(&self, subfield: BinaryField) -> Vec<FieldElement> {
        assert!(
            self.field.is_extension_of(&subfield),
            "{} does not extend {subfield}",
            self.field
        );
        let width = self.field.degree(subfield);
        let bits = subfield.bit_length();
        (0..width as u32)
            .map(|i| subfield.elem((self.value >> (i * bits)) & subfield.mask()))
            .collect()
    }

    /// Embed into an extension field; in the tower basis this preserves the
    /// integer value.
    pub fn to_extension_field(&self, ext: BinaryField) -> FieldElement {
        assert!(ext.is_extension_of(&self.field), "{ext} does not extend {}", self.field);
        ext.elem(self.value)
    }

    pub fn pow(&self, mut n: u128) -> FieldElement {
        let mut result = self.field.one();
        let mut base = *self;
        while n > 0 {
            if n & 1 == 1 {
                result = result * base;
            }
            n >>= 1;
            base = base * base;
        }
        result
    }

    /// Inverse by exponentiation with order - 1; zero maps to zero.
    pub fn inv(&self) -> FieldElement {
        self.pow(self.field.order() - 1)
    }

    /// Two-byte little-endian width header followed by the value in
    /// ceil(bits / 8) little-endian bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let n_bytes = self.field.bit_length().div_ceil(8) as usize;
        let mut out = Vec::with_capacity(2 + n_bytes);
        out.extend_from_slice(&self.field.to_bytes());
        out.extend_from_slice(&self.value.to_le_bytes()[..n_bytes]);
        out
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = (self.field.bit_length() as usize / 4).max(1);
        write!(f, "{:#0w$x}", self.value, w = digits + 2)
    }
}

/// Karatsuba product of two equal-width tower field values. The monomial
/// case (v1 = x^{len/2}) carries the reduction by x^2 + x*b + 1 one level
/// down as a shift plus a half-width product.
fn mul_equal_length(v1: u128, v2: u128, length: u32) -> u128 {
    if v1 < 2 || v2 < 2 {
        return v1 * v2;
    }
    let half = length >> 1;
    let quarter = length >> 2;
    let half_mask = (1u128 << half) - 1;

    let (l1, r1) = (v1 & half_mask, v1 >> half);
    let (l2, r2) = (v2 & half_mask, v2 >> half);

    if (l1, r1) == (0, 1) {
        let out_r = mul_equal_length(1 << quarter, r2, half) ^ l2;
        return r2 ^ (out_r << half);
    }

    let l1l2 = mul_equal_length(l1, l2, half);
    let r1r2 = mul_equal_length(r1, r2, half);
    let r1r2_high = mul_equal_length(1 << quarter, r1r2, half);
    let z3 = mul_equal_length(l1 ^ r1, l2 ^ r2, half);
    l1l2 ^ r1r2 ^ ((z3 ^ l1l2 ^ r1r2 ^ r1r2_high) << half)
}

impl Add for FieldElement {
    type Output = FieldElement;

    fn add(self, rhs: FieldElement) -> FieldElement {
        self.field.join(rhs.field).elem(self.value ^ rhs.value)
    }
}

impl AddAssign for FieldElement {
    fn add_assign(&mut self, rhs: FieldElement) {
        *self = *self + rhs;
    }
}

impl Sub for FieldElement {
    type Output = FieldElement;

    fn sub(self, rhs: FieldElement) -> FieldElement {
        self + rhs
    }
}

impl SubAssign for FieldElement {
    fn sub_assign(&mut self, rhs: FieldElement) {
        *self = *self - rhs;
    }
}

impl Neg for FieldElement {
    type Output = FieldElement;

    fn neg(self) -> FieldElement {
        self
    }
}

impl Mul for FieldElement {
    type Output = FieldElement;

    fn mul(self, rhs: FieldElement) -> FieldElement {
        let (wide, narrow) = if self.field.is_extension_of(&rhs.field) {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let scaled: Vec<FieldElement> = wide
            .unpack_into(narrow.field)
            .iter()
            .map(|coord| {
                narrow
                    .field
                    .elem(mul_equal_length(coord.value, narrow.value, narrow.field.bit_length()))
            })
            .collect();
        wide.field.from_unpacked(&scaled)
    }
}

impl MulAssign for FieldElement {
    fn mul_assign(&mut self, rhs: FieldElement) {
        *self = *self * rhs;
    }
}

impl Div for FieldElement {
    type Output = FieldElement;

    fn div(self, rhs: FieldElement) -> FieldElement {
        self * rhs.inv()
    }
}
