use std::ops::{Add, AddAssign};

use anyhow::ensure;

use crate::Result;
use crate::field::{BinaryField, FieldElement};

/// Element of the tensor algebra F_v (x)_F F_h, materialized as one F_v
/// element per F-coordinate of F_h. Viewed as an n_rows x n_cols matrix of
/// F elements, transposition swaps the vertical and horizontal sides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TowerAlgebra {
    base: BinaryField,
    vertical: BinaryField,
    horizontal: BinaryField,
    elems: Vec<FieldElement>,
}

impl TowerAlgebra {
    /// Missing trailing rows are zero-filled, so a prefix of rows is a valid
    /// construction.
    pub fn new(
        base: BinaryField,
        vertical: BinaryField,
        horizontal: BinaryField,
        mut elems: Vec<FieldElement>,
    ) -> Self {
        assert!(
            vertical.is_extension_of(&base) && horizontal.is_extension_of(&base),
            "both sides of the algebra must extend {base}"
        );
        let n_rows = horizontal.degree(base);
        assert!(elems.len() <= n_rows, "too many rows for {horizontal} over {base}");
        assert!(
            elems.iter().all(|e| e.field() == vertical),
            "rows must be {vertical} elements"
        );
        elems.resize(n_rows, vertical.zero());
        Self { base, vertical, horizontal, elems }
    }

    pub fn zero(base: BinaryField, vertical: BinaryField, horizontal: BinaryField) -> Self {
        Self::new(base, vertical, horizontal, Vec::new())
    }

    /// The rank-1 element v (x) h: row b is v scaled by the b-th
    /// F-coordinate of h.
    pub fn from_tensor(
        base: BinaryField,
        vertical: BinaryField,
        horizontal: BinaryField,
        v: FieldElement,
        h: FieldElement,
    ) -> Self {
        assert_eq!(v.field(), vertical, "vertical entry must be a {vertical} element");
        assert_eq!(h.field(), horizontal, "horizontal entry must be a {horizontal} element");
        let elems = h.unpack_into(base).iter().map(|coord| *coord * v).collect();
        Self::new(base, vertical, horizontal, elems)
    }

    /// v (x) 1.
    pub fn from_vertical(
        base: BinaryField,
        vertical: BinaryField,
        horizontal: BinaryField,
        v: FieldElement,
    ) -> Self {
        assert_eq!(v.field(), vertical, "vertical entry must be a {vertical} element");
        Self::new(base, vertical, horizontal, vec![v])
    }

    /// 1 (x) h.
    pub fn from_horizontal(
        base: BinaryField,
        vertical: BinaryField,
        horizontal: BinaryField,
        h: FieldElement,
    ) -> Self {
        assert_eq!(h.field(), horizontal, "horizontal entry must be a {horizontal} element");
        let elems = h
            .unpack_into(base)
            .iter()
            .map(|coord| coord.to_extension_field(vertical))
            .collect();
        Self::new(base, vertical, horizontal, elems)
    }

    pub fn base_field(&self) -> BinaryField {
        self.base
    }

    pub fn vertical_field(&self) -> BinaryField {
        self.vertical
    }

    pub fn horizontal_field(&self) -> BinaryField {
        self.horizontal
    }

    pub fn n_rows(&self) -> usize {
        self.horizontal.degree(self.base)
    }

    pub fn n_cols(&self) -> usize {
        self.vertical.degree(self.base)
    }

    pub fn elems(&self) -> &[FieldElement] {
        &self.elems
    }

    pub fn is_over(
        &self,
        base: BinaryField,
        vertical: BinaryField,
        horizontal: BinaryField,
    ) -> bool {
        self.base == base && self.vertical == vertical && self.horizontal == horizontal
    }

    /// Succeeds only when the element is v (x) 1, returning v.
    pub fn try_extract_vertical(&self) -> Result<FieldElement> {
        ensure!(
            self.elems[1..].iter().all(|e| e.is_zero()),
            "tensor element has a nonzero horizontal component"
        );
        Ok(self.elems[0])
    }

    pub fn scale_vertical(&self, scalar: FieldElement) -> Self {
        assert_eq!(scalar.field(), self.vertical, "vertical scalar must be a {} element", self.vertical);
        Self {
            base: self.base,
            vertical: self.vertical,
            horizontal: self.horizontal,
            elems: self.elems.iter().map(|e| scalar * *e).collect(),
        }
    }

    pub fn scale_horizontal(&self, scalar: FieldElement) -> Self {
        self.transpose().scale_vertical(scalar).transpose()
    }

    /// Reinterpret the n_rows x n_cols F-matrix as its transpose, swapping
    /// the vertical and horizontal fields.
    pub fn transpose(&self) -> Self {
        let mat: Vec<Vec<FieldElement>> =
            self.elems.iter().map(|e| e.unpack_into(self.base)).collect();
        let elems = (0..self.n_cols())
            .map(|j| {
                let column: Vec<FieldElement> = mat.iter().map(|row| row[j]).collect();
                self.horizontal.from_unpacked(&column)
            })
            .collect();
        Self {
            base: self.base,
            vertical: self.horizontal,
            horizontal: self.vertical,
            elems,
        }
    }

    /// Concatenated row serializations, the transcript form of the element.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.elems.iter().flat_map(|e| e.to_bytes()).collect()
    }
}

impl Add for TowerAlgebra {
    type Output = TowerAlgebra;

    fn add(mut self, rhs: TowerAlgebra) -> TowerAlgebra {
        self += &rhs;
        self
    }
}

impl Add<&TowerAlgebra> for TowerAlgebra {
    type Output = TowerAlgebra;

    fn add(mut self, rhs: &TowerAlgebra) -> TowerAlgebra {
        self += rhs;
        self
    }
}

impl AddAssign<&TowerAlgebra> for TowerAlgebra {
    fn add_assign(&mut self, rhs: &TowerAlgebra) {
        assert!(
            self.is_over(rhs.base, rhs.vertical, rhs.horizontal),
            "cannot add elements of different algebras"
        );
        for (a, b) in self.elems.iter_mut().zip(&rhs.elems) {
            *a += *b;
        }
    }
}
