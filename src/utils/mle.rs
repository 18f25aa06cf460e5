use rayon::iter::{IntoParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

use crate::field::{BinaryField, FieldElement};

use super::{inner_product, log2};

/// Equality-indicator expansion of a query point q in L^k: entry i is the
/// product over bits of i of q_b or (1 - q_b).
#[derive(Clone, Debug)]
pub struct MultilinearQuery {
    field: BinaryField,
    n_vars: usize,
    expanded: Vec<FieldElement>,
}

impl MultilinearQuery {
    pub fn new(field: BinaryField) -> Self {
        Self { field, n_vars: 0, expanded: vec![field.one()] }
    }

    pub fn with_full_query(query: &[FieldElement], field: BinaryField) -> Self {
        let mut q = Self::new(field);
        q.update(query);
        q
    }

    /// Doubling recurrence; each coordinate splits every table entry into
    /// its (1 - q) and q halves, the new variable occupying the high bit.
    pub fn update(&mut self, coords: &[FieldElement]) {
        for &coord in coords {
            let mut high = vec![self.field.zero(); self.expanded.len()];
            (self.expanded.par_iter_mut(), high.par_iter_mut())
                .into_par_iter()
                .for_each(|(low, hi)| {
                    *hi = coord * *low;
                    *low += *hi;
                });
            self.expanded.append(&mut high);
            self.n_vars += 1;
        }
    }

    pub fn field(&self) -> BinaryField {
        self.field
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    pub fn expansion(&self) -> &[FieldElement] {
        &self.expanded
    }
}

/// Multilinear polynomial given by its table of evaluations on the Boolean
/// hypercube.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultilinearExtension {
    field: BinaryField,
    n_vars: usize,
    evals: Vec<FieldElement>,
}

impl MultilinearExtension {
    pub fn from_evals(evals: Vec<FieldElement>, field: BinaryField) -> Self {
        let n_vars = log2(evals.len());
        assert!(evals.iter().all(|e| e.field() == field), "evaluations must live in {field}");
        Self { field, n_vars, evals }
    }

    pub fn field(&self) -> BinaryField {
        self.field
    }

    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    pub fn evals(&self) -> &[FieldElement] {
        &self.evals
    }

    pub fn eval_on_hypercube(&self, index: usize) -> FieldElement {
        self.evals[index]
    }

    pub fn evaluate(&self, query: &MultilinearQuery) -> FieldElement {
        assert_eq!(query.n_vars(), self.n_vars, "query arity mismatch");
        inner_product(query.expansion(), &self.evals, query.field().join(self.field))
    }

    /// Bind the high-index variables: view the table as a 2^k x 2^{n-k}
    /// row-major matrix and left-multiply by the query expansion.
    pub fn evaluate_partial_high(&self, query: &MultilinearQuery) -> MultilinearExtension {
        assert!(query.n_vars() <= self.n_vars, "query arity exceeds polynomial arity");
        let row_len = 1usize << (self.n_vars - query.n_vars());
        let out_field = query.field().join(self.field);
        let expansion = query.expansion();
        let evals: Vec<FieldElement> = (0..row_len)
            .into_par_iter()
            .map(|j| {
                expansion
                    .iter()
                    .enumerate()
                    .fold(out_field.zero(), |acc, (r, &q)| acc + q * self.evals[r * row_len + j])
            })
            .collect();
        Self::from_evals(evals, out_field)
    }

    /// Bind the low-index variables: the symmetric right-multiplication.
    pub fn evaluate_partial_low(&self, query: &MultilinearQuery) -> MultilinearExtension {
        assert!(query.n_vars() <= self.n_vars, "query arity exceeds polynomial arity");
        let row_len = 1usize << query.n_vars();
        let out_field = query.field().join(self.field);
        let evals: Vec<FieldElement> = (0..self.evals.len() >> query.n_vars())
            .into_par_iter()
            .map(|i| {
                inner_product(
                    &self.evals[i * row_len..(i + 1) * row_len],
                    query.expansion(),
                    out_field,
                )
            })
            .collect();
        Self::from_evals(evals, out_field)
    }
}
