use anyhow::ensure;

use crate::Result;
use crate::field::{BinaryField, FieldElement};
use crate::tower::TowerAlgebra;

/// Element the butterfly network can process: addition plus scaling by a
/// twiddle drawn from the transform field. Plain field elements scale by a
/// mixed-width product, tensor-algebra elements on their vertical side.
pub trait NttElement: Clone {
    fn accumulate(&mut self, other: &Self);
    fn scale(&self, twiddle: FieldElement) -> Self;
}

impl NttElement for FieldElement {
    fn accumulate(&mut self, other: &Self) {
        *self = *self + *other;
    }

    fn scale(&self, twiddle: FieldElement) -> Self {
        *self * twiddle
    }
}

impl NttElement for TowerAlgebra {
    fn accumulate(&mut self, other: &Self) {
        *self += other;
    }

    fn scale(&self, twiddle: FieldElement) -> Self {
        self.scale_vertical(twiddle)
    }
}

/// Additive NTT in the novel polynomial basis: the forward transform takes
/// coefficients over the basis dual to the subspace-vanishing polynomials
/// W_i of <b_0, .., b_{i-1}> (with b_j = F(1 << j)) to evaluations on the
/// whole 2^log_domain_size domain.
pub struct AdditiveNtt {
    log_degree: usize,
    log_domain_size: usize,
    field: BinaryField,
    s_evals: Vec<Vec<FieldElement>>,
}

impl AdditiveNtt {
    pub fn new(log_degree: usize, log_domain_size: usize, field: BinaryField) -> Result<Self> {
        ensure!(
            log_degree <= log_domain_size,
            "degree 2^{log_degree} exceeds the domain 2^{log_domain_size}"
        );
        ensure!(
            log_domain_size as u32 <= field.bit_length(),
            "domain 2^{log_domain_size} does not fit in {field}"
        );
        let s_evals = Self::precompute(log_domain_size, field);
        Ok(Self { log_degree, log_domain_size, field, s_evals })
    }

    pub fn field(&self) -> BinaryField {
        self.field
    }

    pub fn log_domain_size(&self) -> usize {
        self.log_domain_size
    }

    /// Full-domain tables of the normalized subspace polynomials: entry x of
    /// table i is W-hat_i(F(x)).
    fn precompute(log_domain_size: usize, field: BinaryField) -> Vec<Vec<FieldElement>> {
        if log_domain_size == 0 {
            return Vec::new();
        }
        // W_i on the generators, by W_{i+1}(x) = W_i(x) * (W_i(x) + W_i(b_i)).
        let mut on_generators: Vec<Vec<FieldElement>> =
            vec![(0..log_domain_size).map(|j| field.elem(1 << j)).collect()];
        for i in 1..log_domain_size {
            let next: Vec<FieldElement> = {
                let prev = &on_generators[i - 1];
                let norm = prev[i - 1];
                prev.iter().map(|&e| e * (e + norm)).collect()
            };
            on_generators.push(next);
        }

        // Normalize by W_i(b_i), then expand over the additive subgroup: the
        // subspace polynomials are linearized, so summing generator values
        // along the bits of x evaluates them anywhere on the domain.
        on_generators
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let norm_inv = row[i].inv();
                let mut expanded = vec![field.zero()];
                for &gen_eval in row {
                    let normalized = gen_eval * norm_inv;
                    let shifted: Vec<FieldElement> =
                        expanded.iter().map(|&e| e + normalized).collect();
                    expanded.extend(shifted);
                }
                expanded
            })
            .collect()
    }

    /// Twiddle of butterfly block u at level i: the level-i subspace
    /// polynomial at the block's base domain point.
    pub fn twiddle(&self, i: usize, u: usize) -> FieldElement {
        self.s_evals[i][u << (i + 1)]
    }

    pub fn forward_transform<T: NttElement>(&self, data: &mut [T]) -> Result<()> {
        self.check_len(data.len())?;
        for i in (0..self.log_degree).rev() {
            for u in 0..1usize << (self.log_domain_size - i - 1) {
                let w = self.twiddle(i, u);
                for v in 0..1usize << i {
                    let idx0 = u << (i + 1) | v;
                    let idx1 = idx0 | 1 << i;
                    let scaled = data[idx1].scale(w);
                    data[idx0].accumulate(&scaled);
                    let bumped = data[idx0].clone();
                    data[idx1].accumulate(&bumped);
                }
            }
        }
        Ok(())
    }

    pub fn inverse_transform<T: NttElement>(&self, data: &mut [T]) -> Result<()> {
        self.check_len(data.len())?;
        for i in 0..self.log_degree {
            for u in 0..1usize << (self.log_domain_size - i - 1) {
                let w = self.twiddle(i, u);
                for v in 0..1usize << i {
                    let idx0 = u << (i + 1) | v;
                    let idx1 = idx0 | 1 << i;
                    let bumped = data[idx0].clone();
                    data[idx1].accumulate(&bumped);
                    let scaled = data[idx1].scale(w);
                    data[idx0].accumulate(&scaled);
                }
            }
        }
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        ensure!(
            len == 1 << self.log_domain_size,
            "transform expects 2^{} values, got {len}",
            self.log_domain_size
        );
        Ok(())
    }
}
