use anyhow::ensure;

use crate::Result;
use crate::field::BinaryField;
use crate::ntt::{AdditiveNtt, NttElement};

/// Reed-Solomon code over a binary field: the codeword of a message of
/// 2^log_dimension novel-basis coefficients is its evaluation on the full
/// 2^{log_dimension + log_inv_rate} additive domain.
pub struct ReedSolomonCode {
    log_dimension: usize,
    log_inv_rate: usize,
    log_length: usize,
    field: BinaryField,
    ntt: AdditiveNtt,
}

impl ReedSolomonCode {
    pub fn new(log_dimension: usize, log_inv_rate: usize, field: BinaryField) -> Result<Self> {
        let log_length = log_dimension + log_inv_rate;
        let ntt = AdditiveNtt::new(log_dimension, log_length, field)?;
        Ok(Self { log_dimension, log_inv_rate, log_length, field, ntt })
    }

    pub fn log_dimension(&self) -> usize {
        self.log_dimension
    }

    pub fn log_inv_rate(&self) -> usize {
        self.log_inv_rate
    }

    pub fn log_length(&self) -> usize {
        self.log_length
    }

    pub fn field(&self) -> BinaryField {
        self.field
    }

    /// Repeating the message once per rate doubling is the butterfly image
    /// of zero-extension in the coefficient domain, so the transform output
    /// is the full-domain evaluation of the degree-bounded interpolant.
    pub fn encode<T: NttElement>(&self, data: &[T]) -> Result<Vec<T>> {
        ensure!(
            data.len() == 1 << self.log_dimension,
            "message length {} does not match dimension 2^{}",
            data.len(),
            self.log_dimension
        );
        let mut encoded = data.to_vec();
        for _ in 0..self.log_inv_rate {
            encoded.extend_from_within(..);
        }
        ensure!(
            encoded.len() == 1 << self.log_length,
            "extension produced {} symbols instead of 2^{}",
            encoded.len(),
            self.log_length
        );
        self.ntt.forward_transform(&mut encoded)?;
        Ok(encoded)
    }
}
