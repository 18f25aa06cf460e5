use sha2::{Digest, Sha256};

use crate::field::{BinaryField, FieldElement};
use crate::tower::TowerAlgebra;

const FIELD_ELEM_TAG: u8 = 0x31;
const BYTES_TAG: u8 = 0x32;
const SAMPLE_TAG: u8 = b'@';

const DEFAULT_SEED: &[u8] = b"init_challenger";

/// Fiat-Shamir transcript: 32 bytes of SHA-256 state plus a sample counter.
/// Observing resets the counter, sampling advances it, so the output stream
/// is a pure function of the observe sequence. Clone one snapshot to hand
/// prover and verifier identical transcripts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenger {
    state: [u8; 32],
    counter: u64,
}

impl Default for Challenger {
    fn default() -> Self {
        Self::new()
    }
}

impl Challenger {
    pub fn new() -> Self {
        Self::from_seed(DEFAULT_SEED)
    }

    pub fn from_seed(seed: &[u8]) -> Self {
        Self { state: Sha256::digest(seed).into(), counter: 0 }
    }

    fn absorb(&mut self, tag: u8, payload: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.state);
        hasher.update([tag]);
        hasher.update(payload);
        self.state = hasher.finalize().into();
        self.counter = 0;
    }

    pub fn observe_bytes(&mut self, bytes: &[u8]) {
        self.absorb(BYTES_TAG, bytes);
    }

    pub fn observe_elem(&mut self, elem: FieldElement) {
        self.absorb(FIELD_ELEM_TAG, &elem.to_bytes());
    }

    pub fn observe_elems(&mut self, elems: &[FieldElement]) {
        for &elem in elems {
            self.observe_elem(elem);
        }
    }

    pub fn observe_algebra(&mut self, algebra: &TowerAlgebra) {
        self.observe_elems(algebra.elems());
    }

    /// Counter-stamped digest of the current state, as a big-endian integer
    /// truncated to 128 bits.
    fn sample_raw(&mut self) -> u128 {
        let mut hasher = Sha256::new();
        hasher.update(self.state);
        hasher.update([SAMPLE_TAG]);
        hasher.update(self.counter.to_le_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        self.counter += 1;

        let mut low = [0u8; 16];
        low.copy_from_slice(&digest[16..]);
        u128::from_be_bytes(low)
    }

    pub fn sample(&mut self, field: BinaryField) -> FieldElement {
        field.elem(self.sample_raw() & field.mask())
    }

    pub fn sample_vec(&mut self, n: usize, field: BinaryField) -> Vec<FieldElement> {
        (0..n).map(|_| self.sample(field)).collect()
    }

    /// The low `bits` bits of the next sample, as an index.
    pub fn sample_bits(&mut self, bits: usize) -> usize {
        assert!(bits < usize::BITS as usize, "index width {bits} too large");
        (self.sample_raw() & ((1u128 << bits) - 1)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{BF64, BF128};

    #[test]
    fn identical_transcripts_sample_identically() {
        let mut a = Challenger::from_seed(b"seed");
        let mut b = Challenger::from_seed(b"seed");

        a.observe_bytes(b"commitment");
        b.observe_bytes(b"commitment");
        a.observe_elem(BF64.elem(0x1234));
        b.observe_elem(BF64.elem(0x1234));

        assert_eq!(a.sample(BF128), b.sample(BF128));
        assert_eq!(a.sample_bits(10), b.sample_bits(10));
        assert_eq!(a.sample_vec(4, BF64), b.sample_vec(4, BF64));
    }

    #[test]
    fn diverging_observations_diverge() {
        let mut a = Challenger::new();
        let mut b = Challenger::new();
        a.observe_bytes(b"x");
        b.observe_bytes(b"y");
        assert_ne!(a.sample(BF128), b.sample(BF128));
    }

    #[test]
    fn observe_resets_the_counter() {
        let mut a = Challenger::new();
        let first = a.sample(BF128);
        let second = a.sample(BF128);
        assert_ne!(first, second);

        // an observation between samples changes the stream entirely
        let mut b = Challenger::new();
        let _ = b.sample(BF128);
        b.observe_bytes(b"");
        assert_ne!(b.sample(BF128), second);
    }

    #[test]
    fn sample_respects_field_width() {
        let mut a = Challenger::new();
        let e = a.sample(BF64);
        assert_eq!(e.field(), BF64);
        assert!(e.value() <= BF64.mask());
    }
}
