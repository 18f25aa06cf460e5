use anyhow::ensure;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::slice::ParallelSlice;
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::Result;
use crate::field::FieldElement;

/// Wrapper struct for SHA-256 digests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hash(pub [u8; 32]);

/// Vector commitment: a SHA-256 Merkle tree over 2^log_len vectors of field
/// elements, one vector per leaf.
#[derive(Clone, Debug)]
pub struct MerkleTreeVcs {
    log_len: usize,
}

/// The root digest, the only part the verifier sees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    root: Hash,
}

impl Commitment {
    pub fn root(&self) -> Hash {
        self.root
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.root.0.to_vec()
    }
}

/// Prover-side state: every tree layer, leaves first.
#[derive(Clone, Debug)]
pub struct Committed {
    layers: Vec<Vec<Hash>>,
}

/// Sibling hashes from a leaf up to (but excluding) the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    pub branch: Vec<Hash>,
}

impl MerkleTreeVcs {
    pub fn new(log_len: usize) -> Self {
        Self { log_len }
    }

    pub fn log_len(&self) -> usize {
        self.log_len
    }

    fn hash_leaf(vec: &[FieldElement]) -> Hash {
        let mut hasher = Sha256::new();
        for v in vec {
            hasher.update(v.to_bytes());
        }
        Hash(hasher.finalize().into())
    }

    fn compress(left: &Hash, right: &Hash) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(left.0);
        hasher.update(right.0);
        Hash(hasher.finalize().into())
    }

    #[instrument(skip_all, name = "merkle_commit", level = "debug")]
    pub fn commit(&self, vecs: &[Vec<FieldElement>]) -> Result<(Commitment, Committed)> {
        ensure!(
            vecs.len() == 1 << self.log_len,
            "expected 2^{} leaf vectors, got {}",
            self.log_len,
            vecs.len()
        );
        let leaves: Vec<Hash> = vecs.par_iter().map(|vec| Self::hash_leaf(vec)).collect();

        let mut layers = vec![leaves];
        for _ in 0..self.log_len {
            let parent = layers
                .last()
                .unwrap()
                .par_chunks_exact(2)
                .map(|pair| Self::compress(&pair[0], &pair[1]))
                .collect();
            layers.push(parent);
        }

        let root = layers.last().unwrap()[0];
        Ok((Commitment { root }, Committed { layers }))
    }

    pub fn prove_opening(&self, committed: &Committed, index: usize) -> Proof {
        assert!(index < 1 << self.log_len, "leaf index out of bounds");
        let branch = (0..self.log_len).map(|d| committed.layers[d][(index >> d) ^ 1]).collect();
        Proof { branch }
    }

    /// Rehash the claimed leaf vector and fold it with the branch, choosing
    /// the concatenation order by the position bit at each level.
    pub fn verify_opening(
        &self,
        commitment: &Commitment,
        mut index: usize,
        proof: &Proof,
        values: &[FieldElement],
    ) -> bool {
        if proof.branch.len() != self.log_len {
            return false;
        }
        let mut node = Self::hash_leaf(values);
        for sibling in &proof.branch {
            node = if index & 1 == 1 {
                Self::compress(sibling, &node)
            } else {
                Self::compress(&node, sibling)
            };
            index >>= 1;
        }
        node == commitment.root
    }
}
