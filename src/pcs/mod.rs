pub mod basic;
pub mod block;
pub mod ring_switch;

use crate::Result;
use crate::field::FieldElement;
use crate::utils::channel::Challenger;
use crate::utils::merkle;
use crate::utils::mle::MultilinearExtension;

/// Commitment half of a commit operation: cheap, immutable, and the only
/// part sent to the verifier.
pub trait PcsCommitment: Clone {
    fn serialize(&self) -> Vec<u8>;
}

/// Wire form of an evaluation proof.
pub trait PcsProof {
    fn serialize(&self) -> Vec<u8>;
}

/// Multilinear polynomial commitment scheme over a binary field tower.
///
/// `commit` also yields an opaque `Committed` state the prover keeps;
/// `prove_evaluation` and `verify_evaluation` advance their challengers
/// identically, so the caller must hand both sides clones of one snapshot.
pub trait PolyCommitScheme {
    type Commitment: PcsCommitment;
    type Committed;
    type Proof;

    fn n_vars(&self) -> usize;

    fn commit(&self, poly: &MultilinearExtension) -> Result<(Self::Commitment, Self::Committed)>;

    fn prove_evaluation(
        &self,
        challenger: &mut Challenger,
        committed: &Self::Committed,
        poly: &MultilinearExtension,
        query: &[FieldElement],
    ) -> Result<Self::Proof>;

    /// `Ok(false)` for any failed sub-check; `Err` only for caller misuse.
    fn verify_evaluation(
        &self,
        challenger: &mut Challenger,
        commitment: &Self::Commitment,
        query: &[FieldElement],
        proof: &Self::Proof,
        value: FieldElement,
    ) -> Result<bool>;
}

/// Commitment to an encoded evaluation matrix: the Merkle root over its
/// columns. Shared by the basic and block schemes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatrixCommitment {
    pub vcs: merkle::Commitment,
}

impl PcsCommitment for MatrixCommitment {
    fn serialize(&self) -> Vec<u8> {
        self.vcs.serialize()
    }
}

/// Prover-side counterpart: the Merkle layers plus the encoded columns the
/// openings are drawn from.
pub struct MatrixCommitted {
    pub vcs: merkle::Committed,
    pub encoded_cols: Vec<Vec<FieldElement>>,
}

/// One sampled column with its Merkle branch.
#[derive(Clone, Debug)]
pub struct ColumnOpening {
    pub column: Vec<FieldElement>,
    pub branch: merkle::Proof,
}

/// Evaluation proof of the matrix schemes: the high-folded row combination
/// t' followed by the sampled column openings.
#[derive(Clone, Debug)]
pub struct MatrixProof {
    pub t_prime: MultilinearExtension,
    pub openings: Vec<ColumnOpening>,
}

impl PcsProof for MatrixProof {
    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for e in self.t_prime.evals() {
            out.extend_from_slice(&e.to_bytes());
        }
        for opening in &self.openings {
            for e in &opening.column {
                out.extend_from_slice(&e.to_bytes());
            }
            for hash in &opening.branch.branch {
                out.extend_from_slice(&hash.0);
            }
        }
        out
    }
}
