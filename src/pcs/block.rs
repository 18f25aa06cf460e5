use anyhow::ensure;
use itertools::Itertools;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;

use crate::Result;
use crate::field::{BinaryField, FieldElement};
use crate::tower::TowerAlgebra;
use crate::utils::channel::Challenger;
use crate::utils::code::ReedSolomonCode;
use crate::utils::merkle::MerkleTreeVcs;
use crate::utils::mle::{MultilinearExtension, MultilinearQuery};
use crate::utils::{log2, transpose};

use super::{ColumnOpening, MatrixCommitment, MatrixCommitted, MatrixProof, PolyCommitScheme};

/// PCS committing over F with a packed codeword alphabet FA, an extension of
/// F; challenges live in the larger extension FE. Rows are cast into FA
/// before encoding, which shrinks the code dimension by deg(FA/F).
pub struct BlockPcs {
    base: BinaryField,
    alphabet: BinaryField,
    ext: BinaryField,
    n_vars: usize,
    log_rows: usize,
    log_cols: usize,
    n_challenges: usize,
    alphabet_degree: usize,
    code: ReedSolomonCode,
    vcs: MerkleTreeVcs,
}

impl BlockPcs {
    pub fn new(
        base: BinaryField,
        alphabet: BinaryField,
        ext: BinaryField,
        n_vars: usize,
        log_rows: usize,
        log_inv_rate: usize,
        n_challenges: usize,
    ) -> Result<Self> {
        ensure!(alphabet.is_extension_of(&base), "{alphabet} does not extend {base}");
        ensure!(ext.is_extension_of(&base), "{ext} does not extend {base}");
        ensure!(log_rows <= n_vars, "log_rows {log_rows} exceeds the arity {n_vars}");
        let log_cols = n_vars - log_rows;
        let alphabet_degree = alphabet.degree(base);
        ensure!(
            log2(alphabet_degree) <= log_cols,
            "rows of 2^{log_cols} entries cannot be packed into {alphabet}"
        );
        let log_dimension = log_cols - log2(alphabet_degree);
        ensure!(
            log_dimension + log_inv_rate <= alphabet.bit_length() as usize,
            "codeword domain 2^{} does not fit the {alphabet} alphabet",
            log_dimension + log_inv_rate
        );
        let code = ReedSolomonCode::new(log_dimension, log_inv_rate, alphabet)?;
        let vcs = MerkleTreeVcs::new(code.log_length());
        Ok(Self {
            base,
            alphabet,
            ext,
            n_vars,
            log_rows,
            log_cols,
            n_challenges,
            alphabet_degree,
            code,
            vcs,
        })
    }

    fn check_query(&self, query: &[FieldElement]) -> Result<()> {
        ensure!(query.len() == self.n_vars, "query arity {} != {}", query.len(), self.n_vars);
        ensure!(query.iter().all(|e| e.field() == self.ext), "query must live in {}", self.ext);
        Ok(())
    }
}

impl PolyCommitScheme for BlockPcs {
    type Commitment = MatrixCommitment;
    type Committed = MatrixCommitted;
    type Proof = MatrixProof;

    fn n_vars(&self) -> usize {
        self.n_vars
    }

    #[instrument(skip_all, name = "block_commit", level = "debug")]
    fn commit(&self, poly: &MultilinearExtension) -> Result<(MatrixCommitment, MatrixCommitted)> {
        ensure!(
            poly.field() == self.base && poly.n_vars() == self.n_vars,
            "polynomial does not match the scheme parameters"
        );
        let rows: Vec<&[FieldElement]> = poly.evals().chunks(1 << self.log_cols).collect();
        let encoded_rows: Vec<Vec<FieldElement>> = rows
            .par_iter()
            .map(|row| self.code.encode(&self.alphabet.cast_slice(row)))
            .collect::<Result<_>>()?;
        let encoded_cols = transpose(&encoded_rows);

        let (vcs_commitment, vcs_committed) = self.vcs.commit(&encoded_cols)?;
        Ok((
            MatrixCommitment { vcs: vcs_commitment },
            MatrixCommitted { vcs: vcs_committed, encoded_cols },
        ))
    }

    #[instrument(skip_all, name = "block_prove", level = "debug")]
    fn prove_evaluation(
        &self,
        challenger: &mut Challenger,
        committed: &MatrixCommitted,
        poly: &MultilinearExtension,
        query: &[FieldElement],
    ) -> Result<MatrixProof> {
        ensure!(
            poly.field() == self.base && poly.n_vars() == self.n_vars,
            "polynomial does not match the scheme parameters"
        );
        self.check_query(query)?;

        let high = MultilinearQuery::with_full_query(&query[self.log_cols..], self.ext);
        let t_prime = poly.evaluate_partial_high(&high);

        challenger.observe_elems(t_prime.evals());
        let openings = (0..self.n_challenges)
            .map(|_| challenger.sample_bits(self.vcs.log_len()))
            .map(|index| ColumnOpening {
                column: committed.encoded_cols[index].clone(),
                branch: self.vcs.prove_opening(&committed.vcs, index),
            })
            .collect();

        Ok(MatrixProof { t_prime, openings })
    }

    #[instrument(skip_all, name = "block_verify", level = "debug")]
    fn verify_evaluation(
        &self,
        challenger: &mut Challenger,
        commitment: &MatrixCommitment,
        query: &[FieldElement],
        proof: &MatrixProof,
        value: FieldElement,
    ) -> Result<bool> {
        self.check_query(query)?;
        if proof.t_prime.field() != self.ext
            || proof.t_prime.n_vars() != self.log_cols
            || proof.openings.len() != self.n_challenges
        {
            return Ok(false);
        }

        // the scalar claim is t' at the low coordinates
        let low = MultilinearQuery::with_full_query(&query[..self.log_cols], self.ext);
        if proof.t_prime.evaluate(&low) != value {
            return Ok(false);
        }

        // regroup t' into tensor-algebra symbols over (F, FA, FE) so the
        // encoding acts on the same F-coordinate layout as the packed rows
        let packed: Vec<TowerAlgebra> = proof
            .t_prime
            .evals()
            .chunks(self.alphabet_degree)
            .map(|group| {
                TowerAlgebra::new(self.base, self.ext, self.alphabet, group.to_vec()).transpose()
            })
            .collect();
        let u_prime = self.code.encode(&packed)?;

        let high = MultilinearQuery::with_full_query(&query[self.log_cols..], self.ext);

        challenger.observe_elems(proof.t_prime.evals());
        let challenges: Vec<usize> =
            (0..self.n_challenges).map(|_| challenger.sample_bits(self.vcs.log_len())).collect();

        // a sampled column folds against the high expansion as a sum of
        // rank-1 tensors, which must equal the encoded symbol of t'
        let columns_ok = challenges
            .par_iter()
            .zip(proof.openings.par_iter())
            .all(|(&index, opening)| {
                if opening.column.len() != 1 << self.log_rows
                    || opening.column.iter().any(|e| e.field() != self.alphabet)
                {
                    return false;
                }
                if !self.vcs.verify_opening(&commitment.vcs, index, &opening.branch, &opening.column)
                {
                    return false;
                }
                let mut lhs = TowerAlgebra::zero(self.base, self.alphabet, self.ext);
                for (&entry, &eq) in opening.column.iter().zip_eq(high.expansion()) {
                    lhs += &TowerAlgebra::from_tensor(self.base, self.alphabet, self.ext, entry, eq);
                }
                lhs == u_prime[index]
            });

        Ok(columns_ok)
    }
}
