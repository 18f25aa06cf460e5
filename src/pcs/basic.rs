use anyhow::ensure;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;

use crate::Result;
use crate::field::{BinaryField, FieldElement};
use crate::utils::channel::Challenger;
use crate::utils::code::ReedSolomonCode;
use crate::utils::merkle::MerkleTreeVcs;
use crate::utils::mle::{MultilinearExtension, MultilinearQuery};
use crate::utils::{inner_product, transpose};

use super::{ColumnOpening, MatrixCommitment, MatrixCommitted, MatrixProof, PolyCommitScheme};

/// PCS committing over K with codeword alphabet K itself; openings are
/// checked at challenge points drawn from the extension L.
pub struct BasicPcs {
    base: BinaryField,
    ext: BinaryField,
    n_vars: usize,
    log_rows: usize,
    log_cols: usize,
    n_challenges: usize,
    code: ReedSolomonCode,
    vcs: MerkleTreeVcs,
}

impl BasicPcs {
    pub fn new(
        base: BinaryField,
        ext: BinaryField,
        n_vars: usize,
        log_rows: usize,
        log_inv_rate: usize,
        n_challenges: usize,
    ) -> Result<Self> {
        ensure!(ext.is_extension_of(&base), "{ext} does not extend {base}");
        ensure!(log_rows <= n_vars, "log_rows {log_rows} exceeds the arity {n_vars}");
        let log_cols = n_vars - log_rows;
        ensure!(
            log_cols + log_inv_rate <= base.bit_length() as usize,
            "codeword domain 2^{} does not fit the {base} alphabet",
            log_cols + log_inv_rate
        );
        let code = ReedSolomonCode::new(log_cols, log_inv_rate, base)?;
        let vcs = MerkleTreeVcs::new(code.log_length());
        Ok(Self { base, ext, n_vars, log_rows, log_cols, n_challenges, code, vcs })
    }

    fn check_query(&self, query: &[FieldElement]) -> Result<()> {
        ensure!(query.len() == self.n_vars, "query arity {} != {}", query.len(), self.n_vars);
        ensure!(query.iter().all(|e| e.field() == self.ext), "query must live in {}", self.ext);
        Ok(())
    }
}

impl PolyCommitScheme for BasicPcs {
    type Commitment = MatrixCommitment;
    type Committed = MatrixCommitted;
    type Proof = MatrixProof;

    fn n_vars(&self) -> usize {
        self.n_vars
    }

    #[instrument(skip_all, name = "basic_commit", level = "debug")]
    fn commit(&self, poly: &MultilinearExtension) -> Result<(MatrixCommitment, MatrixCommitted)> {
        ensure!(
            poly.field() == self.base && poly.n_vars() == self.n_vars,
            "polynomial does not match the scheme parameters"
        );
        let rows: Vec<&[FieldElement]> = poly.evals().chunks(1 << self.log_cols).collect();
        let encoded_rows: Vec<Vec<FieldElement>> =
            rows.par_iter().map(|row| self.code.encode(row)).collect::<Result<_>>()?;
        let encoded_cols = transpose(&encoded_rows);

        let (vcs_commitment, vcs_committed) = self.vcs.commit(&encoded_cols)?;
        Ok((
            MatrixCommitment { vcs: vcs_commitment },
            MatrixCommitted { vcs: vcs_committed, encoded_cols },
        ))
    }

    #[instrument(skip_all, name = "basic_prove", level = "debug")]
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

    #[instrument(skip_all, name = "basic_verify", level = "debug")]
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

        // re-encode the claimed row combination over the same code
        let encoded_t_prime = self.code.encode(proof.t_prime.evals())?;
        let high = MultilinearQuery::with_full_query(&query[self.log_cols..], self.ext);

        challenger.observe_elems(proof.t_prime.evals());
        let challenges: Vec<usize> =
            (0..self.n_challenges).map(|_| challenger.sample_bits(self.vcs.log_len())).collect();

        // each sampled column must open under the root and fold to the
        // matching codeword symbol of t'
        let columns_ok = challenges
            .par_iter()
            .zip(proof.openings.par_iter())
            .all(|(&index, opening)| {
                opening.column.len() == 1 << self.log_rows
                    && self.vcs.verify_opening(&commitment.vcs, index, &opening.branch, &opening.column)
                    && inner_product(high.expansion(), &opening.column, self.ext)
                        == encoded_t_prime[index]
            });
        if !columns_ok {
            return Ok(false);
        }

        // the scalar claim is t' at the low coordinates
        let low = MultilinearQuery::with_full_query(&query[..self.log_cols], self.ext);
        Ok(proof.t_prime.evaluate(&low) == value)
    }
}
