use anyhow::{Context, ensure};
use itertools::Itertools;
use tracing::instrument;

use crate::Result;
use crate::field::{BinaryField, FieldElement};
use crate::sumcheck::{
    ReducedClaim, RoundClaim, RoundProof, SumcheckClaim, SumcheckProver, reduce_round_claim,
};
use crate::tower::TowerAlgebra;
use crate::utils::channel::Challenger;
use crate::utils::log2;
use crate::utils::mle::{MultilinearExtension, MultilinearQuery};

use super::{PcsProof, PolyCommitScheme};

/// Ring-switching wrapper: commits a K-polynomial through an inner scheme
/// over the extension L by packing deg(L/K) coefficients per L element, and
/// reduces an opening claim to an inner claim with one sum-check.
pub struct RingSwitchPcs<Inner> {
    base: BinaryField,
    ext: BinaryField,
    inner: Inner,
    n_vars: usize,
    ext_degree: usize,
}

/// The sum-check transcript plus the inner proof. `sumcheck_eval` is the
/// packed partial evaluation the round messages reduce.
pub struct RingSwitchProof<InnerProof> {
    pub round_proofs: Vec<RoundProof>,
    pub sumcheck_eval: TowerAlgebra,
    pub inner_proof: InnerProof,
}

impl<InnerProof: PcsProof> PcsProof for RingSwitchProof<InnerProof> {
    fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for round_proof in &self.round_proofs {
            for coeff in &round_proof.coeffs {
                out.extend_from_slice(&coeff.to_bytes());
            }
        }
        out.extend_from_slice(&self.sumcheck_eval.to_bytes());
        out.extend_from_slice(&self.inner_proof.serialize());
        out
    }
}

impl<Inner: PolyCommitScheme> RingSwitchPcs<Inner> {
    pub fn new(base: BinaryField, ext: BinaryField, inner: Inner, n_vars: usize) -> Result<Self> {
        ensure!(ext.is_extension_of(&base), "{ext} does not extend {base}");
        let ext_degree = ext.degree(base);
        ensure!(log2(ext_degree) < n_vars, "arity {n_vars} too small to pack into {ext}");
        ensure!(
            inner.n_vars() == n_vars - log2(ext_degree),
            "inner scheme arity {} does not match the packed arity {}",
            inner.n_vars(),
            n_vars - log2(ext_degree)
        );
        Ok(Self { base, ext, inner, n_vars, ext_degree })
    }

    fn check_query(&self, query: &[FieldElement]) -> Result<()> {
        ensure!(query.len() == self.n_vars, "query arity {} != {}", query.len(), self.n_vars);
        ensure!(query.iter().all(|e| e.field() == self.ext), "query must live in {}", self.ext);
        Ok(())
    }

    fn pack(&self, poly: &MultilinearExtension) -> MultilinearExtension {
        MultilinearExtension::from_evals(self.ext.cast_slice(poly.evals()), self.ext)
    }
}

impl<Inner: PolyCommitScheme> PolyCommitScheme for RingSwitchPcs<Inner> {
    type Commitment = Inner::Commitment;
    type Committed = Inner::Committed;
    type Proof = RingSwitchProof<Inner::Proof>;

    fn n_vars(&self) -> usize {
        self.n_vars
    }

    #[instrument(skip_all, name = "ring_switch_commit", level = "debug")]
    fn commit(&self, poly: &MultilinearExtension) -> Result<(Self::Commitment, Self::Committed)> {
        ensure!(
            poly.field() == self.base && poly.n_vars() == self.n_vars,
            "polynomial does not match the scheme parameters"
        );
        self.inner.commit(&self.pack(poly))
    }

    #[instrument(skip_all, name = "ring_switch_prove", level = "debug")]
    fn prove_evaluation(
        &self,
        challenger: &mut Challenger,
        committed: &Self::Committed,
        poly: &MultilinearExtension,
        query: &[FieldElement],
    ) -> Result<Self::Proof> {
        ensure!(
            poly.field() == self.base && poly.n_vars() == self.n_vars,
            "polynomial does not match the scheme parameters"
        );
        self.check_query(query)?;

        let packed = self.pack(poly);
        let high_query = &query[log2(self.ext_degree)..];

        // the packed partial evaluation doubles as the sum-check claim:
        // row b holds the fold of the b-th K-coordinate slice
        let expanded = MultilinearQuery::with_full_query(high_query, self.ext);
        let partial = poly.evaluate_partial_high(&expanded);
        let sumcheck_eval =
            TowerAlgebra::new(self.base, self.ext, self.ext, partial.evals().to_vec());

        challenger.observe_algebra(&sumcheck_eval);

        let claim =
            SumcheckClaim { eval_point: high_query.to_vec(), eval: sumcheck_eval.clone() };
        let mut prover = SumcheckProver::new(self.base, self.ext, claim, packed.clone())?;

        let mut prev_challenge = None;
        let mut round_proofs = Vec::with_capacity(packed.n_vars());
        for _ in 0..packed.n_vars() {
            let round_proof = prover.execute_round(prev_challenge)?;
            for coeff in &round_proof.coeffs {
                challenger.observe_algebra(coeff);
            }
            prev_challenge = Some(challenger.sample(self.ext));
            round_proofs.push(round_proof);
        }
        let last_challenge = prev_challenge.context("sum-check ran no rounds")?;
        let reduced = prover.finalize(last_challenge)?;

        let inner_proof =
            self.inner.prove_evaluation(challenger, committed, &packed, &reduced.eval_point)?;

        Ok(RingSwitchProof { round_proofs, sumcheck_eval, inner_proof })
    }

    #[instrument(skip_all, name = "ring_switch_verify", level = "debug")]
    fn verify_evaluation(
        &self,
        challenger: &mut Challenger,
        commitment: &Self::Commitment,
        query: &[FieldElement],
        proof: &Self::Proof,
        value: FieldElement,
    ) -> Result<bool> {
        self.check_query(query)?;
        let (low_query, high_query) = query.split_at(log2(self.ext_degree));

        if !proof.sumcheck_eval.is_over(self.base, self.ext, self.ext) {
            return Ok(false);
        }

        challenger.observe_algebra(&proof.sumcheck_eval);

        // the claim rows interpolate the scalar claim at the low coordinates
        let low = MultilinearQuery::with_full_query(low_query, self.ext);
        let claim_rows =
            MultilinearExtension::from_evals(proof.sumcheck_eval.elems().to_vec(), self.ext);
        if claim_rows.evaluate(&low) != value {
            return Ok(false);
        }

        if proof.round_proofs.len() != high_query.len() {
            return Ok(false);
        }

        let mut claim = RoundClaim {
            partial_point: Vec::new(),
            current_round_sum: proof.sumcheck_eval.clone(),
        };
        for (z_i, round_proof) in high_query.iter().zip_eq(&proof.round_proofs) {
            if round_proof.coeffs.len() != 1
                || !round_proof.coeffs[0].is_over(self.base, self.ext, self.ext)
            {
                return Ok(false);
            }
            for coeff in &round_proof.coeffs {
                challenger.observe_algebra(coeff);
            }
            let challenge = challenger.sample(self.ext);
            claim = reduce_round_claim(*z_i, &claim, challenge, round_proof);
        }
        let reduced =
            ReducedClaim { eval_point: claim.partial_point, eval: claim.current_round_sum };

        // the residual must be rank-1 with a trivial vertical slot
        let Ok(inner_value) = reduced.eval.transpose().try_extract_vertical() else {
            return Ok(false);
        };

        self.inner.verify_evaluation(
            challenger,
            commitment,
            &reduced.eval_point,
            &proof.inner_proof,
            inner_value,
        )
    }
}
