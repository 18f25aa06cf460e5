use anyhow::{Context, ensure};

use crate::Result;
use crate::field::{BinaryField, FieldElement};
use crate::tower::TowerAlgebra;
use crate::utils::mle::{MultilinearExtension, MultilinearQuery};

/// Claim that sum over the hypercube of eq(z, x) (x) W(x) equals the given
/// tensor-algebra value, for the witness multilinear W.
#[derive(Clone, Debug)]
pub struct SumcheckClaim {
    pub eval_point: Vec<FieldElement>,
    pub eval: TowerAlgebra,
}

/// Running claim after some rounds: the challenges bound so far and the sum
/// over the remaining variables.
#[derive(Clone, Debug)]
pub struct RoundClaim {
    pub partial_point: Vec<FieldElement>,
    pub current_round_sum: TowerAlgebra,
}

/// Round message: the round polynomial is degree 1, and its constant term is
/// recoverable from the claim, so only the linear coefficient is sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundProof {
    pub coeffs: Vec<TowerAlgebra>,
}

/// Output of the reduction: an evaluation claim at the challenge point.
#[derive(Clone, Debug)]
pub struct ReducedClaim {
    pub eval_point: Vec<FieldElement>,
    pub eval: TowerAlgebra,
}

/// Fold a verifier challenge into the running claim. The eq factor of the
/// bound variable contributes z_i on the vertical side, the witness fold
/// contributes the challenge on the horizontal side.
pub fn reduce_round_claim(
    z_i: FieldElement,
    claim: &RoundClaim,
    challenge: FieldElement,
    proof: &RoundProof,
) -> RoundClaim {
    let linear = &proof.coeffs[0];
    let constant = claim.current_round_sum.clone() + linear.scale_vertical(z_i);
    let mut partial_point = claim.partial_point.clone();
    partial_point.push(challenge);
    RoundClaim {
        partial_point,
        current_round_sum: constant + linear.scale_horizontal(challenge),
    }
}

/// Prover for the eq-weighted sum-check. Keeps the equality-indicator table
/// of the unbound variables and halves it each round instead of recomputing.
pub struct SumcheckProver {
    base: BinaryField,
    ext: BinaryField,
    n_vars: usize,
    round: usize,
    eval_point: Vec<FieldElement>,
    round_claim: RoundClaim,
    last_round_proof: Option<RoundProof>,
    eq_ind: Vec<FieldElement>,
    witness: MultilinearExtension,
}

impl SumcheckProver {
    pub fn new(
        base: BinaryField,
        ext: BinaryField,
        claim: SumcheckClaim,
        witness: MultilinearExtension,
    ) -> Result<Self> {
        ensure!(ext.is_extension_of(&base), "{ext} does not extend {base}");
        ensure!(witness.field() == ext, "witness must live in {ext}");
        ensure!(witness.n_vars() > 0, "sum-check needs at least one variable");
        ensure!(
            claim.eval_point.len() == witness.n_vars(),
            "claim arity {} does not match witness arity {}",
            claim.eval_point.len(),
            witness.n_vars()
        );

        // the first coordinate's eq factor is handled analytically per round
        let eq_ind =
            MultilinearQuery::with_full_query(&claim.eval_point[1..], ext).expansion().to_vec();

        Ok(Self {
            base,
            ext,
            n_vars: witness.n_vars(),
            round: 0,
            eval_point: claim.eval_point,
            round_claim: RoundClaim { partial_point: Vec::new(), current_round_sum: claim.eval },
            last_round_proof: None,
            eq_ind,
            witness,
        })
    }

    fn fold_eq_ind(&mut self) {
        self.eq_ind = self.eq_ind.chunks_exact(2).map(|pair| pair[0] + pair[1]).collect();
    }

    fn fold_witness(&mut self, challenge: FieldElement) {
        let partial = MultilinearQuery::with_full_query(&[challenge], self.ext);
        self.witness = self.witness.evaluate_partial_low(&partial);
    }

    fn reduce_claim(&mut self, prev_challenge: FieldElement) -> Result<()> {
        let proof = self
            .last_round_proof
            .as_ref()
            .context("no round executed before claim reduction")?;
        let z = self.eval_point[self.round - 1];
        self.round_claim = reduce_round_claim(z, &self.round_claim, prev_challenge, proof);
        Ok(())
    }

    /// Run one round: fold in the previous challenge if there is one, then
    /// emit the linear coefficient of this round's polynomial.
    pub fn execute_round(&mut self, prev_challenge: Option<FieldElement>) -> Result<RoundProof> {
        ensure!(self.round < self.n_vars, "all rounds already executed");
        ensure!(
            (self.round == 0) == prev_challenge.is_none(),
            "every round after the first needs the previous challenge"
        );

        if let Some(challenge) = prev_challenge {
            self.fold_witness(challenge);
            self.fold_eq_ind();
            self.reduce_claim(challenge)?;
        }

        let rd_vars = self.n_vars - self.round;
        let mut eval_1 = TowerAlgebra::zero(self.base, self.ext, self.ext);
        for i in 0..1usize << (rd_vars - 1) {
            eval_1 += &TowerAlgebra::from_tensor(
                self.base,
                self.ext,
                self.ext,
                self.eq_ind[i],
                self.witness.eval_on_hypercube(i << 1 | 1),
            );
        }

        // eval_0 follows from the claim: S = (1 - z) * eval_0 + z * eval_1
        let z = self.eval_point[self.round];
        let denom_inv = (self.ext.one() + z).inv();
        let eval_0 = (self.round_claim.current_round_sum.clone() + eval_1.scale_vertical(z))
            .scale_vertical(denom_inv);

        let proof = RoundProof { coeffs: vec![eval_1 + eval_0] };
        self.last_round_proof = Some(proof.clone());
        self.round += 1;
        Ok(proof)
    }

    pub fn finalize(mut self, prev_challenge: FieldElement) -> Result<ReducedClaim> {
        ensure!(self.round == self.n_vars, "sum-check still has rounds to run");
        self.reduce_claim(prev_challenge)?;
        Ok(ReducedClaim {
            eval_point: self.round_claim.partial_point,
            eval: self.round_claim.current_round_sum,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::thread_rng;

    use super::*;
    use crate::field::{BF8, BF128};
    use crate::utils::channel::Challenger;

    #[test]
    fn honest_run_reduces_to_the_witness_evaluation() {
        let mut rng = thread_rng();
        let (base, ext) = (BF8, BF128);
        let k = 4;

        let witness = MultilinearExtension::from_evals(
            (0..1 << k).map(|_| ext.random_element(&mut rng)).collect(),
            ext,
        );
        let z: Vec<FieldElement> = (0..k).map(|_| ext.random_element(&mut rng)).collect();

        let eq = MultilinearQuery::with_full_query(&z, ext);
        let mut claimed_sum = TowerAlgebra::zero(base, ext, ext);
        for i in 0..1usize << k {
            claimed_sum += &TowerAlgebra::from_tensor(
                base,
                ext,
                ext,
                eq.expansion()[i],
                witness.eval_on_hypercube(i),
            );
        }

        let claim = SumcheckClaim { eval_point: z.clone(), eval: claimed_sum.clone() };
        let mut prover = SumcheckProver::new(base, ext, claim, witness.clone()).unwrap();

        let mut prover_channel = Challenger::from_seed(b"sumcheck test");
        let mut verifier_channel = prover_channel.clone();

        let mut prev = None;
        let mut round_proofs = Vec::new();
        let mut challenges = Vec::new();
        for _ in 0..k {
            let proof = prover.execute_round(prev).unwrap();
            for coeff in &proof.coeffs {
                prover_channel.observe_algebra(coeff);
            }
            let r = prover_channel.sample(ext);
            challenges.push(r);
            prev = Some(r);
            round_proofs.push(proof);
        }
        let reduced = prover.finalize(prev.unwrap()).unwrap();

        // verifier replay arrives at the same claim
        let mut replay =
            RoundClaim { partial_point: Vec::new(), current_round_sum: claimed_sum };
        for (z_i, proof) in z.iter().zip(&round_proofs) {
            for coeff in &proof.coeffs {
                verifier_channel.observe_algebra(coeff);
            }
            let r = verifier_channel.sample(ext);
            replay = reduce_round_claim(*z_i, &replay, r, proof);
        }
        assert_eq!(replay.partial_point, reduced.eval_point);
        assert_eq!(replay.current_round_sum, reduced.eval);

        // the residual is 1 (x) W(r), so transposing extracts W(r)
        let expected = witness.evaluate(&MultilinearQuery::with_full_query(&challenges, ext));
        let extracted = reduced.eval.transpose().try_extract_vertical().unwrap();
        assert_eq!(extracted, expected);
        assert_eq!(reduced.eval, TowerAlgebra::from_horizontal(base, ext, ext, expected));
    }

    #[test]
    fn round_count_is_enforced() {
        let mut rng = thread_rng();
        let (base, ext) = (BF8, BF128);
        let witness = MultilinearExtension::from_evals(
            (0..4).map(|_| ext.random_element(&mut rng)).collect(),
            ext,
        );
        let z: Vec<FieldElement> = (0..2).map(|_| ext.random_element(&mut rng)).collect();
        let claim = SumcheckClaim {
            eval_point: z,
            eval: TowerAlgebra::zero(base, ext, ext),
        };
        let mut prover = SumcheckProver::new(base, ext, claim, witness).unwrap();

        assert!(prover.execute_round(Some(ext.one())).is_err());
        let _ = prover.execute_round(None).unwrap();
        assert!(prover.execute_round(None).is_err());
        let _ = prover.execute_round(Some(ext.one())).unwrap();
        assert!(prover.finalize(ext.one()).is_ok());
    }
}
