use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::field::{BF4, BF8, BF16, BF32, BF64, BF128, BinaryField, FieldElement};
use crate::pcs::basic::BasicPcs;
use crate::pcs::block::BlockPcs;
use crate::pcs::ring_switch::{RingSwitchPcs, RingSwitchProof};
use crate::pcs::{MatrixProof, PcsCommitment, PcsProof, PolyCommitScheme};
use crate::tower::TowerAlgebra;
use crate::utils::channel::Challenger;
use crate::utils::log2;
use crate::utils::mle::{MultilinearExtension, MultilinearQuery};

struct Instance<P: PolyCommitScheme> {
    pcs: P,
    query: Vec<FieldElement>,
    value: FieldElement,
    commitment: P::Commitment,
    proof: P::Proof,
    verifier_challenger: Challenger,
}

fn prepare<P: PolyCommitScheme>(
    pcs: P,
    base: BinaryField,
    ext: BinaryField,
    n_vars: usize,
    seed: u64,
) -> Instance<P> {
    let mut rng = StdRng::seed_from_u64(seed);
    let poly = MultilinearExtension::from_evals(
        (0..1usize << n_vars).map(|_| base.random_element(&mut rng)).collect(),
        base,
    );
    let query: Vec<FieldElement> = (0..n_vars).map(|_| ext.random_element(&mut rng)).collect();
    let value = poly.evaluate(&MultilinearQuery::with_full_query(&query, ext));

    let (commitment, committed) = pcs.commit(&poly).unwrap();

    let mut challenger = Challenger::new();
    challenger.observe_bytes(&commitment.serialize());
    let mut prover_challenger = challenger.clone();
    let verifier_challenger = challenger;

    let proof = pcs.prove_evaluation(&mut prover_challenger, &committed, &poly, &query).unwrap();

    Instance { pcs, query, value, commitment, proof, verifier_challenger }
}

impl<P: PolyCommitScheme> Instance<P> {
    fn verify(&self) -> bool {
        let mut challenger = self.verifier_challenger.clone();
        self.pcs
            .verify_evaluation(&mut challenger, &self.commitment, &self.query, &self.proof, self.value)
            .unwrap()
    }

    fn verify_with(&self, proof: &P::Proof, value: FieldElement) -> bool {
        let mut challenger = self.verifier_challenger.clone();
        self.pcs
            .verify_evaluation(&mut challenger, &self.commitment, &self.query, proof, value)
            .unwrap()
    }
}

fn basic_instance(seed: u64) -> Instance<BasicPcs> {
    let pcs = BasicPcs::new(BF8, BF128, 11, 5, 2, 64).unwrap();
    prepare(pcs, BF8, BF128, 11, seed)
}

fn block_instance(seed: u64) -> Instance<BlockPcs> {
    let pcs = BlockPcs::new(BF8, BF32, BF128, 11, 3, 2, 64).unwrap();
    prepare(pcs, BF8, BF128, 11, seed)
}

fn ring_switch_instance(seed: u64) -> Instance<RingSwitchPcs<BasicPcs>> {
    let n_vars = 11;
    let packed_vars = n_vars - log2(BF128.degree(BF8));
    let inner = BasicPcs::new(BF128, BF128, packed_vars, 3, 2, 64).unwrap();
    let pcs = RingSwitchPcs::new(BF8, BF128, inner, n_vars).unwrap();
    prepare(pcs, BF8, BF128, n_vars, seed)
}

#[test]
fn basic_pcs_accepts_honest_proof() {
    assert!(basic_instance(123).verify());
}

#[test]
fn block_pcs_accepts_honest_proof() {
    assert!(block_instance(123).verify());
}

#[test]
fn ring_switch_pcs_accepts_honest_proof() {
    assert!(ring_switch_instance(123).verify());
}

#[test]
fn wrong_value_rejected() {
    let instance = basic_instance(123);
    assert!(!instance.verify_with(&instance.proof, instance.value + BF128.one()));

    let instance = block_instance(123);
    assert!(!instance.verify_with(&instance.proof, instance.value + BF128.one()));

    let instance = ring_switch_instance(123);
    assert!(!instance.verify_with(&instance.proof, instance.value + BF128.one()));
}

fn tamper_matrix_branch(proof: &MatrixProof) -> MatrixProof {
    let mut tampered = proof.clone();
    tampered.openings[0].branch.branch[0].0[0] ^= 1;
    tampered
}

fn tamper_matrix_column(proof: &MatrixProof) -> MatrixProof {
    let mut tampered = proof.clone();
    let entry = tampered.openings[0].column[0];
    tampered.openings[0].column[0] = entry + entry.field().one();
    tampered
}

fn tamper_t_prime(proof: &MatrixProof) -> MatrixProof {
    let mut evals = proof.t_prime.evals().to_vec();
    evals[0] += proof.t_prime.field().one();
    MatrixProof {
        t_prime: MultilinearExtension::from_evals(evals, proof.t_prime.field()),
        openings: proof.openings.clone(),
    }
}

#[test]
fn basic_pcs_rejects_tampered_proofs() {
    let instance = basic_instance(123);
    assert!(!instance.verify_with(&tamper_matrix_branch(&instance.proof), instance.value));
    assert!(!instance.verify_with(&tamper_matrix_column(&instance.proof), instance.value));
    assert!(!instance.verify_with(&tamper_t_prime(&instance.proof), instance.value));
}

#[test]
fn block_pcs_rejects_tampered_proofs() {
    let instance = block_instance(123);
    assert!(!instance.verify_with(&tamper_matrix_branch(&instance.proof), instance.value));
    assert!(!instance.verify_with(&tamper_matrix_column(&instance.proof), instance.value));
    assert!(!instance.verify_with(&tamper_t_prime(&instance.proof), instance.value));
}

#[test]
fn ring_switch_pcs_rejects_tampered_proofs() {
    let instance = ring_switch_instance(123);
    let proof = &instance.proof;

    // inner Merkle branch
    let tampered = RingSwitchProof {
        round_proofs: proof.round_proofs.clone(),
        sumcheck_eval: proof.sumcheck_eval.clone(),
        inner_proof: tamper_matrix_branch(&proof.inner_proof),
    };
    assert!(!instance.verify_with(&tampered, instance.value));

    // sum-check claim
    let mut elems = proof.sumcheck_eval.elems().to_vec();
    elems[0] += BF128.one();
    let tampered = RingSwitchProof {
        round_proofs: proof.round_proofs.clone(),
        sumcheck_eval: TowerAlgebra::new(BF8, BF128, BF128, elems),
        inner_proof: proof.inner_proof.clone(),
    };
    assert!(!instance.verify_with(&tampered, instance.value));

    // round message
    let mut round_proofs = proof.round_proofs.clone();
    let mut elems = round_proofs[0].coeffs[0].elems().to_vec();
    elems[0] += BF128.one();
    round_proofs[0].coeffs[0] = TowerAlgebra::new(BF8, BF128, BF128, elems);
    let tampered = RingSwitchProof {
        round_proofs,
        sumcheck_eval: proof.sumcheck_eval.clone(),
        inner_proof: proof.inner_proof.clone(),
    };
    assert!(!instance.verify_with(&tampered, instance.value));
}

#[test]
fn wrong_query_point_rejected() {
    let instance = basic_instance(7);
    let mut query = instance.query.clone();
    query[3] += BF128.one();
    let mut challenger = instance.verifier_challenger.clone();
    let ok = instance
        .pcs
        .verify_evaluation(&mut challenger, &instance.commitment, &query, &instance.proof, instance.value)
        .unwrap();
    assert!(!ok);
}

#[test]
fn basic_pcs_other_towers() {
    for (base, ext, n_vars, log_rows, seed) in [
        (BF16, BF64, 8, 4, 1u64),
        (BF8, BF64, 9, 5, 2),
        (BF32, BF128, 10, 6, 3),
    ] {
        let pcs = BasicPcs::new(base, ext, n_vars, log_rows, 2, 16).unwrap();
        assert!(prepare(pcs, base, ext, n_vars, seed).verify(), "{base} in {ext} failed");
    }
}

#[test]
fn block_pcs_other_towers() {
    for (base, alphabet, ext, n_vars, log_rows, seed) in [
        (BF8, BF16, BF64, 9, 4, 4u64),
        (BF4, BF16, BF128, 10, 4, 5),
    ] {
        let pcs = BlockPcs::new(base, alphabet, ext, n_vars, log_rows, 2, 16).unwrap();
        assert!(prepare(pcs, base, ext, n_vars, seed).verify(), "{base}/{alphabet} failed");
    }
}

#[test]
fn ring_switch_over_block() {
    let (base, ext) = (BF8, BF128);
    let n_vars = 11;
    let packed_vars = n_vars - log2(ext.degree(base));
    let inner = BlockPcs::new(ext, ext, ext, packed_vars, 3, 2, 16).unwrap();
    let pcs = RingSwitchPcs::new(base, ext, inner, n_vars).unwrap();
    assert!(prepare(pcs, base, ext, n_vars, 6).verify());
}

#[test]
fn proof_serialization_layout() {
    let instance = basic_instance(123);
    // 2^6 t' evaluations of 18 bytes, then 64 openings of a 32-entry column
    // (3 bytes per entry) plus an 8-hash branch
    let expected = 64 * 18 + 64 * (32 * 3 + 8 * 32);
    assert_eq!(instance.proof.serialize().len(), expected);

    let instance = ring_switch_instance(123);
    // 7 round coefficients and the claim, 16 rows of 18 bytes each, then the
    // inner proof: 2^4 t' evaluations plus 64 openings over 2^6 columns
    let expected = 7 * 16 * 18 + 16 * 18 + (16 * 18 + 64 * (8 * 18 + 6 * 32));
    assert_eq!(instance.proof.serialize().len(), expected);
}

#[test]
fn mismatched_parameters_rejected() {
    assert!(BasicPcs::new(BF128, BF8, 10, 5, 2, 16).is_err());
    // alphabet ceiling: log_cols + log_inv_rate > bit length of BF8
    assert!(BasicPcs::new(BF8, BF128, 12, 2, 2, 16).is_err());
    assert!(BlockPcs::new(BF32, BF8, BF128, 10, 5, 2, 16).is_err());
    let inner = BasicPcs::new(BF128, BF128, 5, 2, 2, 16).unwrap();
    assert!(RingSwitchPcs::new(BF8, BF128, inner, 11).is_err());
}
