use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_profile::init_tracing;

use binius_pcs::{
    Result,
    field::{BF8, BF32, BF128, BinaryField},
    pcs::{PcsCommitment, PolyCommitScheme, basic::BasicPcs, block::BlockPcs, ring_switch::RingSwitchPcs},
    utils::{
        channel::Challenger,
        log2,
        mle::{MultilinearExtension, MultilinearQuery},
    },
};

const SEED: u64 = 123;

fn main() -> Result<()> {
    let _guard = init_tracing().expect("failed to initialize tracing");

    let basic = BasicPcs::new(BF8, BF128, 11, 5, 2, 64)?;
    run("basic", &basic, BF8, BF128, 11)?;

    let block = BlockPcs::new(BF8, BF32, BF128, 11, 3, 2, 64)?;
    run("block", &block, BF8, BF128, 11)?;

    let n_vars = 11;
    let packed_vars = n_vars - log2(BF128.degree(BF8));
    let inner = BasicPcs::new(BF128, BF128, packed_vars, 3, 2, 64)?;
    let ring_switch = RingSwitchPcs::new(BF8, BF128, inner, n_vars)?;
    run("ring-switching", &ring_switch, BF8, BF128, n_vars)?;

    Ok(())
}

fn run<P: PolyCommitScheme>(
    name: &str,
    pcs: &P,
    base: BinaryField,
    ext: BinaryField,
    n_vars: usize,
) -> Result<()> {
    println!("--------------|| {name} pcs, {n_vars} variables ||--------------");

    let mut rng = StdRng::seed_from_u64(SEED);
    let poly = MultilinearExtension::from_evals(
        (0..1usize << n_vars).map(|_| base.random_element(&mut rng)).collect(),
        base,
    );
    let query: Vec<_> = (0..n_vars).map(|_| ext.random_element(&mut rng)).collect();
    let value = poly.evaluate(&MultilinearQuery::with_full_query(&query, ext));

    let time = Instant::now();
    let (commitment, committed) = pcs.commit(&poly)?;
    println!("commit: {:?}", time.elapsed());

    let mut challenger = Challenger::new();
    challenger.observe_bytes(&commitment.serialize());
    let mut prover_challenger = challenger.clone();
    let mut verifier_challenger = challenger;

    let time = Instant::now();
    let proof = pcs.prove_evaluation(&mut prover_challenger, &committed, &poly, &query)?;
    println!("prove: {:?}", time.elapsed());

    let time = Instant::now();
    let ok = pcs.verify_evaluation(&mut verifier_challenger, &commitment, &query, &proof, value)?;
    println!("verify: {:?}\n", time.elapsed());
    anyhow::ensure!(ok, "{name} verification failed");

    Ok(())
}
