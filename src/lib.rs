pub mod field;
pub mod ntt;
pub mod pcs;
pub mod sumcheck;
pub mod tower;
pub mod utils;

#[cfg(test)]
mod tests;

pub type Result<T> = anyhow::Result<T>;
