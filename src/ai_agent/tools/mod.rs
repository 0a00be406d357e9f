pub mod liquidity;
pub mod ratios;
