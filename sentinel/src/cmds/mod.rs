pub mod seeds;
pub mod start;
pub mod txgenerate;
