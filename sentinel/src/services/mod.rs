pub mod prometheus;
pub mod telegram;
