pub mod config;
pub mod logger;
pub mod verdict;

pub use verdict::Verdict;
