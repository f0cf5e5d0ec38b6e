pub mod expiry;
pub mod mrz;
pub mod similarity;

pub use expiry::ExpiryValidator;
pub use mrz::MrzParser;
pub use similarity::Similarity;
