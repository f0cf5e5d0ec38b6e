pub mod models;
pub mod passport_validator;
pub mod processing;
pub mod utils;
pub mod validation;
pub mod verification;

pub use models::{ClaimedIdentity, Verdict, VerifierConfig};
pub use passport_validator::PassportValidator;
pub use utils::PassportError;
