pub mod cross_field;

pub use cross_field::CrossFieldVerifier;
