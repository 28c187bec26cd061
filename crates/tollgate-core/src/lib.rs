pub mod counter;
pub mod envelope;
pub mod errors;
pub mod policy;
pub mod session;
pub mod types;
