//! CLI command implementations.

pub mod dns;
pub mod export;
pub mod finalize;
pub mod keygen;
pub mod order;
pub mod orders;
