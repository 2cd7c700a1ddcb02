//! Atomic types of the czip encoder.

#![warn(missing_docs)]

pub mod bytes;
pub mod num;

mod types;

pub use types::{Address, Bytes32, ParseHexError};

/// Size of an EVM word, in bytes.
pub const WORD_SIZE: usize = 32;
