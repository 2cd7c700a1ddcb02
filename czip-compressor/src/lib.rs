//! czip calldata compression encoder.
//!
//! The encoder turns EVM calldata into a compact flag stream that the
//! companion on-chain decompressor expands back into the original bytes. A
//! caller seeds a [`Buffer`] with a [`czip_asm::Method`] byte, drives one of
//! the composite encoders ([`Buffer::write_bytes`], [`Buffer::write_calls`],
//! [`Buffer::write_sequence_execute`], ...) and reads the committed stream
//! with [`Buffer::data`].
//!
//! Encoding is greedy: every value is matched against an ordered list of
//! representations (literals, powers, mirrors of earlier flags, calldata
//! copies, contract-storage indexes, raw bytes) and the first legal match
//! wins. Back-references make the buffer stateful, so a buffer belongs to
//! exactly one encoding job.

#![warn(missing_docs)]

pub mod buffer;
pub mod bytes4;
pub mod cache;
pub mod contract;
pub mod rpc;

mod encode;
mod error;
mod sequence;
mod serde_hex;
mod tx;

pub use buffer::{Buffer, EncodeType, Indexes, Snapshot};
pub use error::EncodeError;
pub use tx::{Transaction, TxFields};
