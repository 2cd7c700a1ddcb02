//! The output buffer and its back-reference state.

use std::collections::HashMap;
use std::sync::Arc;

use czip_asm::{AllowOpcodes, Method};

/// How a flag interacts with the decompressor's persistent state.
///
/// The variants form a total order with `WriteStorage` on top; composite
/// encoders fold the types of their children with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EncodeType {
    /// The flag produces its value from the stream alone.
    Stateless,
    /// The flag points at an earlier flag or at earlier calldata.
    Mirror,
    /// The flag reads one of the contract's index tables.
    ReadStorage,
    /// The flag appends to one of the contract's index tables.
    WriteStorage,
}

/// Key→index tables mirrored from the decompressor contract's storage.
///
/// Keys are the raw value bytes (addresses padded to 32); indexes are
/// 1-based positions in the on-chain table, with 0 meaning "absent".
#[derive(Debug, Default, Clone)]
pub struct Indexes {
    /// Stored addresses, keyed by their 32-byte padded form.
    pub address_indexes: HashMap<Vec<u8>, u32>,
    /// Stored 32-byte words.
    pub bytes32_indexes: HashMap<Vec<u8>, u32>,
    /// Built-in 4-byte ABI selectors; the index rides in a single byte.
    pub bytes4_indexes: HashMap<Vec<u8>, u8>,
}

/// Policy and lookup state referenced by a buffer.
///
/// The opcode policy and the stored indexes are immutable for the buffer's
/// lifetime and shared by pointer; the used-flag maps are owned and copied
/// on snapshot.
#[derive(Debug, Clone)]
pub(crate) struct References {
    pub(crate) allow_opcodes: Option<Arc<AllowOpcodes>>,
    pub(crate) use_contract_storage: bool,
    pub(crate) indexes: Arc<Indexes>,
    /// Raw value bytes → committed offset + 1 of the flag that produced it.
    pub(crate) used_flags: HashMap<Vec<u8>, usize>,
    /// Same, restricted to flags that wrote an index table entry.
    pub(crate) used_storage_flags: HashMap<Vec<u8>, usize>,
}

/// A restorable copy of the buffer's committed bytes and reference maps,
/// used for speculative encoding.
#[derive(Debug, Clone)]
pub struct Snapshot {
    committed: Vec<u8>,
    refs: References,
}

impl Snapshot {
    /// Committed length at the time of the snapshot.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Whether nothing was committed when the snapshot was taken.
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}

/// The compression output under construction.
///
/// A buffer is created per encoding job, seeded with a one-byte method
/// selector, mutated by exactly one caller and discarded once the committed
/// bytes are read. It is never shared between jobs.
#[derive(Debug, Clone)]
pub struct Buffer {
    committed: Vec<u8>,
    pending: Vec<u8>,
    refs: References,
}

impl Buffer {
    /// Creates a buffer seeded with the method byte the decompressor
    /// contract will dispatch on.
    pub fn new(
        method: Method,
        indexes: Option<Arc<Indexes>>,
        allow_opcodes: Option<Arc<AllowOpcodes>>,
        use_storage: bool,
    ) -> Self {
        Self {
            committed: vec![method.into()],
            pending: Vec::new(),
            refs: References {
                allow_opcodes,
                use_contract_storage: use_storage,
                indexes: indexes.unwrap_or_default(),
                used_flags: HashMap::new(),
                used_storage_flags: HashMap::new(),
            },
        }
    }

    /// Whether the policy permits emitting `op`.
    pub fn allows(&self, op: u8) -> bool {
        self.refs
            .allow_opcodes
            .as_ref()
            .map_or(true, |allow| allow.allows(op))
    }

    /// The committed stream, starting with the method byte.
    pub fn data(&self) -> &[u8] {
        &self.committed
    }

    /// Committed length; staged bytes are not counted.
    pub fn len(&self) -> usize {
        self.committed.len()
    }

    /// Whether nothing is committed. Always false for a seeded buffer.
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub(crate) fn use_contract_storage(&self) -> bool {
        self.refs.use_contract_storage
    }

    pub(crate) fn indexes(&self) -> &Indexes {
        &self.refs.indexes
    }

    /// 1-based pointer to the flag that last produced `value`, 0 if none.
    pub(crate) fn used_flag(&self, value: &[u8]) -> usize {
        self.refs.used_flags.get(value).copied().unwrap_or(0)
    }

    /// 1-based pointer to the save flag that stored `value`, 0 if none.
    pub(crate) fn used_storage_flag(&self, value: &[u8]) -> usize {
        self.refs.used_storage_flags.get(value).copied().unwrap_or(0)
    }

    pub(crate) fn commit_byte(&mut self, b: u8) {
        self.pending.push(b);
    }

    pub(crate) fn commit_bytes(&mut self, b: &[u8]) {
        self.pending.extend_from_slice(b);
    }

    /// First committed offset where `data` occurs.
    ///
    /// The window ending exactly at the committed tail is excluded: a match
    /// there may still be the prefix of data that has not landed yet.
    pub fn find_past_data(&self, data: &[u8]) -> Option<usize> {
        let n = data.len();
        (0..self.committed.len().saturating_sub(n)).find(|&i| &self.committed[i..i + n] == data)
    }

    /// Finalizes the staged flag: registers `uncompressed` in the reference
    /// maps when worthwhile and moves the pending bytes into the stream.
    ///
    /// A flag pointer costs 2 bytes, so values of up to 2 bytes are never
    /// registered. Only `Stateless` flags land in `used_flags` and only
    /// `WriteStorage` flags in `used_storage_flags`; in particular a
    /// `ReadStorage` flag registers nothing, because mirroring it would
    /// re-read a slot this stream never wrote.
    pub(crate) fn end(&mut self, uncompressed: &[u8], t: EncodeType) {
        if uncompressed.len() > 2 {
            let rindex = self.committed.len();

            match t {
                EncodeType::Stateless => {
                    self.refs.used_flags.insert(uncompressed.to_vec(), rindex + 1);
                }
                EncodeType::WriteStorage => {
                    self.refs
                        .used_storage_flags
                        .insert(uncompressed.to_vec(), rindex + 1);
                }
                EncodeType::Mirror | EncodeType::ReadStorage => {}
            }
        }

        self.committed.append(&mut self.pending);
    }

    /// Captures the committed bytes and the reference maps.
    ///
    /// The opcode policy and the stored indexes stay shared: they are
    /// immutable while the buffer lives.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            committed: self.committed.clone(),
            refs: self.refs.clone(),
        }
    }

    /// Rolls the buffer back to a snapshot, discarding anything staged.
    pub fn restore(&mut self, snap: Snapshot) {
        self.committed = snap.committed;
        self.refs = snap.refs;
        self.pending.clear();
    }
}
