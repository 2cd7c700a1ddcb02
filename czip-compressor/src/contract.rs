//! Stored-index fetch protocol against the decompressor contract.
//!
//! The contract keeps two append-only tables (addresses and bytes32
//! words) and exposes two read methods: one returning both table sizes and
//! one returning a batch of storage slots. Everything here is pure apart
//! from the [`Provider`] seam the caller supplies.

use std::collections::HashMap;

use czip_asm::Method;
use czip_types::Address;

/// Number of storage slots requested per call.
pub const INDEX_BATCH_SIZE: u32 = 2048;

/// Read access to the decompressor contract.
///
/// The encoder core never talks to the network itself; implementors wrap
/// whatever transport the caller already has.
pub trait Provider {
    /// Performs a read-only call against `contract` with the given calldata.
    fn call_contract(&self, contract: &Address, data: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Storage slot key of the `i`-th address table entry.
pub fn address_index_slot(i: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[24..32].copy_from_slice(&(u64::from(i) + 1).to_be_bytes());
    slot
}

/// Storage slot key of the `i`-th bytes32 table entry.
pub fn bytes32_index_slot(i: u32) -> [u8; 32] {
    let mut slot = [0u8; 32];
    slot[8..16].copy_from_slice(&u64::from(i).to_be_bytes());
    slot
}

/// Reads both table sizes.
///
/// The contract reports the highest written index per table; one past it is
/// the first free slot, which is what the loaders iterate up to.
pub fn load_totals(provider: &dyn Provider, contract: &Address) -> anyhow::Result<(u32, u32)> {
    let res = provider.call_contract(contract, &[Method::ReadSizes.into()])?;
    anyhow::ensure!(res.len() >= 32, "short read-sizes result");

    let addresses = u64::from_be_bytes(res[8..16].try_into()?) + 1;
    let bytes32 = u64::from_be_bytes(res[24..32].try_into()?) + 1;
    Ok((addresses as u32, bytes32 as u32))
}

/// Loads the address table, starting after `skip` already-known entries.
pub fn load_addresses(
    provider: &dyn Provider,
    contract: &Address,
    skip: u32,
) -> anyhow::Result<HashMap<Vec<u8>, u32>> {
    let (total, _) = load_totals(provider, contract)?;
    load_storage(provider, contract, skip, total, address_index_slot)
}

/// Loads the bytes32 table, starting after `skip` already-known entries.
pub fn load_bytes32(
    provider: &dyn Provider,
    contract: &Address,
    skip: u32,
) -> anyhow::Result<HashMap<Vec<u8>, u32>> {
    // Index 0 shares a slot with the table size; it is not write-once and
    // referencing it would corrupt decompression.
    let skip = skip.max(1);

    let (_, total) = load_totals(provider, contract)?;
    load_storage(provider, contract, skip, total, bytes32_index_slot)
}

/// Loads both tables, resuming after already-cached entries.
pub fn load_state(
    provider: &dyn Provider,
    contract: &Address,
    skip_addresses: u32,
    skip_bytes32: u32,
) -> anyhow::Result<(HashMap<Vec<u8>, u32>, HashMap<Vec<u8>, u32>)> {
    let addresses = load_addresses(provider, contract, skip_addresses)?;
    let bytes32 = load_bytes32(provider, contract, skip_bytes32)?;
    Ok((addresses, bytes32))
}

/// Walks `skip..total` in batches, asking the contract for each slot and
/// collecting the set entries.
pub fn load_storage(
    provider: &dyn Provider,
    contract: &Address,
    skip: u32,
    total: u32,
    slot_key: fn(u32) -> [u8; 32],
) -> anyhow::Result<HashMap<Vec<u8>, u32>> {
    let mut out = HashMap::new();
    let mut from = skip;

    while from < total {
        let count = INDEX_BATCH_SIZE.min(total - from);

        let mut data = Vec::with_capacity(1 + count as usize * 32);
        data.push(Method::ReadStorageSlots.into());
        for j in 0..count {
            data.extend_from_slice(&slot_key(from + j));
        }

        let res = provider.call_contract(contract, &data)?;
        parse_batch_result(&mut out, &res, from)?;

        tracing::debug!(from, count, loaded = out.len(), "loaded index slots");
        from += count;
    }

    Ok(out)
}

/// Folds one batch result into `out`, skipping unset (all-zero) slots.
pub fn parse_batch_result(
    out: &mut HashMap<Vec<u8>, u32>,
    res: &[u8],
    offset: u32,
) -> anyhow::Result<()> {
    anyhow::ensure!(res.len() % 32 == 0, "invalid result length");

    for (j, slot) in res.chunks_exact(32).enumerate() {
        if slot.iter().any(|&b| b != 0) {
            out.insert(slot.to_vec(), offset + j as u32);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_keys_use_distinct_lanes() {
        let a = address_index_slot(0);
        assert_eq!(&a[24..32], &1u64.to_be_bytes());
        assert!(a[..24].iter().all(|&b| b == 0));

        let b = bytes32_index_slot(7);
        assert_eq!(&b[8..16], &7u64.to_be_bytes());
        assert!(b[..8].iter().all(|&b| b == 0));
        assert!(b[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn batch_result_skips_unset_slots() {
        let mut res = vec![0u8; 96];
        res[32] = 0xaa; // slot 1 is set
        res[95] = 0x01; // slot 2 is set

        let mut out = HashMap::new();
        parse_batch_result(&mut out, &res, 10).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out.get(&res[32..64].to_vec()), Some(&11));
        assert_eq!(out.get(&res[64..96].to_vec()), Some(&12));

        assert!(parse_batch_result(&mut out, &[0u8; 31], 0).is_err());
    }
}
