//! Stored-index loading against a mocked decompressor contract.

use std::collections::HashMap;
use std::sync::Arc;

use czip_asm::flags::*;
use czip_asm::Method;
use czip_compressor::contract::{
    address_index_slot, bytes32_index_slot, load_addresses, load_bytes32, load_totals, Provider,
};
use czip_compressor::{Buffer, EncodeType, Indexes};
use czip_types::Address;

/// A contract backed by in-memory tables.
struct MapProvider {
    address_count: u64,
    bytes32_count: u64,
    slots: HashMap<Vec<u8>, [u8; 32]>,
}

impl MapProvider {
    fn new(address_count: u64, bytes32_count: u64) -> Self {
        Self {
            address_count,
            bytes32_count,
            slots: HashMap::new(),
        }
    }

    fn set_address(&mut self, index: u32, value: [u8; 32]) {
        self.slots.insert(address_index_slot(index).to_vec(), value);
    }

    fn set_bytes32(&mut self, index: u32, value: [u8; 32]) {
        self.slots.insert(bytes32_index_slot(index).to_vec(), value);
    }
}

impl Provider for MapProvider {
    fn call_contract(&self, _contract: &Address, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let method = *data.first().expect("empty calldata");

        if method == u8::from(Method::ReadSizes) {
            let mut res = [0u8; 32];
            res[8..16].copy_from_slice(&self.address_count.to_be_bytes());
            res[24..32].copy_from_slice(&self.bytes32_count.to_be_bytes());
            return Ok(res.to_vec());
        }

        if method == u8::from(Method::ReadStorageSlots) {
            let mut res = Vec::new();
            for key in data[1..].chunks_exact(32) {
                res.extend_from_slice(&self.slots.get(key).copied().unwrap_or([0u8; 32]));
            }
            return Ok(res);
        }

        anyhow::bail!("unexpected method {method:#04x}")
    }
}

fn padded_address(fill: u8) -> [u8; 32] {
    let mut value = [0u8; 32];
    value[12..].copy_from_slice(&[fill; 20]);
    value
}

#[test]
fn totals_are_one_past_the_reported_sizes() {
    let provider = MapProvider::new(2, 5);
    let (addresses, bytes32) = load_totals(&provider, &Address::zeroed()).unwrap();
    assert_eq!((addresses, bytes32), (3, 6));
}

#[test]
fn addresses_load_from_slot_zero() {
    let mut provider = MapProvider::new(2, 0);
    provider.set_address(0, padded_address(0x11));
    provider.set_address(2, padded_address(0x22));
    // Slot 1 stays unset and must be skipped.

    let loaded = load_addresses(&provider, &Address::zeroed(), 0).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.get(padded_address(0x11).as_slice()), Some(&0));
    assert_eq!(loaded.get(padded_address(0x22).as_slice()), Some(&2));
}

#[test]
fn bytes32_loading_always_skips_index_zero() {
    let mut provider = MapProvider::new(0, 2);
    provider.set_bytes32(0, [0xaa; 32]); // the reserved size slot
    provider.set_bytes32(1, [0xbb; 32]);
    provider.set_bytes32(2, [0xcc; 32]);

    let loaded = load_bytes32(&provider, &Address::zeroed(), 0).unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(!loaded.contains_key([0xaa; 32].as_slice()));
    assert_eq!(loaded.get([0xbb; 32].as_slice()), Some(&1));
    assert_eq!(loaded.get([0xcc; 32].as_slice()), Some(&2));
}

#[test]
fn skip_resumes_after_cached_entries() {
    let mut provider = MapProvider::new(3, 0);
    provider.set_address(0, padded_address(0x11));
    provider.set_address(1, padded_address(0x22));
    provider.set_address(3, padded_address(0x33));

    let loaded = load_addresses(&provider, &Address::zeroed(), 2).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.get(padded_address(0x33).as_slice()), Some(&3));
}

#[test]
fn loaded_tables_drive_storage_reads() {
    let signer = [0x99u8; 20];
    let mut padded = [0u8; 32];
    padded[12..].copy_from_slice(&signer);

    let mut provider = MapProvider::new(7, 0);
    provider.set_address(7, padded);

    let loaded = load_addresses(&provider, &Address::zeroed(), 0).unwrap();

    let indexes = Indexes {
        address_indexes: loaded,
        ..Default::default()
    };

    let mut buf = Buffer::new(Method::DecodeAny, Some(Arc::new(indexes)), None, true);
    let t = buf.write_word(&signer, true).unwrap();
    assert_eq!(t, EncodeType::ReadStorage);
    assert_eq!(buf.data()[1..], [FLAG_READ_ADDRESS_2, 0x00, 0x07]);
}
