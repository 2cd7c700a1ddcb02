//! Built-in 4-byte selector table.
//!
//! These selectors are baked into the decompressor contract in this exact
//! order; the 1-based position is the single byte emitted on the wire in
//! place of the selector. Appending is fine, renumbering is not.

use std::collections::HashMap;

/// Selectors in table order.
pub const SELECTORS: &[[u8; 4]] = &[
    [0x7a, 0x9a, 0x16, 0x28], // execute(tuple[],uint256,bytes)
    [0x61, 0xc2, 0x92, 0x6c], // selfExecute(tuple[])
    [0xa9, 0x05, 0x9c, 0xbb], // transfer(address,uint256)
    [0x09, 0x5e, 0xa7, 0xb3], // approve(address,uint256)
    [0x23, 0xb8, 0x72, 0xdd], // transferFrom(address,address,uint256)
    [0x70, 0xa0, 0x82, 0x31], // balanceOf(address)
    [0xdd, 0x62, 0xed, 0x3e], // allowance(address,address)
    [0x18, 0x16, 0x0d, 0xdd], // totalSupply()
    [0x40, 0xc1, 0x0f, 0x19], // mint(address,uint256)
    [0x42, 0x96, 0x6c, 0x68], // burn(uint256)
    [0xd0, 0xe3, 0x0d, 0xb0], // deposit()
    [0x2e, 0x1a, 0x7d, 0x4d], // withdraw(uint256)
    [0x63, 0x52, 0x21, 0x1e], // ownerOf(uint256)
    [0x42, 0x84, 0x2e, 0x0e], // safeTransferFrom(address,address,uint256)
    [0xa2, 0x2c, 0xb4, 0x65], // setApprovalForAll(address,bool)
    [0xe9, 0x85, 0xe9, 0xc5], // isApprovedForAll(address,address)
];

/// The built-in table keyed for lookup; values are 1-based.
pub fn indexes() -> HashMap<Vec<u8>, u8> {
    SELECTORS
        .iter()
        .enumerate()
        .map(|(i, selector)| (selector.to_vec(), (i + 1) as u8))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_stable_and_one_based() {
        let table = indexes();
        assert_eq!(table.len(), SELECTORS.len());
        assert!(SELECTORS.len() < 256);

        // transfer(address,uint256) keeps its slot.
        assert_eq!(table.get(&vec![0xa9, 0x05, 0x9c, 0xbb]), Some(&3));
        assert!(!table.values().any(|&index| index == 0));
    }
}
