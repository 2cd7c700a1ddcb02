//! Flag opcodes understood by the decompressor.
//!
//! Each flag is one byte; its payload layout is fixed by the opcode family.
//! Several families are runs of consecutive opcodes derived from a base
//! constant: bytes32 reads span 32 opcodes selected by payload length,
//! address/signature weights 1..=4 and ABI arities 0..=6 add their value to
//! the base, and literals add the encoded integer to [`LITERAL_ZERO`].
//!
//! These values are mirrored by the decompressor contract's jump table and
//! must never be renumbered.

/// Interpret the value as `2^N`; payload is the one-byte exponent.
pub const FLAG_READ_POWER_OF_2: u8 = 0x00;
/// Interpret the value as `2^(N+1) - 1`; payload is one byte.
pub const FLAG_POW_2_MINUS_1: u8 = 0x01;
/// Interpret the value as `10^N`; payload is the one-byte exponent.
pub const FLAG_POW_10: u8 = 0x02;
/// `10^n * m` packed as 5 exponent bits and 11 mantissa bits.
pub const FLAG_READ_POW_10_MANTISSA_S: u8 = 0x03;
/// `10^n * m` packed as 6 exponent bits and 18 mantissa bits.
pub const FLAG_READ_POW_10_MANTISSA: u8 = 0x04;
/// Re-run the flag at the 16-bit payload offset.
pub const FLAG_MIRROR_FLAG: u8 = 0x05;
/// Re-read the value stored by the save flag at the 16-bit payload offset.
pub const FLAG_READ_STORE_FLAG: u8 = 0x06;
/// Copy already-written calldata: 16-bit offset plus one-byte length.
pub const FLAG_COPY_CALLDATA: u8 = 0x07;

/// Read the address table at a 2-byte index.
pub const FLAG_READ_ADDRESS_2: u8 = 0x08;
/// Read the address table at a 3-byte index.
pub const FLAG_READ_ADDRESS_3: u8 = 0x09;
/// Read the address table at a 4-byte index.
pub const FLAG_READ_ADDRESS_4: u8 = 0x0a;
/// Read the bytes32 table at a 2-byte index.
pub const FLAG_READ_BYTES32_2: u8 = 0x0b;
/// Read the bytes32 table at a 3-byte index.
pub const FLAG_READ_BYTES32_3: u8 = 0x0c;
/// Read the bytes32 table at a 4-byte index.
pub const FLAG_READ_BYTES32_4: u8 = 0x0d;
/// Append the 20-byte payload to the address table.
pub const FLAG_SAVE_ADDRESS: u8 = 0x0e;
/// Append the 32-byte payload to the bytes32 table.
pub const FLAG_SAVE_BYTES32: u8 = 0x0f;

/// Produce no output.
pub const FLAG_NO_OP: u8 = 0x10;
/// An `0x03`-tagged 33-byte tree node; the word follows as a flag.
pub const FLAG_NODE: u8 = 0x11;
/// An `0x05`-tagged 33-byte subdigest leaf; the word follows as a flag.
pub const FLAG_SUBDIGEST: u8 = 0x12;

/// Address-with-weight leaf; the weight rides in an extra byte.
///
/// Weights 1..=4 use `FLAG_ADDRESS_W0 + weight` instead.
pub const FLAG_ADDRESS_W0: u8 = 0x13;
/// Signature-with-weight leaf; the weight rides in an extra byte.
///
/// Weights 1..=4 use `FLAG_SIGNATURE_W0 + weight` instead.
pub const FLAG_SIGNATURE_W0: u8 = 0x18;

/// ABI call with `k` word parameters, `FLAG_ABI_0_PARAM + k`, `k <= 6`.
pub const FLAG_ABI_0_PARAM: u8 = 0x1d;
/// ABI call with a one-byte parameter count and a dynamic-size mask.
pub const FLAG_READ_DYNAMIC_ABI: u8 = 0x24;

/// Concatenate N flags, one-byte count.
pub const FLAG_NESTED_N_FLAGS_S: u8 = 0x25;
/// Concatenate N flags, two-byte count.
pub const FLAG_NESTED_N_FLAGS_L: u8 = 0x26;
/// Raw blob: a word-encoded length followed by that many literal bytes.
pub const FLAG_READ_N_BYTES: u8 = 0x27;

/// A nested wallet execute payload follows.
pub const FLAG_READ_EXECUTE: u8 = 0x28;
/// Chained signature, one-byte part count.
pub const FLAG_READ_CHAINED: u8 = 0x29;
/// Chained signature, two-byte part count.
pub const FLAG_READ_CHAINED_L: u8 = 0x2a;
/// Signature tree branch; a nested tree follows.
pub const FLAG_BRANCH: u8 = 0x2b;
/// Nested signature tree with weight and threshold bytes.
pub const FLAG_NESTED: u8 = 0x2c;
/// Dynamic signature part: weight byte, signer word, payload bytes.
pub const FLAG_DYNAMIC_SIGNATURE: u8 = 0x2d;

/// Signature body, one-byte threshold, chain id bound.
pub const FLAG_S_SIG: u8 = 0x2e;
/// Signature body, one-byte threshold, no chain id.
pub const FLAG_S_SIG_NO_CHAIN: u8 = 0x2f;
/// Signature body, two-byte threshold, chain id bound.
pub const FLAG_S_L_SIG: u8 = 0x30;
/// Signature body, two-byte threshold, no chain id.
pub const FLAG_S_L_SIG_NO_CHAIN: u8 = 0x31;

/// Read `n` literal bytes into a word, `FLAG_READ_BYTES32_1_BYTES + (n-1)`,
/// `1 <= n <= 32`.
pub const FLAG_READ_BYTES32_1_BYTES: u8 = 0x32;
/// Last opcode of the bytes32 run (`n = 32`).
pub const FLAG_READ_BYTES32_32_BYTES: u8 = FLAG_READ_BYTES32_1_BYTES + 31;

/// The literal value zero; `LITERAL_ZERO + v` encodes `v <= MAX_LITERAL`.
pub const LITERAL_ZERO: u8 = 0x52;
/// Largest integer representable as a literal opcode.
pub const MAX_LITERAL: u8 = 0x1f;

/// Human-readable family name of an opcode, used by allow/deny parsing.
pub fn flag_name(op: u8) -> Option<&'static str> {
    let name = match op {
        FLAG_READ_POWER_OF_2 => "FLAG_READ_POWER_OF_2",
        FLAG_POW_2_MINUS_1 => "FLAG_POW_2_MINUS_1",
        FLAG_POW_10 => "FLAG_POW_10",
        FLAG_READ_POW_10_MANTISSA_S => "FLAG_READ_POW_10_MANTISSA_S",
        FLAG_READ_POW_10_MANTISSA => "FLAG_READ_POW_10_MANTISSA",
        FLAG_MIRROR_FLAG => "FLAG_MIRROR_FLAG",
        FLAG_READ_STORE_FLAG => "FLAG_READ_STORE_FLAG",
        FLAG_COPY_CALLDATA => "FLAG_COPY_CALLDATA",
        FLAG_READ_ADDRESS_2 => "FLAG_READ_ADDRESS_2",
        FLAG_READ_ADDRESS_3 => "FLAG_READ_ADDRESS_3",
        FLAG_READ_ADDRESS_4 => "FLAG_READ_ADDRESS_4",
        FLAG_READ_BYTES32_2 => "FLAG_READ_BYTES32_2",
        FLAG_READ_BYTES32_3 => "FLAG_READ_BYTES32_3",
        FLAG_READ_BYTES32_4 => "FLAG_READ_BYTES32_4",
        FLAG_SAVE_ADDRESS => "FLAG_SAVE_ADDRESS",
        FLAG_SAVE_BYTES32 => "FLAG_SAVE_BYTES32",
        FLAG_NO_OP => "FLAG_NO_OP",
        FLAG_NODE => "FLAG_NODE",
        FLAG_SUBDIGEST => "FLAG_SUBDIGEST",
        FLAG_ADDRESS_W0 => "FLAG_ADDRESS_W0",
        0x14 => "FLAG_ADDRESS_W1",
        0x15 => "FLAG_ADDRESS_W2",
        0x16 => "FLAG_ADDRESS_W3",
        0x17 => "FLAG_ADDRESS_W4",
        FLAG_SIGNATURE_W0 => "FLAG_SIGNATURE_W0",
        0x19 => "FLAG_SIGNATURE_W1",
        0x1a => "FLAG_SIGNATURE_W2",
        0x1b => "FLAG_SIGNATURE_W3",
        0x1c => "FLAG_SIGNATURE_W4",
        FLAG_ABI_0_PARAM => "FLAG_ABI_0_PARAM",
        0x1e => "FLAG_ABI_1_PARAM",
        0x1f => "FLAG_ABI_2_PARAM",
        0x20 => "FLAG_ABI_3_PARAM",
        0x21 => "FLAG_ABI_4_PARAM",
        0x22 => "FLAG_ABI_5_PARAM",
        0x23 => "FLAG_ABI_6_PARAM",
        FLAG_READ_DYNAMIC_ABI => "FLAG_READ_DYNAMIC_ABI",
        FLAG_NESTED_N_FLAGS_S => "FLAG_NESTED_N_FLAGS_S",
        FLAG_NESTED_N_FLAGS_L => "FLAG_NESTED_N_FLAGS_L",
        FLAG_READ_N_BYTES => "FLAG_READ_N_BYTES",
        FLAG_READ_EXECUTE => "FLAG_READ_EXECUTE",
        FLAG_READ_CHAINED => "FLAG_READ_CHAINED",
        FLAG_READ_CHAINED_L => "FLAG_READ_CHAINED_L",
        FLAG_BRANCH => "FLAG_BRANCH",
        FLAG_NESTED => "FLAG_NESTED",
        FLAG_DYNAMIC_SIGNATURE => "FLAG_DYNAMIC_SIGNATURE",
        FLAG_S_SIG => "FLAG_S_SIG",
        FLAG_S_SIG_NO_CHAIN => "FLAG_S_SIG_NO_CHAIN",
        FLAG_S_L_SIG => "FLAG_S_L_SIG",
        FLAG_S_L_SIG_NO_CHAIN => "FLAG_S_L_SIG_NO_CHAIN",
        FLAG_READ_BYTES32_1_BYTES..=FLAG_READ_BYTES32_32_BYTES => "FLAG_READ_BYTES32_N_BYTES",
        op if (LITERAL_ZERO..=LITERAL_ZERO + MAX_LITERAL).contains(&op) => "FLAG_LITERAL",
        _ => return None,
    };

    Some(name)
}

/// All opcodes whose name contains `needle`, case-insensitively.
///
/// This is the fuzzy lookup behind the `--allow-opcodes` and
/// `--disallow-opcodes` command line flags.
pub fn flags_matching(needle: &str) -> Vec<u8> {
    let needle = needle.trim().to_ascii_uppercase().replace('-', "_");

    (u8::MIN..=u8::MAX)
        .filter(|&op| flag_name(op).is_some_and(|name| name.contains(&needle)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_do_not_overlap() {
        // Every named opcode resolves, and the runs stay within their lanes.
        assert_eq!(FLAG_READ_BYTES32_32_BYTES, 0x51);
        assert_eq!(LITERAL_ZERO + MAX_LITERAL, 0x71);
        assert!(flag_name(LITERAL_ZERO + MAX_LITERAL + 1).is_none());

        for op in 0x00..=0x71u8 {
            assert!(flag_name(op).is_some(), "unnamed opcode {op:#04x}");
        }
    }

    #[test]
    fn fuzzy_lookup_matches_families() {
        assert_eq!(flags_matching("mirror"), vec![FLAG_MIRROR_FLAG]);
        assert_eq!(
            flags_matching("literal"),
            (LITERAL_ZERO..=LITERAL_ZERO + MAX_LITERAL).collect::<Vec<_>>()
        );
        assert!(flags_matching("abi").contains(&FLAG_READ_DYNAMIC_ABI));
        assert_eq!(flags_matching("pow_10").len(), 3);
        assert!(flags_matching("no-op").contains(&FLAG_NO_OP));
        assert!(flags_matching("nothing matches this").is_empty());
    }
}
