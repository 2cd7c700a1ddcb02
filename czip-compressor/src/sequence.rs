//! Composite encoders for wallet execute payloads and signature trees.

use czip_asm::flags::*;
use czip_types::Bytes32;

use crate::buffer::{Buffer, EncodeType};
use crate::error::EncodeError;
use crate::tx::Transaction;

/// One parsed part of a signature tree, borrowed from the input.
///
/// Fixed-size leaves keep their type byte so the byte-stream encoder can
/// recognize their shape.
enum TreePart<'a> {
    /// `0x00`: type, weight and a 66-byte EOA signature.
    Eoa(&'a [u8]),
    /// `0x01`: type, weight and a signer address.
    Address(&'a [u8]),
    /// `0x02`: weight, signer and a length-prefixed signature payload.
    Dynamic {
        weight: u8,
        address: &'a [u8],
        signature: &'a [u8],
    },
    /// `0x03`: type and a 32-byte merkle node.
    Node(&'a [u8]),
    /// `0x04`: a length-prefixed subtree.
    Branch(&'a [u8]),
    /// `0x05`: type and a 32-byte subdigest.
    Subdigest(&'a [u8]),
    /// `0x06`: weight, threshold and a length-prefixed subtree.
    Nested {
        weight: u8,
        threshold: u16,
        branch: &'a [u8],
    },
}

fn take<'a>(data: &'a [u8], from: usize, to: usize) -> Result<&'a [u8], EncodeError> {
    data.get(from..to).ok_or(EncodeError::TruncatedSignature)
}

fn read_u24(data: &[u8], at: usize) -> Result<usize, EncodeError> {
    let b = take(data, at, at + 3)?;
    Ok(((b[0] as usize) << 16) | ((b[1] as usize) << 8) | b[2] as usize)
}

/// Walks the depth-first tree layout, yielding one entry per top-level part.
fn parse_tree_parts(tree: &[u8]) -> Result<Vec<TreePart<'_>>, EncodeError> {
    let mut parts = Vec::new();
    let mut pointer = 0usize;

    while pointer < tree.len() {
        let start = pointer;
        let part_type = tree[pointer];
        pointer += 1;

        match part_type {
            0x00 => {
                let next = pointer + 1 + 66;
                parts.push(TreePart::Eoa(take(tree, start, next)?));
                pointer = next;
            }
            0x01 => {
                let next = pointer + 1 + 20;
                parts.push(TreePart::Address(take(tree, start, next)?));
                pointer = next;
            }
            0x02 => {
                let weight = *tree.get(pointer).ok_or(EncodeError::TruncatedSignature)?;
                pointer += 1;
                let address = take(tree, pointer, pointer + 20)?;
                pointer += 20;
                let length = read_u24(tree, pointer)?;
                pointer += 3;
                let signature = take(tree, pointer, pointer + length)?;
                pointer += length;
                parts.push(TreePart::Dynamic {
                    weight,
                    address,
                    signature,
                });
            }
            0x03 => {
                let next = pointer + 32;
                parts.push(TreePart::Node(take(tree, start, next)?));
                pointer = next;
            }
            0x04 => {
                let length = read_u24(tree, pointer)?;
                pointer += 3;
                let branch = take(tree, pointer, pointer + length)?;
                pointer += length;
                parts.push(TreePart::Branch(branch));
            }
            0x05 => {
                let next = pointer + 32;
                parts.push(TreePart::Subdigest(take(tree, start, next)?));
                pointer = next;
            }
            0x06 => {
                let weight = *tree.get(pointer).ok_or(EncodeError::TruncatedSignature)?;
                let threshold_bytes = take(tree, pointer + 1, pointer + 3)?;
                let threshold = u16::from_be_bytes([threshold_bytes[0], threshold_bytes[1]]);
                pointer += 3;
                let length = read_u24(tree, pointer)?;
                pointer += 3;
                let branch = take(tree, pointer, pointer + length)?;
                pointer += length;
                parts.push(TreePart::Nested {
                    weight,
                    threshold,
                    branch,
                });
            }
            other => return Err(EncodeError::InvalidSignaturePartType(other)),
        }
    }

    Ok(parts)
}

impl Buffer {
    /// Writes a wallet nonce: a 160-bit space and a 96-bit sequence.
    ///
    /// The space is reused across transactions and is worth a storage slot;
    /// a random nonce space would only pollute the tables, and the sequence
    /// changes every time.
    pub fn write_sequence_nonce(
        &mut self,
        nonce: &Bytes32,
        random_nonce: bool,
    ) -> Result<EncodeType, EncodeError> {
        let (space, seq) = nonce.as_ref().split_at(20);

        let t1 = self.write_word(space, !random_nonce)?;
        let t2 = self.write_word(seq, false)?;
        Ok(t1.max(t2))
    }

    /// Writes a transaction batch behind a one-byte count.
    pub fn write_sequence_transactions(
        &mut self,
        txs: &[Transaction],
    ) -> Result<EncodeType, EncodeError> {
        if txs.is_empty() {
            return Err(EncodeError::EmptyTransactions);
        }

        if txs.len() > 255 {
            return Err(EncodeError::TooManyTransactions);
        }

        self.commit_byte(txs.len() as u8);
        self.end(&[], EncodeType::Stateless);

        let mut encode_type = EncodeType::Stateless;
        for tx in txs {
            encode_type = encode_type.max(self.write_sequence_transaction(tx)?);
        }

        Ok(encode_type)
    }

    /// Writes one transaction: a header byte with presence bits, then only
    /// the fields the bits announce.
    pub fn write_sequence_transaction(&mut self, tx: &Transaction) -> Result<EncodeType, EncodeError> {
        self.commit_byte(tx.fields().bits());
        self.end(&[], EncodeType::Stateless);

        let mut encode_type = EncodeType::Stateless;

        if let Some(gas) = tx.gas_limit.filter(|&gas| gas != 0) {
            encode_type = encode_type.max(self.write_word(&gas.to_be_bytes(), false)?);
        }

        let use_storage = self.use_contract_storage();
        encode_type = encode_type.max(self.write_word(tx.to.as_ref(), use_storage)?);

        if let Some(value) = tx.value.as_ref().filter(|value| !value.is_zero()) {
            encode_type = encode_type.max(self.write_word(value.as_ref(), false)?);
        }

        if tx.has_data() {
            let t = if !tx.transactions.is_empty() {
                // A nested batch rides behind an execute flag in place of
                // calldata.
                self.commit_byte(FLAG_READ_EXECUTE);
                self.end(&[], EncodeType::Stateless);
                self.write_sequence_execute(None, tx)?
            } else {
                self.write_bytes(&tx.data, use_storage)?
            };
            encode_type = encode_type.max(t);
        }

        Ok(encode_type)
    }

    /// Writes a full execute payload: nonce, batch, signature and, for the
    /// top level, the wallet address.
    pub fn write_sequence_execute(
        &mut self,
        to: Option<&[u8]>,
        tx: &Transaction,
    ) -> Result<EncodeType, EncodeError> {
        let mut encode_type = self.write_sequence_nonce(&tx.nonce, false)?;
        encode_type = encode_type.max(self.write_sequence_transactions(&tx.transactions)?);
        encode_type = encode_type.max(self.write_sequence_signature(&tx.signature, true)?);

        if let Some(to) = to {
            encode_type = encode_type.max(self.write_word(to, true)?);
        }

        Ok(encode_type)
    }

    /// Dispatches a wallet signature by its leading type byte.
    ///
    /// With `may_use_bytes`, empty signatures (guest modules) and
    /// calldata-only networks skip the structured encodings entirely.
    pub fn write_sequence_signature(
        &mut self,
        signature: &[u8],
        may_use_bytes: bool,
    ) -> Result<EncodeType, EncodeError> {
        if may_use_bytes && (signature.is_empty() || !self.use_contract_storage()) {
            return self.write_bytes(signature, false);
        }

        match signature.first() {
            // Legacy signatures start straight at the threshold; the type
            // byte doubles as its high byte.
            Some(&0x00) => self.write_sequence_signature_body(false, signature),
            Some(&0x01) => self.write_sequence_signature_body(false, &signature[1..]),
            Some(&0x02) => self.write_sequence_signature_body(true, &signature[1..]),
            Some(&0x03) => self.write_sequence_chained_signature(&signature[1..]),
            Some(&other) => Err(EncodeError::InvalidSignatureType(other)),
            None => Err(EncodeError::SignatureTooShort),
        }
    }

    /// Writes a signature body: threshold, checkpoint, then the tree.
    pub fn write_sequence_signature_body(
        &mut self,
        no_chain: bool,
        body: &[u8],
    ) -> Result<EncodeType, EncodeError> {
        if body.len() < 2 {
            return Err(EncodeError::SignatureTooShort);
        }

        let threshold = u16::from_be_bytes([body[0], body[1]]);
        let long_threshold = threshold > 0xff;

        let tflag = match (long_threshold, no_chain) {
            (false, false) => FLAG_S_SIG,
            (false, true) => FLAG_S_SIG_NO_CHAIN,
            (true, false) => FLAG_S_L_SIG,
            (true, true) => FLAG_S_L_SIG_NO_CHAIN,
        };

        self.commit_byte(tflag);
        if long_threshold {
            self.commit_bytes(&body[..2]);
        } else {
            self.commit_byte(body[1]);
        }
        self.end(body, EncodeType::Stateless);

        if body.len() < 6 {
            return Err(EncodeError::SignatureTooShort);
        }

        self.write_word(&body[2..6], false)?;

        self.write_sequence_signature_tree(&body[6..])
    }

    /// Writes a signature tree: a nesting header when there is more than
    /// one part, then each part in order.
    pub fn write_sequence_signature_tree(&mut self, tree: &[u8]) -> Result<EncodeType, EncodeError> {
        if tree.is_empty() {
            return Err(EncodeError::EmptySignatureTree);
        }

        let parts = parse_tree_parts(tree)?;

        if parts.len() > 65535 {
            return Err(EncodeError::TooManySignatureParts);
        }

        if parts.len() > 1 {
            if parts.len() > 255 {
                self.commit_byte(FLAG_NESTED_N_FLAGS_L);
                self.commit_bytes(&(parts.len() as u16).to_be_bytes());
            } else {
                self.commit_byte(FLAG_NESTED_N_FLAGS_S);
                self.commit_byte(parts.len() as u8);
            }
        }
        self.end(&[], EncodeType::Stateless);

        let mut encode_type = EncodeType::Stateless;
        for part in &parts {
            let t = match part {
                TreePart::Eoa(raw) => self.write_bytes(raw, false)?,
                TreePart::Address(raw) => self.write_bytes(raw, true)?,
                TreePart::Dynamic {
                    weight,
                    address,
                    signature,
                } => self.write_sequence_dynamic_signature_part(
                    address,
                    u32::from(*weight),
                    signature,
                )?,
                TreePart::Node(raw) => self.write_bytes(raw, true)?,
                TreePart::Branch(branch) => self.write_sequence_branch_signature_part(branch)?,
                TreePart::Subdigest(raw) => self.write_bytes(raw, false)?,
                TreePart::Nested {
                    weight,
                    threshold,
                    branch,
                } => self.write_sequence_nested_signature_part(
                    u32::from(*weight),
                    u32::from(*threshold),
                    branch,
                )?,
            };
            encode_type = encode_type.max(t);
        }

        Ok(encode_type)
    }

    /// Writes a nested subtree with its weight and inner threshold.
    pub fn write_sequence_nested_signature_part(
        &mut self,
        weight: u32,
        threshold: u32,
        branch: &[u8],
    ) -> Result<EncodeType, EncodeError> {
        if weight > 255 {
            return Err(EncodeError::WeightTooLarge);
        }

        if threshold > 255 {
            return Err(EncodeError::ThresholdTooLarge);
        }

        self.commit_byte(FLAG_NESTED);
        self.commit_byte(weight as u8);
        self.commit_byte(threshold as u8);
        self.end(&[], EncodeType::Stateless);

        self.write_sequence_signature_tree(branch)
    }

    /// Writes a branch: a bare subtree behind the branch flag.
    pub fn write_sequence_branch_signature_part(
        &mut self,
        branch: &[u8],
    ) -> Result<EncodeType, EncodeError> {
        if branch.is_empty() {
            return Err(EncodeError::EmptyBranch);
        }

        self.commit_byte(FLAG_BRANCH);
        self.end(&[], EncodeType::Stateless);

        self.write_sequence_signature_tree(branch)
    }

    /// Writes a dynamic part: weight, signer word, then the inner payload
    /// as bytes (which may itself speculate as a wallet signature).
    pub fn write_sequence_dynamic_signature_part(
        &mut self,
        address: &[u8],
        weight: u32,
        signature: &[u8],
    ) -> Result<EncodeType, EncodeError> {
        if weight > 255 {
            return Err(EncodeError::WeightTooLarge);
        }

        // On-chain convention suffixes dynamic payloads with an 0x03 type
        // byte; the decompressor re-appends it.
        let unsuffixed = match signature.split_last() {
            Some((&0x03, rest)) => rest,
            _ => return Err(EncodeError::NotDynamicSignature),
        };

        self.commit_byte(FLAG_DYNAMIC_SIGNATURE);
        self.commit_byte(weight as u8);
        self.end(&[], EncodeType::Stateless);

        if address.len() != 20 {
            return Err(EncodeError::BadAddressLength);
        }

        let t1 = self.write_word(address, true)?;
        let t2 = self.write_bytes(unsuffixed, true)?;
        Ok(t1.max(t2))
    }

    /// Writes a chained signature: a part count, then each inner signature
    /// re-entered through the top-level dispatcher.
    pub fn write_sequence_chained_signature(
        &mut self,
        signature: &[u8],
    ) -> Result<EncodeType, EncodeError> {
        let mut parts = Vec::new();
        let mut pointer = 0usize;

        while pointer < signature.len() {
            let length = read_u24(signature, pointer)?;
            pointer += 3;
            parts.push(take(signature, pointer, pointer + length)?);
            pointer += length;
        }

        if parts.len() > 65535 {
            return Err(EncodeError::TooManySignatureParts);
        }

        if parts.len() > 255 {
            self.commit_byte(FLAG_READ_CHAINED_L);
            self.commit_bytes(&(parts.len() as u16).to_be_bytes());
        } else {
            self.commit_byte(FLAG_READ_CHAINED);
            self.commit_byte(parts.len() as u8);
        }
        self.end(&[], EncodeType::Stateless);

        let mut encode_type = EncodeType::Stateless;
        for part in parts {
            encode_type = encode_type.max(self.write_sequence_signature(part, false)?);
        }

        Ok(encode_type)
    }
}
