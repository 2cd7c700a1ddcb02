//! Wallet transaction inputs.
//!
//! These records arrive pre-parsed from the wallet libraries; the encoder
//! only reads them. The JSON form exists for the command line, which takes
//! a decoded transaction document instead of raw execute calldata.

use serde::{Deserialize, Serialize};

use czip_types::{Address, Bytes32};

bitflags::bitflags! {
    /// Bit layout of the per-transaction header byte.
    pub struct TxFields: u8 {
        /// The call is performed as a delegate call.
        const DELEGATE_CALL = 0x80;
        /// A failure reverts the whole batch.
        const REVERT_ON_ERROR = 0x40;
        /// A gas limit word follows.
        const HAS_GAS_LIMIT = 0x20;
        /// A value word follows.
        const HAS_VALUE = 0x10;
        /// A data payload (or a nested execute) follows.
        const HAS_DATA = 0x01;
    }
}

/// One wallet transaction; a batch entry of an execute payload.
///
/// A transaction either carries calldata or a nested batch of further
/// transactions, in which case `nonce` and `signature` describe the nested
/// execute.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    /// Perform the call with `DELEGATECALL`.
    pub delegate_call: bool,
    /// Revert the batch when this call fails.
    pub revert_on_error: bool,
    /// Gas limit; absent or zero means no explicit limit.
    pub gas_limit: Option<u64>,
    /// Call target.
    pub to: Address,
    /// Native token value; absent or zero means none.
    pub value: Option<Bytes32>,
    /// Call payload.
    #[serde(with = "crate::serde_hex")]
    pub data: Vec<u8>,
    /// Wallet nonce: a 160-bit space followed by a 96-bit sequence.
    pub nonce: Bytes32,
    /// Nested batch; non-empty makes this a nested execute.
    pub transactions: Vec<Transaction>,
    /// Wallet signature over the batch.
    #[serde(with = "crate::serde_hex")]
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Header byte for the wire encoding.
    pub(crate) fn fields(&self) -> TxFields {
        let mut fields = TxFields::empty();

        if self.delegate_call {
            fields |= TxFields::DELEGATE_CALL;
        }
        if self.revert_on_error {
            fields |= TxFields::REVERT_ON_ERROR;
        }
        if self.has_gas_limit() {
            fields |= TxFields::HAS_GAS_LIMIT;
        }
        if self.has_value() {
            fields |= TxFields::HAS_VALUE;
        }
        if self.has_data() {
            fields |= TxFields::HAS_DATA;
        }

        fields
    }

    pub(crate) fn has_gas_limit(&self) -> bool {
        matches!(self.gas_limit, Some(gas) if gas != 0)
    }

    pub(crate) fn has_value(&self) -> bool {
        matches!(&self.value, Some(value) if !value.is_zero())
    }

    pub(crate) fn has_data(&self) -> bool {
        !self.data.is_empty() || !self.transactions.is_empty()
    }
}
