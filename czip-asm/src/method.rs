use core::fmt;

/// Method selector: the first byte of every compressed stream, telling the
/// decompressor which top-level operation to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[repr(u8)]
pub enum Method {
    /// Decompress an arbitrary flag stream and return the bytes.
    DecodeAny = 0x01,
    /// Decompress a single call without performing it.
    DecodeCall = 0x02,
    /// Decompress a single call and perform it.
    ExecuteCall = 0x03,
    /// Decompress a single call, perform it and return its result.
    ExecuteCallReturn = 0x04,
    /// Decompress a batch of calls without performing them.
    DecodeNCalls = 0x05,
    /// Decompress a batch of calls and perform them.
    ExecuteNCalls = 0x06,
    /// Decompress a wallet execute transaction without performing it.
    DecodeSequenceTx = 0x07,
    /// Decompress a wallet execute transaction and perform it.
    ExecuteSequenceTx = 0x08,
    /// Read a batch of storage slots from the index tables.
    ReadStorageSlots = 0x09,
    /// Read the sizes of the address and bytes32 index tables.
    ReadSizes = 0x0a,
}

impl From<Method> for u8 {
    fn from(method: Method) -> Self {
        method as u8
    }
}

impl TryFrom<u8> for Method {
    type Error = InvalidMethod;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        use strum::IntoEnumIterator;

        Method::iter().find(|&m| m as u8 == b).ok_or(InvalidMethod(b))
    }
}

/// The byte does not name a decompressor method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMethod(pub u8);

impl fmt::Display for InvalidMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid method byte {:#04x}", self.0)
    }
}

impl std::error::Error for InvalidMethod {}
