use thiserror::Error;

/// Errors produced while encoding a compression job.
///
/// Every failure is terminal for the current job: the buffer that raised it
/// may hold a partial flag stream and must be discarded. Callers that want
/// to retry construct a fresh buffer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// A word input longer than 32 bytes.
    #[error("word exceeds 32 bytes")]
    WordTooLong,
    /// The raw bytes32 fallback received an empty value.
    #[error("word is empty")]
    EmptyWord,
    /// The only remaining encoding uses an opcode the policy denies.
    #[error("{0} encoding is not allowed")]
    NotAllowed(&'static str),
    /// A value too wide for its fixed-width destination.
    #[error("value too large to pad")]
    PadOverflow,
    /// The words input is not a multiple of 32 bytes.
    #[error("words are not aligned to 32 bytes")]
    UnalignedWords,
    /// The words input is empty.
    #[error("words are empty")]
    EmptyWords,
    /// More than 65535 words.
    #[error("too many words")]
    TooManyWords,
    /// The transactions batch is empty.
    #[error("transactions is empty")]
    EmptyTransactions,
    /// More than 255 transactions in one batch.
    #[error("transactions exceeds 255")]
    TooManyTransactions,
    /// The calls batch is empty.
    #[error("calls are empty")]
    EmptyCalls,
    /// More than 255 calls in one batch.
    #[error("calls exceeds 255")]
    TooManyCalls,
    /// Call targets and payloads differ in number.
    #[error("calls and datas have different lengths")]
    CallsMismatch,
    /// A signer weight above the one-byte range.
    #[error("weight exceeds 255")]
    WeightTooLarge,
    /// A nested threshold above the one-byte range.
    #[error("threshold exceeds 255")]
    ThresholdTooLarge,
    /// The signature type byte is not a known encoding.
    #[error("invalid signature type {0}")]
    InvalidSignatureType(u8),
    /// A signature tree part type byte is not a known encoding.
    #[error("invalid signature part type {0}")]
    InvalidSignaturePartType(u8),
    /// The signature ends before its fixed-size prefix.
    #[error("signature is too short")]
    SignatureTooShort,
    /// A length prefix points past the end of the signature.
    #[error("signature is truncated")]
    TruncatedSignature,
    /// The signature tree holds no parts.
    #[error("signature tree is empty")]
    EmptySignatureTree,
    /// More parts than the two-byte nesting headers can count.
    #[error("signature exceeds 65535 parts")]
    TooManySignatureParts,
    /// A branch part with an empty subtree.
    #[error("branch is empty")]
    EmptyBranch,
    /// A dynamic signature payload without its 0x03 type suffix.
    #[error("signature is not a dynamic signature")]
    NotDynamicSignature,
    /// A signer that is not 20 bytes long.
    #[error("address is not 20 bytes long")]
    BadAddressLength,
}
