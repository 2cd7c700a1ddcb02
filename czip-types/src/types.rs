use core::fmt;
use core::str::FromStr;

use crate::bytes::left_pad;

/// Error parsing a fixed-width hex value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseHexError {
    /// The text is not valid hexadecimal.
    InvalidHex,
    /// The decoded value does not fit the target width.
    BadLength,
}

impl fmt::Display for ParseHexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHex => write!(f, "invalid hex value"),
            Self::BadLength => write!(f, "value has the wrong length"),
        }
    }
}

impl std::error::Error for ParseHexError {}

macro_rules! byte_array_type {
    ($doc:literal, $t:ident, $len:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $t([u8; $len]);

        impl $t {
            /// Size of the value, in bytes.
            pub const LEN: usize = $len;

            /// The all-zeroes value.
            pub const fn zeroed() -> Self {
                Self([0u8; $len])
            }

            /// Wraps raw bytes.
            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Whether every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|&b| b == 0)
            }
        }

        impl From<[u8; $len]> for $t {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl From<$t> for [u8; $len] {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl AsRef<[u8]> for $t {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl TryFrom<&[u8]> for $t {
            type Error = ParseHexError;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                <[u8; $len]>::try_from(bytes)
                    .map(Self)
                    .map_err(|_| ParseHexError::BadLength)
            }
        }

        impl fmt::Debug for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($t), "(0x{})"), hex::encode(self.0))
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::LowerHex for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl serde::Serialize for $t {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $t {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <String as serde::Deserialize>::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

byte_array_type!("A 20-byte EVM account address.", Address, 20);
byte_array_type!("A 32-byte EVM word.", Bytes32, 32);

impl FromStr for Address {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(|_| ParseHexError::InvalidHex)?;
        Self::try_from(raw.as_slice())
    }
}

impl FromStr for Bytes32 {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s.trim_start_matches("0x")).map_err(|_| ParseHexError::InvalidHex)?;
        // Short values are numeric; align them to the right like the EVM
        // does when widening to a word.
        left_pad::<32>(&raw).map(Self).ok_or(ParseHexError::BadLength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_hex_round_trip() {
        let addr: Address = "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef".parse().unwrap();
        assert_eq!(addr.to_string(), "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef");
        assert!("0xdeadbeef".parse::<Address>().is_err());
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn bytes32_pads_short_values() {
        let v: Bytes32 = "0x01".parse().unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(v, Bytes32::new(expected));
        assert!(v.to_string().starts_with("0x00"));
    }

    #[test]
    fn serde_uses_hex_strings() {
        let addr = Address::new([0x11; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn zero_check() {
        assert!(Bytes32::zeroed().is_zero());
        assert!(!Bytes32::new([1u8; 32]).is_zero());
    }
}
