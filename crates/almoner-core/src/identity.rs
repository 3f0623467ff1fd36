// crates/almoner-core/src/identity.rs
//
// Participant and asset identities.
//
// Both are opaque 32-byte identifiers supplied by the host. They serialize
// as 0x-prefixed lowercase hex so they can key JSON maps in state exports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::AlmonerError;

macro_rules! hex_identity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Derive a deterministic identity from a human-readable label
            /// (SHA-256 of the label bytes).
            pub fn labelled(label: &str) -> Self {
                let digest = Sha256::digest(label.as_bytes());
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&digest);
                Self(bytes)
            }

            /// The all-zero identity. Never a valid party.
            pub const fn zero() -> Self {
                Self([0u8; 32])
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{}..)", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl FromStr for $name {
            type Err = AlmonerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let stripped = s.strip_prefix("0x").unwrap_or(s);
                let raw = hex::decode(stripped)
                    .map_err(|e| AlmonerError::Serialization(e.to_string()))?;
                let bytes: [u8; 32] = raw.try_into().map_err(|v: Vec<u8>| {
                    AlmonerError::Serialization(format!(
                        "expected 32 bytes for {}, got {}",
                        stringify!($name),
                        v.len()
                    ))
                })?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_identity!(
    /// Identity of a caller: a staker, the treasury owner, a recipient, or
    /// the custody account of one of the engine's own components.
    Address
);

hex_identity!(
    /// Identity of a fungible asset tracked by the credential ledger.
    AssetId
);
