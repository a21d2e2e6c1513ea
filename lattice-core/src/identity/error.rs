use std::io;

use thiserror::Error;

use crate::util::HexError;

/// Error type for operations on [`crate::identity::Identity`] and
/// [`crate::identity::SecretIdentity`].
#[derive(Debug, Error)]
pub enum Error {
    /// Serialized identity does not have the expected field layout.
    #[error("Invalid identity format: {0}")]
    InvalidFormat(String),

    /// Address field does not match the address derived from the public key.
    #[error("Identity address does not match public key")]
    AddressMismatch,

    /// Node address value exceeds 40 bits.
    #[error("Address out of range: {0:#x}")]
    AddressOutOfRange(u64),

    /// Node address string is not exactly 10 hex characters.
    #[error("Invalid node address: {0}")]
    InvalidAddress(String),

    /// Network id string is not exactly 16 hex characters.
    #[error("Invalid network id: {0}")]
    InvalidNetworkId(String),

    /// Public key bytes do not form a valid Ed25519 point.
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid hex string when parsing keys.
    #[error("Invalid hex string: {0}")]
    HexError(#[from] HexError),

    /// Failed to read from or write to the identity file.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
