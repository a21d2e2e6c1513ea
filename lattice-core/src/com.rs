//! Certificates of membership.
//!
//! A controller proves a node's right to participate in a private network by
//! issuing a signed, revision-bound certificate. Members present it to each
//! other; two certificates agree when both are signed by the network's
//! controller and their revisions are within [`REVISION_MAX_DELTA`] of each
//! other, which lets a freshly bumped network keep talking to members that
//! have not yet refreshed their config.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::identity::{Address, Identity, NetworkId, SecretIdentity, SIGNATURE_BYTES};
use crate::util::{bytes_to_hex, hex_to_bytes};

/// Maximum revision distance at which two certificates still agree.
pub const REVISION_MAX_DELTA: u64 = 16;

const FORMAT_VERSION: &str = "1";

#[derive(Debug, Error)]
pub enum ComError {
    #[error("Invalid certificate format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported certificate version: {0}")]
    UnsupportedVersion(String),
}

/// A certificate binding a node to a private network at a given revision.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateOfMembership {
    revision: u64,
    max_delta: u64,
    network_id: NetworkId,
    issued_to: Address,
    signed_by: Option<Address>,
    signature: Option<[u8; SIGNATURE_BYTES]>,
}

impl CertificateOfMembership {
    pub fn new(revision: u64, max_delta: u64, network_id: NetworkId, issued_to: Address) -> Self {
        Self {
            revision,
            max_delta,
            network_id,
            issued_to,
            signed_by: None,
            signature: None,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn network_id(&self) -> NetworkId {
        self.network_id
    }

    pub fn issued_to(&self) -> Address {
        self.issued_to
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    fn payload(&self) -> String {
        format!(
            "{}:{:x}:{:x}:{}:{}",
            FORMAT_VERSION, self.revision, self.max_delta, self.network_id, self.issued_to
        )
    }

    /// Sign with the network controller's identity.
    pub fn sign(&mut self, signer: &SecretIdentity) {
        self.signed_by = Some(signer.address());
        self.signature = Some(signer.sign(self.payload().as_bytes()));
    }

    /// Verify the signature against the issuing controller's identity. The
    /// signer must be the controller named by the upper 40 bits of the
    /// network id.
    pub fn verify(&self, signer: &Identity) -> bool {
        let (Some(signed_by), Some(signature)) = (self.signed_by, &self.signature) else {
            return false;
        };
        signed_by == signer.address()
            && signed_by == self.network_id.controller_address()
            && signer.verify(self.payload().as_bytes(), signature)
    }

    /// Whether `other` proves membership of the same network at a close
    /// enough revision.
    pub fn agrees_with(&self, other: &CertificateOfMembership) -> bool {
        self.network_id == other.network_id
            && self.revision.abs_diff(other.revision) <= self.max_delta
    }
}

impl Display for CertificateOfMembership {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload())?;
        if let (Some(signed_by), Some(signature)) = (self.signed_by, &self.signature) {
            write!(f, ":{}:{}", signed_by, bytes_to_hex(signature))?;
        }
        Ok(())
    }
}

impl fmt::Debug for CertificateOfMembership {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for CertificateOfMembership {
    type Err = ComError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() != 5 && fields.len() != 7 {
            return Err(ComError::InvalidFormat(s.to_string()));
        }
        if fields[0] != FORMAT_VERSION {
            return Err(ComError::UnsupportedVersion(fields[0].to_string()));
        }

        let parse_hex = |v: &str| {
            u64::from_str_radix(v, 16).map_err(|_| ComError::InvalidFormat(s.to_string()))
        };
        let mut com = Self::new(
            parse_hex(fields[1])?,
            parse_hex(fields[2])?,
            fields[3]
                .parse()
                .map_err(|_| ComError::InvalidFormat(s.to_string()))?,
            fields[4]
                .parse()
                .map_err(|_| ComError::InvalidFormat(s.to_string()))?,
        );

        if fields.len() == 7 {
            com.signed_by = Some(
                fields[5]
                    .parse()
                    .map_err(|_| ComError::InvalidFormat(s.to_string()))?,
            );
            com.signature = Some(
                hex_to_bytes::<SIGNATURE_BYTES>(fields[6])
                    .map_err(|_| ComError::InvalidFormat(s.to_string()))?,
            );
        }

        Ok(com)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NetworkId;

    fn network_for(signer: &SecretIdentity) -> NetworkId {
        NetworkId::from_controller(signer.address(), 0x000001)
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let controller = SecretIdentity::generate();
        let member = SecretIdentity::generate();
        let nwid = network_for(&controller);

        let mut com =
            CertificateOfMembership::new(7, REVISION_MAX_DELTA, nwid, member.address());
        assert!(!com.is_signed());
        com.sign(&controller);
        assert!(com.verify(controller.public()));

        let parsed: CertificateOfMembership = com.to_string().parse().unwrap();
        assert_eq!(parsed, com);
        assert!(parsed.verify(controller.public()));
    }

    #[test]
    fn test_verify_rejects_foreign_signer() {
        let controller = SecretIdentity::generate();
        let imposter = SecretIdentity::generate();
        let member = SecretIdentity::generate();

        // imposter signs a certificate for a network it does not control
        let mut com = CertificateOfMembership::new(
            1,
            REVISION_MAX_DELTA,
            network_for(&controller),
            member.address(),
        );
        com.sign(&imposter);
        assert!(!com.verify(imposter.public()));
        assert!(!com.verify(controller.public()));
    }

    #[test]
    fn test_agreement_window() {
        let controller = SecretIdentity::generate();
        let member = SecretIdentity::generate();
        let nwid = network_for(&controller);

        let a = CertificateOfMembership::new(100, REVISION_MAX_DELTA, nwid, member.address());
        let b = CertificateOfMembership::new(
            100 + REVISION_MAX_DELTA,
            REVISION_MAX_DELTA,
            nwid,
            member.address(),
        );
        let c = CertificateOfMembership::new(
            101 + REVISION_MAX_DELTA,
            REVISION_MAX_DELTA,
            nwid,
            member.address(),
        );

        assert!(a.agrees_with(&b));
        assert!(!a.agrees_with(&c));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("2:1:10:deadbeefcafe0001:aaaaaaaaaa"
            .parse::<CertificateOfMembership>()
            .is_err());
        assert!("1:zz:10:deadbeefcafe0001:aaaaaaaaaa"
            .parse::<CertificateOfMembership>()
            .is_err());
        assert!("not a certificate".parse::<CertificateOfMembership>().is_err());
    }
}
