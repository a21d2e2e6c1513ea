//! Cryptographic identities for latticenet nodes.
//!
//! Every node is bound for life to an Ed25519 key pair. The node's 40-bit
//! [`Address`] is derived from the verifying key, so an identity string can
//! never claim an address that does not belong to its key. Controllers hold a
//! [`SecretIdentity`] (with the signing key); everything else in the system
//! only ever sees the public [`Identity`].
//!
//! # Example
//!
//! ```rust
//! use lattice_core::identity::{Identity, SecretIdentity};
//!
//! let secret = SecretIdentity::generate();
//! let public: Identity = secret.to_string().parse().expect("valid identity");
//! assert_eq!(public.address(), secret.public().address());
//! ```

mod address;
mod error;

pub use address::*;
pub use error::*;

use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::util::{bytes_to_hex, hex_to_bytes};

pub const SIGNATURE_BYTES: usize = 64;

fn derive_address(vk: &VerifyingKey) -> Address {
    let digest = Sha256::digest(vk.as_bytes());
    let mut head = [0u8; 5];
    head.copy_from_slice(&digest[..5]);
    Address::from_digest(&head)
}

/// The public half of a node identity: a 40-bit address bound to an Ed25519
/// verifying key.
///
/// Textual form is `<address>:<verifying key>`, both lowercase hex. Parsing
/// recomputes the address from the key and rejects mismatches. A serialized
/// [`SecretIdentity`] (three fields) also parses as an `Identity`; the secret
/// field is ignored.
#[derive(Clone)]
pub struct Identity {
    address: Address,
    vk: VerifyingKey,
}

impl Identity {
    fn from_vk(vk: VerifyingKey) -> Self {
        Self {
            address: derive_address(&vk),
            vk,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Check an Ed25519 signature made by this identity's key.
    pub fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_BYTES]) -> bool {
        let signature = Signature::from_bytes(signature);
        self.vk.verify(message, &signature).is_ok()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address && self.vk.as_bytes() == other.vk.as_bytes()
    }
}

impl Eq for Identity {}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, bytes_to_hex(self.vk.as_bytes()))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.trim().split(':');
        let (Some(address), Some(vk)) = (fields.next(), fields.next()) else {
            return Err(Error::InvalidFormat(s.to_string()));
        };
        // A third field (the signing key of a serialized SecretIdentity) is
        // tolerated; anything beyond that is malformed.
        let secret = fields.next();
        if fields.next().is_some() || secret.is_some_and(|sk| sk.len() != 64) {
            return Err(Error::InvalidFormat(s.to_string()));
        }

        let claimed: Address = address.parse()?;
        let vk = VerifyingKey::from_bytes(&hex_to_bytes::<32>(vk)?)
            .map_err(|_| Error::InvalidPublicKey)?;

        let id = Self::from_vk(vk);
        if id.address != claimed {
            return Err(Error::AddressMismatch);
        }
        Ok(id)
    }
}

impl serde::Serialize for Identity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Identity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A node identity together with its Ed25519 signing key.
///
/// Textual form is `<address>:<verifying key>:<signing key>`. The controller
/// signs certificates of membership and network-config dictionaries with
/// this type; it never travels over the wire.
#[derive(Clone)]
pub struct SecretIdentity {
    public: Identity,
    sk: SigningKey,
}

impl SecretIdentity {
    pub fn generate() -> Self {
        let sk = SigningKey::generate(&mut OsRng);
        Self {
            public: Identity::from_vk(sk.verifying_key()),
            sk,
        }
    }

    pub fn public(&self) -> &Identity {
        &self.public
    }

    pub fn address(&self) -> Address {
        self.public.address
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_BYTES] {
        self.sk.sign(message).to_bytes()
    }

    /// Save to a file, readable by the owner only.
    pub fn save(path: &str, id: &SecretIdentity) -> io::Result<()> {
        let file = File::create(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata()?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        let mut file = file;
        writeln!(file, "[Identity]")?;
        writeln!(file, "SecretKey = {}", bytes_to_hex(&id.sk.to_bytes()))?;

        Ok(())
    }

    pub fn load(path: &str) -> io::Result<SecretIdentity> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if let Some(value) = line.strip_prefix("SecretKey") {
                let Some(value) = value.split('=').nth(1) else {
                    continue;
                };
                let sk_bytes = hex_to_bytes::<32>(value.trim())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                let sk = SigningKey::from_bytes(&sk_bytes);
                return Ok(SecretIdentity {
                    public: Identity::from_vk(sk.verifying_key()),
                    sk,
                });
            }
        }

        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "Missing SecretKey field in identity file",
        ))
    }

    /// Load an identity from a file, or generate and save a new one if the
    /// file does not exist.
    pub fn load_or_generate(path: &str) -> Result<SecretIdentity, Error> {
        match SecretIdentity::load(path) {
            Ok(id) => {
                debug!("Loaded identity from file '{path}'.");
                Ok(id)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Identity file '{path}' not found. Generate new one...");
                let id = SecretIdentity::generate();
                SecretIdentity::save(path, &id)?;
                Ok(id)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Display for SecretIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.public, bytes_to_hex(&self.sk.to_bytes()))
    }
}

impl fmt::Debug for SecretIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // never leak the signing key through Debug output
        write!(f, "SecretIdentity({})", self.public)
    }
}

impl FromStr for SecretIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(':').collect();
        let [address, vk, sk] = fields.as_slice() else {
            return Err(Error::InvalidFormat(s.to_string()));
        };

        let sk = SigningKey::from_bytes(&hex_to_bytes::<32>(sk)?);
        let public = Identity::from_vk(sk.verifying_key());
        if bytes_to_hex(public.vk.as_bytes()) != *vk {
            return Err(Error::InvalidPublicKey);
        }
        if public.address != address.parse::<Address>()? {
            return Err(Error::AddressMismatch);
        }

        Ok(Self { public, sk })
    }
}

impl serde::Serialize for SecretIdentity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for SecretIdentity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_identity_round_trip() {
        let secret = SecretIdentity::generate();
        let serialized = secret.public().to_string();
        let parsed: Identity = serialized.parse().unwrap();
        assert_eq!(parsed, *secret.public());
    }

    #[test]
    fn test_secret_identity_round_trip() {
        let secret = SecretIdentity::generate();
        let parsed: SecretIdentity = secret.to_string().parse().unwrap();
        assert_eq!(parsed.public(), secret.public());
    }

    #[test]
    fn test_secret_string_parses_as_public() {
        let secret = SecretIdentity::generate();
        let public: Identity = secret.to_string().parse().unwrap();
        assert_eq!(public, *secret.public());
    }

    #[test]
    fn test_parse_rejects_claimed_foreign_address() {
        let secret = SecretIdentity::generate();
        let serialized = secret.public().to_string();
        let (_, key) = serialized.split_once(':').unwrap();
        let forged = format!("{}:{}", "0000000001", key);
        assert!(matches!(
            forged.parse::<Identity>(),
            Err(Error::AddressMismatch)
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let secret = SecretIdentity::generate();
        let other = SecretIdentity::generate();

        let sig = secret.sign(b"attestation");
        assert!(secret.public().verify(b"attestation", &sig));
        assert!(!secret.public().verify(b"something else", &sig));
        assert!(!other.public().verify(b"attestation", &sig));
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join("lattice-core-identity-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("controller.identity");
        let path = path.to_str().unwrap();

        let id = SecretIdentity::generate();
        SecretIdentity::save(path, &id).unwrap();
        let loaded = SecretIdentity::load(path).unwrap();
        assert_eq!(loaded.public(), id.public());

        std::fs::remove_file(path).unwrap();
    }
}
