//! Fixed-width identifiers for nodes and virtual networks.
//!
//! A node address is a 40-bit value derived from the node's public key; a
//! network id is a 64-bit value whose upper 40 bits are the address of the
//! controller that owns the network. Both render as fixed-width lowercase
//! hex everywhere they leave the process.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::identity::Error;

/// A 40-bit node address, rendered as exactly 10 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(u64);

impl Address {
    pub const MAX: u64 = (1 << 40) - 1;

    pub fn new(value: u64) -> Result<Self, Error> {
        if value > Self::MAX {
            return Err(Error::AddressOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Address packed from the first 5 bytes of a hash digest.
    pub(crate) fn from_digest(bytes: &[u8; 5]) -> Self {
        let mut value = 0u64;
        for &b in bytes {
            value = (value << 8) | u64::from(b);
        }
        Self(value)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:010x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 10 {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let value =
            u64::from_str_radix(s, 16).map_err(|_| Error::InvalidAddress(s.to_string()))?;
        Self::new(value)
    }
}

impl serde::Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// A 64-bit virtual network id, rendered as exactly 16 lowercase hex
/// characters. The upper 40 bits name the controller that owns the network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(u64);

impl NetworkId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Compose an id from a controller address and a 24-bit suffix.
    pub fn from_controller(controller: Address, suffix: u32) -> Self {
        Self((controller.to_u64() << 24) | u64::from(suffix & 0x00ff_ffff))
    }

    /// Address of the controller that owns this network (upper 40 bits).
    pub fn controller_address(self) -> Address {
        Address(self.0 >> 24)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl Display for NetworkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for NetworkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for NetworkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(Error::InvalidNetworkId(s.to_string()));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| Error::InvalidNetworkId(s.to_string()))
    }
}

impl serde::Serialize for NetworkId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for NetworkId {
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
    fn test_address_fixed_width() {
        let addr = Address::new(0xaa).unwrap();
        assert_eq!(addr.to_string(), "00000000aa");
        assert_eq!("00000000aa".parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_wide_values() {
        assert!(Address::new(1 << 40).is_err());
        assert!("deadbeefcafe".parse::<Address>().is_err());
        assert!("zzzzzzzzzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_network_id_controller_address() {
        let nwid = "deadbeefcafe0001".parse::<NetworkId>().unwrap();
        assert_eq!(nwid.controller_address().to_string(), "deadbeefca");
        assert_eq!(nwid.to_string(), "deadbeefcafe0001");
    }

    #[test]
    fn test_network_id_from_controller() {
        let controller = "deadbeefca".parse::<Address>().unwrap();
        let nwid = NetworkId::from_controller(controller, 0x0001_0002);
        assert_eq!(nwid.to_string(), "deadbeefca010002");
        assert_eq!(nwid.controller_address(), controller);
    }
}
