//! Conversions between structured addresses and their stored forms.
//!
//! IP addresses are persisted as 16-byte blobs: IPv6 verbatim, IPv4
//! left-padded with twelve zero bytes. MACs are persisted as 12 lowercase
//! hex characters. Nothing outside the store and the views that render it
//! should ever see these encodings.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub const IP_BLOB_LEN: usize = 16;

pub fn ip_version(ip: IpAddr) -> i64 {
    match ip {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 6,
    }
}

pub fn ip_to_blob(ip: IpAddr) -> [u8; IP_BLOB_LEN] {
    match ip {
        IpAddr::V4(v4) => v4_to_blob(u32::from(v4)),
        IpAddr::V6(v6) => v6.octets(),
    }
}

pub fn v4_to_blob(ip: u32) -> [u8; IP_BLOB_LEN] {
    let mut blob = [0u8; IP_BLOB_LEN];
    blob[12..].copy_from_slice(&ip.to_be_bytes());
    blob
}

pub fn v4_from_blob(blob: &[u8]) -> Option<u32> {
    if blob.len() != IP_BLOB_LEN {
        return None;
    }
    Some(u32::from_be_bytes(blob[12..].try_into().ok()?))
}

pub fn blob_to_ip(blob: &[u8], version: i64) -> Option<IpAddr> {
    if blob.len() != IP_BLOB_LEN {
        return None;
    }
    match version {
        4 => Some(IpAddr::V4(Ipv4Addr::from(v4_from_blob(blob)?))),
        6 => {
            let octets: [u8; 16] = blob.try_into().ok()?;
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

/// Textual IP form used in config dictionaries and JSON views: dotted quad
/// for IPv4, colon-separated two-byte groups without `::` compression for
/// IPv6.
pub fn format_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            let groups: Vec<String> = segments.iter().map(|s| format!("{s:04x}")).collect();
            groups.join(":")
        }
    }
}

/// Parse `"<ip>"` or `"<ip>/<n>"`. The suffix carries the netmask bits for
/// assignments and routes, and the metric for gateways; it defaults to 0.
pub fn parse_ip_prefix(s: &str) -> Option<(IpAddr, u32)> {
    let (ip, suffix) = match s.split_once('/') {
        Some((ip, suffix)) => (ip, suffix.parse().ok()?),
        None => (s, 0),
    };
    Some((ip.trim().parse().ok()?, suffix))
}

/// Normalize a textual MAC (`aa:bb:cc:dd:ee:ff`, `aa-bb-…` or bare hex) to
/// the stored 12-hex form.
pub fn parse_mac(s: &str) -> Option<String> {
    let hex: String = s
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .collect::<String>()
        .to_lowercase();
    if hex.len() != 12 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(hex)
}

/// Render a stored 12-hex MAC with colons.
pub fn format_mac(stored: &str) -> String {
    if stored.len() != 12 {
        return stored.to_string();
    }
    let mut out = String::with_capacity(17);
    for (i, chunk) in stored.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(':');
        }
        out.push_str(std::str::from_utf8(chunk).unwrap_or(""));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v4_blob_is_left_padded() {
        let blob = ip_to_blob("10.0.0.2".parse().unwrap());
        assert_eq!(&blob[..12], &[0u8; 12]);
        assert_eq!(&blob[12..], &[10, 0, 0, 2]);
        assert_eq!(
            blob_to_ip(&blob, 4).unwrap(),
            "10.0.0.2".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_v6_blob_round_trip() {
        let ip: IpAddr = "fd00::1".parse().unwrap();
        let blob = ip_to_blob(ip);
        assert_eq!(blob_to_ip(&blob, 6).unwrap(), ip);
    }

    #[test]
    fn test_format_ip_v6_uncompressed() {
        let ip: IpAddr = "fd00::1".parse().unwrap();
        assert_eq!(format_ip(ip), "fd00:0000:0000:0000:0000:0000:0000:0001");
    }

    #[test]
    fn test_parse_ip_prefix() {
        assert_eq!(
            parse_ip_prefix("10.0.0.2/24").unwrap(),
            ("10.0.0.2".parse().unwrap(), 24)
        );
        assert_eq!(
            parse_ip_prefix("10.0.0.1").unwrap(),
            ("10.0.0.1".parse().unwrap(), 0)
        );
        assert!(parse_ip_prefix("10.0.0/24").is_none());
        assert!(parse_ip_prefix("10.0.0.2/x").is_none());
    }

    #[test]
    fn test_mac_normalization() {
        assert_eq!(parse_mac("AA:BB:cc:dd:ee:ff").unwrap(), "aabbccddeeff");
        assert_eq!(parse_mac("aabbccddeeff").unwrap(), "aabbccddeeff");
        assert!(parse_mac("aa:bb:cc").is_none());
        assert_eq!(format_mac("aabbccddeeff"), "aa:bb:cc:dd:ee:ff");
    }
}
