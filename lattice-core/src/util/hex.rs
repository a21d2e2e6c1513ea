use faster_hex::{hex_decode, hex_encode};

#[derive(Debug, thiserror::Error)]
pub enum HexError {
    #[error("Invalid hex string length")]
    InvalidLength,
    #[error("Invalid hex character")]
    InvalidCharacter,
}

pub fn hex_to_bytes<const N: usize>(hex: &str) -> Result<[u8; N], HexError> {
    if hex.len() != N * 2 {
        return Err(HexError::InvalidLength);
    }

    let mut bytes = [0u8; N];
    hex_decode(hex.as_bytes(), &mut bytes).map_err(|_| HexError::InvalidCharacter)?;
    Ok(bytes)
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut hex = vec![0u8; bytes.len() * 2];
    hex_encode(bytes, &mut hex).expect("output buffer sized to input");
    String::from_utf8(hex).expect("hex output is ASCII")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let bytes = hex_to_bytes::<32>(
            "ab7a1654d463f9986530bed00569cc895697827b802153b8ef1598579713045f",
        )
        .unwrap();
        assert_eq!(bytes[0], 171);
        assert_eq!(
            bytes_to_hex(&bytes),
            "ab7a1654d463f9986530bed00569cc895697827b802153b8ef1598579713045f"
        );
    }

    #[test]
    fn test_hex_rejects_bad_input() {
        assert!(hex_to_bytes::<4>("abcd").is_err());
        assert!(hex_to_bytes::<2>("zzzz").is_err());
    }
}
