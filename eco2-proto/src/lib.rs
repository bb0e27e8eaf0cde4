//! Eco2 wire protocol - GATT identifiers and payload encoding
//!
//! Characteristic values are kept as opaque payloads. They are stored as
//! uppercase hex bytes separated by hyphens, e.g. `01-AF-3C`.

pub mod ble;

/// Error returned when a stored payload is not valid hyphenated hex
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("invalid hex byte {byte:?} at position {position}")]
    InvalidByte { byte: String, position: usize },
}

/// Encode raw characteristic bytes as `01-AF-3C`
pub fn encode_value(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| data_encoding::HEXUPPER.encode(std::slice::from_ref(b)))
        .collect::<Vec<_>>()
        .join("-")
}

/// Decode a payload produced by [`encode_value`]
///
/// Lowercase digits are accepted. The empty string decodes to no bytes.
pub fn decode_value(value: &str) -> Result<Vec<u8>, PayloadError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }

    value
        .split('-')
        .enumerate()
        .map(|(position, byte)| {
            let invalid = || PayloadError::InvalidByte {
                byte: byte.to_string(),
                position,
            };
            if byte.len() != 2 {
                return Err(invalid());
            }
            let decoded = data_encoding::HEXUPPER
                .decode(byte.to_ascii_uppercase().as_bytes())
                .map_err(|_| invalid())?;
            decoded.first().copied().ok_or_else(invalid)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_uppercase_with_hyphens() {
        assert_eq!(encode_value(&[0x01, 0xAF, 0x3C]), "01-AF-3C");
        assert_eq!(encode_value(&[0x0a]), "0A");
        assert_eq!(encode_value(&[]), "");
    }

    #[test]
    fn decodes_stored_payloads() {
        assert_eq!(decode_value("01-AF-3C"), Ok(vec![0x01, 0xAF, 0x3C]));
        assert_eq!(decode_value("64"), Ok(vec![100]));
        assert_eq!(decode_value("ff-0a"), Ok(vec![0xff, 0x0a]));
        assert_eq!(decode_value(""), Ok(vec![]));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(
            decode_value("01-A-3C"),
            Err(PayloadError::InvalidByte {
                byte: "A".to_string(),
                position: 1
            })
        );
        assert!(decode_value("ZZ").is_err());
        assert!(decode_value("01--02").is_err());
    }
}
