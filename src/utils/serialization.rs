// Bincode helpers for on-disk records
use crate::error::{BlockchainError, Result};

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data using bincode 2.0 with standard configuration
pub fn deserialize<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T> {
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
    struct StoredKey {
        address: String,
        pkcs8: Vec<u8>,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = StoredKey {
            address: "1BoatSLRHtKNngkdXEeobR76b53LETtpyT".to_string(),
            pkcs8: vec![1, 2, 3, 4, 5],
        };

        let bytes = serialize(&original).expect("Serialization should work");
        let decoded: StoredKey = deserialize(&bytes).expect("Deserialization should work");
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<StoredKey> = deserialize(&invalid_bytes);
        assert!(result.is_err());
    }
}
