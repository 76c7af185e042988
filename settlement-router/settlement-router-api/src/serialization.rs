//! Serialization helpers for the settlement router API

/// A module for serializing and deserializing U256 as decimal strings
pub mod u256_string_serialization {
    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize a U256 to a string
    pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    /// Deserialize a string to a U256
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let s = String::deserialize(d)?;
        U256::from_str_radix(&s, 10).map_err(|_| D::Error::custom("Invalid U256 value"))
    }
}

/// A module for serializing and deserializing an optional U256 as a decimal
/// string
pub mod option_u256_string_serialization {
    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize an optional U256 to an optional string
    pub fn serialize<S: Serializer>(value: &Option<U256>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => s.serialize_some(&v.to_string()),
            None => s.serialize_none(),
        }
    }

    /// Deserialize an optional string to an optional U256
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<U256>, D::Error> {
        let maybe_str = Option::<String>::deserialize(d)?;
        maybe_str
            .map(|s| U256::from_str_radix(&s, 10))
            .transpose()
            .map_err(|_| D::Error::custom("Invalid U256 value"))
    }
}

/// A module for serializing and deserializing a signed I256 as a decimal
/// string
pub mod i256_string_serialization {
    use alloy_primitives::I256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serialize an I256 to a string
    pub fn serialize<S: Serializer>(value: &I256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    /// Deserialize a string to an I256
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<I256, D::Error> {
        let s = String::deserialize(d)?;
        I256::from_dec_str(&s).map_err(|_| D::Error::custom("Invalid I256 value"))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{I256, U256};
    use rand::{thread_rng, Rng};
    use serde::{Deserialize, Serialize};

    use super::*;

    /// A wrapper exercising each of the string serialization modules
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Amounts {
        /// An unsigned amount
        #[serde(with = "u256_string_serialization")]
        unsigned: U256,
        /// An optional unsigned amount
        #[serde(default, with = "option_u256_string_serialization")]
        maybe_unsigned: Option<U256>,
        /// A signed amount
        #[serde(with = "i256_string_serialization")]
        signed: I256,
    }

    /// Test that amounts are written as decimal strings
    #[test]
    fn test_decimal_string_format() {
        let amounts = Amounts {
            unsigned: U256::from(1_000_000u64),
            maybe_unsigned: None,
            signed: I256::try_from(-42i64).unwrap(),
        };

        let value = serde_json::to_value(&amounts).unwrap();
        assert_eq!(value["unsigned"], "1000000");
        assert_eq!(value["maybe_unsigned"], serde_json::Value::Null);
        assert_eq!(value["signed"], "-42");
    }

    /// Test serialization and deserialization of random amounts
    #[test]
    fn test_random_amounts() {
        let mut rng = thread_rng();
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes);
        let unsigned = U256::from_be_bytes(bytes);
        let signed = I256::try_from(rng.gen::<i64>()).unwrap();

        let amounts = Amounts { unsigned, maybe_unsigned: Some(unsigned), signed };
        let serialized = serde_json::to_string(&amounts).unwrap();
        let deserialized: Amounts = serde_json::from_str(&serialized).unwrap();
        assert_eq!(amounts, deserialized);
    }

    /// Test that a hex string is rejected where a decimal string is expected
    #[test]
    fn test_reject_hex_amount() {
        let json = r#"{"unsigned":"0x10","maybe_unsigned":null,"signed":"1"}"#;
        assert!(serde_json::from_str::<Amounts>(json).is_err());
    }
}
