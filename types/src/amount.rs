//! Serde adapter for `u128` amounts.
//!
//! TOML integers are signed 64-bit, and raw 18-decimal amounts overflow
//! them quickly. Values that fit are written as integers, larger ones as
//! decimal strings; both forms are accepted on input.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    match i64::try_from(*value) {
        Ok(small) => serializer.serialize_i64(small),
        Err(_) => serializer.serialize_str(&value.to_string()),
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = u128;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
        Ok(v as u128)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
        u128::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
        Ok(v)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
        v.replace('_', "")
            .parse()
            .map_err(|_| E::custom(format!("invalid amount {v:?}")))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::amount")]
        value: u128,
    }

    #[test]
    fn small_values_stay_numeric() {
        let json = serde_json::to_string(&Holder { value: 42 }).unwrap();
        assert_eq!(json, r#"{"value":42}"#);
    }

    #[test]
    fn large_values_become_strings() {
        let big = Holder {
            value: 50_000_000_000_000_000_000,
        };
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, r#"{"value":"50000000000000000000"}"#);
        assert_eq!(serde_json::from_str::<Holder>(&json).unwrap(), big);
    }

    #[test]
    fn accepts_underscored_strings_and_rejects_negatives() {
        let parsed: Holder = serde_json::from_str(r#"{"value":"1_000"}"#).unwrap();
        assert_eq!(parsed.value, 1_000);
        assert!(serde_json::from_str::<Holder>(r#"{"value":-1}"#).is_err());
    }
}
