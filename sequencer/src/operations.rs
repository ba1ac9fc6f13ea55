//! The owner-maintained list of post-rebase operations.

use serde::{Deserialize, Serialize};
use tranche_types::Address;

use crate::error::SequencerError;

/// One follow-up call: opaque calldata for `destination`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub destination: Address,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub enabled: bool,
}

/// Ordered operations. Indices shift on insert and remove.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationList {
    operations: Vec<Operation>,
}

impl OperationList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at `index`, shifting later entries down. `index == len`
    /// appends.
    pub fn insert(&mut self, index: usize, destination: Address, data: Vec<u8>) -> Result<(), SequencerError> {
        if index > self.operations.len() {
            return Err(self.out_of_bounds(index));
        }
        self.operations.insert(
            index,
            Operation {
                destination,
                data,
                enabled: true,
            },
        );
        Ok(())
    }

    /// Remove at `index`, shifting later entries up.
    pub fn remove(&mut self, index: usize) -> Result<Operation, SequencerError> {
        if index >= self.operations.len() {
            return Err(self.out_of_bounds(index));
        }
        Ok(self.operations.remove(index))
    }

    /// Toggle the entry at `index`. `destination` must match the entry, so
    /// a stale index after a shift is caught instead of toggling the wrong
    /// operation.
    pub fn set_enabled(&mut self, index: usize, destination: &Address, enabled: bool) -> Result<(), SequencerError> {
        let len = self.operations.len();
        let op = self
            .operations
            .get_mut(index)
            .ok_or(SequencerError::IndexOutOfBounds { index, len })?;
        if &op.destination != destination {
            return Err(SequencerError::DestinationMismatch {
                index,
                expected: destination.clone(),
                actual: op.destination.clone(),
            });
        }
        op.enabled = enabled;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn out_of_bounds(&self, index: usize) -> SequencerError {
        SequencerError::IndexOutOfBounds {
            index,
            len: self.operations.len(),
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: &str) -> Address {
        Address::new(raw)
    }

    fn list(names: &[&str]) -> OperationList {
        let mut ops = OperationList::new();
        for (i, name) in names.iter().enumerate() {
            ops.insert(i, addr(name), vec![i as u8]).unwrap();
        }
        ops
    }

    fn destinations(ops: &OperationList) -> Vec<String> {
        ops.iter().map(|op| op.destination.as_str().to_string()).collect()
    }

    #[test]
    fn insert_shifts_down() {
        let mut ops = list(&["a", "c"]);
        ops.insert(1, addr("b"), vec![]).unwrap();
        assert_eq!(destinations(&ops), ["a", "b", "c"]);
        ops.insert(3, addr("d"), vec![]).unwrap();
        assert_eq!(ops.len(), 4);
    }

    #[test]
    fn remove_shifts_up() {
        let mut ops = list(&["a", "b", "c"]);
        let removed = ops.remove(0).unwrap();
        assert_eq!(removed.destination, addr("a"));
        assert_eq!(destinations(&ops), ["b", "c"]);
    }

    #[test]
    fn out_of_bounds_indices_rejected() {
        let mut ops = list(&["a"]);
        assert_eq!(
            ops.insert(2, addr("x"), vec![]),
            Err(SequencerError::IndexOutOfBounds { index: 2, len: 1 })
        );
        assert_eq!(
            ops.remove(1).unwrap_err(),
            SequencerError::IndexOutOfBounds { index: 1, len: 1 }
        );
        assert_eq!(
            ops.set_enabled(5, &addr("a"), false),
            Err(SequencerError::IndexOutOfBounds { index: 5, len: 1 })
        );
    }

    #[test]
    fn toggle_checks_destination() {
        let mut ops = list(&["a", "b"]);
        ops.set_enabled(1, &addr("b"), false).unwrap();
        assert!(!ops.get(1).unwrap().enabled);
        assert!(matches!(
            ops.set_enabled(0, &addr("b"), false),
            Err(SequencerError::DestinationMismatch { index: 0, .. })
        ));
        assert!(ops.get(0).unwrap().enabled);
    }

    #[test]
    fn calldata_serializes_as_hex() {
        let op = Operation {
            destination: addr("pool"),
            data: vec![0xde, 0xad],
            enabled: true,
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"dead\""));
        assert_eq!(serde_json::from_str::<Operation>(&json).unwrap(), op);
    }
}
