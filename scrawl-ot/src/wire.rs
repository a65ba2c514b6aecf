//! The on-the-wire form of an operation.
//!
//! Operations travel as a flat JSON array mixing integers and strings:
//!
//! ```text
//! [3, "X", -2]    retain 3, insert "X", delete 2
//! ```
//!
//! Positive integers retain, negative integers delete, strings insert.
//! Decoding feeds every element through the coalescing builder, so whatever
//! a client sends is canonical by the time it reaches the session: adjacent
//! same-kind components are merged and zero-length elements vanish.

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::operation::{OpComponent, TextOperation};

impl Serialize for TextOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.components().len()))?;
        for component in self.components() {
            match component {
                OpComponent::Retain(n) => seq.serialize_element(&(*n as i64))?,
                OpComponent::Delete(n) => seq.serialize_element(&-(*n as i64))?,
                OpComponent::Insert(s) => seq.serialize_element(s)?,
            }
        }
        seq.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireComponent {
    Number(i64),
    Text(String),
}

struct OperationVisitor;

impl<'de> Visitor<'de> for OperationVisitor {
    type Value = TextOperation;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an array of integers and strings")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut operation = TextOperation::default();
        while let Some(element) = seq.next_element::<WireComponent>()? {
            match element {
                WireComponent::Number(n) if n >= 0 => operation.retain(n as u64),
                WireComponent::Number(n) => operation.delete(n.unsigned_abs()),
                WireComponent::Text(s) => operation.insert(s),
            }
        }
        Ok(operation)
    }
}

impl<'de> Deserialize<'de> for TextOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(OperationVisitor)
    }
}
