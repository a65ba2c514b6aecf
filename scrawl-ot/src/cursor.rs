//! Transporting caret positions across concurrent operations.
//!
//! When an operation commits, every position reported against the old
//! revision has to be re-expressed against the new one. The rules:
//!
//! - a position strictly after a component's range shifts by the
//!   component's length delta,
//! - a position inside a deleted range snaps to the deletion start,
//! - an insert at exactly the position leaves it in place (typing next to
//!   someone's caret does not push their caret).

use crate::operation::{OpComponent, TextOperation};
use crate::utf16;

/// Map a single UTF-16 position across `operation`.
pub fn transform_index(operation: &TextOperation, position: u64) -> u64 {
    let mut transformed = position;
    let mut walked = 0u64; // position in the base string
    for component in operation.components() {
        if walked >= position {
            break;
        }
        match component {
            OpComponent::Retain(n) => walked += n,
            OpComponent::Delete(n) => {
                transformed -= (position - walked).min(*n);
                walked += n;
            }
            OpComponent::Insert(s) => transformed += utf16::len(s),
        }
    }
    transformed
}
