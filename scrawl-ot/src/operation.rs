//! Canonical edit operations over plain text.
//!
//! A [`TextOperation`] is built through the coalescing methods
//! [`retain`](TextOperation::retain), [`insert`](TextOperation::insert) and
//! [`delete`](TextOperation::delete), which maintain the canonical form as
//! components are appended:
//!
//! - adjacent components of the same kind are merged,
//! - zero-length components are dropped,
//! - an insert adjacent to a delete is ordered insert-first, so equivalent
//!   edits always produce identical component runs.
//!
//! `base_len` and `target_len` are tracked incrementally: the former is the
//! UTF-16 length of any input the operation accepts, the latter the length
//! of its output.

use thiserror::Error;

use crate::utf16;

/// One step of a [`TextOperation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpComponent {
    /// Advance the cursor `n` UTF-16 code units without change.
    Retain(u64),
    /// Remove `n` UTF-16 code units at the cursor.
    Delete(u64),
    /// Insert the string at the cursor.
    Insert(String),
}

impl OpComponent {
    /// UTF-16 length of the base-string range this component covers.
    pub fn base_units(&self) -> u64 {
        match self {
            OpComponent::Retain(n) | OpComponent::Delete(n) => *n,
            OpComponent::Insert(_) => 0,
        }
    }
}

/// Errors raised by the algebra.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OtError {
    /// An operation was paired with a string or operation of the wrong length.
    #[error("operation expects length {expected}, got {actual} (UTF-16 units)")]
    LengthMismatch { expected: u64, actual: u64 },
    /// Two operations of matching length do not align component-for-component.
    #[error("operations do not align component-for-component")]
    Incompatible,
    /// A component boundary falls between the two halves of a surrogate pair.
    #[error("component boundary falls inside a surrogate pair")]
    SurrogateBoundary,
}

/// A canonical sequence of edit components turning one string into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOperation {
    components: Vec<OpComponent>,
    base_len: u64,
    target_len: u64,
}

impl TextOperation {
    /// The empty operation (identity on the empty string).
    pub fn new() -> Self {
        Self::default()
    }

    /// UTF-16 length of the input this operation applies to.
    pub fn base_len(&self) -> u64 {
        self.base_len
    }

    /// UTF-16 length of the output this operation produces.
    pub fn target_len(&self) -> u64 {
        self.target_len
    }

    /// The canonical component run.
    pub fn components(&self) -> &[OpComponent] {
        &self.components
    }

    /// Append a retain of `n` code units.
    pub fn retain(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        self.base_len += n;
        self.target_len += n;
        if let Some(OpComponent::Retain(last)) = self.components.last_mut() {
            *last += n;
        } else {
            self.components.push(OpComponent::Retain(n));
        }
    }

    /// Append a delete of `n` code units.
    pub fn delete(&mut self, n: u64) {
        if n == 0 {
            return;
        }
        self.base_len += n;
        if let Some(OpComponent::Delete(last)) = self.components.last_mut() {
            *last += n;
        } else {
            self.components.push(OpComponent::Delete(n));
        }
    }

    /// Append an insert of `s`.
    ///
    /// An insert directly after a delete is reordered in front of it, so
    /// "delete then insert" and "insert then delete" of the same span build
    /// the same canonical run.
    pub fn insert(&mut self, s: impl Into<String>) {
        let s: String = s.into();
        if s.is_empty() {
            return;
        }
        self.target_len += utf16::len(&s);
        match self.components.as_mut_slice() {
            [.., OpComponent::Insert(last)] => last.push_str(&s),
            [.., OpComponent::Insert(before_delete), OpComponent::Delete(_)] => {
                before_delete.push_str(&s);
            }
            [.., last @ OpComponent::Delete(_)] => {
                let delete = std::mem::replace(last, OpComponent::Insert(s));
                self.components.push(delete);
            }
            _ => self.components.push(OpComponent::Insert(s)),
        }
    }

    /// Append an arbitrary component through the coalescing builder.
    pub fn add(&mut self, component: OpComponent) {
        match component {
            OpComponent::Retain(n) => self.retain(n),
            OpComponent::Delete(n) => self.delete(n),
            OpComponent::Insert(s) => self.insert(s),
        }
    }

    /// Whether applying this operation changes nothing.
    pub fn is_noop(&self) -> bool {
        matches!(self.components.as_slice(), [] | [OpComponent::Retain(_)])
    }

    /// Apply the operation to `s`, producing the edited string.
    ///
    /// Fails unless the UTF-16 length of `s` equals [`base_len`](Self::base_len).
    pub fn apply(&self, s: &str) -> Result<String, OtError> {
        let actual = utf16::len(s);
        if actual != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual,
            });
        }
        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        for component in &self.components {
            match component {
                OpComponent::Retain(n) => {
                    let (head, tail) =
                        utf16::split(rest, *n).ok_or(OtError::SurrogateBoundary)?;
                    out.push_str(head);
                    rest = tail;
                }
                OpComponent::Delete(n) => {
                    let (_, tail) =
                        utf16::split(rest, *n).ok_or(OtError::SurrogateBoundary)?;
                    rest = tail;
                }
                OpComponent::Insert(text) => out.push_str(text),
            }
        }
        Ok(out)
    }

    /// The operation that undoes this one, given the string it applied to.
    pub fn invert(&self, s: &str) -> Result<Self, OtError> {
        let actual = utf16::len(s);
        if actual != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual,
            });
        }
        let mut inverse = TextOperation::default();
        let mut rest = s;
        for component in &self.components {
            match component {
                OpComponent::Retain(n) => {
                    let (_, tail) =
                        utf16::split(rest, *n).ok_or(OtError::SurrogateBoundary)?;
                    inverse.retain(*n);
                    rest = tail;
                }
                OpComponent::Delete(n) => {
                    let (deleted, tail) =
                        utf16::split(rest, *n).ok_or(OtError::SurrogateBoundary)?;
                    inverse.insert(deleted);
                    rest = tail;
                }
                OpComponent::Insert(text) => inverse.delete(utf16::len(text)),
            }
        }
        Ok(inverse)
    }
}

impl FromIterator<OpComponent> for TextOperation {
    fn from_iter<T: IntoIterator<Item = OpComponent>>(iter: T) -> Self {
        let mut op = TextOperation::default();
        for component in iter {
            op.add(component);
        }
        op
    }
}
