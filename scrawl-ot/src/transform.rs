//! Sequential composition and concurrent transformation.
//!
//! Both walk two component runs with a pair of cursors, splitting whichever
//! component is longer so the runs stay aligned. `compose` collapses two
//! operations that ran back-to-back; `transform` rebases two operations
//! that ran concurrently against the same base so that
//!
//! ```text
//! compose(a, b') == compose(b, a')    where (a', b') = transform(a, b)
//! ```
//!
//! When both sides insert at the same offset the first argument's text is
//! placed first; the tie-break is part of the wire contract shared with
//! deployed clients.

use crate::operation::{OpComponent, OtError, TextOperation};
use crate::utf16;

impl TextOperation {
    /// Collapse `self` followed by `other` into a single operation.
    ///
    /// Fails unless `self.target_len() == other.base_len()`.
    pub fn compose(&self, other: &Self) -> Result<Self, OtError> {
        if self.target_len() != other.base_len() {
            return Err(OtError::LengthMismatch {
                expected: self.target_len(),
                actual: other.base_len(),
            });
        }

        let mut composed = TextOperation::default();
        let mut first = self.components().iter().cloned();
        let mut second = other.components().iter().cloned();
        let mut head_a = first.next();
        let mut head_b = second.next();

        loop {
            match (&head_a, &head_b) {
                (None, None) => break,

                // deletes from the first pass through untouched
                (Some(OpComponent::Delete(n)), _) => {
                    composed.delete(*n);
                    head_a = first.next();
                }
                // inserts from the second pass through untouched
                (_, Some(OpComponent::Insert(s))) => {
                    composed.insert(s.clone());
                    head_b = second.next();
                }

                (None, _) | (_, None) => return Err(OtError::Incompatible),

                (Some(OpComponent::Retain(n)), Some(OpComponent::Retain(m))) => {
                    let (n, m) = (*n, *m);
                    composed.retain(n.min(m));
                    match n.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            head_b = Some(OpComponent::Retain(m - n));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            head_a = Some(OpComponent::Retain(n - m));
                            head_b = second.next();
                        }
                    }
                }

                (Some(OpComponent::Insert(s)), Some(OpComponent::Delete(m))) => {
                    let (len, m) = (utf16::len(s), *m);
                    match len.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            head_b = Some(OpComponent::Delete(m - len));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            let (_, kept) =
                                utf16::split(s, m).ok_or(OtError::SurrogateBoundary)?;
                            let kept = kept.to_owned();
                            head_a = Some(OpComponent::Insert(kept));
                            head_b = second.next();
                        }
                    }
                }

                (Some(OpComponent::Insert(s)), Some(OpComponent::Retain(m))) => {
                    let (len, m) = (utf16::len(s), *m);
                    match len.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            composed.insert(s.clone());
                            head_b = Some(OpComponent::Retain(m - len));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            composed.insert(s.clone());
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            let (kept, rest) =
                                utf16::split(s, m).ok_or(OtError::SurrogateBoundary)?;
                            let (kept, rest) = (kept.to_owned(), rest.to_owned());
                            composed.insert(kept);
                            head_a = Some(OpComponent::Insert(rest));
                            head_b = second.next();
                        }
                    }
                }

                (Some(OpComponent::Retain(n)), Some(OpComponent::Delete(m))) => {
                    let (n, m) = (*n, *m);
                    composed.delete(n.min(m));
                    match n.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            head_b = Some(OpComponent::Delete(m - n));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            head_a = Some(OpComponent::Retain(n - m));
                            head_b = second.next();
                        }
                    }
                }
            }
        }

        Ok(composed)
    }

    /// Rebase two concurrent operations over the same base string.
    ///
    /// Returns `(a', b')` such that applying `self` then `b'` produces the
    /// same string as applying `other` then `a'`. Fails unless both sides
    /// share a `base_len`.
    pub fn transform(&self, other: &Self) -> Result<(Self, Self), OtError> {
        if self.base_len() != other.base_len() {
            return Err(OtError::LengthMismatch {
                expected: self.base_len(),
                actual: other.base_len(),
            });
        }

        let mut a_prime = TextOperation::default();
        let mut b_prime = TextOperation::default();
        let mut first = self.components().iter().cloned();
        let mut second = other.components().iter().cloned();
        let mut head_a = first.next();
        let mut head_b = second.next();

        loop {
            match (&head_a, &head_b) {
                (None, None) => break,

                // the first side's insert goes in front: it lands in a'
                // as an insert and in b' as a retain over the new text
                (Some(OpComponent::Insert(s)), _) => {
                    a_prime.insert(s.clone());
                    b_prime.retain(utf16::len(s));
                    head_a = first.next();
                }
                (_, Some(OpComponent::Insert(s))) => {
                    a_prime.retain(utf16::len(s));
                    b_prime.insert(s.clone());
                    head_b = second.next();
                }

                (None, _) | (_, None) => return Err(OtError::Incompatible),

                (Some(OpComponent::Retain(n)), Some(OpComponent::Retain(m))) => {
                    let (n, m) = (*n, *m);
                    let shared = n.min(m);
                    a_prime.retain(shared);
                    b_prime.retain(shared);
                    match n.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            head_b = Some(OpComponent::Retain(m - n));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            head_a = Some(OpComponent::Retain(n - m));
                            head_b = second.next();
                        }
                    }
                }

                // both deleted the same region: nothing left to transform
                (Some(OpComponent::Delete(n)), Some(OpComponent::Delete(m))) => {
                    let (n, m) = (*n, *m);
                    match n.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            head_b = Some(OpComponent::Delete(m - n));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            head_a = Some(OpComponent::Delete(n - m));
                            head_b = second.next();
                        }
                    }
                }

                (Some(OpComponent::Delete(n)), Some(OpComponent::Retain(m))) => {
                    let (n, m) = (*n, *m);
                    a_prime.delete(n.min(m));
                    match n.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            head_b = Some(OpComponent::Retain(m - n));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            head_a = Some(OpComponent::Delete(n - m));
                            head_b = second.next();
                        }
                    }
                }

                (Some(OpComponent::Retain(n)), Some(OpComponent::Delete(m))) => {
                    let (n, m) = (*n, *m);
                    b_prime.delete(n.min(m));
                    match n.cmp(&m) {
                        std::cmp::Ordering::Less => {
                            head_b = Some(OpComponent::Delete(m - n));
                            head_a = first.next();
                        }
                        std::cmp::Ordering::Equal => {
                            head_a = first.next();
                            head_b = second.next();
                        }
                        std::cmp::Ordering::Greater => {
                            head_a = Some(OpComponent::Retain(n - m));
                            head_b = second.next();
                        }
                    }
                }
            }
        }

        Ok((a_prime, b_prime))
    }
}
