//! # scrawl-ot — text operation algebra for Scrawl
//!
//! The reconciliation core of the Scrawl editor: a small algebra over
//! plain-text edit operations that lets the server merge concurrent edits
//! from many clients into one serial history.
//!
//! ## Architecture
//!
//! ```text
//! client A edit ──┐
//!                 ├── transform(a, b) ── (a', b') ──► single serial log
//! client B edit ──┘
//!                 compose(a, b')  ==  compose(b, a')        (convergence)
//! ```
//!
//! An operation is a canonical run of `Retain` / `Insert` / `Delete`
//! components describing how one string becomes another. Three functions
//! form the contract:
//!
//! - [`TextOperation::apply`] — run an operation against its input string
//! - [`TextOperation::compose`] — collapse two sequential operations into one
//! - [`TextOperation::transform`] — rebase two concurrent operations so
//!   either order of application converges
//!
//! All positions and lengths are **UTF-16 code units**, the measure the
//! browser-side editor reports. Boundaries that would land inside a
//! surrogate pair are rejected rather than snapped.
//!
//! Reference: Ellis & Gibbs — Concurrency Control in Groupware Systems

pub mod cursor;
pub mod operation;
pub mod utf16;
pub mod wire;

mod transform;

pub use cursor::transform_index;
pub use operation::{OpComponent, OtError, TextOperation};

#[cfg(test)]
pub(crate) mod testing;
