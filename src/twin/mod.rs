//! Twin documents and property reconciliation.
//!
//! The backend owns the desired document and pushes it either as a full
//! snapshot (after every connect) or as incremental patches. The device owns
//! the reported document. [`PropertyReconciler`] converts the former into
//! patches of the latter via the registered property handlers.

mod document;
mod reconciler;


pub use document::*;
pub use reconciler::*;
