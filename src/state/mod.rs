//! State module for tracking document resolution
//!
//! # Components
//!
//! - `DocumentState`: where a document stands in the two-phase attach
//!   protocol (pending metadata, pending download link, confirmed, discarded)

mod document_state;

pub use document_state::DocumentState;
