//! Pipeline stages for clipboard-to-Markdown ingestion.
//!
//! Each submodule implements exactly one step. Only [`resolve`] and
//! [`upload`] touch the network, and both sit behind traits so the rest of
//! the pipeline can be tested without it.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ compile ──▶ placeholders ──▶ attachments ──▶ postprocess
//! (files)   (tree→text)  (resolve+upload)  (raw uploads)   (optional tidy)
//! ```
//!
//! 1. [`input`]        — read capture files or a recorded JSON payload
//! 2. [`compile`]      — walk the document tree, emitting text and numbered
//!    image placeholders
//! 3. [`locator`]      — classify each image source
//! 4. [`placeholders`] — swap every placeholder for its final reference, one
//!    at a time in document order, via [`resolve`] and [`upload`]
//! 5. [`attachments`]  — upload raw image attachments and build the suffix
//! 6. [`postprocess`]  — optional whitespace and invisible-character tidy

pub mod attachments;
pub mod compile;
pub mod input;
pub mod locator;
pub mod placeholders;
pub mod postprocess;
pub mod resolve;
pub mod upload;
