//! Pipeline stages shared by the image and PDF batches.
//!
//! Each submodule implements one step. Both batches run the same shape;
//! only the partitioner and the per-unit transform differ.
//!
//! ## Data Flow
//!
//! ```text
//! partition ──▶ transform × N ──▶ collect ──▶ assemble ──▶ finalize
//! (units)      (worker pool)     (reorder)   (one writer)  (save, inspect)
//! ```
//!
//! 1. [`partition`]: list images, or split a page count into chunks
//! 2. [`transform`] / [`render`]: CPU-bound per-unit work on the blocking
//!    pool; [`orient`], [`geometry`] and [`encode`] are its building blocks
//! 3. [`collect`]: the only barrier; sorts results by original index
//! 4. [`assemble`]: sequential page insertion into one output document
//! 5. [`finalize`]: atomic save, then an advisory read-back
//!
//! [`input`] validates the PDF path before any of this starts.

pub mod assemble;
pub mod collect;
pub mod encode;
pub mod finalize;
pub mod geometry;
pub mod input;
pub mod orient;
pub mod partition;
pub mod render;
pub mod transform;
