//! Byte n-gram language identification library.
//!
//! This crate implements the identification pipeline of Lui & Baldwin
//! style language detection:
//! - A deterministic byte automaton that recognizes a trained
//!   dictionary of n-gram features in arbitrary binary input
//! - Sparse counting sets that accumulate state and feature counts
//!   without per-call allocation
//! - Multinomial naive Bayes scoring over the accumulated feature
//!   vector, selecting the arg-max language
//!
//! Models exist in two lifecycles: a built-in default compiled into
//! the binary, and externally serialized models loaded from disk.
//! Only the high-level API is exposed publicly; the counting
//! structures and generated tables are kept internal.

/// Compiled models, identification, and model loading.
///
/// This module exposes the model and identifier types while keeping
/// internal table storage and counting structures private.
pub mod model;
