//! Top-level module for the language identification system.
//!
//! The pipeline is: bytes → automaton state counts → feature counts →
//! per-language log-probabilities → arg-max label. It is split into:
//! - Immutable compiled models (`CompiledModel`)
//! - The runtime identifier (`LanguageIdentifier`)
//! - Internal sparse counting sets (`SparseSet`)
//! - Generated tables backing the built-in default model

/// The compiled identification model.
///
/// Holds the byte-transition table, per-state output-feature runs,
/// naive Bayes priors and likelihoods, and language labels. Covers
/// both lifecycles: built-in constant tables and models decoded from
/// an external serialized file.
pub mod compiled;

/// The runtime identifier.
///
/// Owns one compiled model plus two reusable counting sets, and
/// exposes `identify` as the single classification entry point.
pub mod identifier;

/// Generated constant tables for the built-in default model.
///
/// This module is not exposed publicly.
mod default;

/// Sparse counting set over a bounded integer universe.
///
/// Supports O(1) clear, lookup and accumulation, used for both state
/// visit counts and feature counts. Not exposed publicly.
mod sparse_set;
