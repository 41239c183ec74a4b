use std::path::Path;

use super::compiled::{CompiledModel, ModelError};
use super::sparse_set::SparseSet;

/// Runtime handle for classifying byte streams against one model.
///
/// Bundles a compiled model with two reusable counting sets: one sized
/// to the state universe, one to the feature universe. The sets are
/// cleared (not reallocated) at the start of every call, so a result
/// depends only on that call's input.
///
/// ## Responsibilities
/// - Drive input bytes through the automaton, counting state visits
/// - Expand distinct visited states into feature counts
/// - Score the feature vector with naive Bayes and pick the arg-max
///
/// # Notes
/// - One identifier performs one classification at a time; the working
///   sets are mutated in place, so concurrent use from several threads
///   needs one identifier per thread. The compiled model itself is
///   immutable and cheap to clone when backed by the built-in tables.
pub struct LanguageIdentifier {
	model: CompiledModel,
	state_counts: SparseSet,
	feat_counts: SparseSet,
}

impl LanguageIdentifier {
	/// Creates an identifier for the given model.
	///
	/// The two working sets are allocated here, sized to the model's
	/// state and feature universes, and reused for the identifier's
	/// whole lifetime.
	pub fn new(model: CompiledModel) -> Self {
		let state_counts = SparseSet::new(model.num_states());
		let feat_counts = SparseSet::new(model.num_feats());
		Self { model, state_counts, feat_counts }
	}

	/// Creates an identifier backed by the built-in default model.
	pub fn with_builtin_model() -> Self {
		Self::new(CompiledModel::builtin())
	}

	/// Creates an identifier from a serialized model file.
	///
	/// # Errors
	/// Propagates `ModelError` from the model loader.
	pub fn from_model_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
		Ok(Self::new(CompiledModel::from_path(path)?))
	}

	/// Returns the model this identifier classifies against.
	pub fn model(&self) -> &CompiledModel {
		&self.model
	}

	/// Identifies the language of `text`.
	///
	/// Accepts arbitrary binary input; the transition function is
	/// total, so classification never fails. Empty input yields the
	/// prior-only posterior, selecting the language with the highest
	/// prior. The returned label borrows from the model's label table.
	pub fn identify(&mut self, text: &[u8]) -> &str {
		self.count_features(text);
		let logprob = self.score();
		self.model.label(Self::argmax(&logprob))
	}

	/// Converts `text` into the feature count vector.
	///
	/// # Behavior
	/// - Clears both working sets.
	/// - Walks the automaton from state 0, counting every state
	///   entered.
	/// - Expands each distinct visited state once into its completed
	///   features, weighted by the visit count. Counting states first
	///   avoids re-expanding a state that recurs many times in long
	///   inputs.
	fn count_features(&mut self, text: &[u8]) {
		self.state_counts.clear();
		self.feat_counts.clear();

		let mut state = 0u32;
		for &byte in text {
			state = self.model.next_state(state, byte);
			self.state_counts.add(state, 1);
		}

		for (state, count) in self.state_counts.iter() {
			for &feat in self.model.state_outputs(state) {
				self.feat_counts.add(feat, count);
			}
		}
	}

	/// Computes per-language log-probabilities from the current
	/// feature counts.
	///
	/// Multinomial naive Bayes up to the normalizing constant:
	/// `logprob[lang] = prior[lang] + sum_f count(f) *
	/// likelihood[f][lang]`.
	fn score(&self) -> Vec<f64> {
		let mut logprob = self.model.priors().to_vec();
		for (feat, count) in self.feat_counts.iter() {
			let row = self.model.likelihood_row(feat);
			for (lp, likelihood) in logprob.iter_mut().zip(row) {
				*lp += f64::from(count) * likelihood;
			}
		}
		logprob
	}

	/// Returns the index of the maximum log-probability.
	///
	/// Replaces the incumbent only on strict inequality, so ties break
	/// toward the lowest index.
	fn argmax(logprob: &[f64]) -> usize {
		let mut best = 0;
		for (lang, lp) in logprob.iter().enumerate().skip(1) {
			if logprob[best] < *lp {
				best = lang;
			}
		}
		best
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Two states, two features, two languages. Byte `a` moves
	/// 0 -> 1 and keeps looping on state 1; every other byte returns
	/// to state 0. Entering state 1 completes feature 0, which is
	/// weighted heavily toward "en". Feature 1 is never completed.
	/// "fr" holds the higher prior.
	fn toy_model() -> CompiledModel {
		let mut transitions = vec![0u32; 2 * 256];
		transitions[b'a' as usize] = 1;
		transitions[256 + b'a' as usize] = 1;
		CompiledModel::from_parts(
			2,
			2,
			2,
			transitions,
			vec![0, 1],
			vec![0, 0],
			vec![0],
			vec![(0.4f64).ln(), (0.6f64).ln()],
			vec![(0.5f64).ln(), (0.01f64).ln(), (0.1f64).ln(), (0.1f64).ln()],
			vec!["en".to_owned(), "fr".to_owned()],
		)
		.expect("toy model is valid")
	}

	#[test]
	fn repeated_feature_bytes_select_heavy_class() {
		let mut lid = LanguageIdentifier::new(toy_model());
		assert_eq!(lid.identify(b"aaa"), "en");
		// every 'a' lands on state 1, which completes feature 0
		assert_eq!(lid.feat_counts.get(0), 3);
		assert_eq!(lid.feat_counts.get(1), 0);
	}

	#[test]
	fn empty_input_selects_highest_prior() {
		let mut lid = LanguageIdentifier::new(toy_model());
		assert_eq!(lid.identify(b""), "fr");
	}

	#[test]
	fn arbitrary_binary_input_is_accepted() {
		let mut lid = LanguageIdentifier::new(toy_model());
		let label = lid.identify(&[0x00, 0xff, b'a', 0xfe, b'a', 0x80]);
		assert!(label == "en" || label == "fr");
		assert_eq!(lid.feat_counts.get(0), 2);
	}

	#[test]
	fn identification_is_deterministic() {
		let mut lid = LanguageIdentifier::new(toy_model());
		let text = b"abacada";
		let first = lid.identify(text).to_owned();
		for _ in 0..5 {
			assert_eq!(lid.identify(text), first);
		}
	}

	#[test]
	fn results_do_not_leak_across_calls() {
		let mut lid = LanguageIdentifier::new(toy_model());
		lid.identify(b"aaaaaaaa");
		// the second call must see only its own counts
		lid.identify(b"");
		assert_eq!(lid.feat_counts.get(0), 0);
		assert_eq!(lid.state_counts.len(), 0);
	}

	#[test]
	fn doubling_input_doubles_feature_counts() {
		let mut lid = LanguageIdentifier::new(toy_model());
		let text = b"xaayaaz";
		lid.count_features(text);
		let single: Vec<(u32, u32)> = lid.feat_counts.iter().collect();
		let single_scores = lid.score();

		let mut doubled_text = text.to_vec();
		doubled_text.extend_from_slice(text);
		lid.count_features(&doubled_text);
		let doubled: Vec<(u32, u32)> = lid.feat_counts.iter().collect();
		let doubled_scores = lid.score();

		assert_eq!(doubled.len(), single.len());
		for ((feat, count), (feat2, count2)) in single.iter().zip(&doubled) {
			assert_eq!(feat, feat2);
			assert_eq!(count * 2, *count2);
		}

		// each class's likelihood contribution scales by exactly 2x
		let priors = lid.model.priors();
		for ((s, d), prior) in single_scores.iter().zip(&doubled_scores).zip(priors) {
			let single_contrib = s - prior;
			let doubled_contrib = d - prior;
			assert!((doubled_contrib - 2.0 * single_contrib).abs() < 1e-9);
		}
	}

	#[test]
	fn argmax_breaks_ties_toward_lowest_index() {
		assert_eq!(LanguageIdentifier::argmax(&[0.0, 0.0, 0.0]), 0);
		assert_eq!(LanguageIdentifier::argmax(&[-1.0, 0.5, 0.5]), 1);
		assert_eq!(LanguageIdentifier::argmax(&[-3.0]), 0);
	}
}
