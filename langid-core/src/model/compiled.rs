use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::default;

/// Errors that can occur while obtaining a compiled model.
///
/// Classification itself has no failure mode; these cover the two
/// checked paths of model loading plus invariant violations detected
/// at construction time.
#[derive(Error, Debug)]
pub enum ModelError {
	/// The model file could not be opened or read.
	#[error("unable to read model file: {0}")]
	Io(#[from] std::io::Error),

	/// The bytes could not be parsed as a serialized model.
	#[error("malformed model data: {0}")]
	Decode(#[from] postcard::Error),

	/// The decoded tables violate a dimension or content invariant.
	#[error("invalid model: {0}")]
	Invalid(String),
}

/// The trained, immutable tables of one identification model.
///
/// The automaton side is a total byte-transition function plus, for
/// each state, a run of completed-feature indices (a state can finish
/// zero or more overlapping n-grams). The classifier side holds
/// log-space naive Bayes priors and per-feature per-language
/// likelihoods, and the language label strings.
///
/// ## Responsibilities
/// - Store validated tables, never mutated after construction
/// - Provide both lifecycles: `builtin` borrows `'static` generated
///   tables at zero cost, `from_path`/`from_bytes` decode an external
///   serialized model into fully owned storage
/// - Serve as the wire message itself (serde + postcard)
///
/// # Invariants
/// - `transitions` has `num_states * 256` entries, each `< num_states`
/// - `output_offsets[s] + output_counts[s] <= outputs.len()` for all
///   states, and every entry of `outputs` is `< num_feats`
/// - `priors` and `labels` have `num_langs` entries, labels unique
/// - `likelihoods` has `num_feats * num_langs` entries (feature-major)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompiledModel {
	num_states: usize,
	num_feats: usize,
	num_langs: usize,
	/// Dense transition table, row-major `[state][byte]`.
	transitions: Cow<'static, [u32]>,
	/// Number of features completed by entering each state.
	output_counts: Cow<'static, [u32]>,
	/// Offset of each state's feature run inside `outputs`.
	output_offsets: Cow<'static, [u32]>,
	/// Flattened per-state completed-feature lists.
	outputs: Cow<'static, [u32]>,
	/// Log-space class priors, one per language.
	priors: Cow<'static, [f64]>,
	/// Log-space likelihoods, row-major `[feat][lang]`.
	likelihoods: Cow<'static, [f64]>,
	/// Language label strings, unique, one per language.
	labels: Vec<Cow<'static, str>>,
}

impl CompiledModel {
	/// Returns the built-in default model.
	///
	/// All numeric tables are borrowed from generated `'static` data,
	/// so this never copies table memory and always succeeds.
	pub fn builtin() -> Self {
		Self {
			num_states: default::NUM_STATES,
			num_feats: default::NUM_FEATS,
			num_langs: default::NUM_LANGS,
			transitions: Cow::Borrowed(&default::TRANSITIONS),
			output_counts: Cow::Borrowed(&default::OUTPUT_COUNTS),
			output_offsets: Cow::Borrowed(&default::OUTPUT_OFFSETS),
			outputs: Cow::Borrowed(&default::OUTPUTS),
			priors: Cow::Borrowed(&default::PRIORS),
			likelihoods: Cow::Borrowed(&default::LIKELIHOODS),
			labels: default::LABELS.iter().map(|l| Cow::Borrowed(*l)).collect(),
		}
	}

	/// Builds a model from owned table arrays, validating all
	/// invariants.
	///
	/// This is the construction path for programmatically assembled
	/// models (fixtures, converters).
	///
	/// # Errors
	/// Returns `ModelError::Invalid` if any table dimension or content
	/// invariant is violated.
	#[allow(clippy::too_many_arguments)]
	pub fn from_parts(
		num_states: usize,
		num_feats: usize,
		num_langs: usize,
		transitions: Vec<u32>,
		output_counts: Vec<u32>,
		output_offsets: Vec<u32>,
		outputs: Vec<u32>,
		priors: Vec<f64>,
		likelihoods: Vec<f64>,
		labels: Vec<String>,
	) -> Result<Self, ModelError> {
		Self {
			num_states,
			num_feats,
			num_langs,
			transitions: Cow::Owned(transitions),
			output_counts: Cow::Owned(output_counts),
			output_offsets: Cow::Owned(output_offsets),
			outputs: Cow::Owned(outputs),
			priors: Cow::Owned(priors),
			likelihoods: Cow::Owned(likelihoods),
			labels: labels.into_iter().map(Cow::Owned).collect(),
		}
		.validated()
	}

	/// Decodes a serialized model from raw bytes.
	///
	/// The decoded model owns all of its tables, including label
	/// strings; nothing aliases `bytes` after this call returns.
	///
	/// # Errors
	/// - `ModelError::Decode` if the bytes are not a well-formed
	///   serialized model.
	/// - `ModelError::Invalid` if the decoded tables violate the model
	///   invariants.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
		let model: Self = postcard::from_bytes(bytes)?;
		model.validated()
	}

	/// Loads a serialized model from a file.
	///
	/// # Errors
	/// - `ModelError::Io` if the file cannot be opened or read.
	/// - `ModelError::Decode` / `ModelError::Invalid` as for
	///   `from_bytes`.
	pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
		let path = path.as_ref();
		debug!("loading model from {}", path.display());
		let bytes = std::fs::read(path)?;
		let model = Self::from_bytes(&bytes)?;
		debug!(
			"loaded model: {} feats, {} langs, {} states",
			model.num_feats, model.num_langs, model.num_states
		);
		Ok(model)
	}

	/// Checks every table dimension and content invariant.
	///
	/// Run on every construction path except `builtin`, whose
	/// generated tables are covered by tests instead.
	fn validated(self) -> Result<Self, ModelError> {
		if self.num_langs == 0 {
			return Err(ModelError::Invalid("model declares no languages".to_owned()));
		}
		if self.num_states == 0 {
			return Err(ModelError::Invalid("model declares no states".to_owned()));
		}
		let transition_len = self
			.num_states
			.checked_mul(256)
			.ok_or_else(|| ModelError::Invalid("state count overflows transition table".to_owned()))?;
		if self.transitions.len() != transition_len {
			return Err(ModelError::Invalid(format!(
				"transition table has {} entries, expected {}",
				self.transitions.len(),
				transition_len
			)));
		}
		if let Some(&target) = self.transitions.iter().find(|&&t| t as usize >= self.num_states) {
			return Err(ModelError::Invalid(format!(
				"transition target {} out of range for {} states",
				target, self.num_states
			)));
		}
		if self.output_counts.len() != self.num_states || self.output_offsets.len() != self.num_states {
			return Err(ModelError::Invalid(format!(
				"output index tables have {}/{} entries, expected {}",
				self.output_counts.len(),
				self.output_offsets.len(),
				self.num_states
			)));
		}
		for state in 0..self.num_states {
			let start = self.output_offsets[state] as usize;
			let count = self.output_counts[state] as usize;
			let end = start
				.checked_add(count)
				.ok_or_else(|| ModelError::Invalid(format!("output run of state {} overflows", state)))?;
			if end > self.outputs.len() {
				return Err(ModelError::Invalid(format!(
					"output run of state {} ends at {}, past {} entries",
					state,
					end,
					self.outputs.len()
				)));
			}
		}
		if let Some(&feat) = self.outputs.iter().find(|&&f| f as usize >= self.num_feats) {
			return Err(ModelError::Invalid(format!(
				"output feature {} out of range for {} features",
				feat, self.num_feats
			)));
		}
		if self.priors.len() != self.num_langs {
			return Err(ModelError::Invalid(format!(
				"prior table has {} entries, expected {}",
				self.priors.len(),
				self.num_langs
			)));
		}
		let likelihood_len = self
			.num_feats
			.checked_mul(self.num_langs)
			.ok_or_else(|| ModelError::Invalid("feature count overflows likelihood table".to_owned()))?;
		if self.likelihoods.len() != likelihood_len {
			return Err(ModelError::Invalid(format!(
				"likelihood table has {} entries, expected {}",
				self.likelihoods.len(),
				likelihood_len
			)));
		}
		if self.labels.len() != self.num_langs {
			return Err(ModelError::Invalid(format!(
				"label table has {} entries, expected {}",
				self.labels.len(),
				self.num_langs
			)));
		}
		let distinct: HashSet<&str> = self.labels.iter().map(|l| l.as_ref()).collect();
		if distinct.len() != self.labels.len() {
			return Err(ModelError::Invalid("label strings are not unique".to_owned()));
		}
		Ok(self)
	}

	/// Returns the number of automaton states.
	pub fn num_states(&self) -> usize {
		self.num_states
	}

	/// Returns the number of n-gram features.
	pub fn num_feats(&self) -> usize {
		self.num_feats
	}

	/// Returns the number of languages.
	pub fn num_langs(&self) -> usize {
		self.num_langs
	}

	/// Returns the label of the language at `lang`.
	pub fn label(&self, lang: usize) -> &str {
		&self.labels[lang]
	}

	/// Iterates over the language labels in class order.
	pub fn labels(&self) -> impl Iterator<Item = &str> {
		self.labels.iter().map(|l| l.as_ref())
	}

	/// Looks up the successor of `state` on input `byte`.
	///
	/// Total over all 256 byte values; never fails for a valid model.
	pub(super) fn next_state(&self, state: u32, byte: u8) -> u32 {
		self.transitions[state as usize * 256 + byte as usize]
	}

	/// Returns the features completed by entering `state`.
	pub(super) fn state_outputs(&self, state: u32) -> &[u32] {
		let start = self.output_offsets[state as usize] as usize;
		let count = self.output_counts[state as usize] as usize;
		&self.outputs[start..start + count]
	}

	/// Returns the log-space class priors.
	pub(super) fn priors(&self) -> &[f64] {
		&self.priors
	}

	/// Returns the log-space likelihood row of `feat`, one entry per
	/// language.
	pub(super) fn likelihood_row(&self, feat: u32) -> &[f64] {
		let start = feat as usize * self.num_langs;
		&self.likelihoods[start..start + self.num_langs]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tiny_model() -> CompiledModel {
		// one state looping to itself, one feature it completes
		CompiledModel::from_parts(
			1,
			1,
			2,
			vec![0; 256],
			vec![1],
			vec![0],
			vec![0],
			vec![-0.5, -0.9],
			vec![-1.0, -2.0],
			vec!["en".to_owned(), "fr".to_owned()],
		)
		.expect("tiny model is valid")
	}

	#[test]
	fn builtin_tables_are_valid() {
		CompiledModel::builtin().validated().expect("builtin model must validate");
	}

	#[test]
	fn builtin_transition_function_is_total() {
		let model = CompiledModel::builtin();
		for state in 0..model.num_states() as u32 {
			for byte in 0..=255u8 {
				assert!((model.next_state(state, byte) as usize) < model.num_states());
			}
		}
	}

	#[test]
	fn builtin_output_runs_stay_in_bounds() {
		let model = CompiledModel::builtin();
		for state in 0..model.num_states() as u32 {
			for &feat in model.state_outputs(state) {
				assert!((feat as usize) < model.num_feats());
			}
		}
	}

	#[test]
	fn roundtrip_is_bit_exact() {
		let model = tiny_model();
		let bytes = postcard::to_stdvec(&model).expect("encode");
		let decoded = CompiledModel::from_bytes(&bytes).expect("decode");
		assert_eq!(model, decoded);

		let builtin = CompiledModel::builtin();
		let bytes = postcard::to_stdvec(&builtin).expect("encode");
		let decoded = CompiledModel::from_bytes(&bytes).expect("decode");
		// PartialEq on f64 tables: equality here means every prior and
		// likelihood survived the trip bit-exactly
		assert_eq!(builtin, decoded);
	}

	#[test]
	fn rejects_zero_languages() {
		let err = CompiledModel::from_parts(
			1,
			0,
			0,
			vec![0; 256],
			vec![0],
			vec![0],
			vec![],
			vec![],
			vec![],
			vec![],
		)
		.unwrap_err();
		assert!(matches!(err, ModelError::Invalid(_)));
	}

	#[test]
	fn rejects_out_of_range_transition() {
		let mut transitions = vec![0; 256];
		transitions[10] = 1; // only state 0 exists
		let err = CompiledModel::from_parts(
			1,
			0,
			1,
			transitions,
			vec![0],
			vec![0],
			vec![],
			vec![-0.1],
			vec![],
			vec!["en".to_owned()],
		)
		.unwrap_err();
		assert!(matches!(err, ModelError::Invalid(_)));
	}

	#[test]
	fn rejects_output_run_past_table_end() {
		let err = CompiledModel::from_parts(
			1,
			1,
			1,
			vec![0; 256],
			vec![2],
			vec![0],
			vec![0], // run claims two entries, table has one
			vec![-0.1],
			vec![-1.0],
			vec!["en".to_owned()],
		)
		.unwrap_err();
		assert!(matches!(err, ModelError::Invalid(_)));
	}

	#[test]
	fn rejects_likelihood_dimension_mismatch() {
		let err = CompiledModel::from_parts(
			1,
			2,
			2,
			vec![0; 256],
			vec![0],
			vec![0],
			vec![],
			vec![-0.1, -0.2],
			vec![-1.0, -2.0, -3.0], // expected 2 * 2 entries
			vec!["en".to_owned(), "fr".to_owned()],
		)
		.unwrap_err();
		assert!(matches!(err, ModelError::Invalid(_)));
	}

	#[test]
	fn rejects_duplicate_labels() {
		let err = CompiledModel::from_parts(
			1,
			0,
			2,
			vec![0; 256],
			vec![0],
			vec![0],
			vec![],
			vec![-0.1, -0.2],
			vec![],
			vec!["en".to_owned(), "en".to_owned()],
		)
		.unwrap_err();
		assert!(matches!(err, ModelError::Invalid(_)));
	}

	#[test]
	fn truncated_bytes_fail_to_decode() {
		let bytes = postcard::to_stdvec(&tiny_model()).expect("encode");
		let err = CompiledModel::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
		assert!(matches!(err, ModelError::Decode(_)));
	}
}
