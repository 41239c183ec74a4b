//! End-to-end tests against the public API and the built-in model.

use std::io::Write;

use langid_core::model::compiled::{CompiledModel, ModelError};
use langid_core::model::identifier::LanguageIdentifier;

#[test]
fn builtin_model_identifies_sample_sentences() {
	let samples: [(&str, &str); 7] = [
		("the quick brown fox jumps over the lazy dog and the cat", "en"),
		("der alte hund und die katze schlafen nicht im garten", "de"),
		("el perro que vive con los vecinos en una casa blanca", "es"),
		("le chat est assis dans les jardins pour une heure", "fr"),
		("il gatto che dorme nella casa della nonna per ore", "it"),
		("het oude huis is een van de mooiste die er niet meer zijn", "nl"),
		("o cão não gosta de ficar como um dos gatos da vizinhança", "pt"),
	];

	let mut lid = LanguageIdentifier::with_builtin_model();
	for (text, expected) in samples {
		assert_eq!(lid.identify(text.as_bytes()), expected, "input: {text:?}");
	}
}

#[test]
fn empty_input_falls_back_to_the_prior() {
	let mut lid = LanguageIdentifier::with_builtin_model();
	// "en" carries the highest prior in the built-in model
	assert_eq!(lid.identify(b""), "en");
}

#[test]
fn featureless_binary_input_falls_back_to_the_prior() {
	let mut lid = LanguageIdentifier::with_builtin_model();
	assert_eq!(lid.identify(b"zzzz \xff\x00\x01 qqq"), "en");
}

#[test]
fn identification_is_deterministic_across_calls() {
	let mut lid = LanguageIdentifier::with_builtin_model();
	let text = "le chat est assis dans les jardins pour une heure".as_bytes();
	let first = lid.identify(text).to_owned();
	for _ in 0..10 {
		assert_eq!(lid.identify(text), first);
	}
}

#[test]
fn builtin_model_exposes_its_labels() {
	let model = CompiledModel::builtin();
	let labels: Vec<&str> = model.labels().collect();
	assert_eq!(labels.len(), model.num_langs());
	assert!(labels.contains(&"en"));
	assert!(labels.contains(&"pt"));
}

#[test]
fn model_loaded_from_disk_matches_builtin() {
	let bytes = postcard::to_stdvec(&CompiledModel::builtin()).expect("encode");
	let mut file = tempfile::NamedTempFile::new().expect("temp file");
	file.write_all(&bytes).expect("write model");

	let mut loaded = LanguageIdentifier::from_model_path(file.path()).expect("load model");
	let mut builtin = LanguageIdentifier::with_builtin_model();

	let text = "der alte hund und die katze schlafen nicht im garten".as_bytes();
	assert_eq!(loaded.identify(text), builtin.identify(text));
	assert_eq!(loaded.model(), builtin.model());
}

#[test]
fn missing_model_file_reports_io_error() {
	let err = CompiledModel::from_path("/no/such/model.langid").unwrap_err();
	assert!(matches!(err, ModelError::Io(_)));
}

#[test]
fn corrupt_model_file_is_rejected() {
	let mut file = tempfile::NamedTempFile::new().expect("temp file");
	file.write_all(b"\x9f\x86definitely not a model\xff\xff\xff\xff")
		.expect("write garbage");

	let err = CompiledModel::from_path(file.path()).unwrap_err();
	assert!(matches!(err, ModelError::Decode(_) | ModelError::Invalid(_)));
}
