use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use log::debug;

use langid_core::model::compiled::CompiledModel;
use langid_core::model::identifier::LanguageIdentifier;

/// Label printed for batch paths that cannot be read.
const NO_FILE: &str = "NOSUCHFILE";

/// Identify the natural language of text.
///
/// Reads a document from a file or stdin and prints the detected
/// language label. Line mode classifies each input line separately;
/// batch mode reads file paths from stdin and classifies every file.
#[derive(Parser)]
#[command(name = "langid", version)]
struct Args {
	/// Load a serialized model instead of the built-in default
	#[arg(short, long, value_name = "PATH")]
	model: Option<PathBuf>,

	/// Classify each input line separately
	#[arg(short, long, conflicts_with = "batch")]
	line: bool,

	/// Read file paths from stdin and classify each file, printing
	/// `path,len,lang`
	#[arg(short, long, conflicts_with = "file")]
	batch: bool,

	/// Input file (stdin when omitted)
	file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();
	let args = Args::parse();

	let model = match &args.model {
		Some(path) => CompiledModel::from_path(path)?,
		None => CompiledModel::builtin(),
	};
	debug!(
		"model ready: {} langs, {} feats, {} states",
		model.num_langs(),
		model.num_feats(),
		model.num_states()
	);

	if args.batch {
		run_batch(model)
	} else if args.line {
		run_lines(model, args.file.as_deref())
	} else {
		run_single(model, args.file.as_deref())
	}
}

/// Classifies one whole document (a file, or everything on stdin).
fn run_single(model: CompiledModel, file: Option<&std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
	let text = match file {
		Some(path) => fs::read(path)?,
		None => {
			let mut buf = Vec::new();
			io::stdin().lock().read_to_end(&mut buf)?;
			buf
		}
	};

	let mut lid = LanguageIdentifier::new(model);
	println!("{}", lid.identify(&text));
	Ok(())
}

/// Classifies each input line separately, one label per line.
fn run_lines(model: CompiledModel, file: Option<&std::path::Path>) -> Result<(), Box<dyn std::error::Error>> {
	let reader: Box<dyn BufRead> = match file {
		Some(path) => Box::new(io::BufReader::new(fs::File::open(path)?)),
		None => Box::new(io::BufReader::new(io::stdin())),
	};

	let mut lid = LanguageIdentifier::new(model);
	let stdout = io::stdout();
	let mut out = stdout.lock();
	for line in reader.lines() {
		let line = line?;
		writeln!(out, "{}", lid.identify(line.as_bytes()))?;
	}
	Ok(())
}

/// Classifies every file named on stdin (one path per line).
///
/// Paths are split into chunks and fanned out to one worker thread per
/// chunk; each worker runs its own identifier over a copy of the
/// model. Output keeps stdin order and prints `path,len,lang`, with
/// the `NOSUCHFILE` sentinel for unreadable paths.
fn run_batch(model: CompiledModel) -> Result<(), Box<dyn std::error::Error>> {
	let paths: Vec<String> = io::stdin().lock().lines().collect::<Result<_, _>>()?;
	if paths.is_empty() {
		return Ok(());
	}

	let workers = num_cpus::get().max(1);
	let chunk_size = paths.len().div_ceil(workers);

	let (tx, rx) = mpsc::channel();
	for (chunk_index, chunk) in paths.chunks(chunk_size).enumerate() {
		let tx = tx.clone();
		let chunk: Vec<String> = chunk.to_vec();
		let model = model.clone();

		thread::spawn(move || {
			let mut lid = LanguageIdentifier::new(model);
			let rows: Vec<String> = chunk
				.iter()
				.map(|path| match fs::read(path) {
					Ok(text) => format!("{},{},{}", path, text.len(), lid.identify(&text)),
					Err(_) => format!("{},0,{}", path, NO_FILE),
				})
				.collect();
			tx.send((chunk_index, rows)).expect("failed to send from worker");
		});
	}
	drop(tx);

	let mut results: Vec<(usize, Vec<String>)> = rx.iter().collect();
	results.sort_by_key(|(chunk_index, _)| *chunk_index);

	let stdout = io::stdout();
	let mut out = stdout.lock();
	for (_, rows) in results {
		for row in rows {
			writeln!(out, "{}", row)?;
		}
	}
	Ok(())
}
