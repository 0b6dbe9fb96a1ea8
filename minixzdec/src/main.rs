//! Command-line front-end for the minixz library: reads a whole `.xz`
//! file, sizes the output with a query pass, decodes, writes the result.

use clap::Parser;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Decompress a single-block XZ file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Compressed input file (.xz)
    input: PathBuf,

    /// Output file; defaults to the input without its .xz suffix
    output: Option<PathBuf>,

    /// Print the decompressed size instead of writing anything
    #[arg(long)]
    size_only: bool,
}

/// Output path when none is given: strip `.xz`, or append `.out` when the
/// input does not carry the suffix.
fn default_output(input: &Path) -> PathBuf {
    if input.extension().is_some_and(|ext| ext == "xz") {
        input.with_extension("")
    } else {
        let mut fallback = input.as_os_str().to_owned();
        fallback.push(".out");
        PathBuf::from(fallback)
    }
}

/// Whole-file decode; returns a printable error.
fn run(args: &Args) -> Result<(), String> {
    let data = fs::read(&args.input)
        .map_err(|err| format!("reading {}: {err}", args.input.display()))?;

    let size = minixz::xz_decoded_size(&data)
        .map_err(|err| format!("{}: {err}", args.input.display()))?;
    if args.size_only {
        println!("{size}");
        return Ok(());
    }

    // the decoder insists the output covers the declared dictionary
    let dictionary = minixz::xz_dictionary_size(&data)
        .map_err(|err| format!("{}: {err}", args.input.display()))?;
    let mut output = vec![0u8; size.max(dictionary)];
    let decoded = minixz::xz_decode(&data, &mut output)
        .map_err(|err| format!("{}: {err}", args.input.display()))?;
    output.truncate(decoded);

    let target = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));
    fs::write(&target, &output)
        .map_err(|err| format!("writing {}: {err}", target.display()))?;
    info!(
        "{} -> {} ({} -> {decoded} bytes)",
        args.input.display(),
        target.display(),
        data.len()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("minixzdec: {message}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_strips_the_suffix() {
        assert_eq!(default_output(Path::new("a/b.xz")), PathBuf::from("a/b"));
        assert_eq!(
            default_output(Path::new("archive.tar.xz")),
            PathBuf::from("archive.tar")
        );
        assert_eq!(default_output(Path::new("plain")), PathBuf::from("plain.out"));
    }
}
