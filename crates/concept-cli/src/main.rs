//! concept-cli: a small front end over the parser, manifest generator,
//! and code generators.
//!
//! Usage: `concept-cli <concept-spec-file> [--codegen <out-dir>]`
//!
//! Reads one concept spec file, parses and lowers it to a manifest,
//! prints a summary, and — when `--codegen` is given — writes every
//! target language's generated files under `<out-dir>/<target>/`.

use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(spec_path) = args.get(1) else {
        eprintln!("usage: concept-cli <concept-spec-file> [--codegen <out-dir>]");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(spec_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot read {spec_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let spec = match concept_parser::parse_concept(&source, spec_path) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("parse error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let manifest = match concept_manifest::generate_manifest(&spec) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("manifest error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("concept {} (v{})", manifest.uri, manifest.version);
    println!("  {} action(s), {} relation(s), {} invariant(s)", manifest.actions.len(), manifest.relations.len(), manifest.invariants.len());

    if args.get(2).map(String::as_str) == Some("--codegen") {
        let Some(out_dir) = args.get(3) else {
            eprintln!("--codegen requires an output directory");
            return ExitCode::FAILURE;
        };
        match concept_codegen::generate_all(&manifest) {
            Ok(bundles) => {
                for (target, files) in bundles {
                    let target_dir = Path::new(out_dir).join(&target);
                    if let Err(e) = fs::create_dir_all(&target_dir) {
                        eprintln!("cannot create {}: {e}", target_dir.display());
                        return ExitCode::FAILURE;
                    }
                    for file in files {
                        let path = target_dir.join(&file.path);
                        if let Some(parent) = path.parent() {
                            let _ = fs::create_dir_all(parent);
                        }
                        if let Err(e) = fs::write(&path, &file.content) {
                            eprintln!("cannot write {}: {e}", path.display());
                            return ExitCode::FAILURE;
                        }
                        println!("  wrote {}", path.display());
                    }
                }
            }
            Err(e) => {
                eprintln!("codegen error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}
