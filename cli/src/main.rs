use clap::{ArgAction, Parser, Subcommand};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use flowflat::{compile_files, generate_rust, ir_to_json, CompiledSession, Config};
use flowflat_compiler::error::FlowflatError;

#[derive(Parser)]
#[command(name = "flowflat")]
#[command(about = "Check, inspect or generate Rust from flowflat schemas", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON config file with `compiler` and `rust` sections
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Primitive used for union discriminants (overrides the config file)
    #[arg(long, global = true)]
    union_discriminant: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile the schemas as one session and report the result
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the compiled IR as JSON
    Ir {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Generate one Rust file per schema
    GenRust {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Derive `serde::Serialize` on generated types
        #[arg(long)]
        serde: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), FlowflatError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(discriminant) = &cli.union_discriminant {
        config.compiler.union_discriminant = discriminant.clone();
    }
    log::debug!("using {:?}", config);

    match &cli.command {
        Commands::Check { files } => {
            let compiled = compile_files(files.as_slice(), &config.compiler)?;
            println!("ok: {} types", compiled.types.len());
            Ok(())
        }

        Commands::Ir { files } => {
            let compiled = compile_files(files.as_slice(), &config.compiler)?;
            println!("{}", ir_to_json(&compiled)?);
            Ok(())
        }

        Commands::GenRust { files, output, serde } => {
            if *serde {
                config.rust.serde_derives = true;
            }
            let compiled = compile_files(files.as_slice(), &config.compiler)?;
            write_rust(&compiled, &config, output.as_deref())
        }
    }
}

fn write_rust(compiled: &CompiledSession, config: &Config, output: Option<&Path>) -> Result<(), FlowflatError> {
    let generated = generate_rust(compiled, &config.rust)?;
    match output {
        Some(dir) => {
            let out_paths = output_paths(dir, &generated)?;
            fs::create_dir_all(dir)?;
            for ((path, code), out_path) in generated.iter().zip(&out_paths) {
                fs::write(out_path, code)?;
                println!("{} → {}", path, out_path.display());
            }
        }
        None => {
            for (_, code) in &generated {
                println!("{}", code);
            }
        }
    }
    Ok(())
}

/// `<dir>/<stem>.rs` for every generated file. Two schemas mapping to the
/// same output file are an error.
fn output_paths(dir: &Path, generated: &[(String, String)]) -> Result<Vec<PathBuf>, FlowflatError> {
    let mut claimed: HashMap<PathBuf, &str> = HashMap::new();
    let mut out_paths = Vec::with_capacity(generated.len());
    for (path, _) in generated {
        let stem = Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let out_path = dir.join(format!("{}.rs", stem.replace(['-', '.'], "_")));
        if let Some(other) = claimed.insert(out_path.clone(), path) {
            return Err(FlowflatError::InvalidValue(format!(
                "{} and {} would both be written to {}",
                other,
                path,
                out_path.display()
            )));
        }
        out_paths.push(out_path);
    }
    Ok(out_paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowflat::ErrorKind;

    fn generated(paths: &[&str]) -> Vec<(String, String)> {
        paths.iter().map(|p| (p.to_string(), String::new())).collect()
    }

    #[test]
    fn test_output_paths_use_the_file_stem() {
        let out = output_paths(Path::new("out"), &generated(&["schemas/game-core.fbs", "geo.v2.fbs"])).unwrap();
        assert_eq!(out, vec![PathBuf::from("out/game_core.rs"), PathBuf::from("out/geo_v2.rs")]);
    }

    #[test]
    fn test_output_paths_reject_colliding_stems() {
        let err = output_paths(Path::new("out"), &generated(&["a/x.fbs", "b/x.fbs"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(err.to_string().contains("a/x.fbs and b/x.fbs"), "{}", err);
    }
}
