use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use argonbox::{Algorithm, EncodedHash, PartialParameters, Version};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, clap::Args)]
struct ParamArgs {
    /// Argon2 variant: argon2d, argon2i or argon2id (default: argon2id)
    #[arg(long)]
    algorithm: Option<Algorithm>,

    /// Memory cost as a power of two (default: 12, i.e. m=4096)
    #[arg(long = "memory-cost")]
    memory_cost: Option<u32>,

    /// Number of passes over memory (default: 3)
    #[arg(long = "time-cost")]
    time_cost: Option<u32>,

    /// Degree of parallelism (default: 1)
    #[arg(long = "parallelism")]
    parallelism_cost: Option<u32>,

    /// Digest length in bytes (default: 32)
    #[arg(long = "output-length")]
    output_length: Option<usize>,

    /// Argon2 version, 16/0x10 or 19/0x13 (default: 19)
    #[arg(long = "argon-version")]
    argon_version: Option<Version>,

    /// Parameters as JSON, e.g. '{"memoryCost":16,"algorithm":"argon2i"}'
    #[arg(long, value_name = "JSON", env = "ARGONBOX_PARAMS")]
    params: Option<String>,

    /// Path to a JSON file with parameters
    #[arg(long = "params-file", value_name = "PATH")]
    params_file: Option<PathBuf>,
}

impl ParamArgs {
    /// Flags override `--params`, which overrides `--params-file`.
    fn to_partial(&self) -> Result<PartialParameters> {
        let mut partial = PartialParameters::default();

        if let Some(path) = &self.params_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let from_file: PartialParameters = serde_json::from_str(&text)
                .with_context(|| format!("invalid parameters in {}", path.display()))?;
            partial = partial.merge(from_file);
        }

        if let Some(json) = &self.params {
            let inline: PartialParameters =
                serde_json::from_str(json).context("invalid --params JSON")?;
            partial = partial.merge(inline);
        }

        Ok(partial.merge(PartialParameters {
            algorithm: self.algorithm,
            memory_cost: self.memory_cost,
            time_cost: self.time_cost,
            parallelism_cost: self.parallelism_cost,
            version: self.argon_version,
            output_length: self.output_length,
        }))
    }
}

#[derive(Debug, Parser)]
#[command(name = "argonbox")]
#[command(version, about = "Argon2 password hashing and verification.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hashes a password and prints the encoded hash
    Hash {
        #[command(flatten)]
        params: ParamArgs,
    },

    /// Checks a password against an encoded hash
    #[command(arg_required_else_help = true)]
    Verify { encoded: String },

    /// Prints the parameters embedded in an encoded hash
    #[command(arg_required_else_help = true)]
    Inspect { encoded: String },
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("ARGONBOX_LOG", "warn")).init();

    let args = Cli::parse();
    match args.command {
        Commands::Hash { params } => {
            let partial = params.to_partial()?;
            let password = auth::read_password()?;
            let encoded = argonbox::hash_with(&password, partial).context("hashing failed")?;
            println!("{encoded}");
        }
        Commands::Verify { encoded } => {
            let password = auth::read_password()?;
            let matched = argonbox::verify(&password, encoded.trim())
                .context("unable to verify against this hash")?;
            if !matched {
                println!("invalid");
                return Ok(ExitCode::FAILURE);
            }
            println!("valid");
        }
        Commands::Inspect { encoded } => {
            let parsed: EncodedHash = encoded.trim().parse().context("not an encoded argon2 hash")?;

            let memory = match parsed.parameters() {
                Some(p) => format!("{} (2^{})", parsed.memory(), p.memory_cost),
                None => parsed.memory().to_string(),
            };
            let version = parsed.version() as u32;

            println!("{:<12} {}", "algorithm", parsed.algorithm());
            println!("{:<12} {version} ({version:#x})", "version");
            println!("{:<12} {memory}", "memory");
            println!("{:<12} {}", "time cost", parsed.time_cost());
            println!("{:<12} {}", "parallelism", parsed.parallelism_cost());
            println!("{:<12} {} bytes", "salt", parsed.salt().len());
            println!("{:<12} {} bytes", "digest", parsed.digest().len());
        }
    }

    Ok(ExitCode::SUCCESS)
}
