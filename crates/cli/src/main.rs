mod config;

use anyhow::{Context, Result, bail};
use clap::Parser;
use flagbind::argparse::{FlagSet, ParseOutcome, parse_with_env};
use flagbind::{Binding, FlagDeclaration};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::TunnelConfig;

#[derive(Parser)]
#[command(name = "flagbind-demo")]
#[command(version, about = "Bind a tunnel client configuration to flags", long_about = None)]
struct Cli {
    /// Load extra environment variables from a dotenv file
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Print the synthesized flag declarations as JSON and exit
    #[arg(long)]
    describe: bool,

    /// Arguments for the tunnel configuration (use `-- --help` to list them)
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Serialize)]
struct FlagRow<'a> {
    name: &'a str,
    aliases: &'a [String],
    kind: String,
    usage: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<&'a str>,
    hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

impl<'a> From<&'a FlagDeclaration> for FlagRow<'a> {
    fn from(decl: &'a FlagDeclaration) -> Self {
        Self {
            name: &decl.name,
            aliases: &decl.aliases,
            kind: decl.kind.to_string(),
            usage: &decl.usage,
            env: decl.env.as_deref(),
            hidden: decl.hidden,
            default: decl.default.as_ref().map(ToString::to_string),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let binding = Binding::<TunnelConfig>::new().context("invalid configuration schema")?;
    let flags = binding
        .flags()
        .context("failed to synthesize flag declarations")?;

    if cli.describe {
        if !cli.args.is_empty() {
            bail!("--describe does not take configuration arguments");
        }
        let rows: Vec<FlagRow<'_>> = flags.iter().map(FlagRow::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut set = FlagSet::new("flagbind-demo")
        .summary("Tunnel client configuration")
        .version(env!("CARGO_PKG_VERSION"));
    set.flags(flags);

    let env = load_env(cli.env_file.as_deref())?;
    tracing::debug!(args = cli.args.len(), env = env.len(), "parsing configuration");

    let matches = match parse_with_env(&set, &cli.args, &env)? {
        ParseOutcome::Matches(m) => m,
        ParseOutcome::Help(text) | ParseOutcome::Version(text) => {
            print!("{text}");
            return Ok(());
        }
    };

    let mut config = TunnelConfig {
        session: format!("pid-{}", std::process::id()),
        ..Default::default()
    };
    binding
        .hydrate(&mut config, &matches)
        .context("failed to hydrate configuration")?;
    if !matches.rest().is_empty() {
        tracing::info!(rest = ?matches.rest(), "ignoring positional arguments");
    }

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Process environment with the dotenv file, if any, layered on top.
fn load_env(env_file: Option<&Path>) -> Result<Vec<(String, String)>> {
    let mut env: Vec<(String, String)> = std::env::vars().collect();
    let Some(path) = env_file else {
        return Ok(env);
    };

    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to open env file: {}", path.display()))?;
    for item in iter {
        let (key, value) =
            item.with_context(|| format!("failed to parse env file: {}", path.display()))?;
        env.retain(|(k, _)| k != &key);
        env.push((key, value));
    }
    tracing::debug!(path = %path.display(), "loaded env file");
    Ok(env)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
