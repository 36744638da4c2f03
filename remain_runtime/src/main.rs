//! remain-probe: probe a simulated host and print what it supports.

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;

use remain_kernel::hashing::report;
use remain_kernel::{probe_all, OperationKind};
use remain_runtime::config::RemainConfig;
use remain_runtime::drift::{compare_registries, verify_probe_determinism};
use remain_runtime::remain::Remain;
use remain_runtime::sim::{profile, SimHost, PROFILES};

#[derive(Parser)]
#[command(
    name = "remain-probe",
    version,
    about = "Probe a simulated host and print its capabilities and dispatch plans",
    long_about = None
)]
struct Cli {
    /// Host profile to probe (see --list-profiles).
    #[arg(long, default_value = "1.16")]
    profile: String,

    /// Print the registry report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Compare against another profile and print the capability drift.
    #[arg(long, value_name = "PROFILE")]
    diff: Option<String>,

    /// JSON configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// List the available profiles and exit.
    #[arg(long)]
    list_profiles: bool,

    /// Verbose logging (same as `"debug": true` in the configuration).
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("remain-probe: {}", message);
            return ExitCode::from(2);
        }
    };

    let default_level = if cli.debug || config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.list_profiles {
        for p in PROFILES.iter() {
            println!("{:<12} {}", p.name, p.version);
        }
        return ExitCode::SUCCESS;
    }

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&str>) -> Result<RemainConfig, String> {
    let config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path, e))?;
            RemainConfig::from_json(&raw).map_err(|e| e.to_string())?
        }
        None => RemainConfig::default(),
    };
    config.with_env_overrides().map_err(|e| e.to_string())
}

fn run(cli: &Cli, config: RemainConfig) -> Result<(), String> {
    let host = SimHost::from_profile_name(&cli.profile).ok_or_else(|| format!("unknown profile {:?}", cli.profile))?;
    let fingerprint = verify_probe_determinism(&host).map_err(|e| e.to_string())?;
    let remain = Remain::bootstrap(Arc::new(host), config).map_err(|e| e.to_string())?;
    let registry = remain.registry();

    if let Some(other) = &cli.diff {
        let other_profile = profile(other).ok_or_else(|| format!("unknown profile {:?}", other))?;
        let other_registry = probe_all(&SimHost::new(other_profile)).map_err(|e| e.to_string())?;
        let drift = compare_registries(registry, &other_registry);
        if cli.json {
            let json = serde_json::to_string_pretty(&drift).map_err(|e| e.to_string())?;
            println!("{}", json);
        } else {
            print!("{}", drift.render());
        }
        return Ok(());
    }

    if cli.json {
        println!("{}", report(registry));
        return Ok(());
    }

    println!("host {} ({})", registry.version(), cli.profile);
    println!("fingerprint {}", fingerprint);
    println!();
    for (flag, value) in registry.iter() {
        println!("  {:<24} {}", flag.name(), value);
    }
    println!();
    for kind in OperationKind::ALL {
        let plan = remain.engine().plan(kind);
        let plan = if plan.is_empty() {
            "(unsupported)".to_string()
        } else {
            plan.join(" -> ")
        };
        println!("  {:<24} {}", kind.name(), plan);
    }
    Ok(())
}
