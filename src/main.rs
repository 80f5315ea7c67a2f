//! Vigil - verification suite for the multicluster observability stack

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use vigil::config::SuiteOptions;
use vigil::suite;

/// Vigil - eventual-consistency verification suite for the observability stack
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about, long_about = None)]
struct Cli {
    /// Path to a YAML options file
    #[arg(short = 'f', long = "options")]
    options_file: Option<PathBuf>,

    /// Kubeconfig path (overrides the options file)
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use (overrides the options file)
    #[arg(long)]
    context: Option<String>,

    /// Grafana console base URL (overrides the options file)
    #[arg(long)]
    grafana_url: Option<String>,

    /// Bearer token for console requests (overrides the options file)
    #[arg(long, env = "VIGIL_TOKEN")]
    token: Option<String>,

    /// Run only the named scenarios, in catalog order (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,

    /// List the scenario catalog and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider before any TLS client is built. kube and
    // reqwest both link rustls; with two providers in the dependency
    // graph the process-level default must be picked explicitly.
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: failed to install default crypto provider: {:?}. \
             TLS connections to the cluster and console cannot be made.",
            e
        );
        std::process::exit(1);
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.list {
        for entry in suite::catalog() {
            println!("{:<20} {}", entry.name(), entry.summary());
        }
        return Ok(());
    }

    let mut options = match &cli.options_file {
        Some(path) => SuiteOptions::load(path)?,
        None => SuiteOptions::default(),
    };
    if let Some(kubeconfig) = cli.kubeconfig {
        options.cluster.kubeconfig = Some(kubeconfig);
    }
    if let Some(context) = cli.context {
        options.cluster.context = Some(context);
    }
    if let Some(grafana_url) = cli.grafana_url {
        options.console.grafana_url = grafana_url;
    }
    if let Some(token) = cli.token {
        options.console.token = Some(token);
    }
    options.validate()?;

    println!("=== Vigil verification suite ===");
    println!("Hub namespace: {}", options.operator.namespace);
    println!(
        "Observability namespace: {}",
        options.operator.observability_namespace
    );
    println!("Console: {}", options.console.grafana_url);

    let started = Instant::now();
    let report = suite::run(&options, &cli.only).await?;
    report.render_summary(started.elapsed());

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
