mod cli;

use std::io::Read;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use xsdgen::{generate_source, write_output, AccessorStyle, Config};

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("cannot read schema from standard input")?;
        Ok(source)
    } else if input.starts_with("http://") || input.starts_with("https://") {
        let response = reqwest::blocking::get(input)
            .and_then(|response| response.error_for_status())
            .with_context(|| format!("cannot fetch {input}"))?;
        response
            .text()
            .with_context(|| format!("cannot read response body from {input}"))
    } else {
        std::fs::read_to_string(input).with_context(|| format!("cannot read {input}"))
    }
}

fn run(cli: cli::Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("cannot load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if cli.use_old_getter_setter {
        config.accessor_style = AccessorStyle::Capitalized;
    }

    let source = read_input(&cli.input)?;
    let mut emitter = cli.generator.unwrap_or_default().emitter();
    let generated = generate_source(&source, cli.namespace_prefix, &config, emitter.as_mut())
        .with_context(|| format!("cannot parse schema {}", cli.input))?;

    match &cli.output {
        Some(path) => write_output(path, &generated.code, cli.force)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => print!("{}", generated.code),
    }

    for diagnostic in &generated.diagnostics {
        eprintln!("{diagnostic}");
    }
    tracing::debug!(
        emitted = generated.report.emitted.len(),
        diagnostics = generated.diagnostics.len(),
        "done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
