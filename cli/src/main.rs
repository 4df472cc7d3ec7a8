//! secval CLI: evaluate a quantity from a JSON catalog.

mod cli;


use clap::Parser;
use cli::Cli;
use secval_core::{Bindings, Catalog};
use serde_json::json;
use std::io::Write;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let status = report(run(&cli), &mut std::io::stdout(), &mut std::io::stderr());
    ExitCode::from(status)
}

/// Print the outcome of a run and return the process exit status
fn report(result: Result<String, String>, out: &mut impl Write, err: &mut impl Write) -> u8 {
    match result {
        Ok(output) => match writeln!(out, "{}", output) {
            Ok(()) => 0,
            Err(_) => 1,
        },
        Err(message) => {
            error!("{}", message);
            // Nothing left to report to if stderr is gone
            let _ = writeln!(err, "error: {}", message);
            1
        }
    }
}

fn run(cli: &Cli) -> Result<String, String> {
    let text = std::fs::read_to_string(&cli.catalog)
        .map_err(|e| format!("cannot read {}: {}", cli.catalog.display(), e))?;
    let catalog = Catalog::from_json(&text).map_err(|e| e.to_string())?;
    debug!(path = %cli.catalog.display(), quantities = catalog.len(), "catalog loaded");

    let Some(name) = cli.quantity.as_deref() else {
        return Ok(list(&catalog));
    };

    if let Some(variables) = &cli.propagation {
        let quantity = catalog
            .get(name)
            .ok_or_else(|| format!("no quantity named '{}'", name))?;
        let variables: Vec<&str> = variables.iter().map(String::as_str).collect();
        let formula = quantity
            .gauss_propagation(&variables)
            .map_err(|e| e.to_string())?;
        return Ok(formula.to_string());
    }

    let bindings: Bindings =
        serde_json::from_str(&cli.bindings).map_err(|e| format!("invalid bindings: {}", e))?;

    let output = if cli.with_dependencies {
        let (estimate, dependencies) = catalog
            .evaluate_with_dependencies(name, &bindings)
            .map_err(|e| e.to_string())?;
        json!({ "result": estimate, "dependencies": dependencies })
    } else {
        let estimate = catalog
            .evaluate(name, &bindings)
            .map_err(|e| e.to_string())?;
        json!({ "result": estimate })
    };

    serde_json::to_string_pretty(&output).map_err(|e| e.to_string())
}

/// One line per quantity: name, formula and description
fn list(catalog: &Catalog) -> String {
    catalog
        .names()
        .filter_map(|name| {
            let quantity = catalog.get(name)?;
            Some(match catalog.description(name) {
                Some(description) => format!("{} = {}  # {}", name, quantity, description),
                None => format!("{} = {}", name, quantity),
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}
