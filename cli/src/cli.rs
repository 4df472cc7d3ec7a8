use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "secval",
    about = "Evaluate catalog quantities with first-order Gaussian error propagation",
    version = secval_core::version()
)]
pub struct Cli {
    /// Path to the catalog JSON
    #[arg(long)]
    pub catalog: PathBuf,

    /// Quantity to evaluate; omit to list the catalog
    #[arg(long)]
    pub quantity: Option<String>,

    /// Bindings as a JSON object, e.g. '{"a": [3, 0.1], "b": 2}'
    #[arg(long, default_value = "{}")]
    pub bindings: String,

    /// Also print the results of computed dependencies
    #[arg(long)]
    pub with_dependencies: bool,

    /// Print the symbolic propagation formula over these variables instead of evaluating
    #[arg(long, value_delimiter = ',')]
    pub propagation: Option<Vec<String>>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}
