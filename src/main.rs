use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use silvae_io::{DatasetReader, EnsembleReader, ExperimentName, ProximityReader, ResultWriter};
use silvae_proximity::{DissimilarityBuilder, DissimilarityMatrix, Ensemble, ExecutionMode};
use silvae_tree::{Dataset, Settings};
use silvae_validate::{Agreement, MantelTest};

#[derive(Parser)]
#[command(name = "silvae")]
#[command(about = "Distill a Random Forest regression ensemble into a single surrogate tree")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the Mantel permutations
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Inputs shared by every subcommand.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the training table CSV
    #[arg(long)]
    data: PathBuf,

    /// Name of the response column
    #[arg(long)]
    response: String,

    /// Columns to treat as categorical predictors (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',')]
    categorical: Vec<String>,

    /// Path to the ensemble export JSON
    #[arg(long)]
    ensemble: PathBuf,

    /// Precomputed dense proximity matrix CSV, used instead of the ensemble leaves
    #[arg(long)]
    proximity: Option<PathBuf>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Compute the dissimilarity matrix on the calling thread only
    #[arg(long, default_value_t = false)]
    serial: bool,

    /// Dedicated worker count for the dissimilarity matrix
    #[arg(long)]
    workers: Option<usize>,
}

/// Surrogate tree growth parameters.
#[derive(Args, Debug, Clone)]
struct GrowthArgs {
    /// Cumulative importance share the candidate predictors must cover
    #[arg(long, default_value_t = 1.0)]
    imp_total: f64,

    /// Minimum relative decrease in node error for a split to be kept
    #[arg(long, default_value_t = 0.01)]
    max_dec: f64,

    /// Minimum number of observations in each child of a split
    #[arg(long, default_value_t = 5)]
    min_node_size: usize,

    /// Maximum tree depth (root is depth 0)
    #[arg(long, default_value_t = 4)]
    max_depth: usize,

    /// Candidate thresholds evaluated per predictor per node
    #[arg(long, default_value_t = 256)]
    t_max: usize,

    /// Grow sibling subtrees in parallel
    #[arg(long, default_value_t = false)]
    parallel_growth: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Grow a surrogate tree and test its fidelity to the ensemble
    Distill {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        growth: GrowthArgs,

        /// Number of Mantel test permutations
        #[arg(long, default_value_t = 999)]
        permutations: usize,
    },

    /// Export the ensemble dissimilarity matrix
    Dissimilarity {
        #[command(flatten)]
        input: InputArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct DistillOutput {
    experiment: String,
    n_observations: usize,
    n_members: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    mantel_correlation: f64,
    mantel_p_value: f64,
    agreement_r_squared: Option<f64>,
}

#[derive(Serialize)]
struct DissimilarityOutput {
    experiment: String,
    n_observations: usize,
    n_members: usize,
    mean_dissimilarity: f64,
}

fn execution_mode(serial: bool, workers: Option<usize>) -> ExecutionMode {
    if serial {
        ExecutionMode::Serial
    } else {
        ExecutionMode::Parallel { workers }
    }
}

/// Read the dataset and ensemble, then build the dissimilarity matrix.
fn load_inputs(input: &InputArgs) -> Result<(Dataset, Ensemble, DissimilarityMatrix)> {
    let dataset = DatasetReader::new(&input.data, &input.response)
        .with_categorical(&input.categorical)
        .read()
        .context("failed to read dataset CSV")?;
    let n_observations = dataset.n_observations();
    let ensemble = EnsembleReader::new(&input.ensemble)
        .with_observations(n_observations)
        .read(&dataset.predictor_names())
        .context("failed to read ensemble JSON")?;

    let dissimilarity = match &input.proximity {
        Some(path) => {
            let matrix = ProximityReader::new(path)
                .read()
                .context("failed to read proximity CSV")?;
            if matrix.len() != n_observations {
                anyhow::bail!(
                    "proximity matrix covers {} observations, dataset has {n_observations}",
                    matrix.len()
                );
            }
            matrix
        }
        None => DissimilarityBuilder::new()
            .with_mode(execution_mode(input.serial, input.workers))
            .build(&ensemble, n_observations)
            .context("failed to build dissimilarity matrix")?,
    };
    Ok((dataset, ensemble, dissimilarity))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Distill {
            input,
            growth,
            permutations,
        } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let settings = Settings::new()
                .with_imp_total(growth.imp_total)
                .with_max_dec(growth.max_dec)
                .with_min_node_size(growth.min_node_size)
                .with_max_depth(growth.max_depth)
                .with_t_max(growth.t_max)
                .with_parallel_growth(growth.parallel_growth);
            settings.validate().context("invalid growth settings")?;
            let mantel_test = MantelTest::new(permutations)?.with_seed(cli.seed);

            // 1. Inputs and dissimilarity
            let (dataset, ensemble, dissimilarity) = load_inputs(&input)?;

            // 2. Grow
            let tree = settings
                .fit(&dataset, &dissimilarity, &ensemble)
                .context("tree growth failed")?;

            // 3. Validate
            let mantel = mantel_test
                .run(&dissimilarity, &tree)
                .context("Mantel test failed")?;
            let agreement = Agreement::for_tree(&tree, &dataset, &ensemble)
                .context("agreement computation failed")?;

            // 4. Write artifacts
            let writer = ResultWriter::new(&input.output_dir, experiment_name)?;
            writer.write_frame(&tree.to_frame())?;
            writer.write_distill(&tree, ensemble.n_members(), Some(&mantel), agreement.as_ref())?;

            // 5. Print summary
            let output = DistillOutput {
                experiment: input.experiment,
                n_observations: tree.n_observations(),
                n_members: ensemble.n_members(),
                n_nodes: tree.n_nodes(),
                n_leaves: tree.n_leaves(),
                depth: tree.depth(),
                mantel_correlation: mantel.correlation,
                mantel_p_value: mantel.p_value,
                agreement_r_squared: agreement.map(|a| a.r_squared),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Dissimilarity { input } => {
            let experiment_name = ExperimentName::new(input.experiment.clone())?;
            let (_, ensemble, dissimilarity) = load_inputs(&input)?;

            let writer = ResultWriter::new(&input.output_dir, experiment_name)?;
            writer.write_dissimilarity(&dissimilarity)?;

            let pairs = dissimilarity.lower_triangle();
            let mean_dissimilarity = if pairs.is_empty() {
                0.0
            } else {
                pairs.iter().sum::<f64>() / pairs.len() as f64
            };
            let output = DissimilarityOutput {
                experiment: input.experiment,
                n_observations: dissimilarity.len(),
                n_members: ensemble.n_members(),
                mean_dissimilarity,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
