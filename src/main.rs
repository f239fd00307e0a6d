#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::uninlined_format_args, clippy::module_name_repetitions)]

mod csv_reader;
mod error;
mod ml;
mod structs;

use clap::{Parser, Subcommand};
use ml::pipeline::AnalysisConfig;
use ml::summary::{aggregate_groups, load_groups, SummaryConfig};
use std::path::{Path, PathBuf};
use structs::{ClusterConfig, ClusterSummary, CsvData, FeatureTable, Result, ScError, SelectionConfig};
use tracing_subscriber::{fmt, EnvFilter};

/// sc - permutation-importance feature selection and K-means clustering
/// for encoded survey tables
#[derive(Parser, Debug)]
#[command(name = "sc")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Select features, cluster over several seeds and write the best run
    Analyze {
        /// Encoded, fully numeric CSV/TSV table
        #[arg(short, long)]
        csv: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./cluster_output")]
        output_dir: PathBuf,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,

        /// Number of seeds to try (seeds 0..N)
        #[arg(long, default_value = "4")]
        seeds: u64,

        /// Number of clusters for K-means
        #[arg(short = 'k', long, default_value = "3")]
        clusters: usize,

        /// Number of PCA components
        #[arg(long, default_value = "3")]
        components: usize,

        /// Columns with variance at or below this are dropped
        #[arg(long, default_value = "0.071")]
        variance_threshold: f64,

        /// Seed of the K-means initialisation
        #[arg(long, default_value = "0")]
        init_seed: u64,

        /// Also run the inertia sweep and write elbow.csv
        #[arg(long)]
        elbow: bool,

        /// Largest k of the inertia sweep
        #[arg(long, default_value = "8")]
        max_k: usize,
    },

    /// Print K-means inertia for k = 1..=max-k and the suggested k
    Elbow {
        /// Encoded, fully numeric CSV/TSV table
        #[arg(short, long)]
        csv: PathBuf,

        /// Treat input as TSV instead of CSV
        #[arg(long)]
        tsv: bool,

        /// Largest k of the sweep
        #[arg(long, default_value = "8")]
        max_k: usize,

        /// Seed of the K-means initialisation
        #[arg(long, default_value = "0")]
        init_seed: u64,
    },

    /// Average a cluster summary over thematic feature groups
    Summarize {
        /// cluster_summary.csv written by `analyze`
        #[arg(short, long)]
        summary: PathBuf,

        /// JSON array of {"name", "features"} groups
        #[arg(short, long)]
        groups: PathBuf,

        /// Output directory for group_summary.csv
        #[arg(short, long, default_value = "./cluster_output")]
        output_dir: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Option<Commands>) -> Result<()> {
    match command {
        Some(Commands::Analyze {
            csv,
            output_dir,
            tsv,
            seeds,
            clusters,
            components,
            variance_threshold,
            init_seed,
            elbow,
            max_k,
        }) => {
            let config = AnalysisConfig {
                selection: SelectionConfig {
                    variance_threshold,
                    n_components: components,
                    seeds: (0..seeds).collect(),
                    clustering: ClusterConfig {
                        k: clusters,
                        init_seed,
                        ..ClusterConfig::default()
                    },
                },
                summary: SummaryConfig::default(),
                elbow_max_k: elbow.then_some(max_k),
            };
            run_analyze(&csv, &output_dir, &config, tsv)
        }

        Some(Commands::Elbow {
            csv,
            tsv,
            max_k,
            init_seed,
        }) => run_elbow(&csv, tsv, max_k, init_seed),

        Some(Commands::Summarize {
            summary,
            groups,
            output_dir,
        }) => run_summarize(&summary, &groups, &output_dir),

        None => {
            eprintln!("No subcommand provided. Use 'sc analyze', 'sc elbow' or 'sc summarize'.");
            eprintln!("Run 'sc --help' for usage information.");
            std::process::exit(1);
        }
    }
}

/// Load an encoded table, refusing missing files up front
fn load_table(csv_path: &Path, tsv: bool) -> Result<FeatureTable> {
    if !csv_path.exists() {
        return Err(ScError::Config(format!(
            "CSV file not found: {}",
            csv_path.display()
        )));
    }

    eprintln!("Loading: {}", csv_path.display());
    let csv_data = CsvData::from_file(csv_path, tsv)?;
    let table = FeatureTable::from_csv(&csv_data)?;
    eprintln!(
        "Loaded {} respondents x {} features",
        table.n_samples(),
        table.n_features()
    );
    Ok(table)
}

/// Run selection and clustering, then write every artifact
fn run_analyze(
    csv_path: &Path,
    output_dir: &Path,
    config: &AnalysisConfig,
    tsv: bool,
) -> Result<()> {
    if config.selection.clustering.k < 2 {
        return Err(ScError::Config("need at least 2 clusters".into()));
    }
    if config.selection.n_components == 0 {
        return Err(ScError::Config("need at least 1 PCA component".into()));
    }

    let table = load_table(csv_path, tsv)?;

    eprintln!(
        "Running selection over {} seeds...",
        config.selection.seeds.len()
    );
    let result = ml::pipeline::run_pipeline(&table, config)?;

    for outcome in &result.selection.outcomes {
        match &outcome.status {
            structs::RunStatus::Recorded { score } => {
                eprintln!("  seed {}: silhouette after PCA {score:.4}", outcome.seed);
            }
            structs::RunStatus::Skipped { reason } => {
                eprintln!("  seed {}: skipped ({reason})", outcome.seed);
            }
        }
    }

    let best = &result.selection.best;
    println!(
        "Best silhouette: {:.4} from seed {}",
        best.score, best.seed
    );

    std::fs::create_dir_all(output_dir)?;
    eprintln!("Writing output files...");

    let summary_text = ml::output::build_summary(csv_path, &result);
    ml::output::write_summary(output_dir, &summary_text)?;
    ml::output::write_clusters(output_dir, best)?;
    ml::output::write_importance(output_dir, &best.importance)?;
    ml::output::write_cluster_summary(output_dir, &result.summary)?;
    ml::output::write_runs_json(output_dir, &result)?;

    if let Some(corr) = &result.correlation {
        ml::output::write_correlation(output_dir, corr)?;
    }
    if let Some(elbow) = &result.elbow {
        ml::output::write_elbow(output_dir, elbow)?;
    }

    eprintln!("Output written to {}", output_dir.display());
    eprintln!("  - summary.txt");
    eprintln!("  - clusters.csv");
    eprintln!("  - importance.csv");
    eprintln!("  - cluster_summary.csv");
    eprintln!("  - runs.json");
    if result.correlation.is_some() {
        eprintln!("  - correlation.csv");
    }
    if result.elbow.is_some() {
        eprintln!("  - elbow.csv");
    }

    Ok(())
}

/// Print the inertia sweep
fn run_elbow(csv_path: &Path, tsv: bool, max_k: usize, init_seed: u64) -> Result<()> {
    let table = load_table(csv_path, tsv)?;
    let config = ClusterConfig {
        init_seed,
        ..ClusterConfig::default()
    };

    let result = ml::clustering::elbow(&table.values, max_k, &config)?;

    println!("k,inertia");
    for point in &result.points {
        println!("{},{:.4}", point.k, point.inertia);
    }
    println!("Suggested k: {}", result.suggested_k);
    Ok(())
}

/// Aggregate a written cluster summary over feature groups
fn run_summarize(summary_path: &Path, groups_path: &Path, output_dir: &Path) -> Result<()> {
    let summary = ClusterSummary::from_csv_file(summary_path)?;
    let groups = load_groups(groups_path)?;
    eprintln!(
        "Aggregating {} features into {} groups",
        summary.features.len(),
        groups.len()
    );

    let aggregated = aggregate_groups(&summary, &groups, &SummaryConfig::default());
    if aggregated.groups.is_empty() {
        return Err(ScError::Data(
            "no group matched any feature of the summary".into(),
        ));
    }

    std::fs::create_dir_all(output_dir)?;
    ml::output::write_group_summary(output_dir, &aggregated)?;

    for (name, values) in aggregated.groups.iter().zip(&aggregated.values) {
        let cells: Vec<String> = values.iter().map(|v| format!("{v:.1}")).collect();
        println!("{name}: {}", cells.join(", "));
    }
    eprintln!("Output written to {}", output_dir.join("group_summary.csv").display());
    Ok(())
}
