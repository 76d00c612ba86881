//! BridgeKG CLI
//!
//! - `validate`: check extraction batches against the inspection ontology
//! - `ingest`: validate and commit batches into the shared graph snapshot
//! - `consolidate`: unify duplicate entities across batches
//! - `paths`: export root-to-leaf paths for review
//! - `reset`: empty the graph snapshot

use anyhow::{Context, Result};
use bridgekg_batch::{
    parse_batch_file, validate_input, validate_inputs_parallel, BatchInput, Corrector, ValidatedBatch,
    ValidationReport,
};
use bridgekg_ontology::{OntologyContext, Vocabulary};
use bridgekg_store::{commit_batch, ConsolidationEngine, GraphStore, MemoryGraphStore, PathEnumerator};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod logging;

use config::PipelineConfig;

#[derive(Parser)]
#[command(name = "bridgekg")]
#[command(author, version, about = "BridgeKG: ontology-checked bridge inspection knowledge graphs")]
struct Cli {
    /// Pipeline configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate batch files against the ontology and print the reports.
    Validate {
        /// Ontology (.ttl / .nt)
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Batch JSON (one object or an array)
        #[arg(long)]
        batch: PathBuf,
        /// Print structured reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate batches and commit them into the graph snapshot.
    ///
    /// A schema that fails to load does not stop ingestion: batches are
    /// committed unvalidated.
    Ingest {
        #[arg(long)]
        schema: Option<PathBuf>,
        /// Graph snapshot (created if missing)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Revised batches (same JSON shape), tried in order for rejected
        /// batches with the same text
        #[arg(long)]
        revisions: Option<PathBuf>,
        /// Batch JSON files
        #[arg(required = true)]
        batches: Vec<PathBuf>,
    },

    /// Merge duplicate entities created by different batches.
    Consolidate {
        #[arg(long)]
        store: Option<PathBuf>,
        /// Deepest child level merged below a root group
        #[arg(long)]
        max_depth: Option<usize>,
        /// Merge independent groups in parallel
        #[arg(long, conflicts_with = "sequential")]
        parallel: bool,
        /// Merge groups one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Enumerate root-to-leaf paths.
    Paths {
        #[arg(long)]
        store: Option<PathBuf>,
        /// Write rows as JSON instead of printing sentences
        #[arg(long)]
        out: Option<PathBuf>,
        /// Top-level collection node excluded from roots
        #[arg(long)]
        collection: Option<String>,
    },

    /// Delete every node and edge in the snapshot.
    Reset {
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate { schema, batch, json } => {
            let schema = PipelineConfig::require_path(schema, &config.schema_path, "schema")?;
            cmd_validate(&config, &schema, &batch, json)
        }
        Commands::Ingest {
            schema,
            store,
            revisions,
            batches,
        } => {
            let schema = PipelineConfig::require_path(schema, &config.schema_path, "schema")?;
            let store = PipelineConfig::require_path(store, &config.store_path, "store")?;
            cmd_ingest(&config, &schema, &store, revisions.as_deref(), &batches)
        }
        Commands::Consolidate {
            store,
            max_depth,
            parallel,
            sequential,
        } => {
            let store = PipelineConfig::require_path(store, &config.store_path, "store")?;
            if let Some(depth) = max_depth {
                config.max_merge_depth = depth;
            }
            if parallel {
                config.parallel = true;
            }
            if sequential {
                config.parallel = false;
            }
            cmd_consolidate(&config, &store)
        }
        Commands::Paths {
            store,
            out,
            collection,
        } => {
            let store = PipelineConfig::require_path(store, &config.store_path, "store")?;
            let collection = collection.or_else(|| config.collection_node.clone());
            cmd_paths(&store, out.as_deref(), collection)
        }
        Commands::Reset { store } => {
            let store = PipelineConfig::require_path(store, &config.store_path, "store")?;
            cmd_reset(&store)
        }
    }
}

fn load_context(config: &PipelineConfig, schema: &Path) -> Option<Arc<OntologyContext>> {
    OntologyContext::load_or_degrade(schema, config.vocabulary.clone())
}

fn run_validation(
    config: &PipelineConfig,
    vocabulary: &Vocabulary,
    ctx: Option<&OntologyContext>,
    inputs: Vec<BatchInput>,
) -> Vec<ValidatedBatch> {
    if config.parallel {
        validate_inputs_parallel(inputs, vocabulary, ctx)
    } else {
        inputs
            .into_iter()
            .map(|input| validate_input(input, vocabulary, ctx))
            .collect()
    }
}

/// Replays pre-computed revisions keyed by batch text, one per round.
#[derive(Default)]
struct RevisionReplay {
    pending: HashMap<String, VecDeque<BatchInput>>,
}

impl RevisionReplay {
    fn load(path: &Path) -> Result<Self> {
        let mut pending: HashMap<String, VecDeque<BatchInput>> = HashMap::new();
        for revision in parse_batch_file(path)? {
            pending.entry(revision.text.clone()).or_default().push_back(revision);
        }
        Ok(Self { pending })
    }
}

impl Corrector for RevisionReplay {
    fn correct(&mut self, input: &BatchInput, _report: &ValidationReport) -> Result<BatchInput> {
        self.pending
            .get_mut(&input.text)
            .and_then(VecDeque::pop_front)
            .with_context(|| format!("no revision left for {:?}", input.text))
    }
}

fn open_store(path: &Path) -> Result<MemoryGraphStore> {
    MemoryGraphStore::open(path).with_context(|| format!("failed to open store {}", path.display()))
}

fn save_store(store: &MemoryGraphStore, path: &Path) -> Result<()> {
    store
        .save_snapshot(path)
        .with_context(|| format!("failed to save store {}", path.display()))?;
    eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
    Ok(())
}

fn cmd_validate(config: &PipelineConfig, schema: &Path, batch: &Path, json: bool) -> Result<()> {
    let ctx = load_context(config, schema);
    let inputs = parse_batch_file(batch)?;
    let validated = run_validation(config, &config.vocabulary, ctx.as_deref(), inputs);

    if json {
        let reports: Vec<_> = validated.iter().map(|v| &v.report).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for (i, v) in validated.iter().enumerate() {
        let status = if v.report.unvalidated {
            "unvalidated".yellow().bold()
        } else if v.report.is_accepted() {
            "ok".green().bold()
        } else {
            "issues".red().bold()
        };
        println!(
            "{} batch {} (score {:.1}) {}",
            status,
            i,
            v.report.score(),
            v.input.text.dimmed()
        );
        println!("{}\n", v.report.render());
    }
    Ok(())
}

fn cmd_ingest(
    config: &PipelineConfig,
    schema: &Path,
    store_path: &Path,
    revisions: Option<&Path>,
    files: &[PathBuf],
) -> Result<()> {
    let ctx = load_context(config, schema);
    let store = open_store(store_path)?;
    let mut replay = match revisions {
        Some(path) => RevisionReplay::load(path)?,
        None => RevisionReplay::default(),
    };
    let correction = config.correction_loop();

    let mut committed = 0usize;
    let mut accepted = 0usize;
    for file in files {
        let inputs = parse_batch_file(file)?;
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch".to_string());
        let validated = run_validation(config, &config.vocabulary, ctx.as_deref(), inputs);
        for (i, mut v) in validated.into_iter().enumerate() {
            if !v.report.unvalidated && !v.report.is_accepted() && !replay.pending.is_empty() {
                let outcome = correction.run(v.input, &config.vocabulary, ctx.as_deref(), &mut replay);
                tracing::info!(
                    file = %file.display(),
                    index = i,
                    iterations = outcome.iterations(),
                    accepted = outcome.is_accepted(),
                    "correction loop finished"
                );
                v = outcome.into_batch();
            }
            if v.report.is_accepted() {
                accepted += 1;
            } else {
                tracing::warn!(
                    file = %file.display(),
                    index = i,
                    blocking = v.report.blocking_count(),
                    "committing batch with validation issues"
                );
            }
            commit_batch(&store, &v.graph, &format!("{stem}#{i}"))
                .with_context(|| format!("failed to commit {}#{i}", file.display()))?;
            committed += 1;
        }
    }

    save_store(&store, store_path)?;
    println!(
        "{} {} batch(es), {} accepted, {} node(s), {} edge(s)",
        "ingested".green().bold(),
        committed,
        accepted,
        store.node_count(),
        store.edge_count()
    );
    Ok(())
}

fn cmd_consolidate(config: &PipelineConfig, store_path: &Path) -> Result<()> {
    let store = open_store(store_path)?;
    let before = store.node_count();
    let report = ConsolidationEngine::new(&store, config.consolidation()).run()?;
    save_store(&store, store_path)?;

    println!(
        "{} {} group(s), {} node(s) absorbed ({} -> {})",
        "merged".green().bold(),
        report.merged.len(),
        report.absorbed,
        before,
        store.node_count()
    );
    if !report.conflicts.is_empty() {
        println!("{} {} property conflict(s)", "warn".yellow().bold(), report.conflicts.len());
    }
    if report.depth_capped > 0 {
        println!("{} {} frontier(s) hit the depth cap", "warn".yellow().bold(), report.depth_capped);
    }
    for failed in &report.failed {
        println!(
            "{} {}:{}: {}",
            "failed".red().bold(),
            failed.label,
            failed.name,
            failed.error
        );
    }
    Ok(())
}

fn cmd_paths(store_path: &Path, out: Option<&Path>, collection: Option<String>) -> Result<()> {
    let store = open_store(store_path)?;
    let rows = PathEnumerator::new(collection).enumerate(&store)?;
    match out {
        Some(out) => {
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            eprintln!(
                "{} {} path(s) to {}",
                "wrote".green().bold(),
                rows.len(),
                out.display().to_string().bold()
            );
        }
        None => {
            for row in &rows {
                println!("{}", row.sentence);
            }
        }
    }
    Ok(())
}

fn cmd_reset(store_path: &Path) -> Result<()> {
    let store = open_store(store_path)?;
    store.detach_delete_all()?;
    save_store(&store, store_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_replay_pops_in_order_per_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("revisions.json");
        std::fs::write(
            &path,
            r#"[
                {"text": "a", "triples": ["Component:主梁>locatedAt>ComponentID:1号"]},
                {"text": "a", "triples": ["Component:主梁>hasPart>Part:腹板"]}
            ]"#,
        )
        .unwrap();

        let mut replay = RevisionReplay::load(&path).unwrap();
        let input = BatchInput {
            text: "a".to_string(),
            ..BatchInput::default()
        };
        let report = ValidationReport::default();
        let first = replay.correct(&input, &report).unwrap();
        assert!(first.triples[0].contains("locatedAt"));
        let second = replay.correct(&input, &report).unwrap();
        assert!(second.triples[0].contains("hasPart"));
        assert!(replay.correct(&input, &report).is_err());

        let other = BatchInput {
            text: "b".to_string(),
            ..BatchInput::default()
        };
        assert!(replay.correct(&other, &report).is_err());
    }
}
