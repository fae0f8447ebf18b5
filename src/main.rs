use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use kennel_import_lib::{
    mapping_stats, AppError, ColumnMappings, ColumnTarget, EntityCatalog, ImportMode, ImportSession,
    OverwriteSetting, ParsedDataset, SelectedTypes, DEFAULT_BATCH_SIZE,
};

/// Exit code when required fields of the primary type are not mapped.
const MAPPING_INCOMPLETE_EXIT_CODE: i32 = 2;

#[derive(Debug, Parser)]
#[command(name = "kennel-import", about = "Map and transform bulk import files", version)]
struct Cli {
    /// Entity catalog JSON to use instead of the built-in one.
    #[arg(long, value_name = "PATH", global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the importable entity types.
    Catalog {
        /// Emit the catalog as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Propose a column mapping for a file and check it.
    Map {
        file: PathBuf,
        /// Entity types to import; the first one is created from each row.
        #[arg(long = "type", value_name = "ID", required = true)]
        types: Vec<String>,
        /// Emit mapping, stats and validation as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Transform every row and emit the import request.
    Transform {
        file: PathBuf,
        #[arg(long = "type", value_name = "ID", required = true)]
        types: Vec<String>,
        /// Mapping JSON (as printed by `map --json`) to apply over the automatic one.
        #[arg(long, value_name = "PATH")]
        mapping: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// create_update, create_only or update_only for the primary type.
        #[arg(long, default_value = "create_update")]
        mode: ImportMode,
        /// Field keys whose existing values may be overwritten.
        #[arg(long = "overwrite", value_name = "FIELD")]
        overwrite: Vec<String>,
        /// Write a timestamped report into this directory instead of printing.
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
    },
}

fn main() {
    kennel_import_lib::init_logging();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            AppError::from(err).log_with_event("command_failed");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let catalog = match &cli.catalog {
        Some(path) => EntityCatalog::from_path(path)
            .with_context(|| format!("load catalog {}", path.display()))?,
        None => EntityCatalog::builtin(),
    };

    match cli.command {
        Commands::Catalog { json } => print_catalog(&catalog, json),
        Commands::Map { file, types, json } => handle_map(&catalog, &file, types, json),
        Commands::Transform {
            file,
            types,
            mapping,
            batch_size,
            mode,
            overwrite,
            out,
        } => {
            let mut session = open_session(&catalog, &file, types)?;
            if let Some(path) = mapping {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("read mapping {}", path.display()))?;
                let document: Value = serde_json::from_str(&text)
                    .with_context(|| format!("parse mapping {}", path.display()))?;
                // Accept the whole `map --json` payload as well as a bare list.
                let listed = match document {
                    Value::Object(mut object) if object.contains_key("mappings") => {
                        object.remove("mappings").unwrap_or_default()
                    }
                    other => other,
                };
                let mappings: ColumnMappings = serde_json::from_value(listed)
                    .with_context(|| format!("parse mapping {}", path.display()))?;
                session.replace_mappings(mappings)?;
            }
            session.set_batch_size(batch_size);
            let primary = session.selected().require_primary()?.to_string();
            session.set_import_mode(&primary, mode)?;
            for field in &overwrite {
                session.set_overwrite(field, OverwriteSetting::Overwrite);
            }
            handle_transform(&session, &file, out.as_deref())
        }
    }
}

fn open_session<'c>(
    catalog: &'c EntityCatalog,
    file: &Path,
    types: Vec<String>,
) -> Result<ImportSession<'c>> {
    let dataset =
        ParsedDataset::from_path(file).with_context(|| format!("read {}", file.display()))?;
    let mut session = ImportSession::new(catalog);
    session.select(SelectedTypes::new(catalog, types)?)?;
    session.load_dataset(dataset)?;
    Ok(session)
}

fn print_catalog(catalog: &EntityCatalog, emit_json: bool) -> Result<i32> {
    if emit_json {
        let serialized = serde_json::to_string_pretty(catalog.entity_types())
            .context("serialize catalog")?;
        println!("{serialized}");
        return Ok(0);
    }
    for entity in catalog.entity_types() {
        let partners: Vec<&str> = catalog
            .partners_of(&entity.id)
            .into_iter()
            .map(|partner| partner.id.as_str())
            .collect();
        println!(
            "{:<14} {:<3} fields  required: {}  links: {}",
            entity.id,
            entity.fields.len(),
            entity.required_fields.join(", "),
            if partners.is_empty() { "-".to_string() } else { partners.join(", ") },
        );
    }
    Ok(0)
}

fn describe(target: &ColumnTarget) -> String {
    match target {
        ColumnTarget::Skip => "skip".to_string(),
        ColumnTarget::Property { entity_type, field } => {
            format!("{entity_type}.{}", field.as_deref().unwrap_or("?"))
        }
        ColumnTarget::Association {
            target_entity_type,
            field,
        } => format!(
            "link {}.{}",
            target_entity_type.as_deref().unwrap_or("?"),
            field.as_deref().unwrap_or("?")
        ),
    }
}

fn handle_map(
    catalog: &EntityCatalog,
    file: &Path,
    types: Vec<String>,
    emit_json: bool,
) -> Result<i32> {
    let session = open_session(catalog, file, types)?;
    let validation = session.validate()?;
    let stats = mapping_stats(session.mappings(), session.selected());

    if emit_json {
        let payload = json!({
            "mappings": session.mappings(),
            "stats": stats,
            "validation": validation,
        });
        let serialized =
            serde_json::to_string_pretty(&payload).context("serialize mapping payload")?;
        println!("{serialized}");
    } else {
        for (header, target) in session.mappings().iter() {
            println!("{header:<24} -> {}", describe(target));
        }
        println!(
            "{} properties, {} associations, {} skipped",
            stats.property_count, stats.association_count, stats.skipped_count
        );
    }

    if validation.is_valid {
        return Ok(0);
    }
    for missing in &validation.errors {
        eprintln!("Required field not mapped: {} ({})", missing.label, missing.field);
    }
    Ok(MAPPING_INCOMPLETE_EXIT_CODE)
}

fn handle_transform(session: &ImportSession<'_>, file: &Path, out: Option<&Path>) -> Result<i32> {
    let validation = session.validate()?;
    if !validation.is_valid {
        for missing in &validation.errors {
            eprintln!("Required field not mapped: {} ({})", missing.label, missing.field);
        }
        return Ok(MAPPING_INCOMPLETE_EXIT_CODE);
    }

    let outcome = session.transform(|_| {})?;
    let request = session.build_request(outcome.rows)?;
    for line in request.coercion_summary.lines() {
        eprintln!("Warning: {line}");
    }

    match out {
        Some(dir) => {
            let path = kennel_import_lib::write_import_report(dir, file, &request)?;
            println!("{}", path.display());
        }
        None => {
            let serialized =
                serde_json::to_string_pretty(&request).context("serialize import request")?;
            println!("{serialized}");
        }
    }
    Ok(0)
}
