//! filterform CLI: inspect and validate experiment filter documents.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use filterform_core::{
    columns, validate, FilterField, FilterFormSet, FilterGroup, FilterNode, ROOT_ID,
};

#[derive(Parser)]
#[command(
    name = "filterform",
    about = "Inspect and validate experiment filter documents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a filter document for well-formedness and nesting depth
    Validate {
        /// Path to the filter document (JSON)
        file: PathBuf,
    },
    /// Print the filter tree and a condition summary
    Show {
        /// Path to the filter document (JSON)
        file: PathBuf,
    },
    /// Print the query JSON: ids stripped, incomplete conditions pruned
    Sanitize {
        /// Path to the filter document (JSON)
        file: PathBuf,
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file } => cmd_validate(file),
        Commands::Show { file } => cmd_show(file),
        Commands::Sanitize { file, output } => cmd_sanitize(file, output),
    }
}

// ─── Command implementations ──────────────────────────────────────────────────

fn load_formset(file: &Path) -> Result<FilterFormSet> {
    let content = std::fs::read_to_string(file)?;
    match FilterFormSet::from_json(&content) {
        Ok(formset) => Ok(formset),
        Err(e) => anyhow::bail!("invalid filter document {}: {}", file.display(), e),
    }
}

fn cmd_validate(file: PathBuf) -> Result<()> {
    let formset = load_formset(&file)?;

    let depth = validate::max_group_level(&formset.filter_group);
    if depth > validate::MAX_GROUP_NESTING {
        anyhow::bail!(
            "nesting too deep: group level {} exceeds the allowed {}",
            depth,
            validate::MAX_GROUP_NESTING
        );
    }
    if formset.filter_group.id != ROOT_ID {
        warn!(id = %formset.filter_group.id, "document root id is not the canonical ROOT");
    }

    let complete = validate::prune(&formset.filter_group).field_count();
    println!(
        "Valid: {} condition(s) ({} complete), depth {}/{}, show archived: {}",
        formset.field_count(),
        complete,
        depth,
        validate::MAX_GROUP_NESTING,
        formset.show_archived
    );
    Ok(())
}

fn cmd_show(file: PathBuf) -> Result<()> {
    let formset = load_formset(&file)?;

    println!(
        "Filter: {} condition(s), show archived: {}",
        formset.field_count(),
        formset.show_archived
    );
    println!();
    print_group(&formset.filter_group, 0);

    let mut fields = Vec::new();
    collect_fields(&formset.filter_group, &mut fields);
    if fields.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Column", "Operator", "Value", "Type", "Location"]);
    for field in fields {
        let value = field
            .value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row([
            field.column_name.as_str(),
            columns::operator_label(field.operator, field.column_type),
            &value,
            &field.column_type.to_string(),
            &field.location.to_string(),
        ]);
    }
    println!();
    println!("{}", table);
    Ok(())
}

fn cmd_sanitize(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let formset = load_formset(&file)?;
    let json = validate::sanitized_json(&formset)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json)?;
            println!("Wrote query JSON to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

// ─── Utilities ────────────────────────────────────────────────────────────────

fn print_group(group: &FilterGroup, level: usize) {
    let indent = "  ".repeat(level);
    println!("{}{} ({} children)", indent, group.conjunction, group.children.len());
    for child in &group.children {
        match child {
            FilterNode::Group(inner) => print_group(inner, level + 1),
            FilterNode::Field(field) => {
                let value = field
                    .value
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {} {} {}",
                    indent,
                    field.column_name,
                    columns::operator_label(field.operator, field.column_type),
                    value
                );
            }
        }
    }
}

fn collect_fields<'a>(group: &'a FilterGroup, out: &mut Vec<&'a FilterField>) {
    for child in &group.children {
        match child {
            FilterNode::Group(inner) => collect_fields(inner, out),
            FilterNode::Field(field) => out.push(field),
        }
    }
}
