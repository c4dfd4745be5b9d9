//! Output formatters for graph, plan and walk results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use serde_json::json;

use reindex_core::{
    DependencyGraph, DependentQuery, EntityKey, JoinForm, MetricsSnapshot, SkippedField,
    WalkReport,
};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format the dependency graph and the fields it skipped.
    fn format_graph(&self, graph: &DependencyGraph, skipped: &[SkippedField]) -> String;

    /// Format the queries planned for one entity.
    fn format_plan(&self, root: &EntityKey, queries: &[DependentQuery]) -> String;

    /// Format a finished walk.
    fn format_walk(&self, report: &WalkReport, metrics: &MetricsSnapshot) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

fn form_label(form: JoinForm) -> &'static str {
    match form {
        JoinForm::Scalar => "scalar",
        JoinForm::Collection => "collection",
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_graph(&self, graph: &DependencyGraph, skipped: &[SkippedField]) -> String {
        let mut output = if graph.is_empty() {
            "No dependency edges".to_string()
        } else {
            let mut table = Table::new();
            table.set_header(vec!["Embedded", "Owner", "Field", "Collection"]);
            for (embedded, edges) in graph.iter() {
                for edge in edges {
                    table.add_row(vec![
                        Cell::new(embedded),
                        Cell::new(&edge.owner_type),
                        Cell::new(&edge.field_name),
                        Cell::new(edge.is_collection),
                    ]);
                }
            }
            table.to_string()
        };

        if !skipped.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["Owner", "Field", "Skipped"]);
            for field in skipped {
                table.add_row(vec![
                    field.owner_type.clone(),
                    field.field_name.clone(),
                    field.reason.to_string(),
                ]);
            }
            output.push_str("\n\n");
            output.push_str(&table.to_string());
        }

        output
    }

    fn format_plan(&self, root: &EntityKey, queries: &[DependentQuery]) -> String {
        if queries.is_empty() {
            return format!("No dependents of {}", root.entity_type);
        }

        let mut table = Table::new();
        table.set_header(vec!["Owner", "Form", "Query", "id"]);
        for query in queries {
            table.add_row(vec![
                Cell::new(query.owner_type()),
                Cell::new(form_label(query.form())),
                Cell::new(query.text()),
                Cell::new(query.id()),
            ]);
        }
        table.to_string()
    }

    fn format_walk(&self, report: &WalkReport, metrics: &MetricsSnapshot) -> String {
        let mut output = format!(
            "Re-indexed {} entities from {} ({} queries)",
            report.size(),
            report.root,
            report.queries
        );

        if !report.indexed.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["#", "Entity"]);
            for (position, key) in report.indexed.iter().enumerate() {
                table.add_row(vec![Cell::new(position + 1), Cell::new(key)]);
            }
            output.push_str("\n\n");
            output.push_str(&table.to_string());
        }

        if !report.failures.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["Failure", "Entity", "Message"]);
            for failure in &report.failures {
                table.add_row(vec![
                    Cell::new(failure.kind),
                    Cell::new(&failure.key),
                    Cell::new(&failure.message),
                ]);
            }
            output.push_str("\n\n");
            output.push_str(&table.to_string());
        }

        if metrics.walks_dropped > 0 {
            output.push_str(&format!("\n\n{} walk(s) dropped", metrics.walks_dropped));
        }

        output
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_graph(&self, graph: &DependencyGraph, skipped: &[SkippedField]) -> String {
        let mut edges = serde_json::Map::new();
        for (embedded, list) in graph.iter() {
            edges.insert(embedded.to_string(), json!(list));
        }

        serde_json::to_string_pretty(&json!({
            "edges": edges,
            "skipped": skipped,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_plan(&self, root: &EntityKey, queries: &[DependentQuery]) -> String {
        let rows: Vec<_> = queries
            .iter()
            .map(|query| {
                json!({
                    "owner": query.owner_type(),
                    "form": form_label(query.form()),
                    "query": query.text(),
                    "id": query.id(),
                })
            })
            .collect();

        serde_json::to_string_pretty(&json!({
            "root": root,
            "queries": rows,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_walk(&self, report: &WalkReport, metrics: &MetricsSnapshot) -> String {
        serde_json::to_string_pretty(&json!({
            "report": report,
            "metrics": metrics,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }
}
