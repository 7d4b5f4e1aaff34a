//! schemaflow CLI: Schema-Übersicht und Quelltext-Abfragen.

use clap::{Args, Parser, Subcommand};
use schemaflow::schema::Registry;
use schemaflow::{SchemaSet, SourceTextProvider};
use serde_json::{json, Value};
use std::io::Write;
use std::process;

#[derive(Parser)]
#[command(name = "schemaflow", about = "XML Schema model browser")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load schemas (following include/import) and print an outline
    Outline(OutlineArgs),
    /// Print the full text of a schema document
    Text(TextArgs),
    /// Print the element fragment starting at a line/column
    Fragment(FragmentArgs),
}

#[derive(Args)]
struct OutlineArgs {
    /// Schema files (.xsd)
    #[arg(required = true)]
    files: Vec<String>,

    /// JSON output
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TextArgs {
    /// File path or file: URI
    locator: String,
}

#[derive(Args)]
struct FragmentArgs {
    /// File path or file: URI
    locator: String,

    /// 1-based line of the start tag
    #[arg(long)]
    line: u32,

    /// 1-based column of the start tag's `<`
    #[arg(long)]
    column: u32,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Outline(args) => run_outline(args),
        Command::Text(args) => run_text(args),
        Command::Fragment(args) => run_fragment(args),
    }
}

fn run_outline(args: OutlineArgs) -> Result<(), String> {
    let set = SchemaSet::load_files(&args.files).map_err(|e| e.to_string())?;
    let output = if args.json {
        serde_json::to_string_pretty(&outline_json(&set))
            .map_err(|e| format!("JSON encode error: {e}"))?
    } else {
        outline_text(&set)
    };
    write_stdout(&output)
}

fn run_text(args: TextArgs) -> Result<(), String> {
    let text = SourceTextProvider::shared()
        .document_text(&args.locator)
        .map_err(|e| e.to_string())?;
    write_stdout(&text)
}

fn run_fragment(args: FragmentArgs) -> Result<(), String> {
    let xml = SourceTextProvider::shared()
        .fragment_at(&args.locator, args.line, args.column)
        .map_err(|e| e.to_string())?;
    write_stdout(&xml)
}

fn write_stdout(text: &str) -> Result<(), String> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{text}").map_err(|e| format!("Schreibfehler: {e}"))
}

/// Registry-Namen in Registrierungsreihenfolge.
fn names<T>(registry: &Registry<T>) -> Vec<String> {
    registry.keys().map(|key| display_key(key)).collect()
}

/// `ns|local` → `{ns}local`, ohne Namespace nur `local`.
fn display_key(key: &str) -> String {
    match key.split_once('|') {
        Some(("", local)) => local.to_string(),
        Some((ns, local)) => format!("{{{ns}}}{local}"),
        None => key.to_string(),
    }
}

fn registries(set: &SchemaSet) -> [(&'static str, Vec<String>); 6] {
    [
        ("elements", names(set.elements())),
        ("complexTypes", names(set.complex_types())),
        ("simpleTypes", names(set.simple_types())),
        ("attributes", names(set.attributes())),
        ("groups", names(set.groups())),
        ("attributeGroups", names(set.attribute_groups())),
    ]
}

fn outline_json(set: &SchemaSet) -> Value {
    let documents: Vec<Value> = set
        .documents()
        .iter()
        .map(|doc| {
            json!({
                "uri": doc.document_uri,
                "targetNamespace": doc.target_namespace,
                "version": doc.version,
                "includes": doc.includes,
                "imports": doc.imports.iter().map(|i| json!({
                    "namespace": i.namespace,
                    "schemaLocation": i.schema_location,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    let registries: serde_json::Map<String, Value> = registries(set)
        .into_iter()
        .map(|(kind, names)| (kind.to_string(), json!(names)))
        .collect();
    let diagnostics: Vec<Value> = set
        .diagnostics()
        .iter()
        .map(|d| {
            json!({
                "severity": d.severity.to_string(),
                "message": d.message,
                "location": d.location.as_ref().map(ToString::to_string),
            })
        })
        .collect();
    let unresolved: Vec<String> = set
        .unresolved_references()
        .iter()
        .map(|r| format!("{} {}", r.kind, r.name))
        .collect();

    json!({
        "documents": documents,
        "registries": registries,
        "diagnostics": diagnostics,
        "unresolved": unresolved,
    })
}

fn outline_text(set: &SchemaSet) -> String {
    let mut out = String::new();
    for doc in set.documents() {
        out.push_str(&format!(
            "document {} (targetNamespace: {})\n",
            doc.document_uri.as_deref().unwrap_or("<unknown>"),
            doc.target_namespace.as_deref().unwrap_or("-"),
        ));
    }
    for (kind, names) in registries(set) {
        out.push_str(&format!("{kind}: {}\n", names.len()));
        for name in names {
            out.push_str(&format!("  {name}\n"));
        }
    }
    for diagnostic in set.diagnostics() {
        out.push_str(&format!("{diagnostic}\n"));
    }
    for reference in set.unresolved_references() {
        out.push_str(&format!("unresolved {} {}\n", reference.kind, reference.name));
    }
    out.truncate(out.trim_end().len());
    out
}
