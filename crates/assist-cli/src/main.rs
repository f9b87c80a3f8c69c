use anyhow::{anyhow, bail, Context, Result};
use assist_config::{init_tracing, AssistConfig};
use assist_core::{LineCol, LineIndex, ScopeId};
use assist_index::{
    jar_roots_in_dir, ClasspathRoot, FileHandle, MetadataDiscovery, MetadataService,
    RebuildReport, Suggestion,
};
use assist_metadata::text::{
    base_type, documentation_target, dot_delimited_original_names, first_sentence_without_dot,
    shortened_type,
};
use assist_metadata::{Deprecation, SuggestionNode};
use assist_scheduler::Scheduler;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "spring-assist",
    version,
    about = "Query Spring Boot configuration metadata (resolve, complete, describe)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a property name to the chain of metadata nodes it walks through
    Resolve(KeyArgs),
    /// Complete a partial property name (a trailing `.` lists all children)
    Complete(KeyArgs),
    /// Show documentation, type, default and hints for one property
    Describe(KeyArgs),
    /// List the metadata files found in the given sources
    Files(FilesArgs),
    /// Resolve the key under a cursor position in a `.properties` file
    Nav(NavArgs),
}

/// Where metadata comes from.
#[derive(Args)]
struct SourceArgs {
    /// Classpath root: a build output directory or a jar (repeatable)
    #[arg(long = "root", value_name = "PATH")]
    roots: Vec<PathBuf>,
    /// Directory whose jars are all classpath roots (repeatable)
    #[arg(long = "lib-dir", value_name = "DIR")]
    lib_dirs: Vec<PathBuf>,
    /// Metadata JSON file to load directly (repeatable)
    #[arg(long = "metadata", value_name = "FILE")]
    metadata: Vec<PathBuf>,
    /// Configuration file (defaults to `spring-assist.toml` in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit JSON suitable for scripts
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct KeyArgs {
    /// Property name, e.g. `server.servlet.session.timeout`
    key: String,
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args)]
struct FilesArgs {
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args)]
struct NavArgs {
    /// `.properties` file to inspect
    file: PathBuf,
    /// Byte offset of the cursor
    #[arg(long, conflicts_with_all = ["line", "column"])]
    offset: Option<usize>,
    /// 1-based line of the cursor
    #[arg(long, requires = "column")]
    line: Option<u32>,
    /// 1-based column (in bytes) of the cursor
    #[arg(long, requires = "line")]
    column: Option<u32>,
    #[command(flatten)]
    source: SourceArgs,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Resolve(args) => {
            let session = Session::open(&args.source)?;
            let chain = session.service.resolve(&args.key)?;
            let exit = if chain.is_empty() { 1 } else { 0 };
            let views: Vec<_> = chain.iter().map(SuggestionView::from).collect();
            print_suggestions(&views, args.source.json)?;
            Ok(exit)
        }
        Command::Complete(args) => {
            let session = Session::open(&args.source)?;
            let found = session.service.complete(&args.key)?;
            let views: Vec<_> = found.iter().map(SuggestionView::from).collect();
            print_suggestions(&views, args.source.json)?;
            Ok(0)
        }
        Command::Describe(args) => {
            let session = Session::open(&args.source)?;
            let tree = session.service.snapshot();
            let chain = tree.resolve_str(&args.key)?;
            let Some(node) = chain.last() else {
                if !args.source.json {
                    println!("no metadata for `{}`", args.key);
                } else {
                    print_json(&serde_json::Value::Null)?;
                }
                return Ok(1);
            };
            let description = Description::new(dot_delimited_original_names(&chain, 0), node);
            if args.source.json {
                print_json(&description)?;
            } else {
                print_description(&description);
            }
            Ok(0)
        }
        Command::Files(args) => {
            let session = Session::open(&args.source)?;
            let listing = FileListing::from(&session);
            if args.source.json {
                print_json(&listing)?;
            } else {
                for file in &listing.files {
                    println!("{file}");
                }
                for failure in &listing.failed {
                    println!("failed: {} ({})", failure.file, failure.reason);
                }
                println!("properties: {}", listing.properties);
            }
            Ok(0)
        }
        Command::Nav(args) => {
            let text = std::fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let offset = cursor_offset(&text, &args)?;
            let session = Session::open(&args.source)?;
            let tree = session.service.snapshot();

            let Some(reference) = assist_properties::resolve_reference(&text, offset, &tree) else {
                if !args.source.json {
                    println!("no property key at offset {offset}");
                } else {
                    print_json(&serde_json::Value::Null)?;
                }
                return Ok(1);
            };
            let target = reference
                .target()
                .map(|node| SuggestionView::from(&Suggestion::from_node(reference.name.to_string(), node)));
            let view = NavView {
                key: reference.key.clone(),
                resolved: reference.name.to_string(),
                exact: reference.is_exact(),
                range: [
                    u32::from(reference.target_range.start()),
                    u32::from(reference.target_range.end()),
                ],
                target,
            };
            if args.source.json {
                print_json(&view)?;
            } else {
                let marker = if view.exact { "" } else { " (closest known prefix)" };
                println!("{} -> {}{marker}", view.key, view.resolved);
                if let Some(target) = &view.target {
                    print_suggestions(std::slice::from_ref(target), false)?;
                }
            }
            Ok(0)
        }
    }
}

/// Metadata loaded from the command-line sources into a single scope.
struct Session {
    service: MetadataService,
    files: Vec<FileHandle>,
    report: RebuildReport,
}

impl Session {
    fn open(args: &SourceArgs) -> Result<Self> {
        let config = load_config(args)?;
        let discovery = MetadataDiscovery::from_config(&config.metadata);

        let mut roots = Vec::new();
        for path in &args.roots {
            let root = ClasspathRoot::from_path(path)
                .ok_or_else(|| anyhow!("{} is neither a directory nor a jar", path.display()))?;
            roots.push(root);
        }
        for dir in &args.lib_dirs {
            roots.extend(
                jar_roots_in_dir(dir).with_context(|| format!("failed to list jars in {}", dir.display()))?,
            );
        }

        let mut files = discovery.find_in_roots(&roots);
        for path in &args.metadata {
            if !path.is_file() {
                bail!("metadata file {} does not exist", path.display());
            }
            files.push(FileHandle::File(path.clone()));
        }
        tracing::debug!(
            target = "assist.cli",
            roots = roots.len(),
            files = files.len(),
            "loading metadata"
        );

        // One-shot: jobs run on this thread, so `wait` cannot deadlock.
        let service = MetadataService::new(
            ScopeId::new("cli"),
            Scheduler::inline(),
            config.metadata.merge_policy,
        );
        let report = service
            .refresh_metadata(files)
            .wait()
            .map_err(|err| anyhow!("metadata rebuild failed: {err}"))?;

        Ok(Self {
            files: service.known_files(),
            service,
            report,
        })
    }
}

fn load_config(args: &SourceArgs) -> Result<AssistConfig> {
    let (mut config, explicit) = match &args.config {
        Some(path) => (
            AssistConfig::load_from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            true,
        ),
        None => {
            let cwd = std::env::current_dir().context("failed to determine current directory")?;
            let (config, path) = assist_config::load_for_workspace(&cwd)?;
            (config, path.is_some())
        }
    };
    // Without a config file only warnings reach stderr.
    if !explicit {
        config.logging.level = "warn".to_string();
    }
    init_tracing(&config.logging);
    Ok(config)
}

fn cursor_offset(text: &str, args: &NavArgs) -> Result<usize> {
    if let Some(offset) = args.offset {
        if offset > text.len() {
            bail!("offset {offset} is past the end of {}", args.file.display());
        }
        return Ok(offset);
    }
    let (Some(line), Some(column)) = (args.line, args.column) else {
        bail!("pass either --offset or --line and --column");
    };
    let position = LineCol {
        line: line.saturating_sub(1),
        col: column.saturating_sub(1),
    };
    LineIndex::new(text)
        .offset(position)
        .map(usize::from)
        .ok_or_else(|| anyhow!("{line}:{column} is outside {}", args.file.display()))
}

#[derive(Serialize)]
struct SuggestionView {
    name: String,
    kind: &'static str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    ty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<String>,
    deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    replacement: Option<String>,
}

impl From<&Suggestion> for SuggestionView {
    fn from(suggestion: &Suggestion) -> Self {
        Self {
            name: suggestion.name.clone(),
            kind: suggestion.kind.as_str(),
            ty: suggestion.ty.clone(),
            description: suggestion.description.clone(),
            default_value: suggestion.default_value.clone(),
            deprecated: suggestion.deprecated,
            replacement: suggestion.replacement.clone(),
        }
    }
}

#[derive(Serialize)]
struct HintValueView {
    value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize)]
struct Description {
    name: String,
    kind: &'static str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    ty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    short_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    declared_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deprecation: Option<Deprecation>,
    values: Vec<HintValueView>,
    providers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl Description {
    fn new(name: String, node: &SuggestionNode) -> Self {
        let raw_type = node.ty().raw();
        let ty = (!raw_type.is_empty()).then(|| raw_type.to_string());
        let hints = node.hint().into_iter().chain(node.key_hint());
        let mut values = Vec::new();
        let mut providers = Vec::new();
        for hint in hints {
            values.extend(hint.values.iter().map(|value| HintValueView {
                value: value.value.clone(),
                description: value.description.clone(),
            }));
            providers.extend(hint.providers.iter().map(|provider| provider.name.clone()));
        }

        Self {
            name,
            kind: node.kind().as_str(),
            short_type: ty.as_deref().map(shortened_type),
            base_type: ty.as_deref().map(base_type),
            declared_in: documentation_target(node),
            ty,
            summary: node.description().map(first_sentence_without_dot),
            description: node.description().map(str::to_string),
            default_value: node.property().and_then(|p| p.default_value.clone()),
            deprecation: node.deprecation().cloned(),
            values,
            providers,
            source: node.source().map(ToString::to_string),
        }
    }
}

#[derive(Serialize)]
struct FailedFile {
    file: String,
    reason: String,
}

#[derive(Serialize)]
struct FileListing {
    files: Vec<String>,
    failed: Vec<FailedFile>,
    properties: usize,
}

impl From<&Session> for FileListing {
    fn from(session: &Session) -> Self {
        Self {
            files: session.files.iter().map(ToString::to_string).collect(),
            failed: session
                .report
                .failed_files
                .iter()
                .map(|(file, reason)| FailedFile {
                    file: file.to_string(),
                    reason: reason.clone(),
                })
                .collect(),
            properties: session.report.build.properties,
        }
    }
}

#[derive(Serialize)]
struct NavView {
    key: String,
    resolved: String,
    exact: bool,
    range: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<SuggestionView>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

fn print_suggestions(views: &[SuggestionView], json: bool) -> Result<()> {
    if json {
        return print_json(&views);
    }
    for view in views {
        let ty = view.ty.as_deref().map(shortened_type).unwrap_or_default();
        let deprecated = if view.deprecated { " (deprecated)" } else { "" };
        println!("{}\t{}\t{ty}{deprecated}", view.name, view.kind);
    }
    Ok(())
}

fn print_description(description: &Description) {
    println!("{} ({})", description.name, description.kind);
    if let Some(ty) = &description.short_type {
        println!("  type: {ty}");
    }
    if let Some(declared_in) = &description.declared_in {
        println!("  declared in: {declared_in}");
    }
    if let Some(default) = &description.default_value {
        println!("  default: {default}");
    }
    if let Some(summary) = &description.summary {
        println!("  {summary}");
    }
    if let Some(deprecation) = &description.deprecation {
        let level = match deprecation.level {
            assist_metadata::DeprecationLevel::Warning => "warning",
            assist_metadata::DeprecationLevel::Error => "error",
        };
        println!("  deprecated ({level})");
        if let Some(reason) = &deprecation.reason {
            println!("    reason: {reason}");
        }
        if let Some(replacement) = &deprecation.replacement {
            println!("    replacement: {replacement}");
        }
    }
    for value in &description.values {
        match &value.description {
            Some(text) => println!("  value: {} - {text}", value.value),
            None => println!("  value: {}", value.value),
        }
    }
    for provider in &description.providers {
        println!("  provider: {provider}");
    }
    if let Some(source) = &description.source {
        println!("  source: {source}");
    }
}
