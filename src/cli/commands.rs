use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use annogen::annotation::{parse_annotation, ANNOTATION_SEPARATOR};
use annogen::config::Config;
use annogen::engine::Engine;
use annogen::error::{AnnogenError, Result};
use annogen::pipeline::{AnnotatedDecl, DeclKind};
use annogen::plugin::{PluginEntities, PluginEntity, PluginRegistry};

#[derive(Parser)]
#[command(name = "annogen")]
#[command(about = "Annotation-driven code generation for Go source trees")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Dump every entity annotated for the dump plugin
    annogen run ./internal -p dump

    # Same, one JSON object per line
    annogen run ./internal -p dump:compact

    # Use a different annotation prefix
    annogen --prefix "+build:" run . -p dump

    # List annotated declarations
    annogen scan ./pkg --format json

    # Show registered plugins
    annogen list

    # Resolve a type across packages
    annogen lookup Duration time
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Annotation prefix (default: "+gen:")
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Path to the persisted resolver cache
    #[arg(long, global = true)]
    pub cache_file: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true, default_value = "annogen.toml")]
    pub config: PathBuf,

    /// Never shell out to the go toolchain
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run plugins over a file or directory
    Run {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Plugin to run, as name[:key=value...]; repeatable, runs in order
        #[arg(short = 'p', long = "plugin", required = true)]
        plugins: Vec<String>,
    },

    /// List annotated declarations
    Scan {
        /// File or directory to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List registered plugins
    List,

    /// Resolve a type to its concrete definition
    Lookup {
        /// Type name
        name: String,

        /// Import path of the declaring package
        import_path: String,

        /// Directory the import path is resolved from
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

/// Splits `name[:key=value...]` into the plugin name and its options.
pub fn parse_plugin_spec(spec: &str) -> (String, BTreeMap<String, String>) {
    let name = spec
        .split(ANNOTATION_SEPARATOR)
        .next()
        .unwrap_or_default()
        .to_string();
    let options = parse_annotation(spec, &name, 0, &BTreeMap::new())
        .map(|parsed| parsed.options.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    (name, options)
}

pub fn run_plugins(
    engine: &Engine,
    registry: &PluginRegistry,
    config: &Config,
    path: &Path,
    specs: &[String],
    prefix: &str,
) -> Result<()> {
    let mut entities = PluginEntities::default();
    for spec in specs {
        let (name, flags) = parse_plugin_spec(spec);
        let plugin = registry.get(&name)?;
        entities.push(PluginEntity::new(plugin, config.plugin_options(&name, flags)));
    }

    tracing::info!("running {} plugins on {}", entities.len(), path.display());
    entities.run(path, engine.pipeline(), prefix)
}

#[derive(Serialize)]
struct ScanEntry<'a> {
    name: &'a str,
    kind: DeclKind,
    package: &'a str,
    file: String,
    line: usize,
    annotations: &'a [String],
    fields: Vec<ScanField<'a>>,
}

#[derive(Serialize)]
struct ScanField<'a> {
    name: &'a str,
    annotations: &'a [String],
}

impl<'a> ScanEntry<'a> {
    fn new(decl: &'a AnnotatedDecl) -> Self {
        Self {
            name: decl.name(),
            kind: decl.kind,
            package: decl.package(),
            file: decl.path().display().to_string(),
            line: decl.line(),
            annotations: &decl.annotations,
            fields: decl
                .fields
                .iter()
                .map(|f| ScanField {
                    name: f.name(),
                    annotations: &f.annotations,
                })
                .collect(),
        }
    }
}

pub fn scan(engine: &Engine, path: &Path, prefix: &str, format: &str) -> Result<()> {
    let decls = engine.pipeline().parse_file_or_directory(path, prefix)?;
    let entries: Vec<ScanEntry> = decls.iter().map(|d| ScanEntry::new(d)).collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        "text" => {
            if entries.is_empty() {
                println!("No annotated declarations found");
                return Ok(());
            }
            for entry in &entries {
                let kind = serde_json::to_value(entry.kind)?;
                println!(
                    "{} ({}) - {}:{}",
                    if entry.name.is_empty() { "_" } else { entry.name },
                    kind.as_str().unwrap_or_default(),
                    entry.file,
                    entry.line
                );
                for annotation in entry.annotations {
                    println!("    {}{}", prefix, annotation);
                }
                for field in &entry.fields {
                    for annotation in field.annotations {
                        println!("    .{} {}{}", field.name, prefix, annotation);
                    }
                }
            }
            println!("\nTotal: {} declarations", entries.len());
        }
        other => {
            return Err(AnnogenError::Config(format!(
                "unknown format '{}', expected text or json",
                other
            )))
        }
    }

    Ok(())
}

pub fn list_plugins(registry: &PluginRegistry) -> Result<()> {
    if registry.is_empty() {
        println!("No plugins registered");
        return Ok(());
    }

    for plugin in registry.iter() {
        println!("{} - {}", plugin.name(), plugin.description());
        let args = plugin.args();
        for arg in &args.args {
            let (name, help) = arg.split_once(ANNOTATION_SEPARATOR).unwrap_or((arg, ""));
            println!("    <{}>  {}", name, help);
        }
        for (key, help) in &args.options {
            println!("    {}=  {}", key, help);
        }
    }

    Ok(())
}

pub fn lookup(engine: &Engine, name: &str, import_path: &str, dir: &Path) -> Result<()> {
    let dir = annogen::source::absolute(dir)?;
    match engine.resolver().lookup_type_spec(name, &dir, import_path) {
        Some((ty, unit)) => {
            println!("{}.{} = {}", import_path, name, ty.text);
            println!("    declared in {}", unit.path.display());
        }
        None => println!("{}.{} not found", import_path, name),
    }
    Ok(())
}
