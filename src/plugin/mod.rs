//! Plugin contract and the static registry.

pub mod dump;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::annotation::DeclEntities;
use crate::error::{AnnogenError, Result};
use crate::pipeline::Pipeline;

pub use dump::DumpPlugin;

/// Positional arguments and options a plugin accepts.
///
/// Arguments are written `name:help`; their count decides where options start
/// in an annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginArgs {
    pub args: Vec<String>,
    pub options: BTreeMap<String, String>,
}

impl PluginArgs {
    pub fn new(args: &[&str], options: &[(&str, &str)]) -> Self {
        Self {
            args: args.iter().map(|a| a.to_string()).collect(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

pub trait Plugin: Send + Sync {
    /// Unique name, also the first annotation segment
    fn name(&self) -> &str;

    fn args(&self) -> PluginArgs;

    fn description(&self) -> &str;

    fn run(&self, entities: DeclEntities) -> Result<()>;
}

pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(DumpPlugin::new()));
        registry
    }

    pub fn empty() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Registers `plugin`, replacing any plugin with the same name.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        self.plugins
            .get(name)
            .cloned()
            .ok_or_else(|| AnnogenError::PluginNotFound(name.to_string()))
    }

    /// Plugins ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.values()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A plugin selected for one run with its command-line options
#[derive(Clone)]
pub struct PluginEntity {
    pub plugin: Arc<dyn Plugin>,
    pub options: BTreeMap<String, String>,
}

impl PluginEntity {
    pub fn new(plugin: Arc<dyn Plugin>, options: BTreeMap<String, String>) -> Self {
        Self { plugin, options }
    }

    pub fn run(&self, path: &Path, pipeline: &Pipeline, prefix: &str) -> Result<()> {
        let decls = pipeline.parse_file_or_directory(path, prefix)?;
        let entities = decls.parse(self.plugin.as_ref(), &self.options);
        tracing::info!(
            "running {} on {} entities",
            self.plugin.name(),
            entities.len()
        );
        self.plugin.run(entities)
    }
}

#[derive(Clone, Default)]
pub struct PluginEntities(Vec<PluginEntity>);

impl PluginEntities {
    pub fn new(entities: Vec<PluginEntity>) -> Self {
        Self(entities)
    }

    pub fn push(&mut self, entity: PluginEntity) {
        self.0.push(entity);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Runs every plugin in order over `path`, stopping at the first failure.
    /// Later plugins see the output of earlier ones.
    pub fn run(&self, path: &Path, pipeline: &Pipeline, prefix: &str) -> Result<()> {
        for entity in &self.0 {
            entity.run(path, pipeline, prefix)?;
        }
        Ok(())
    }
}
