use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::annotation::{DeclEntities, DeclEntity, Options};
use crate::error::Result;
use crate::pipeline::DeclKind;

use super::{Plugin, PluginArgs};

/// Prints bound entities as JSON, one document per run.
pub struct DumpPlugin {
    out: Mutex<Box<dyn Write + Send>>,
}

#[derive(Serialize)]
struct EntityView<'a> {
    plugin: &'a str,
    kind: DeclKind,
    name: &'a str,
    package: &'a str,
    file: &'a PathBuf,
    args: &'a [String],
    options: &'a Options,
    docs: &'a [String],
    fields: Vec<FieldView<'a>>,
}

#[derive(Serialize)]
struct FieldView<'a> {
    names: &'a [String],
    #[serde(rename = "type")]
    ty: &'a str,
    annotations: &'a [String],
}

impl<'a> From<&'a DeclEntity> for EntityView<'a> {
    fn from(e: &'a DeclEntity) -> Self {
        Self {
            plugin: &e.plugin,
            kind: e.kind,
            name: e.name(),
            package: e.package(),
            file: &e.unit.path,
            args: &e.args,
            options: &e.options,
            docs: &e.docs,
            fields: e
                .fields
                .iter()
                .map(|f| FieldView {
                    names: &f.field.names,
                    ty: &f.field.ty.text,
                    annotations: &f.annotations,
                })
                .collect(),
        }
    }
}

impl DumpPlugin {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Default for DumpPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for DumpPlugin {
    fn name(&self) -> &str {
        "dump"
    }

    fn args(&self) -> PluginArgs {
        PluginArgs::new(&[], &[("compact", "print JSON on a single line")])
    }

    fn description(&self) -> &str {
        "print annotated declarations bound to this plugin as JSON"
    }

    fn run(&self, entities: DeclEntities) -> Result<()> {
        let compact = entities.iter().any(|e| e.options.exist("compact"));
        let views: Vec<EntityView> = entities.iter().map(EntityView::from).collect();

        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if compact {
            serde_json::to_writer(&mut *out, &views)?;
        } else {
            serde_json::to_writer_pretty(&mut *out, &views)?;
        }
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}
