use std::sync::Arc;

use crate::cache::Caches;
use crate::config::Config;
use crate::patch::ModifySet;
use crate::pipeline::{FileWalker, Pipeline};
use crate::resolver::{GoToolchain, ModuleResolver, Offline, Toolchain};
use crate::source::Parser;

/// Parser, pipeline and resolver sharing one set of caches
pub struct Engine {
    parser: Arc<Parser>,
    pipeline: Pipeline,
    resolver: ModuleResolver,
}

impl Engine {
    pub fn new(caches: Arc<Caches>, config: &Config) -> Self {
        let toolchain: Arc<dyn Toolchain> = if config.offline {
            Arc::new(Offline)
        } else {
            Arc::new(GoToolchain::new())
        };
        Self::with_toolchain(caches, config, toolchain)
    }

    pub fn with_toolchain(
        caches: Arc<Caches>,
        config: &Config,
        toolchain: Arc<dyn Toolchain>,
    ) -> Self {
        let parser = Arc::new(Parser::new(caches));
        let walker = FileWalker::new().with_skip_dirs(config.skip_dirs.iter().cloned());

        Self {
            pipeline: Pipeline::new(Arc::clone(&parser), walker),
            resolver: ModuleResolver::new(Arc::clone(&parser), toolchain),
            parser,
        }
    }

    pub fn caches(&self) -> &Arc<Caches> {
        self.parser.caches()
    }

    pub fn parser(&self) -> &Arc<Parser> {
        &self.parser
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Fresh patch session over this engine's parser
    pub fn modify_set(&self) -> ModifySet {
        ModifySet::new(Arc::clone(&self.parser))
    }
}
