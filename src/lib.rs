//! Call-order linting for Ruby classes.
//!
//! The crate exposes a tree-sitter based `CopEngine` running a registry of
//! cops. The flagship cop, `method_order`, rebuilds the expected declaration
//! order of private/protected methods from their call graph and plans the
//! text moves that restore it.

pub mod cli;
pub mod config;
pub mod cop;
pub mod cops;
pub mod diagnostics;
pub mod fix;
pub mod level;
pub mod parser;
pub mod telemetry;

use anyhow::Result;
use tree_sitter::Tree;

use crate::cop::{CopContext, CopRegistry, CopSettings};
use crate::cops::OrderStyle;
use crate::diagnostics::Diagnostic;
use crate::parser::parse_source;

/// Engine orchestrates linting by parsing source and running registered cops.
pub struct CopEngine {
    registry: CopRegistry,
    settings: CopSettings,
}

impl CopEngine {
    /// Create a new engine with default cop settings.
    pub fn new(registry: CopRegistry) -> Self {
        Self {
            registry,
            settings: CopSettings::default(),
        }
    }

    /// Create a new engine with explicit cop settings (e.g. from config).
    pub fn new_with_settings(registry: CopRegistry, settings: CopSettings) -> Self {
        Self { registry, settings }
    }

    /// Lint a single in-memory source string and return diagnostics.
    pub fn lint_source(&self, source: &str) -> Result<Vec<Diagnostic>> {
        let tree = parse_source(source)?;
        self.run_cops(source, &tree)
    }

    fn run_cops(&self, source: &str, tree: &Tree) -> Result<Vec<Diagnostic>> {
        let mut ctx = CopContext::new(source, self.settings.clone());
        let root = tree.root_node();

        for cop in self.registry.cops() {
            cop.check(root, &mut ctx);
        }

        Ok(ctx.into_diagnostics())
    }
}

/// Construct a `CopEngine` with all built-in cops and default settings.
pub fn create_default_engine() -> CopEngine {
    CopEngine::new(CopRegistry::default_cops(OrderStyle::default()))
}
