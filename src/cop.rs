use crate::cops::method_order::{MethodOrder, OrderStyle};
use crate::diagnostics::Diagnostic;
use crate::level::CopLevel;
use anyhow::{Result, anyhow};
use std::collections::{HashMap, HashSet};
use tree_sitter::Node;

/// High-level categories used to group cops, mirroring the departments of the
/// Ruby style guides this tool draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CopCategory {
    Style,
    Rails,
    Rspec,
}

impl CopCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopCategory::Style => "style",
            CopCategory::Rails => "rails",
            CopCategory::Rspec => "rspec",
        }
    }
}

/// Descriptor for an auto-correction associated with a cop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixDescriptor {
    /// Whether an auto-correction is available for this cop.
    pub available: bool,
    /// Human-readable description of what the correction does.
    pub description: &'static str,
}

impl FixDescriptor {
    pub const fn safe(description: &'static str) -> Self {
        Self {
            available: true,
            description,
        }
    }

    pub const fn none() -> Self {
        Self {
            available: false,
            description: "",
        }
    }
}

/// Static metadata describing a cop.
#[derive(Debug)]
pub struct CopDescriptor {
    pub name: &'static str,
    pub category: CopCategory,
    pub description: &'static str,
    pub fix: FixDescriptor,
}

/// A single cop that can inspect a syntax tree. The source being linted is
/// available through the context.
pub trait Cop: Send + Sync {
    fn descriptor(&self) -> &'static CopDescriptor;
    fn check(&self, root: Node, ctx: &mut CopContext<'_>);
}

/// Per-cop configuration derived from `obsession.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopSettings {
    levels: HashMap<String, CopLevel>,
}

impl CopSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, CopLevel>) -> Self {
        self.levels.extend(levels);
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            self.levels.insert(name, CopLevel::Allow);
        }
        self
    }

    pub fn level_for(&self, cop_name: &str) -> CopLevel {
        self.levels.get(cop_name).copied().unwrap_or_default()
    }
}

/// Mutable context passed to cops while traversing a file.
pub struct CopContext<'src> {
    source: &'src str,
    settings: CopSettings,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> CopContext<'src> {
    pub fn new(source: &'src str, settings: CopSettings) -> Self {
        Self {
            source,
            settings,
            diagnostics: Vec::new(),
        }
    }

    /// Report an already-constructed diagnostic, dropping it when the cop's
    /// configured level is `allow`.
    pub fn report_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.level == CopLevel::Allow {
            return;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn settings(&self) -> &CopSettings {
        &self.settings
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

pub fn all_known_cops() -> HashSet<&'static str> {
    CopRegistry::default_cops(OrderStyle::default())
        .descriptors()
        .map(|d| d.name)
        .collect()
}

/// Registry of cops run by the engine.
pub struct CopRegistry {
    cops: Vec<Box<dyn Cop>>,
}

impl CopRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self { cops: Vec::new() }
    }

    #[must_use]
    pub fn with_cop(mut self, cop: impl Cop + 'static) -> Self {
        self.cops.push(Box::new(cop));
        self
    }

    pub fn cops(&self) -> impl Iterator<Item = &Box<dyn Cop>> {
        self.cops.iter()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static CopDescriptor> + '_ {
        self.cops.iter().map(|c| c.descriptor())
    }

    pub fn find_descriptor(&self, name: &str) -> Option<&'static CopDescriptor> {
        self.descriptors().find(|d| d.name == name)
    }

    /// All built-in cops, with `method_order` configured for the given style.
    #[must_use = "registry should be used to create an engine"]
    pub fn default_cops(style: OrderStyle) -> Self {
        Self::new().with_cop(MethodOrder::new(style))
    }

    /// Filter cops by CLI/config selection.
    ///
    /// # Errors
    ///
    /// Returns an error if any cop name in `only`, `skip`, or `disabled` is
    /// unknown.
    pub fn default_cops_filtered(
        style: OrderStyle,
        only: &[String],
        skip: &[String],
        disabled: &[String],
    ) -> Result<Self> {
        let known = all_known_cops();

        for n in only.iter().chain(skip.iter()).chain(disabled.iter()) {
            if !known.contains(n.as_str()) {
                return Err(anyhow!("unknown cop: {n}"));
            }
        }

        let only_set: Option<HashSet<&str>> = if only.is_empty() {
            None
        } else {
            Some(only.iter().map(String::as_str).collect())
        };

        let skip_set: HashSet<&str> = skip.iter().map(String::as_str).collect();
        let disabled_set: HashSet<&str> = disabled.iter().map(String::as_str).collect();

        let mut reg = Self::new();
        let all = Self::default_cops(style);
        for cop in all.cops {
            let name = cop.descriptor().name;

            if let Some(ref only) = only_set
                && !only.contains(name)
            {
                continue;
            }
            if skip_set.contains(name) || disabled_set.contains(name) {
                continue;
            }

            reg.cops.push(cop);
        }

        Ok(reg)
    }
}

impl Default for CopRegistry {
    fn default() -> Self {
        Self::new()
    }
}
