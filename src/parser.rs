use anyhow::{Context, Result};
use tree_sitter::{Language, Parser, Tree};

fn ruby_language() -> Language {
    tree_sitter_ruby::language()
}

pub fn parse_source(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(ruby_language())
        .context("failed to load Ruby grammar")?;

    parser
        .parse(source, None)
        .context("tree-sitter failed to parse source")
}
