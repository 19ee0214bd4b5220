use clap::Parser;
use obsession::CopEngine;
use obsession::cli::{Args, Command, LintArgs, OutputFormat};
use obsession::config;
use obsession::cop::{CopRegistry, CopSettings};
use obsession::cops::OrderStyle;
use obsession::fix;
use obsession::level::CopLevel;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    obsession::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::ListRules) => {
            list_rules();
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Explain { rule }) => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Lint(lint)) => lint_command(lint),
        None => lint_command(args.lint),
    }
}

fn list_rules() {
    let registry = CopRegistry::default_cops(OrderStyle::default());
    let mut cops: Vec<_> = registry.descriptors().collect();
    cops.sort_by_key(|d| d.name);

    for d in cops {
        let fix_status = if d.fix.available { " [fixable]" } else { "" };
        println!(
            "{}\t{}\t{}{}",
            d.name,
            d.category.as_str(),
            d.description,
            fix_status
        );
    }
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let registry = CopRegistry::default_cops(OrderStyle::default());
    let Some(d) = registry.find_descriptor(rule) else {
        anyhow::bail!("unknown cop: {rule}");
    };

    println!("name: {}", d.name);
    println!("category: {}", d.category.as_str());
    println!("description: {}", d.description);
    if d.fix.available {
        println!("fix: available");
        if !d.fix.description.is_empty() {
            println!("fix description: {}", d.fix.description);
        }
    } else {
        println!("fix: not available");
    }
    Ok(())
}

/// Disabled cop names, settings, and the configured method order style, from
/// obsession.toml when one applies.
fn resolve_configuration(
    args: &LintArgs,
) -> anyhow::Result<(Vec<String>, CopSettings, OrderStyle)> {
    let start_dir = infer_start_dir(args)?;
    let loaded_cfg = config::load_config(args.config.as_deref(), &start_dir)?;

    Ok(match loaded_cfg {
        Some((_path, cfg)) => (
            cfg.cops.disabled.clone(),
            CopSettings::default()
                .with_config_levels(cfg.cops.levels.clone())
                .disable(cfg.cops.disabled),
            cfg.method_order.style,
        ),
        None => (Vec::new(), CopSettings::default(), OrderStyle::default()),
    })
}

fn lint_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.fix || args.fix_dry_run {
        return fix_command(args);
    }

    let (disabled, settings, style) = resolve_configuration(&args)?;
    #[cfg(feature = "telemetry")]
    tracing::debug!(style = style.as_str(), "resolved configuration");

    let registry = CopRegistry::default_cops_filtered(style, &args.only, &args.skip, &disabled)?;
    let engine = CopEngine::new_with_settings(registry, settings);

    let mut total_diags = 0usize;
    let mut has_error = false;

    match args.format {
        OutputFormat::Json => {
            let mut out: Vec<JsonDiagnostic> = Vec::new();

            if args.paths.is_empty() {
                let (count, file_has_error, mut diags) = lint_stdin_json(&engine)?;
                total_diags += count;
                has_error |= file_has_error;
                out.append(&mut diags);
            } else {
                let files = collect_ruby_files(&args.paths)?;
                for path in files {
                    let (count, file_has_error, mut diags) = lint_file_json(&engine, &path)?;
                    total_diags += count;
                    has_error |= file_has_error;
                    out.append(&mut diags);
                }
            }

            out.sort_by(|a, b| {
                (a.file.as_str(), a.row, a.column, a.cop.as_str()).cmp(&(
                    b.file.as_str(),
                    b.row,
                    b.column,
                    b.cop.as_str(),
                ))
            });

            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Pretty | OutputFormat::Github => {
            if args.paths.is_empty() {
                let (count, file_has_error) =
                    lint_stdin_text(&engine, args.format, args.deny_warnings)?;
                total_diags += count;
                has_error |= file_has_error;
            } else {
                let files = collect_ruby_files(&args.paths)?;
                for path in files {
                    let (count, file_has_error) =
                        lint_file_text(&engine, &path, args.format, args.deny_warnings)?;
                    total_diags += count;
                    has_error |= file_has_error;
                }
            }
        }
    }

    if has_error || (args.deny_warnings && total_diags > 0) {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(Debug, Serialize)]
struct JsonDiagnostic {
    file: String,
    row: usize,
    column: usize,
    level: String,
    cop: String,
    message: String,
}

/// Handle --fix / --fix-dry-run: apply auto-corrections to files.
fn fix_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    if args.paths.is_empty() {
        anyhow::bail!("--fix requires file paths (stdin not supported)");
    }

    let (disabled, settings, style) = resolve_configuration(&args)?;
    let registry = CopRegistry::default_cops_filtered(style, &args.only, &args.skip, &disabled)?;
    let engine = CopEngine::new_with_settings(registry, settings);

    let files = collect_ruby_files(&args.paths)?;
    #[cfg(feature = "telemetry")]
    tracing::debug!(files = files.len(), "fixing files");

    let mut total_fixed = 0usize;
    let mut total_skipped = 0usize;
    let mut files_modified = 0usize;

    // Each pass reports one ordering offense per class, so re-lint until a
    // fixpoint is reached.
    const MAX_ITERATIONS: usize = 10;

    for path in &files {
        let original_source = std::fs::read_to_string(path)?;
        let mut current_source = original_source.clone();
        let mut file_fixes = 0usize;
        let mut iterations = 0usize;

        loop {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                eprintln!(
                    "Warning: Max fix iterations ({}) reached for {}",
                    MAX_ITERATIONS,
                    path.display()
                );
                break;
            }

            let diagnostics = engine.lint_source(&current_source)?;

            let fixable: Vec<_> = diagnostics
                .into_iter()
                .filter(|d| d.suggestion.is_some())
                .collect();

            if fixable.is_empty() {
                break;
            }

            let result = fix::apply_suggestions(&current_source, &fixable, args.unsafe_fixes)?;

            if result.fixes_applied == 0 {
                total_skipped += result.fixes_skipped;
                break;
            }

            file_fixes += result.fixes_applied;
            current_source = result.fixed_source;
        }

        if file_fixes > 0 {
            if args.fix_dry_run {
                let diff = fix::format_diff(&original_source, &current_source, path);
                if !diff.is_empty() {
                    println!("{}", diff);
                }
            } else {
                if !args.no_backup {
                    let backup_path = path.with_extension(format!(
                        "{}.bak",
                        path.extension().unwrap_or_default().to_string_lossy()
                    ));
                    std::fs::write(&backup_path, &original_source)?;
                }

                std::fs::write(path, &current_source)?;
                files_modified += 1;
            }
            total_fixed += file_fixes;
        }
    }

    if args.fix_dry_run {
        println!(
            "\n{} fix(es) would be applied to {} file(s)",
            total_fixed,
            files.len()
        );
    } else {
        println!(
            "Applied {} fix(es) to {} file(s)",
            total_fixed, files_modified
        );
    }
    if total_skipped > 0 {
        println!(
            "{} fix(es) skipped (use --unsafe-fixes to apply)",
            total_skipped
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn print_text_diagnostics(
    diagnostics: &[obsession::diagnostics::Diagnostic],
    file_label: &str,
    format: OutputFormat,
    deny_warnings: bool,
) -> bool {
    let mut has_error = false;

    for diag in diagnostics {
        let file = diag.file.clone().unwrap_or_else(|| file_label.to_string());

        match format {
            OutputFormat::Pretty => {
                println!(
                    "{}:{}:{}: {}: {}: {}",
                    file,
                    diag.span.start.row,
                    diag.span.start.column,
                    diag.level,
                    diag.cop.name,
                    diag.message
                );
                has_error |= diag.level == CopLevel::Error;
            }
            OutputFormat::Github => {
                let msg = github_escape(&diag.message);
                let kind = if diag.level == CopLevel::Error
                    || (deny_warnings && diag.level == CopLevel::Warn)
                {
                    "error"
                } else {
                    "warning"
                };

                println!(
                    "::{} file={},line={},col={},title={}::{}",
                    kind,
                    github_escape(&file),
                    diag.span.start.row,
                    diag.span.start.column,
                    diag.cop.name,
                    msg
                );
                has_error |= kind == "error";
            }
            OutputFormat::Json => unreachable!("json handled elsewhere"),
        }
    }

    has_error
}

fn lint_file_text(
    engine: &CopEngine,
    path: &Path,
    format: OutputFormat,
    deny_warnings: bool,
) -> anyhow::Result<(usize, bool)> {
    let source = std::fs::read_to_string(path)?;
    let diagnostics = engine.lint_source(&source)?;

    let label = path.display().to_string();
    let has_error = print_text_diagnostics(&diagnostics, &label, format, deny_warnings);

    if matches!(format, OutputFormat::Pretty) {
        println!("{} diagnostics for {}", diagnostics.len(), label);
    }

    Ok((diagnostics.len(), has_error))
}

fn lint_stdin_text(
    engine: &CopEngine,
    format: OutputFormat,
    deny_warnings: bool,
) -> anyhow::Result<(usize, bool)> {
    let mut source = String::new();
    std::io::stdin().read_to_string(&mut source)?;
    let diagnostics = engine.lint_source(&source)?;

    let has_error = print_text_diagnostics(&diagnostics, "stdin", format, deny_warnings);

    if matches!(format, OutputFormat::Pretty) {
        println!("{} diagnostics for stdin", diagnostics.len());
    }

    Ok((diagnostics.len(), has_error))
}

fn json_diagnostics(
    diagnostics: &[obsession::diagnostics::Diagnostic],
    file_label: &str,
) -> (bool, Vec<JsonDiagnostic>) {
    let mut has_error = false;

    let out = diagnostics
        .iter()
        .map(|d| {
            let file = d.file.clone().unwrap_or_else(|| file_label.to_string());
            has_error |= d.level == CopLevel::Error;
            JsonDiagnostic {
                file,
                row: d.span.start.row,
                column: d.span.start.column,
                level: d.level.to_string(),
                cop: d.cop.name.to_string(),
                message: d.message.clone(),
            }
        })
        .collect();

    (has_error, out)
}

fn lint_file_json(
    engine: &CopEngine,
    path: &Path,
) -> anyhow::Result<(usize, bool, Vec<JsonDiagnostic>)> {
    let source = std::fs::read_to_string(path)?;
    let diagnostics = engine.lint_source(&source)?;

    let (has_error, out) = json_diagnostics(&diagnostics, &path.display().to_string());
    Ok((diagnostics.len(), has_error, out))
}

fn lint_stdin_json(engine: &CopEngine) -> anyhow::Result<(usize, bool, Vec<JsonDiagnostic>)> {
    let mut source = String::new();
    std::io::stdin().read_to_string(&mut source)?;
    let diagnostics = engine.lint_source(&source)?;

    let (has_error, out) = json_diagnostics(&diagnostics, "stdin");
    Ok((diagnostics.len(), has_error, out))
}

fn github_escape(s: &str) -> String {
    s.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn collect_ruby_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        collect_from_path(path, &mut out)?;
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn collect_from_path(path: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)?;
    if meta.is_dir() {
        collect_from_dir(path, out)
    } else {
        out.push(path.to_path_buf());
        Ok(())
    }
}

fn collect_from_dir(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            collect_from_dir(&path, out)?;
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) == Some("rb") {
            out.push(path);
        }
    }

    Ok(())
}

fn should_skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };

    matches!(name, ".git" | "vendor" | "node_modules" | "tmp")
}

fn infer_start_dir(args: &LintArgs) -> anyhow::Result<PathBuf> {
    let base = if let Some(p) = args.paths.first() {
        p.clone()
    } else {
        std::env::current_dir()?
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}
