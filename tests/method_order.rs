use obsession::cop::{CopRegistry, CopSettings};
use obsession::cops::OrderStyle;
use obsession::fix::apply_suggestions;
use obsession::level::CopLevel;
use obsession::{CopEngine, create_default_engine};
use std::collections::HashMap;

fn engine_with_style(style: OrderStyle) -> CopEngine {
    CopEngine::new(CopRegistry::default_cops(style))
}

fn fix_to_fixpoint(engine: &CopEngine, src: &str) -> String {
    let mut current = src.to_string();
    for _ in 0..10 {
        let diagnostics = engine.lint_source(&current).expect("lint should succeed");
        if diagnostics.is_empty() {
            break;
        }
        let outcome = apply_suggestions(&current, &diagnostics, false).expect("fix should apply");
        if outcome.fixed_source == current {
            break;
        }
        current = outcome.fixed_source;
    }
    current
}

#[test]
fn default_engine_reports_out_of_order_method() {
    let engine = create_default_engine();
    let src = include_str!("fixtures/method_order/out_of_order.rb");

    let diagnostics = engine.lint_source(src).expect("lint should succeed");
    assert_eq!(diagnostics.len(), 1);

    let diag = &diagnostics[0];
    assert_eq!(diag.cop.name, "method_order");
    assert_eq!(diag.level, CopLevel::Warn);
    assert_eq!(
        diag.message,
        "Method `build_header` should appear below `private`."
    );
    // The span points at the offending definition.
    assert_eq!(diag.span.start.row, 13);
    assert_eq!(diag.span.start.column, 3);
}

#[test]
fn default_engine_accepts_ordered_class() {
    let engine = create_default_engine();
    let src = "\
class Report
  def perform
    build_header
    build_body
  end

  private

  def build_header
    true
  end

  def build_body
    true
  end
end
";
    let diagnostics = engine.lint_source(src).expect("lint should succeed");
    assert!(diagnostics.is_empty());
}

#[test]
fn style_changes_the_expected_order() {
    let src = include_str!("fixtures/method_order/shared_callee.rb");

    let depth_first = engine_with_style(OrderStyle::DepthFirst)
        .lint_source(src)
        .expect("lint should succeed");
    assert!(depth_first.is_empty());

    let step_down = engine_with_style(OrderStyle::StepDown)
        .lint_source(src)
        .expect("lint should succeed");
    assert_eq!(step_down.len(), 1);
    assert_eq!(
        step_down[0].message,
        "Method `load_orders` should appear below `load_users`."
    );
}

#[test]
fn repeated_fixes_reach_a_clean_fixpoint() {
    let engine = create_default_engine();
    let src = "\
class Importer
  def perform
    fetch
    parse
    persist
  end

  private

  def persist
    true
  end

  def fetch
    true
  end

  def parse
    true
  end
end
";
    let fixed = fix_to_fixpoint(&engine, src);
    let expected = "\
class Importer
  def perform
    fetch
    parse
    persist
  end

  private

  def fetch
    true
  end

  def parse
    true
  end

  def persist
    true
  end
end
";
    assert_eq!(fixed, expected);
    assert!(
        engine
            .lint_source(&fixed)
            .expect("lint should succeed")
            .is_empty()
    );
    assert_eq!(fix_to_fixpoint(&engine, &fixed), fixed);
}

#[test]
fn each_class_in_a_file_is_checked_independently() {
    let engine = create_default_engine();
    let src = "\
class First
  def perform
    step_a
    step_b
  end

  private

  def step_b; end

  def step_a; end
end

class Second
  def perform
    part_one
    part_two
  end

  private

  def part_two; end

  def part_one; end
end
";
    let diagnostics = engine.lint_source(src).expect("lint should succeed");
    let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Method `step_a` should appear below `private`.",
            "Method `part_one` should appear below `private`.",
        ]
    );
}

#[test]
fn skip_filter_removes_the_cop() {
    let registry = CopRegistry::default_cops_filtered(
        OrderStyle::default(),
        &[],
        &["method_order".to_string()],
        &[],
    )
    .expect("registry should build");
    let engine = CopEngine::new(registry);

    let src = include_str!("fixtures/method_order/out_of_order.rb");
    assert!(
        engine
            .lint_source(src)
            .expect("lint should succeed")
            .is_empty()
    );
}

#[test]
fn unknown_cop_names_are_rejected() {
    let err = CopRegistry::default_cops_filtered(
        OrderStyle::default(),
        &["no_such_cop".to_string()],
        &[],
        &[],
    )
    .err()
    .expect("unknown cop name should be rejected");
    assert!(err.to_string().contains("unknown cop"));
}

#[test]
fn configured_level_promotes_diagnostics_to_error() {
    let mut levels = HashMap::new();
    levels.insert("method_order".to_string(), CopLevel::Error);
    let settings = CopSettings::default().with_config_levels(levels);

    let engine =
        CopEngine::new_with_settings(CopRegistry::default_cops(OrderStyle::default()), settings);

    let src = include_str!("fixtures/method_order/out_of_order.rb");
    let diagnostics = engine.lint_source(src).expect("lint should succeed");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].level, CopLevel::Error);
}

#[test]
fn allow_level_silences_the_cop() {
    let settings = CopSettings::default().disable(["method_order".to_string()]);
    let engine =
        CopEngine::new_with_settings(CopRegistry::default_cops(OrderStyle::default()), settings);

    let src = include_str!("fixtures/method_order/out_of_order.rb");
    assert!(
        engine
            .lint_source(src)
            .expect("lint should succeed")
            .is_empty()
    );
}
