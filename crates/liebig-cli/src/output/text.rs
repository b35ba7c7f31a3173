use liebig_core::recommend::RecommendationStatus;
use liebig_core::report::{CoefficientRow, LevelStatus, Report};
use liebig_core::trace::TraceSeverity;
use liebig_core::variability::CoefficientSource;

pub fn print_report(report: &Report, show_trace: bool) {
    println!("=== Plot {} ({}) ===\n", report.plot_id, report.crop);
    println!(
        "  Sample: {} ({} of {} record(s), catalog v{})\n",
        report.representative,
        policy_label(report),
        report.record_ids.len(),
        report.catalog_version
    );

    let max_name = report
        .comparison
        .iter()
        .map(|r| r.nutrient.chars().count() + r.symbol.len() + 3)
        .max()
        .unwrap_or(12);

    println!(
        "  {:<width$}  {:>10}  {:>10}  {:<10}  {:>9}",
        "Nutrient",
        "Current",
        "Ideal",
        "Status",
        "Suff. %",
        width = max_name
    );
    for row in &report.comparison {
        let label = format!("{} ({})", row.nutrient, row.symbol);
        let sufficiency = report
            .sweep
            .iter()
            .find(|s| s.symbol == row.symbol)
            .map(|s| {
                let marker = if s.limiting { " *" } else { "" };
                format!("{}{}", s.sufficiency, marker)
            })
            .unwrap_or_default();
        let status = match row.status {
            LevelStatus::Deficient => "deficient",
            LevelStatus::Optimal => "optimal",
            LevelStatus::Excess => "excess",
        };
        println!(
            "  {:<width$}  {:>10}  {:>10}  {:<10}  {:>9}",
            label,
            row.current.to_string(),
            row.ideal.to_string(),
            status,
            sufficiency,
            width = max_name
        );
    }
    println!();

    let rec = &report.recommendation;
    let status = match rec.status {
        RecommendationStatus::Application => "apply",
        RecommendationStatus::NoApplication => "no application",
        RecommendationStatus::Infeasible => "INFEASIBLE",
    };
    println!("  Recommendation: {status}");
    for line in &rec.narrative {
        println!("    {line}");
    }
    println!();

    if show_trace {
        println!("  Trace:");
        for step in &report.trace.steps {
            println!("    [{}] {}", severity_tag(step.severity), step.message);
        }
        println!();
    }

    let warnings: Vec<String> = report
        .trace
        .warnings
        .iter()
        .map(|w| w.message.clone())
        .collect();
    print_warnings(&warnings);
}

pub fn print_coefficients(rows: &[CoefficientRow]) {
    let max_name = rows
        .iter()
        .map(|r| r.nutrient.chars().count())
        .max()
        .unwrap_or(10);

    for row in rows {
        let source = match row.source {
            CoefficientSource::History { samples } => format!("history, {samples} readings"),
            CoefficientSource::Literature { samples } => {
                format!("literature default, {samples} readings")
            }
            CoefficientSource::Fallback => "fallback".to_string(),
            CoefficientSource::Override => "override".to_string(),
        };
        let pad = max_name - row.nutrient.chars().count();
        println!(
            "  {:<4} {}{}  {:>5}  ({})",
            row.symbol,
            row.nutrient,
            " ".repeat(pad),
            row.value.to_string(),
            source
        );
    }
}

pub fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("\nWarnings:");
    for w in warnings {
        println!("  - {}", w);
    }
}

fn policy_label(report: &Report) -> &'static str {
    match report.policy {
        liebig_core::SamplePolicy::First => "first",
        liebig_core::SamplePolicy::MostRecent => "most recent",
        liebig_core::SamplePolicy::Average => "average",
    }
}

fn severity_tag(severity: TraceSeverity) -> &'static str {
    match severity {
        TraceSeverity::Critical => "!!",
        TraceSeverity::Important => "! ",
        TraceSeverity::Info => "  ",
    }
}
