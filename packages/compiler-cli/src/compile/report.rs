use super::parallel::FileOutcome;
use webforms_compiler::builder::SubBuilder;
use webforms_compiler::ControlBuilder;

/// Builders below `builder`, not counting itself
pub fn count_controls(builder: &ControlBuilder) -> usize {
    builder
        .sub_builders
        .iter()
        .map(|s| match s {
            SubBuilder::Builder(b) => 1 + count_controls(b),
            SubBuilder::Literal(_) => 0,
        })
        .sum()
}

/// One line per error: `path: location: message (code)`
pub fn format_diagnostics(outcomes: &[FileOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        for error in &outcome.errors {
            if error.location.is_some() {
                out.push_str(&format!("error: {}\n", error));
            } else {
                out.push_str(&format!("error: {}: {}\n", outcome.virtual_path, error));
            }
        }
    }
    out
}

/// One line per parsed file
pub fn format_summary(outcomes: &[FileOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        if let Some(doc) = &outcome.document {
            out.push_str(&format!(
                "{}: {:?} {}, {} builders, {} dependencies\n",
                outcome.virtual_path,
                doc.kind,
                doc.base_type,
                count_controls(&doc.root),
                doc.source_dependencies.len()
            ));
        }
    }
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    out.push_str(&format!("{} parsed, {} failed\n", outcomes.len() - failed, failed));
    out
}
