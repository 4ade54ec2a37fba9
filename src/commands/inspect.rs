use std::collections::BTreeSet;
use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::InspectArgs;
use crate::commands::convert::{ConvertContext, build_rules, decode_styles, extract_records};

/// Pre-flight summary for one document: fragment and field counts without
/// writing any output.
pub fn run(args: InspectArgs) -> Result<()> {
    let raw = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let document = String::from_utf8_lossy(&raw);

    let rules = build_rules(args.rules_path.as_deref(), &args.boundaries, &args.keywords)?;
    let context = ConvertContext::new(rules)?;

    let mut progress = |_: usize, _: usize| {};
    let extraction = extract_records(&context, &document, &mut progress);
    let tables = decode_styles(&context, &document);

    let mut keys = BTreeSet::new();
    for record in &extraction.records {
        keys.extend(record.attributes.keys().cloned());
    }

    info!(
        input = %args.input.display(),
        lines = document.lines().count(),
        fragments = extraction.fragments_seen,
        records = extraction.records.len(),
        failures = extraction.failures.len(),
        styles = tables.styles.len(),
        style_maps = tables.style_maps.len(),
        "document inspected"
    );

    if !keys.is_empty() {
        let fields = keys.into_iter().collect::<Vec<String>>().join(", ");
        info!(fields = %fields, "attribute keys found");
    }

    for failure in &extraction.failures {
        warn!(
            ordinal = failure.ordinal,
            name = %failure.partial_name.clone().unwrap_or_default(),
            reason = %failure.reason,
            "fragment failed extraction"
        );
    }

    Ok(())
}
