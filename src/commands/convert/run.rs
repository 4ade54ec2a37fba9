use super::*;

struct DocumentOutcome {
    input: PathBuf,
    output: PathBuf,
    records: Vec<PointRecord>,
    failures: Vec<ExtractionFailure>,
    fragments_seen: usize,
    styles_decoded: usize,
    style_maps_decoded: usize,
    icons_resolved: usize,
    icons_remote: usize,
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let rules = build_rules(args.rules_path.as_deref(), &args.boundaries, &args.keywords)?;
    let context = ConvertContext::new(rules)?;

    if let Some(output_dir) = &args.output_dir {
        ensure_directory(output_dir)?;
    }

    info!(run_id = %run_id, documents = args.inputs.len(), "starting convert");

    // One worker per document; no state is shared until the join here.
    let mut outcomes = args
        .inputs
        .par_iter()
        .map(|input| {
            convert_document(
                input,
                args.output_dir.as_deref(),
                &context,
                &args.style_variant,
            )
        })
        .collect::<Result<Vec<DocumentOutcome>>>()?;

    let mut warnings = Vec::new();
    let mut icons_localized = 0usize;
    if args.localize_icons {
        let fetcher = HttpIconFetcher::new()?;
        for outcome in &mut outcomes {
            icons_localized +=
                localize_icons(&mut outcome.records, &args.icon_dir, &fetcher, &mut warnings)?;
        }
    }

    let mut counts = ConvertCounts {
        documents: outcomes.len(),
        icons_localized,
        ..ConvertCounts::default()
    };
    let mut key_union = BTreeSet::new();
    let mut documents = Vec::with_capacity(outcomes.len());

    for outcome in &outcomes {
        let rows = assemble_rows(&outcome.records);
        write_csv(&outcome.output, &rows)?;

        counts.fragments_seen += outcome.fragments_seen;
        counts.records_extracted += outcome.records.len();
        counts.extraction_failures += outcome.failures.len();
        counts.styles_decoded += outcome.styles_decoded;
        counts.style_maps_decoded += outcome.style_maps_decoded;
        counts.icons_resolved += outcome.icons_resolved;
        counts.icons_remote += outcome.icons_remote;
        for record in &outcome.records {
            key_union.extend(record.attributes.keys().cloned());
        }

        info!(
            input = %outcome.input.display(),
            output = %outcome.output.display(),
            fragments = outcome.fragments_seen,
            records = outcome.records.len(),
            failures = outcome.failures.len(),
            "document converted"
        );

        documents.push(DocumentSummary {
            input: outcome.input.display().to_string(),
            output: outcome.output.display().to_string(),
            fragments_seen: outcome.fragments_seen,
            records_extracted: outcome.records.len(),
            extraction_failures: outcome.failures.len(),
            styles_decoded: outcome.styles_decoded,
            style_maps_decoded: outcome.style_maps_decoded,
            icons_resolved: outcome.icons_resolved,
            icons_remote: outcome.icons_remote,
            failures: outcome.failures.clone(),
        });
    }
    counts.attribute_keys_distinct = key_union.len();

    for warning in &warnings {
        warn!(warning = %warning, "convert warning");
    }

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        let manifest_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        manifest_dir.join(format!(
            "kmlsift_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });

    let manifest = ConvertRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: "convert".to_string(),
        paths: ConvertPaths {
            output_dir: args
                .output_dir
                .as_ref()
                .map(|dir| dir.display().to_string()),
            manifest_path: manifest_path.display().to_string(),
            icon_dir: args
                .localize_icons
                .then(|| args.icon_dir.display().to_string()),
        },
        counts: counts.clone(),
        documents,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        run_id = %run_id,
        records = counts.records_extracted,
        failures = counts.extraction_failures,
        manifest = %manifest_path.display(),
        "convert finished"
    );

    Ok(())
}

fn convert_document(
    input: &Path,
    output_dir: Option<&Path>,
    context: &ConvertContext,
    style_variant: &str,
) -> Result<DocumentOutcome> {
    let raw = fs::read(input).with_context(|| format!("failed to read {}", input.display()))?;
    // Undecodable bytes degrade to replacement characters, never a failure.
    let document = String::from_utf8_lossy(&raw);

    let input_label = input.display().to_string();
    let mut progress = |processed: usize, total: usize| {
        info!(input = %input_label, processed, total, "extraction progress");
    };
    let mut extraction = extract_records(context, &document, &mut progress);

    let tables = decode_styles(context, &document);
    let icons_resolved = apply_styles(&mut extraction.records, &tables, style_variant);
    let icons_remote = extraction
        .records
        .iter()
        .filter(|record| record.icon.as_ref().is_some_and(|icon| icon.remote))
        .count();

    Ok(DocumentOutcome {
        input: input.to_path_buf(),
        output: output_path(input, output_dir),
        records: extraction.records,
        failures: extraction.failures,
        fragments_seen: extraction.fragments_seen,
        styles_decoded: tables.styles.len(),
        style_maps_decoded: tables.style_maps.len(),
        icons_resolved,
        icons_remote,
    })
}

fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => {
            let stem = input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            dir.join(format!("{stem}.csv"))
        }
        None => input.with_extension("csv"),
    }
}
