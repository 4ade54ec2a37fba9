use super::*;

/// Compiled regexes plus rules for one conversion run. Each document worker
/// borrows the context read-only; nothing here mutates during extraction.
pub struct ConvertContext {
    pub rules: ExtractionRules,
    pub(super) boundary_regexes: Vec<Regex>,
    pub(super) fields: FieldRegexes,
    pub(super) normalizer: TextNormalizer,
    pub(super) spotter: PathSpotter,
    pub(super) styles: StyleRegexes,
}

impl ConvertContext {
    pub fn new(rules: ExtractionRules) -> Result<Self> {
        let boundary_regexes = rules
            .boundaries
            .iter()
            .map(boundary_regex)
            .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            rules,
            boundary_regexes,
            fields: FieldRegexes::new()?,
            normalizer: TextNormalizer::new()?,
            spotter: PathSpotter::new()?,
            styles: StyleRegexes::new()?,
        })
    }
}

pub(super) struct FieldRegexes {
    name: Regex,
    coordinates: Regex,
    description: Regex,
    style_url: Regex,
}

impl FieldRegexes {
    fn new() -> Result<Self> {
        Ok(Self {
            name: Regex::new(r"(?s)<name>(.*?)</name>").context("invalid name regex")?,
            coordinates: Regex::new(r"(?s)<coordinates>(.*?)</coordinates>")
                .context("invalid coordinates regex")?,
            description: Regex::new(r"(?s)<description>(.*?)</description>")
                .context("invalid description regex")?,
            style_url: Regex::new(r"(?s)<styleUrl>(.*?)</styleUrl>")
                .context("invalid styleUrl regex")?,
        })
    }
}

fn boundary_regex(pattern: &BoundaryPattern) -> Result<Regex> {
    let middle = if pattern.multi_line { "(?s:.*?)" } else { ".*?" };
    let body = format!(
        "{}{}{}",
        regex::escape(&pattern.start),
        middle,
        regex::escape(&pattern.end)
    );
    Regex::new(&body)
        .with_context(|| format!("invalid boundary pattern {:?}", pattern.name))
}

/// All non-overlapping fragments, pattern order first, then match order.
pub fn collect_fragments<'a>(context: &ConvertContext, document: &'a str) -> Vec<&'a str> {
    let mut fragments = Vec::new();
    for regex in &context.boundary_regexes {
        for found in regex.find_iter(document) {
            fragments.push(found.as_str());
        }
    }
    fragments
}

#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub fragments_seen: usize,
    pub records: Vec<PointRecord>,
    pub failures: Vec<ExtractionFailure>,
}

/// Runs the per-fragment pipeline over one document. A fragment that cannot
/// bind its required fields becomes a failure entry; the batch never aborts.
pub fn extract_records(
    context: &ConvertContext,
    document: &str,
    progress: &mut dyn FnMut(usize, usize),
) -> ExtractionOutcome {
    let fragments = collect_fragments(context, document);
    let total = fragments.len();
    let mut outcome = ExtractionOutcome {
        fragments_seen: total,
        ..ExtractionOutcome::default()
    };

    for (ordinal, fragment) in fragments.iter().enumerate() {
        match extract_one(context, ordinal, fragment) {
            Ok(record) => outcome.records.push(record),
            Err(failure) => outcome.failures.push(failure),
        }

        if (ordinal + 1) % PROGRESS_BATCH == 0 {
            progress(ordinal + 1, total);
        }
    }

    outcome
}

fn tag_capture<'a>(regex: &Regex, fragment: &'a str) -> Option<&'a str> {
    regex
        .captures(fragment)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
}

fn extract_one(
    context: &ConvertContext,
    ordinal: usize,
    fragment: &str,
) -> Result<PointRecord, ExtractionFailure> {
    let failure = |reason: String, name: Option<String>, coordinates: Option<String>| {
        ExtractionFailure {
            ordinal,
            fragment: fragment.to_string(),
            partial_name: name,
            partial_coordinates: coordinates,
            reason,
        }
    };

    let Some(name) = tag_capture(&context.fields.name, fragment) else {
        return Err(failure("missing <name> tag".to_string(), None, None));
    };
    let name = name.trim().to_string();

    let Some(token) = tag_capture(&context.fields.coordinates, fragment) else {
        return Err(failure(
            "missing <coordinates> tag".to_string(),
            Some(name),
            None,
        ));
    };
    let token = token.trim();

    let (longitude, latitude) = match parse_coordinates(token) {
        Ok(pair) => pair,
        Err(err) => {
            return Err(failure(
                format!("{err:#}"),
                Some(name),
                Some(token.to_string()),
            ));
        }
    };

    let description = tag_capture(&context.fields.description, fragment).unwrap_or("");
    let plain = context.normalizer.normalize(description);
    let (text, attributes) = split_attributes(&plain, &context.rules, &context.spotter);

    let style_ref = tag_capture(&context.fields.style_url, fragment)
        .map(str::trim)
        .filter(|reference| !reference.is_empty())
        .map(|reference| reference.to_string());

    Ok(PointRecord {
        name,
        longitude,
        latitude,
        text,
        attributes,
        style_ref,
        icon: None,
    })
}
