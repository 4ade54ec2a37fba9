use super::*;

/// One record boundary: fragments span from `start` to the matching `end`
/// marker. Patterns are data so extraction rules stay user-editable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryPattern {
    pub name: String,
    pub start: String,
    pub end: String,
    #[serde(default = "default_multi_line")]
    pub multi_line: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRules {
    #[serde(default = "default_boundaries")]
    pub boundaries: Vec<BoundaryPattern>,
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_separators")]
    pub separators: Vec<char>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            boundaries: default_boundaries(),
            keywords: default_keywords(),
            separators: default_separators(),
        }
    }
}

fn default_multi_line() -> bool {
    true
}

fn default_boundaries() -> Vec<BoundaryPattern> {
    vec![BoundaryPattern {
        name: "placemark".to_string(),
        start: "<Placemark>".to_string(),
        end: "</Placemark>".to_string(),
        multi_line: true,
    }]
}

fn default_keywords() -> Vec<String> {
    [
        "date",
        "scale",
        "library number",
        "quality",
        "run number",
        "ref",
        "other",
        "alt name",
        "opened",
        "status dec 1944",
        "current use",
        "remarks",
    ]
    .iter()
    .map(|keyword| keyword.to_string())
    .collect()
}

fn default_separators() -> Vec<char> {
    vec![':', '=']
}

/// Loads the rule file when given, then appends CLI-supplied boundaries and
/// keywords. CLI boundaries are written as `START..END`.
pub fn build_rules(
    rules_path: Option<&Path>,
    extra_boundaries: &[String],
    extra_keywords: &[String],
) -> Result<ExtractionRules> {
    let mut rules = match rules_path {
        Some(path) => {
            let raw = fs::read(path)
                .with_context(|| format!("failed to read rules file: {}", path.display()))?;
            serde_json::from_slice::<ExtractionRules>(&raw)
                .with_context(|| format!("failed to parse rules file: {}", path.display()))?
        }
        None => ExtractionRules::default(),
    };

    for (index, spec) in extra_boundaries.iter().enumerate() {
        let Some((start, end)) = spec.split_once("..") else {
            bail!("boundary {spec:?} is not of the form START..END");
        };
        if start.is_empty() || end.is_empty() {
            bail!("boundary {spec:?} has an empty marker");
        }
        rules.boundaries.push(BoundaryPattern {
            name: format!("cli-{}", index + 1),
            start: start.to_string(),
            end: end.to_string(),
            multi_line: true,
        });
    }

    for keyword in extra_keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !rules.keywords.contains(&keyword) {
            rules.keywords.push(keyword);
        }
    }

    if rules.boundaries.is_empty() {
        bail!("extraction rules contain no boundary patterns");
    }
    if rules.separators.is_empty() {
        bail!("extraction rules contain no key/value separators");
    }

    Ok(rules)
}
