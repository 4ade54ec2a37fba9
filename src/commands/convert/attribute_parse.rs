use super::*;

/// Detects embedded file references on a single line: an HTML `src="..."`
/// attribute, a Markdown image `![](...)`, or a "found in" prefix.
pub struct PathSpotter {
    src_attr: Regex,
    markdown_image: Regex,
}

impl PathSpotter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            src_attr: Regex::new(r#"src="([^"]*)""#).context("invalid src attribute regex")?,
            markdown_image: Regex::new(r"!\[\]\(([^)]*)\)")
                .context("invalid markdown image regex")?,
        })
    }

    pub fn spot(&self, line: &str) -> Option<String> {
        if let Some(captures) = self.src_attr.captures(line) {
            return captures.get(1).map(|found| clean_path(found.as_str()));
        }

        if let Some(captures) = self.markdown_image.captures(line) {
            return captures.get(1).map(|found| clean_path(found.as_str()));
        }

        let trimmed = line.trim();
        let prefix_matches = trimmed
            .get(.."found in".len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("found in"));
        if prefix_matches {
            let rest = trimmed["found in".len()..]
                .trim_matches(|character: char| character.is_whitespace() || character == ':');
            return Some(clean_path(rest));
        }

        None
    }
}

fn clean_path(path: &str) -> String {
    strip_ends_any(path.trim(), &["file:", "/"]).to_string()
}

/// Picks the first unused key for `base`: base, base2, base3, ...
pub fn next_free_key(existing: &BTreeMap<String, String>, base: &str) -> String {
    if !existing.contains_key(base) {
        return base.to_string();
    }

    let mut suffix = 2usize;
    loop {
        let candidate = format!("{base}{suffix}");
        if !existing.contains_key(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Splits a plain-text block into residual narrative and recognized
/// key/value attributes. Never fails; no matches just means an empty map.
pub fn split_attributes(
    text: &str,
    rules: &ExtractionRules,
    spotter: &PathSpotter,
) -> (String, BTreeMap<String, String>) {
    let mut attributes = BTreeMap::new();
    let mut kept = Vec::<&str>::new();
    let mut paths = Vec::<String>::new();

    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((key, value)) = match_attribute_line(line, rules) {
            let slot = next_free_key(&attributes, &key);
            attributes.insert(slot, value);
            continue;
        }

        if let Some(path) = spotter.spot(line) {
            paths.push(path);
            continue;
        }

        kept.push(line);
    }

    for path in paths {
        let slot = next_free_key(&attributes, "path");
        attributes.insert(slot, path);
    }

    (kept.join("\n").trim().to_string(), attributes)
}

fn match_attribute_line(line: &str, rules: &ExtractionRules) -> Option<(String, String)> {
    // Separators are tried in priority order; the first one whose left side
    // is a recognized keyword wins. Lines with no recognized keyword stay in
    // the residual text even when they contain separators.
    for separator in &rules.separators {
        let Some((left, right)) = line.split_once(*separator) else {
            continue;
        };

        let key = left
            .trim_matches(|character: char| {
                character.is_whitespace()
                    || character.is_ascii_punctuation()
                    || rules.separators.contains(&character)
            })
            .to_lowercase();
        if key.is_empty() {
            continue;
        }

        if rules
            .keywords
            .iter()
            .any(|keyword| keyword.to_lowercase() == key)
        {
            let value = right
                .trim_matches(|character: char| {
                    character.is_whitespace() || rules.separators.contains(&character)
                })
                .to_string();
            return Some((key, value));
        }
    }

    None
}
