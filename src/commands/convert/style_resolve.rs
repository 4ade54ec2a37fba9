use super::*;

pub(super) struct StyleRegexes {
    style_block: Regex,
    icon_href: Regex,
    style_map_block: Regex,
    pair_block: Regex,
    pair_key: Regex,
    pair_url: Regex,
}

impl StyleRegexes {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            style_block: Regex::new(r#"(?s)<Style\b[^>]*\bid="([^"]+)"[^>]*>(.*?)</Style>"#)
                .context("invalid style block regex")?,
            icon_href: Regex::new(r"(?s)<href>(.*?)</href>").context("invalid href regex")?,
            style_map_block: Regex::new(
                r#"(?s)<StyleMap\b[^>]*\bid="([^"]+)"[^>]*>(.*?)</StyleMap>"#,
            )
            .context("invalid style-map block regex")?,
            pair_block: Regex::new(r"(?s)<Pair>(.*?)</Pair>").context("invalid pair regex")?,
            pair_key: Regex::new(r"(?s)<key>(.*?)</key>").context("invalid pair key regex")?,
            pair_url: Regex::new(r"(?s)<styleUrl>(.*?)</styleUrl>")
                .context("invalid pair styleUrl regex")?,
        })
    }
}

/// Decoded style definitions for one document. Identifiers are stored with
/// the leading `#` indirection marker stripped.
#[derive(Debug, Default)]
pub struct StyleTables {
    pub styles: HashMap<String, String>,
    pub style_maps: HashMap<String, HashMap<String, String>>,
}

pub fn decode_styles(context: &ConvertContext, document: &str) -> StyleTables {
    let regexes = &context.styles;
    let mut tables = StyleTables::default();

    for captures in regexes.style_block.captures_iter(document) {
        let (Some(id), Some(body)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let id = id.as_str().trim().trim_start_matches('#');
        let href = regexes
            .icon_href
            .captures(body.as_str())
            .and_then(|found| found.get(1))
            .map(|found| found.as_str().trim())
            .unwrap_or("");
        if !id.is_empty() && !href.is_empty() {
            tables.styles.insert(id.to_string(), href.to_string());
        }
    }

    for captures in regexes.style_map_block.captures_iter(document) {
        let (Some(id), Some(body)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let id = id.as_str().trim().trim_start_matches('#');

        let mut variants = HashMap::new();
        for pair in regexes.pair_block.captures_iter(body.as_str()) {
            let Some(pair_body) = pair.get(1) else {
                continue;
            };
            let key = regexes
                .pair_key
                .captures(pair_body.as_str())
                .and_then(|found| found.get(1))
                .map(|found| found.as_str().trim())
                .unwrap_or("");
            let target = regexes
                .pair_url
                .captures(pair_body.as_str())
                .and_then(|found| found.get(1))
                .map(|found| found.as_str().trim().trim_start_matches('#'))
                .unwrap_or("");
            if !key.is_empty() && !target.is_empty() {
                variants.insert(key.to_string(), target.to_string());
            }
        }

        if !id.is_empty() && !variants.is_empty() {
            tables.style_maps.insert(id.to_string(), variants);
        }
    }

    tables
}

/// Resolves a record's style reference to an icon path: styles first, then
/// one hop through a style map's requested variant. A variant pointing at
/// another style map is not chased; an unknown identifier yields no icon.
pub fn resolve_icon(tables: &StyleTables, reference: &str, variant: &str) -> Option<ResolvedIcon> {
    let id = reference.trim().trim_start_matches('#');

    let path = tables.styles.get(id).cloned().or_else(|| {
        tables
            .style_maps
            .get(id)
            .and_then(|variants| variants.get(variant))
            .and_then(|target| tables.styles.get(target.trim_start_matches('#')))
            .cloned()
    })?;

    let remote = path.starts_with("http://") || path.starts_with("https://");
    Some(ResolvedIcon { path, remote })
}

/// Post-pass over extracted records: resolves each style reference and
/// mirrors the icon path into the `icon` attribute.
pub fn apply_styles(records: &mut [PointRecord], tables: &StyleTables, variant: &str) -> usize {
    let mut resolved = 0usize;

    for record in records.iter_mut() {
        let Some(reference) = record.style_ref.as_deref() else {
            continue;
        };
        if let Some(icon) = resolve_icon(tables, reference, variant) {
            record
                .attributes
                .insert("icon".to_string(), icon.path.clone());
            record.icon = Some(icon);
            resolved += 1;
        }
    }

    resolved
}

/// Fetches a remote icon to a local file. The HTTP implementation lives
/// behind this seam so localization stays testable offline.
pub trait IconFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

pub struct HttpIconFetcher {
    client: reqwest::blocking::Client,
}

impl HttpIconFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build icon fetch client")?;
        Ok(Self { client })
    }
}

impl IconFetcher for HttpIconFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch icon {url}"))?
            .error_for_status()
            .with_context(|| format!("icon fetch rejected for {url}"))?;
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to read icon body for {url}"))?;
        fs::write(destination, &bytes)
            .with_context(|| format!("failed to write icon file {}", destination.display()))
    }
}

/// Downloads each distinct remote icon once, sequentially, rewriting records
/// to point at the local copy. Existing destination files are reused; fetch
/// failures become warnings and leave the remote path in place.
pub fn localize_icons(
    records: &mut [PointRecord],
    icon_dir: &Path,
    fetcher: &dyn IconFetcher,
    warnings: &mut Vec<String>,
) -> Result<usize> {
    ensure_directory(icon_dir)?;

    let mut local_by_url = HashMap::<String, String>::new();
    let mut fetched = 0usize;

    for record in records.iter_mut() {
        let Some(icon) = record.icon.as_ref() else {
            continue;
        };
        if !icon.remote {
            continue;
        }
        let url = icon.path.clone();

        let local = match local_by_url.get(&url) {
            Some(existing) => existing.clone(),
            None => {
                let destination = icon_dir.join(icon_file_name(&url));
                if !destination.exists() {
                    if let Err(err) = fetcher.fetch(&url, &destination) {
                        warnings.push(format!("icon fetch failed for {url}: {err:#}"));
                        continue;
                    }
                    fetched += 1;
                }
                let local = destination.to_string_lossy().into_owned();
                local_by_url.insert(url.clone(), local.clone());
                local
            }
        };

        record.attributes.insert("icon".to_string(), local.clone());
        record.icon = Some(ResolvedIcon {
            path: local,
            remote: false,
        });
    }

    Ok(fetched)
}

/// Unique-per-URL local file name: the sanitized URL minus its scheme.
fn icon_file_name(url: &str) -> String {
    let stripped = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let sanitized = stripped
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '.' | '-' | '_') {
                character
            } else {
                '_'
            }
        })
        .collect::<String>();

    if sanitized.is_empty() {
        "icon".to_string()
    } else {
        sanitized
    }
}
