use super::*;

/// Decodes CDATA-wrapped description payloads into plain text. Anything not
/// CDATA-wrapped passes through untouched apart from edge trimming.
pub struct TextNormalizer {
    break_tag: Regex,
    any_tag: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            break_tag: Regex::new(r"(?i)<\s*(?:br\s*/?|/?p\b[^>]*)\s*>")
                .context("invalid line-break tag regex")?,
            any_tag: Regex::new(r"<[^>]+>").context("invalid markup tag regex")?,
        })
    }

    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let Some(inner) = trimmed
            .strip_prefix("<![CDATA[")
            .and_then(|rest| rest.strip_suffix("]]>"))
        else {
            return trimmed.to_string();
        };

        // Literal newlines become break tags first so the markup pass keeps
        // line boundaries; output lines are never re-wrapped.
        let with_breaks = inner.replace('\n', "<br>");
        let with_breaks = self.break_tag.replace_all(&with_breaks, "\n");
        let stripped = self.any_tag.replace_all(&with_breaks, "");
        let decoded = decode_entities(&stripped);

        unescape_backslashes(&decoded).trim().to_string()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Drops each backslash and copies the following character literally.
fn unescape_backslashes(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut escaped = false;

    for character in text.chars() {
        if escaped {
            output.push(character);
            escaped = false;
        } else if character == '\\' {
            escaped = true;
        } else {
            output.push(character);
        }
    }

    output
}
