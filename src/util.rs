use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write json file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize json file: {}", path.display()))?;

    Ok(())
}

/// Removes every leading and trailing occurrence of `target`, greedily.
pub fn strip_ends_exact<'a>(text: &'a str, target: &str) -> &'a str {
    if target.is_empty() {
        return text;
    }

    let mut current = text;
    loop {
        let mut changed = false;
        if let Some(rest) = current.strip_prefix(target) {
            current = rest;
            changed = true;
        }
        if let Some(rest) = current.strip_suffix(target) {
            current = rest;
            changed = true;
        }
        if !changed {
            return current;
        }
    }
}

/// Greedy edge strip over a set of targets, applied until a fixpoint.
pub fn strip_ends_any<'a>(text: &'a str, targets: &[&str]) -> &'a str {
    let mut current = text;
    loop {
        let previous = current;
        for target in targets {
            current = strip_ends_exact(current, target);
        }
        if current == previous {
            return current;
        }
    }
}
