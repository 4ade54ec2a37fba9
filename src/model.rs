use std::collections::BTreeMap;

use serde::Serialize;

/// One normalized placemark. Built by the record extractor; only the style
/// resolver touches it afterwards, to attach the resolved icon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub style_ref: Option<String>,
    pub icon: Option<ResolvedIcon>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIcon {
    pub path: String,
    pub remote: bool,
}

/// A fragment the extractor could not turn into a record. Carries whatever
/// fields were bound before the failure so the operator can triage it.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub ordinal: usize,
    pub fragment: String,
    pub partial_name: Option<String>,
    pub partial_coordinates: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertPaths {
    pub output_dir: Option<String>,
    pub manifest_path: String,
    pub icon_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConvertCounts {
    pub documents: usize,
    pub fragments_seen: usize,
    pub records_extracted: usize,
    pub extraction_failures: usize,
    pub styles_decoded: usize,
    pub style_maps_decoded: usize,
    pub icons_resolved: usize,
    pub icons_remote: usize,
    pub icons_localized: usize,
    pub attribute_keys_distinct: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub input: String,
    pub output: String,
    pub fragments_seen: usize,
    pub records_extracted: usize,
    pub extraction_failures: usize,
    pub styles_decoded: usize,
    pub style_maps_decoded: usize,
    pub icons_resolved: usize,
    pub icons_remote: usize,
    pub failures: Vec<ExtractionFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub paths: ConvertPaths,
    pub counts: ConvertCounts,
    pub documents: Vec<DocumentSummary>,
    pub warnings: Vec<String>,
}
