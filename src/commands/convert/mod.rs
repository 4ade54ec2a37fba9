use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cli::ConvertArgs;
use crate::model::{
    ConvertCounts, ConvertPaths, ConvertRunManifest, DocumentSummary, ExtractionFailure,
    PointRecord, ResolvedIcon,
};
use crate::util::{
    ensure_directory, now_utc_string, strip_ends_any, utc_compact_string, write_json_pretty,
};

const PROGRESS_BATCH: usize = 250;

mod attribute_parse;
mod coordinate_parse;
mod csv_output;
mod description_normalize;
mod fragment_extract;
mod row_assembly;
mod rules;
mod run;
mod style_resolve;
#[cfg(test)]
mod tests;

pub use fragment_extract::{ConvertContext, extract_records};
pub use rules::build_rules;
pub use run::run;
pub use style_resolve::decode_styles;

use attribute_parse::*;
use coordinate_parse::*;
use csv_output::*;
use description_normalize::*;
use fragment_extract::*;
use row_assembly::*;
use rules::*;
use style_resolve::*;
