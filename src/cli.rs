use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "kmlsift",
    version,
    about = "Placemark extraction from KML exports into flat CSV tables"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Convert(ConvertArgs),
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Source documents, each converted to a CSV next to it unless --output-dir is set.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// JSON file overriding the built-in extraction rules.
    #[arg(long)]
    pub rules_path: Option<PathBuf>,

    /// Extra record boundary, written as START..END, tried after the rule-file patterns.
    #[arg(long = "boundary")]
    pub boundaries: Vec<String>,

    /// Extra recognized attribute keyword, appended to the rule-file vocabulary.
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// Style-map variant consulted when a style reference points at a map.
    #[arg(long, default_value = "normal")]
    pub style_variant: String,

    #[arg(long, default_value_t = false)]
    pub localize_icons: bool,

    #[arg(long, default_value = "icons")]
    pub icon_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    pub input: PathBuf,

    #[arg(long)]
    pub rules_path: Option<PathBuf>,

    #[arg(long = "boundary")]
    pub boundaries: Vec<String>,

    #[arg(long = "keyword")]
    pub keywords: Vec<String>,
}
