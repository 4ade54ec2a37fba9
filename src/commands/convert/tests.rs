use super::*;

fn default_context() -> ConvertContext {
    ConvertContext::new(ExtractionRules::default()).unwrap()
}

fn no_progress() -> impl FnMut(usize, usize) {
    |_, _| {}
}

#[test]
fn normalize_passes_plain_text_through_modulo_trim() {
    let normalizer = TextNormalizer::new().unwrap();
    assert_eq!(normalizer.normalize("  plain text\nwith lines  "), "plain text\nwith lines");
    assert_eq!(normalizer.normalize("a < b > c"), "a < b > c");
}

#[test]
fn normalize_strips_cdata_and_markup() {
    let normalizer = TextNormalizer::new().unwrap();
    let raw = "<![CDATA[<B>Bold</B> and <I>italic</I><br>next line]]>";
    assert_eq!(normalizer.normalize(raw), "Bold and italic\nnext line");
}

#[test]
fn normalize_keeps_line_boundaries_from_literal_newlines() {
    let normalizer = TextNormalizer::new().unwrap();
    let raw = "<![CDATA[first line\nsecond line]]>";
    assert_eq!(normalizer.normalize(raw), "first line\nsecond line");
}

#[test]
fn normalize_unescapes_backslash_escapes() {
    let normalizer = TextNormalizer::new().unwrap();
    let raw = r"<![CDATA[a\_b\\c]]>";
    assert_eq!(normalizer.normalize(raw), r"a_b\c");
}

#[test]
fn split_attributes_captures_keyword_lines_and_removes_them() {
    let context = default_context();
    let (text, attributes) = split_attributes(
        "Some narrative\nDate: 2020\nMore narrative",
        &context.rules,
        &context.spotter,
    );

    assert_eq!(attributes.get("date").map(String::as_str), Some("2020"));
    assert_eq!(text, "Some narrative\nMore narrative");
}

#[test]
fn split_attributes_disambiguates_duplicate_keywords() {
    let context = default_context();
    let (_, attributes) = split_attributes(
        "date: 1944\nDate: 1945",
        &context.rules,
        &context.spotter,
    );

    assert_eq!(attributes.get("date").map(String::as_str), Some("1944"));
    assert_eq!(attributes.get("date2").map(String::as_str), Some("1945"));
}

#[test]
fn split_attributes_tries_separators_in_priority_order() {
    let context = default_context();
    let (text, attributes) = split_attributes(
        "ref = B/123\nratio 1:25000 scale",
        &context.rules,
        &context.spotter,
    );

    // The '=' line is an attribute; the ':' line has no recognized keyword
    // on its left side and stays in the residual text verbatim.
    assert_eq!(attributes.get("ref").map(String::as_str), Some("B/123"));
    assert_eq!(text, "ratio 1:25000 scale");
}

#[test]
fn split_attributes_spots_embedded_file_paths() {
    let context = default_context();
    let (text, attributes) = split_attributes(
        "narrative\n<img src=\"file:///photos/a.jpg\">\n![](file:/scans/b.png)\nFound in: box 7",
        &context.rules,
        &context.spotter,
    );

    assert_eq!(attributes.get("path").map(String::as_str), Some("photos/a.jpg"));
    assert_eq!(attributes.get("path2").map(String::as_str), Some("scans/b.png"));
    assert_eq!(attributes.get("path3").map(String::as_str), Some("box 7"));
    assert_eq!(text, "narrative");
}

#[test]
fn next_free_key_appends_numeric_suffixes() {
    let mut existing = BTreeMap::new();
    assert_eq!(next_free_key(&existing, "date"), "date");

    existing.insert("date".to_string(), "1944".to_string());
    assert_eq!(next_free_key(&existing, "date"), "date2");

    existing.insert("date2".to_string(), "1945".to_string());
    assert_eq!(next_free_key(&existing, "date"), "date3");
}

#[test]
fn parse_coordinates_accepts_altitude_and_validates_ranges() {
    assert_eq!(parse_coordinates("1.5,-2.25,300").unwrap(), (1.5, -2.25));
    assert_eq!(parse_coordinates(" 10.0, 20.0 ").unwrap(), (10.0, 20.0));

    assert!(parse_coordinates("not,numbers").is_err());
    assert!(parse_coordinates("181.0,10.0").is_err());
    assert!(parse_coordinates("10.0,-91.0").is_err());
    assert!(parse_coordinates("10.0").is_err());
}

#[test]
fn extract_records_handles_single_placemark_document() {
    let context = default_context();
    let document = "<Placemark><name>A</name><coordinates>1.0,2.0</coordinates>\
                    <description>Date: 2020</description></Placemark>";

    let outcome = extract_records(&context, document, &mut no_progress());
    assert_eq!(outcome.fragments_seen, 1);
    assert_eq!(outcome.records.len(), 1);
    assert!(outcome.failures.is_empty());

    let record = &outcome.records[0];
    assert_eq!(record.name, "A");
    assert_eq!((record.longitude, record.latitude), (1.0, 2.0));
    assert_eq!(record.text, "");
    assert_eq!(record.attributes.get("date").map(String::as_str), Some("2020"));
    assert!(record.style_ref.is_none());
}

#[test]
fn extract_records_continues_past_broken_fragments() {
    let context = default_context();
    let document = "<Placemark><name>Broken</name></Placemark>\
                    <Placemark><name>Good</name><coordinates>3.0,4.0</coordinates></Placemark>";

    let outcome = extract_records(&context, document, &mut no_progress());
    assert_eq!(outcome.fragments_seen, 2);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].name, "Good");

    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.ordinal, 0);
    assert_eq!(failure.partial_name.as_deref(), Some("Broken"));
    assert!(failure.reason.contains("coordinates"));
    assert!(failure.fragment.contains("<name>Broken</name>"));
}

#[test]
fn extract_records_reports_rejected_coordinate_tokens() {
    let context = default_context();
    let document = "<Placemark><name>Bad</name><coordinates>east,north</coordinates></Placemark>";

    let outcome = extract_records(&context, document, &mut no_progress());
    assert!(outcome.records.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].partial_coordinates.as_deref(), Some("east,north"));
}

#[test]
fn collect_fragments_preserves_pattern_order_then_match_order() {
    let mut rules = ExtractionRules::default();
    rules.boundaries.push(BoundaryPattern {
        name: "waypoint".to_string(),
        start: "<Waypoint>".to_string(),
        end: "</Waypoint>".to_string(),
        multi_line: true,
    });
    let context = ConvertContext::new(rules).unwrap();

    let document = "<Waypoint>w1</Waypoint><Placemark>p1</Placemark>\
                    <Placemark>p2</Placemark><Waypoint>w2</Waypoint>";
    let fragments = collect_fragments(&context, document);

    assert_eq!(
        fragments,
        vec![
            "<Placemark>p1</Placemark>",
            "<Placemark>p2</Placemark>",
            "<Waypoint>w1</Waypoint>",
            "<Waypoint>w2</Waypoint>",
        ]
    );
}

#[test]
fn decode_styles_reads_styles_and_style_maps() {
    let context = default_context();
    let document = r##"
        <Style id="pin"><IconStyle><Icon><href>icons/pin.png</href></Icon></IconStyle></Style>
        <StyleMap id="pin-map">
            <Pair><key>normal</key><styleUrl>#pin</styleUrl></Pair>
            <Pair><key>highlight</key><styleUrl>#pin-bright</styleUrl></Pair>
        </StyleMap>
    "##;

    let tables = decode_styles(&context, document);
    assert_eq!(tables.styles.get("pin").map(String::as_str), Some("icons/pin.png"));

    let variants = tables.style_maps.get("pin-map").unwrap();
    assert_eq!(variants.get("normal").map(String::as_str), Some("pin"));
    assert_eq!(variants.get("highlight").map(String::as_str), Some("pin-bright"));
}

#[test]
fn resolve_icon_follows_one_style_map_hop() {
    let mut tables = StyleTables::default();
    tables.styles.insert("pin".to_string(), "icons/pin.png".to_string());
    tables.style_maps.insert(
        "pin-map".to_string(),
        HashMap::from([("normal".to_string(), "pin".to_string())]),
    );
    tables.style_maps.insert(
        "deep-map".to_string(),
        HashMap::from([("normal".to_string(), "pin-map".to_string())]),
    );

    let direct = resolve_icon(&tables, "#pin", "normal").unwrap();
    assert_eq!(direct.path, "icons/pin.png");
    assert!(!direct.remote);

    let via_map = resolve_icon(&tables, "#pin-map", "normal").unwrap();
    assert_eq!(via_map.path, "icons/pin.png");

    // A map variant pointing at another map is not chased.
    assert!(resolve_icon(&tables, "#deep-map", "normal").is_none());
    assert!(resolve_icon(&tables, "#unknown", "normal").is_none());
}

#[test]
fn resolve_icon_flags_remote_paths() {
    let mut tables = StyleTables::default();
    tables.styles.insert(
        "remote".to_string(),
        "http://example.com/pin.png".to_string(),
    );

    let icon = resolve_icon(&tables, "remote", "normal").unwrap();
    assert!(icon.remote);
}

#[test]
fn apply_styles_writes_icon_attribute() {
    let context = default_context();
    let document = r##"
        <Style id="pin"><IconStyle><Icon><href>icons/pin.png</href></Icon></IconStyle></Style>
        <Placemark><name>A</name><coordinates>1.0,2.0</coordinates>
        <styleUrl>#pin</styleUrl></Placemark>
        <Placemark><name>B</name><coordinates>3.0,4.0</coordinates>
        <styleUrl>#missing</styleUrl></Placemark>
    "##;

    let mut outcome = extract_records(&context, document, &mut no_progress());
    let tables = decode_styles(&context, document);
    let resolved = apply_styles(&mut outcome.records, &tables, "normal");

    assert_eq!(resolved, 1);
    assert_eq!(
        outcome.records[0].attributes.get("icon").map(String::as_str),
        Some("icons/pin.png")
    );
    assert!(outcome.records[1].icon.is_none());
    assert!(!outcome.records[1].attributes.contains_key("icon"));
}

#[test]
fn assemble_rows_builds_stable_header_and_full_rows() {
    let records = vec![
        PointRecord {
            name: "A".to_string(),
            longitude: 1.0,
            latitude: 2.0,
            text: "narrative".to_string(),
            attributes: BTreeMap::from([("date".to_string(), "1944".to_string())]),
            style_ref: None,
            icon: None,
        },
        PointRecord {
            name: "B".to_string(),
            longitude: 3.0,
            latitude: 4.0,
            text: String::new(),
            attributes: BTreeMap::from([("ref".to_string(), "B/9".to_string())]),
            style_ref: None,
            icon: None,
        },
    ];

    let rows = assemble_rows(&records);
    assert_eq!(rows.header, vec!["x", "y", "id", "text", "date", "ref"]);
    assert_eq!(rows.rows.len(), 2);
    for row in &rows.rows {
        assert_eq!(row.len(), rows.header.len());
    }

    assert_eq!(rows.rows[0][0], CellValue::Float(1.0));
    assert_eq!(rows.rows[0][4], CellValue::Text("1944".to_string()));
    assert_eq!(rows.rows[0][5], CellValue::Text(String::new()));
    assert_eq!(rows.rows[1][5], CellValue::Text("B/9".to_string()));
}

#[test]
fn assemble_rows_surfaces_icon_as_its_own_column() {
    let records = vec![PointRecord {
        name: "A".to_string(),
        longitude: 1.0,
        latitude: 2.0,
        text: String::new(),
        attributes: BTreeMap::from([
            ("icon".to_string(), "icons/pin.png".to_string()),
            ("date".to_string(), "1944".to_string()),
        ]),
        style_ref: Some("#pin".to_string()),
        icon: Some(ResolvedIcon {
            path: "icons/pin.png".to_string(),
            remote: false,
        }),
    }];

    let rows = assemble_rows(&records);
    assert_eq!(rows.header, vec!["x", "y", "id", "text", "icon", "date"]);
    assert_eq!(rows.rows[0][4], CellValue::Text("icons/pin.png".to_string()));
}

#[test]
fn encode_line_escapes_reserved_characters() {
    let fields = vec![
        "plain".to_string(),
        "with,comma".to_string(),
        "with \"quote\"".to_string(),
        "with\nnewline".to_string(),
    ];

    assert_eq!(
        encode_line(&fields),
        "plain,\"with,comma\",\"with \"\"quote\"\"\",\"with\nnewline\"\n"
    );
}

struct FakeFetcher {
    fetches: std::cell::RefCell<usize>,
    fail: bool,
}

impl FakeFetcher {
    fn new(fail: bool) -> Self {
        Self {
            fetches: std::cell::RefCell::new(0),
            fail,
        }
    }
}

impl IconFetcher for FakeFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        if self.fail {
            bail!("unreachable host for {url}");
        }
        *self.fetches.borrow_mut() += 1;
        fs::write(destination, b"png").map_err(Into::into)
    }
}

fn remote_record(name: &str, url: &str) -> PointRecord {
    PointRecord {
        name: name.to_string(),
        longitude: 0.0,
        latitude: 0.0,
        text: String::new(),
        attributes: BTreeMap::from([("icon".to_string(), url.to_string())]),
        style_ref: Some("#pin".to_string()),
        icon: Some(ResolvedIcon {
            path: url.to_string(),
            remote: true,
        }),
    }
}

#[test]
fn localize_icons_fetches_each_remote_url_once() {
    let icon_dir = tempfile::tempdir().unwrap();
    let url = "http://example.com/pin.png";
    let mut records = vec![remote_record("A", url), remote_record("B", url)];

    let fetcher = FakeFetcher::new(false);
    let mut warnings = Vec::new();
    let fetched =
        localize_icons(&mut records, icon_dir.path(), &fetcher, &mut warnings).unwrap();

    assert_eq!(fetched, 1);
    assert_eq!(*fetcher.fetches.borrow(), 1);
    assert!(warnings.is_empty());

    for record in &records {
        let icon = record.icon.as_ref().unwrap();
        assert!(!icon.remote);
        assert!(Path::new(&icon.path).exists());
        assert_eq!(record.attributes.get("icon"), Some(&icon.path));
    }

    // A second pass finds the destination file already present.
    let mut fresh = vec![remote_record("C", url)];
    let fetched =
        localize_icons(&mut fresh, icon_dir.path(), &fetcher, &mut warnings).unwrap();
    assert_eq!(fetched, 0);
    assert!(!fresh[0].icon.as_ref().unwrap().remote);
}

#[test]
fn localize_icons_downgrades_fetch_failures_to_warnings() {
    let icon_dir = tempfile::tempdir().unwrap();
    let mut records = vec![remote_record("A", "http://example.com/gone.png")];

    let fetcher = FakeFetcher::new(true);
    let mut warnings = Vec::new();
    let fetched =
        localize_icons(&mut records, icon_dir.path(), &fetcher, &mut warnings).unwrap();

    assert_eq!(fetched, 0);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("gone.png"));
    // The record keeps its remote reference when the fetch fails.
    assert!(records[0].icon.as_ref().unwrap().remote);
}

#[test]
fn parallel_documents_match_sequential_totals() {
    let context = default_context();
    let document_a = "<Placemark><name>A</name><coordinates>1.0,2.0</coordinates></Placemark>\
                      <Placemark><name>broken</name></Placemark>";
    let document_b = "<Placemark><name>B1</name><coordinates>3.0,4.0</coordinates></Placemark>\
                      <Placemark><name>B2</name><coordinates>5.0,6.0</coordinates></Placemark>";

    let documents = vec![document_a, document_b];

    let sequential = documents
        .iter()
        .map(|document| extract_records(&context, document, &mut no_progress()))
        .collect::<Vec<ExtractionOutcome>>();
    let sequential_records = sequential.iter().map(|o| o.records.len()).sum::<usize>();
    let sequential_failures = sequential.iter().map(|o| o.failures.len()).sum::<usize>();

    let parallel = documents
        .par_iter()
        .map(|document| extract_records(&context, document, &mut |_, _| {}))
        .collect::<Vec<ExtractionOutcome>>();
    let parallel_records = parallel.iter().map(|o| o.records.len()).sum::<usize>();
    let parallel_failures = parallel.iter().map(|o| o.failures.len()).sum::<usize>();

    assert_eq!(parallel_records, sequential_records);
    assert_eq!(parallel_failures, sequential_failures);
    assert_eq!(parallel_records, 3);
    assert_eq!(parallel_failures, 1);
}

#[test]
fn build_rules_applies_cli_overrides() {
    let rules = build_rules(
        None,
        &["<Waypoint>..</Waypoint>".to_string()],
        &["Sortie".to_string()],
    )
    .unwrap();

    assert_eq!(rules.boundaries.len(), 2);
    assert_eq!(rules.boundaries[1].start, "<Waypoint>");
    assert_eq!(rules.boundaries[1].end, "</Waypoint>");
    assert!(rules.keywords.contains(&"sortie".to_string()));

    assert!(build_rules(None, &["no-separator".to_string()], &[]).is_err());
}

#[test]
fn strip_ends_any_is_greedy_at_both_ends() {
    assert_eq!(strip_ends_any("file:///a/b.png", &["file:", "/"]), "a/b.png");
    assert_eq!(strip_ends_any("//x//", &["/"]), "x");
    assert_eq!(strip_ends_any("plain", &["file:", "/"]), "plain");
}
