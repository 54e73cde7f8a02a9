use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

use crate::domain::entities::dataset::{RowStyle, SortDirection};
use crate::domain::entities::mapping::StoredMapping;
use crate::infra::import::csv::{export_csv, import_csv_to_sqlite};
use crate::infra::import::xlsx::import_xlsx_sheet_to_sqlite;
use crate::infra::memory::{MemoryHost, MemoryMappingStore};
use crate::infra::sqlite::queries::create_dataset_from_rows;
use crate::infra::sqlite::repo::{load_formatted_rows, SqliteHost, SqliteMappingStore};
use crate::infra::sqlite::schema::init_db;
use crate::infra::unattended::{DeclineMappings, FixedDuplicateDecision, LogNotifier};
use crate::usecase::error::ImportError;
use crate::usecase::ports::extractor::{Extractor, SourceDocument};
use crate::usecase::ports::host::{DatasetHost, HostError};
use crate::usecase::ports::prompt::{
    DuplicateDecision, DuplicatePrompt, DuplicateReport, MappingAnswer, MappingPrompt,
    MappingRequest, Notifier,
};
use crate::usecase::ports::store::{MappingStore, StoreError};
use crate::usecase::services::extraction_service::{ExtractionService, NO_USABLE_ROWS};
use crate::usecase::services::mapping_resolver::MappingResolver;
use crate::usecase::services::merge_coordinator::MergeCoordinator;
use crate::*;

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("pmfusion-{prefix}-{nanos}"))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn cable_headers() -> Vec<String> {
    strings(&["Kabelnummer", "von Ort", "von km", "bis Ort", "bis km", "IST"])
}

fn batch(columns: &[(&str, &[&str])]) -> ExtractedBatch {
    ExtractedBatch::new(
        columns
            .iter()
            .map(|(name, values)| (name.to_string(), strings(values)))
            .collect(),
    )
}

fn candidates(columns: &[(&str, &[&str])]) -> CandidateSet {
    CandidateSet::from_batches(vec![batch(columns)], &AliasCatalog::default())
}

#[derive(Default)]
struct RecordingMappingPrompt {
    answer: MappingAnswer,
    requests: Mutex<Vec<MappingRequest>>,
}

impl RecordingMappingPrompt {
    fn answering(answers: &[(&str, Option<&str>)]) -> Self {
        Self {
            answer: answers
                .iter()
                .map(|(header, target)| (header.to_string(), target.map(str::to_string)))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<MappingRequest> {
        self.requests.lock().expect("lock should not be poisoned").clone()
    }
}

impl MappingPrompt for RecordingMappingPrompt {
    fn choose(&self, request: &MappingRequest) -> MappingAnswer {
        self.requests
            .lock()
            .expect("lock should not be poisoned")
            .push(request.clone());
        self.answer.clone()
    }
}

/// Records every report and which rows were highlighted when it was shown.
struct RecordingDuplicatePrompt {
    decision: DuplicateDecision,
    host: Option<Arc<MemoryHost>>,
    reports: Mutex<Vec<DuplicateReport>>,
    highlighted: Mutex<Vec<usize>>,
}

impl RecordingDuplicatePrompt {
    fn new(decision: DuplicateDecision, host: Option<Arc<MemoryHost>>) -> Self {
        Self {
            decision,
            host,
            reports: Mutex::new(Vec::new()),
            highlighted: Mutex::new(Vec::new()),
        }
    }

    fn reports(&self) -> Vec<DuplicateReport> {
        self.reports.lock().expect("lock should not be poisoned").clone()
    }

    fn highlighted(&self) -> Vec<usize> {
        self.highlighted.lock().expect("lock should not be poisoned").clone()
    }
}

impl DuplicatePrompt for RecordingDuplicatePrompt {
    fn decide(&self, report: &DuplicateReport) -> DuplicateDecision {
        self.reports
            .lock()
            .expect("lock should not be poisoned")
            .push(report.clone());
        if let Some(host) = &self.host {
            let rows = host.formatted_rows().expect("rows should be readable");
            *self.highlighted.lock().expect("lock should not be poisoned") = rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row.format.highlight.is_some())
                .map(|(idx, _)| idx + 2)
                .collect();
        }
        self.decision
    }
}

#[derive(Default)]
struct RecordingNotifier {
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn infos(&self) -> Vec<String> {
        self.infos.lock().expect("lock should not be poisoned").clone()
    }

    fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("lock should not be poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.infos
            .lock()
            .expect("lock should not be poisoned")
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("lock should not be poisoned")
            .push(message.to_string());
    }
}

/// Memory host that can be told to reject writes or sorts.
struct FlakyHost {
    inner: MemoryHost,
    fail_write: bool,
    fail_sort: bool,
}

impl DatasetHost for FlakyHost {
    fn read_headers(&self) -> Result<Vec<String>, HostError> {
        self.inner.read_headers()
    }

    fn read_rows(&self) -> Result<Vec<Vec<String>>, HostError> {
        self.inner.read_rows()
    }

    fn write_rows(&self, start_row: usize, rows: &[Vec<String>]) -> Result<(), HostError> {
        if self.fail_write {
            return Err(HostError::Message("sheet is protected".to_string()));
        }
        self.inner.write_rows(start_row, rows)
    }

    fn apply_style(&self, first_row: usize, row_count: usize, style: &RowStyle) -> Result<(), HostError> {
        self.inner.apply_style(first_row, row_count, style)
    }

    fn sort_rows(
        &self,
        first_row: usize,
        last_row: usize,
        column: usize,
        direction: SortDirection,
    ) -> Result<(), HostError> {
        if self.fail_sort {
            return Err(HostError::Message("sort rejected".to_string()));
        }
        self.inner.sort_rows(first_row, last_row, column, direction)
    }

    fn delete_row(&self, row: usize) -> Result<(), HostError> {
        self.inner.delete_row(row)
    }

    fn set_highlight(&self, row: usize, color: &str) -> Result<(), HostError> {
        self.inner.set_highlight(row, color)
    }

    fn clear_highlight(&self, row: usize) -> Result<(), HostError> {
        self.inner.clear_highlight(row)
    }

    fn flush(&self) -> Result<(), HostError> {
        self.inner.flush()
    }
}

/// Mapping store whose backing storage is unavailable.
struct UnavailableStore;

impl MappingStore for UnavailableStore {
    fn load(&self) -> Result<StoredMapping, StoreError> {
        Err(StoreError::Message("database is locked".to_string()))
    }

    fn save(&self, _mapping: &HeaderMapping) -> Result<(), StoreError> {
        Err(StoreError::Message("database is locked".to_string()))
    }

    fn reset(&self) -> Result<(), StoreError> {
        Err(StoreError::Message("database is locked".to_string()))
    }
}

fn resolver(
    store: Arc<dyn MappingStore>,
    prompt: Arc<dyn MappingPrompt>,
    notifier: Arc<dyn Notifier>,
) -> MappingResolver {
    MappingResolver::new(Arc::new(AliasCatalog::default()), store, prompt, notifier)
}

fn coordinator(
    host: Arc<dyn DatasetHost>,
    duplicate_prompt: Arc<dyn DuplicatePrompt>,
    notifier: Arc<dyn Notifier>,
) -> MergeCoordinator {
    MergeCoordinator::new(
        host,
        resolver(
            Arc::new(MemoryMappingStore::new()),
            Arc::new(DeclineMappings),
            Arc::clone(&notifier),
        ),
        duplicate_prompt,
        notifier,
        ImportConfig::default(),
    )
}

fn cable_rows(rows: &[[&str; 6]]) -> Vec<Vec<String>> {
    rows.iter().map(|row| strings(row)).collect()
}

#[test]
fn init_db_creates_required_tables() {
    let temp_dir = unique_test_dir("init-db");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let result = init_db(&db_path);

    assert!(result.is_ok(), "init_db should succeed: {result:?}");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('dataset','column_name','cell','row_format','kv_store')",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 5, "required tables should exist");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn sqlite_mapping_store_round_trips_and_resets() {
    let temp_dir = unique_test_dir("mapping-store");
    let store = SqliteMappingStore::new(temp_dir.join("app.sqlite"));
    store.init().expect("store should initialize");

    assert!(store.load().expect("empty load should succeed").is_empty());
    store.reset().expect("reset without saved mapping should succeed");

    let mut mapping = HeaderMapping::new();
    mapping.insert("Nr.", Some("Kabelnummer".to_string()), MappingOrigin::Interactive);
    mapping.insert("Ø mm", Some("Durchmesser".to_string()), MappingOrigin::Catalog);
    mapping.insert("Lieferant", None, MappingOrigin::Declined);
    store.save(&mapping).expect("save should succeed");

    assert_eq!(
        store.load().expect("load should succeed"),
        StoredMapping::from(&mapping)
    );
    assert!(store
        .last_saved_at()
        .expect("timestamp query should succeed")
        .is_some());

    store.reset().expect("reset should succeed");
    assert!(store.load().expect("load after reset should succeed").is_empty());

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn sqlite_host_rewrites_rows_with_formatting() {
    let temp_dir = unique_test_dir("sqlite-host");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");

    let dataset_id = create_dataset_from_rows(
        &db_path,
        "sheet",
        "sheet.csv",
        &strings(&["A", "B"]),
        &[strings(&["b", "1"]), strings(&["a", "2"])],
    )
    .expect("dataset should be created");
    let host = SqliteHost::new(db_path.clone(), dataset_id.into());

    host.write_rows(5, &[strings(&["c", "3"])])
        .expect("write below a gap should succeed");
    host.apply_style(5, 1, &RowStyle::default())
        .expect("style should apply");
    host.set_highlight(2, "#FFFF00").expect("highlight should apply");
    host.sort_rows(2, 5, 0, SortDirection::Asc)
        .expect("sort should succeed");

    assert_eq!(
        host.read_rows().expect("rows should load"),
        vec![
            strings(&["", ""]),
            strings(&["a", "2"]),
            strings(&["b", "1"]),
            strings(&["c", "3"]),
        ]
    );
    let formatted = load_formatted_rows(&host).expect("formatted rows should load");
    assert_eq!(formatted[2].format.highlight.as_deref(), Some("#FFFF00"));
    assert_eq!(formatted[3].format.style, Some(RowStyle::default()));

    host.delete_row(2).expect("delete should succeed");
    host.clear_highlight(3).expect("clear should succeed");
    assert_eq!(host.read_rows().expect("rows should load").len(), 3);
    assert!(load_formatted_rows(&host)
        .expect("formatted rows should load")
        .iter()
        .all(|row| row.format.highlight.is_none()));

    assert!(matches!(
        host.delete_row(9),
        Err(HostError::RowOutOfRange { row: 9, .. })
    ));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn header_with_unit_symbol_resolves_from_catalog_without_prompt() {
    let prompt = Arc::new(RecordingMappingPrompt::default());
    let resolver = resolver(
        Arc::new(MemoryMappingStore::new()),
        prompt.clone(),
        Arc::new(LogNotifier),
    );
    let set = candidates(&[("Kabelnummer", &["c1"]), ("Durchmesser", &["12"])]);

    let mapping = resolver
        .resolve(&strings(&["Kabelnummer", "Ø mm"]), &set)
        .expect("mapping should resolve");

    assert_eq!(mapping.target("Ø mm"), Some("Durchmesser"));
    assert_eq!(
        mapping.resolution("Ø mm").map(|r| r.origin),
        Some(MappingOrigin::Catalog)
    );
    assert!(prompt.requests().is_empty(), "no interaction expected");
}

#[test]
fn resolver_layers_catalog_store_and_user() {
    let store = Arc::new(MemoryMappingStore::with_payload(
        r#"{"Nr.": "Kabelnummer", "Lieferant": "Unbekannt", "Alt": "IST"}"#,
    ));
    let prompt = Arc::new(RecordingMappingPrompt::answering(&[(
        "Lieferant",
        Some("Hersteller"),
    )]));
    let resolver = resolver(store.clone(), prompt.clone(), Arc::new(LogNotifier));
    let set = candidates(&[("Kabelnummer", &["c1"]), ("Hersteller", &["ACME"])]);
    let headers = strings(&["Nr.", "Lieferant", "", "Bemerkungen"]);

    let mapping = resolver.resolve(&headers, &set).expect("mapping should resolve");

    assert_eq!(mapping.len(), 4, "mapping must cover every header");
    assert_eq!(mapping.resolution("Nr.").map(|r| r.origin), Some(MappingOrigin::Stored));
    assert_eq!(mapping.target("Lieferant"), Some("Hersteller"));
    assert_eq!(mapping.resolution("").map(|r| r.origin), Some(MappingOrigin::Blank));
    assert_eq!(mapping.target("Bemerkungen"), Some("Bemerkung"));

    let requests = prompt.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].unresolved_headers, strings(&["Lieferant"]));
    assert_eq!(requests[0].canonical_columns.last().map(String::as_str), Some("Hersteller"));
    assert_eq!(requests[0].canonical_columns.first().map(String::as_str), Some("Kabelnummer"));

    let saved = store.load().expect("store should load");
    let expected: BTreeMap<String, String> = [
        ("Alt", "IST"),
        ("Bemerkungen", "Bemerkung"),
        ("Lieferant", "Hersteller"),
        ("Nr.", "Kabelnummer"),
    ]
    .iter()
    .map(|(header, target)| (header.to_string(), target.to_string()))
    .collect();
    assert_eq!(saved.targets, expected);
}

#[test]
fn declined_or_unknown_choices_leave_header_unmapped() {
    let prompt = Arc::new(RecordingMappingPrompt::answering(&[
        ("Lieferant", None),
        ("Seite", Some("Gibt es nicht")),
    ]));
    let resolver = resolver(
        Arc::new(MemoryMappingStore::new()),
        prompt,
        Arc::new(LogNotifier),
    );

    let mapping = resolver
        .resolve(&strings(&["Lieferant", "Seite", "Prüfer"]), &candidates(&[("Kabelnummer", &["c1"])]))
        .expect("mapping should resolve");

    for header in ["Lieferant", "Seite", "Prüfer"] {
        assert_eq!(mapping.target(header), None, "{header} should be unmapped");
        assert_eq!(
            mapping.resolution(header).map(|r| r.origin),
            Some(MappingOrigin::Declined)
        );
    }
}

#[test]
fn reset_clears_store_and_notifies() {
    let store = Arc::new(MemoryMappingStore::with_payload(r#"{"Nr.": "Kabelnummer"}"#));
    let notifier = Arc::new(RecordingNotifier::default());
    let resolver = resolver(store.clone(), Arc::new(DeclineMappings), notifier.clone());

    resolver.reset().expect("reset should succeed");
    resolver.reset().expect("second reset should succeed");

    assert!(store.load().expect("store should load").is_empty());
    assert_eq!(
        notifier.infos(),
        vec![
            "Saved column mappings have been reset.".to_string(),
            "Saved column mappings have been reset.".to_string(),
        ]
    );
}

fn fake_extract(document: &SourceDocument) -> Result<ExtractedBatch, String> {
    match document.name.as_str() {
        "ok.pdf" => Ok(batch(&[("Kabel-Nr.", &["c1", "c2"]), ("Ømm", &["12", "14"])])),
        "blank.pdf" => Ok(batch(&[("Kabelnummer", &["", " "])])),
        _ => Err("Keine verarbeitbaren Tabellen gefunden".to_string()),
    }
}

fn extraction_service(notifier: Arc<dyn Notifier>) -> ExtractionService {
    let extractor: Arc<dyn Extractor> = Arc::new(fake_extract);
    ExtractionService::new(extractor, Arc::new(AliasCatalog::default()), notifier)
}

#[test]
fn failing_documents_are_recorded_and_the_rest_continue() {
    let notifier = Arc::new(RecordingNotifier::default());
    let service = extraction_service(notifier.clone());
    let documents = vec![
        SourceDocument::new("scan.pdf", Vec::new()),
        SourceDocument::new("ok.pdf", Vec::new()),
        SourceDocument::new("blank.pdf", Vec::new()),
    ];

    let outcome = service.extract_all(&documents).expect("one document succeeded");

    assert_eq!(outcome.processed, 1);
    assert_eq!(outcome.candidates.record_count(), 2);
    assert_eq!(outcome.candidates.value("Durchmesser", 1), "14");
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(
        outcome.failures[0].to_string(),
        "scan.pdf: Keine verarbeitbaren Tabellen gefunden"
    );
    assert_eq!(outcome.failures[1].detail, NO_USABLE_ROWS);

    let errors = notifier.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("scan.pdf: Keine verarbeitbaren Tabellen gefunden"));
    assert!(errors[0].contains("blank.pdf"));
}

#[test]
fn all_documents_failing_aborts_extraction() {
    let service = extraction_service(Arc::new(LogNotifier));

    let result = service.extract_all(&[
        SourceDocument::new("a.pdf", Vec::new()),
        SourceDocument::new("blank.pdf", Vec::new()),
    ]);

    match result {
        Err(ImportError::NothingExtracted { failures }) => assert_eq!(failures.len(), 2),
        other => panic!("expected NothingExtracted, got {other:?}"),
    }
    assert!(matches!(service.extract_all(&[]), Err(ImportError::NoDocuments)));
}

#[test]
fn duplicate_candidate_is_skipped_and_reported_with_existing_row() {
    let host = Arc::new(MemoryHost::new(
        cable_headers(),
        cable_rows(&[["c1", "a", "0", "b", "10", "95"]]),
    ));
    let prompt = Arc::new(RecordingDuplicatePrompt::new(
        DuplicateDecision::Keep,
        Some(host.clone()),
    ));
    let merge = coordinator(host.clone(), prompt.clone(), Arc::new(LogNotifier));
    let set = candidates(&[
        ("Kabelnummer", &["c1", "c2"]),
        ("von Ort", &["a", "a"]),
        ("von km", &["0", "0"]),
        ("bis Ort", &["b", "b"]),
        ("bis km", &["10", "10"]),
        ("IST", &["96", "40"]),
    ]);

    let report = merge.insert(&set).expect("insert should succeed");

    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped_duplicates, 1);
    assert_eq!(report.duplicate_groups, 1);
    assert_eq!(report.decision, Some(DuplicateDecision::Keep));
    assert_eq!(
        host.read_rows().expect("rows should load"),
        cable_rows(&[
            ["c1", "a", "0", "b", "10", "95"],
            ["c2", "a", "0", "b", "10", "40"],
        ])
    );

    let reports = prompt.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].groups[0].key, "c1|a|0|b|10");
    assert_eq!(reports[0].groups[0].rows, vec![2]);
    assert_eq!(reports[0].groups[0].skipped_candidates, 1);
    assert_eq!(prompt.highlighted(), vec![2]);

    let formatted = host.formatted_rows().expect("rows should load");
    assert!(formatted.iter().all(|row| row.format.highlight.is_none()));
    assert_eq!(formatted[1].format.style, Some(RowStyle::default()));
}

fn sheet_with_stale_rows() -> Arc<MemoryHost> {
    Arc::new(MemoryHost::new(
        cable_headers(),
        cable_rows(&[
            ["c3", "a", "0", "b", "10", "3"],
            ["c1", "a", "0", "b", "10", "1"],
            ["C1", "a", "0", "b", "10 ", "2"],
            ["", "", "", "", "", ""],
        ]),
    ))
}

fn c2_candidate() -> CandidateSet {
    candidates(&[
        ("Kabelnummer", &["c2"]),
        ("von Ort", &["a"]),
        ("von km", &["0"]),
        ("bis Ort", &["b"]),
        ("bis km", &["10"]),
    ])
}

#[test]
fn delete_decision_keeps_one_row_per_key() {
    let host = sheet_with_stale_rows();
    let prompt = Arc::new(RecordingDuplicatePrompt::new(
        DuplicateDecision::Delete,
        Some(host.clone()),
    ));
    let merge = coordinator(host.clone(), prompt.clone(), Arc::new(LogNotifier));

    let report = merge.insert(&c2_candidate()).expect("insert should succeed");

    assert_eq!(report.inserted, 1);
    assert_eq!(report.removed_blank_rows, 1);
    assert_eq!(report.duplicate_groups, 1);
    assert_eq!(report.removed_duplicate_rows, 1);
    assert_eq!(prompt.highlighted(), vec![2, 3]);
    assert_eq!(
        host.read_rows().expect("rows should load"),
        cable_rows(&[
            ["C1", "a", "0", "b", "10 ", "2"],
            ["c2", "a", "0", "b", "10", ""],
            ["c3", "a", "0", "b", "10", "3"],
        ])
    );
    assert!(host
        .formatted_rows()
        .expect("rows should load")
        .iter()
        .all(|row| row.format.highlight.is_none()));
}

#[test]
fn keep_decision_leaves_rows_and_clears_highlight() {
    let host = sheet_with_stale_rows();
    let prompt = Arc::new(RecordingDuplicatePrompt::new(
        DuplicateDecision::Keep,
        Some(host.clone()),
    ));
    let merge = coordinator(host.clone(), prompt.clone(), Arc::new(LogNotifier));

    let report = merge.insert(&c2_candidate()).expect("insert should succeed");

    assert_eq!(report.removed_duplicate_rows, 0);
    let rows = host.read_rows().expect("rows should load");
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row.iter().any(|cell| !cell.is_empty())));
    assert!(host
        .formatted_rows()
        .expect("rows should load")
        .iter()
        .all(|row| row.format.highlight.is_none()));
}

#[test]
fn single_key_column_disables_duplicate_detection() {
    let headers = strings(&["Kabelnummer", "Bemerkung"]);
    let host = Arc::new(MemoryHost::new(headers, vec![strings(&["c1", "x"])]));
    let prompt = Arc::new(RecordingDuplicatePrompt::new(DuplicateDecision::Delete, None));
    let notifier = Arc::new(RecordingNotifier::default());
    let merge = coordinator(host.clone(), prompt.clone(), notifier.clone());

    let report = merge
        .insert(&candidates(&[
            ("Kabelnummer", &["c1", "c1"]),
            ("Bemerkung", &["y", "z"]),
        ]))
        .expect("insert should succeed");

    assert!(report.dedup_degraded);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.duplicate_groups, 0);
    assert!(prompt.reports().is_empty());
    assert_eq!(host.read_rows().expect("rows should load").len(), 3);
    let infos = notifier.infos();
    assert_eq!(infos.len(), 1);
    assert!(
        infos[0].contains("Duplicate detection was disabled"),
        "summary must not read as a normal import: {}",
        infos[0]
    );
}

#[test]
fn cleanup_failure_keeps_inserted_rows() {
    let host = Arc::new(FlakyHost {
        inner: MemoryHost::new(cable_headers(), cable_rows(&[["c9", "a", "0", "b", "10", ""]])),
        fail_write: false,
        fail_sort: true,
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let merge = coordinator(
        host.clone(),
        Arc::new(RecordingDuplicatePrompt::new(DuplicateDecision::Keep, None)),
        notifier.clone(),
    );

    let report = merge.insert(&c2_candidate()).expect("insert itself succeeded");

    assert_eq!(report.inserted, 1);
    assert_eq!(
        report.cleanup_error,
        Some(HostError::Message("sort rejected".to_string()))
    );
    assert_eq!(host.read_rows().expect("rows should load").len(), 2);
    assert_eq!(notifier.errors().len(), 1);
}

#[test]
fn write_failure_aborts_the_insert() {
    let host = Arc::new(FlakyHost {
        inner: MemoryHost::new(cable_headers(), Vec::new()),
        fail_write: true,
        fail_sort: false,
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let merge = coordinator(
        host.clone(),
        Arc::new(RecordingDuplicatePrompt::new(DuplicateDecision::Keep, None)),
        notifier.clone(),
    );

    let result = merge.insert(&c2_candidate());

    assert!(matches!(result, Err(ImportError::Host(HostError::Message(_)))));
    assert!(host.read_rows().expect("rows should load").is_empty());
    assert_eq!(notifier.errors().len(), 1);
}

#[test]
fn empty_header_row_is_rejected() {
    let host = Arc::new(MemoryHost::new(strings(&["", " "]), Vec::new()));
    let merge = coordinator(
        host,
        Arc::new(RecordingDuplicatePrompt::new(DuplicateDecision::Keep, None)),
        Arc::new(LogNotifier),
    );

    assert!(matches!(merge.insert(&c2_candidate()), Err(ImportError::NoHeaders)));
}

fn survey_extract(_document: &SourceDocument) -> Result<ExtractedBatch, String> {
    Ok(batch(&[
        ("Kabelnummer", &["c1", "c2"]),
        ("von Ort", &["a", "a"]),
        ("von km", &["0", "0"]),
        ("bis Ort", &["b", "b"]),
        ("bis km", &["10", "10"]),
        ("Lieferant", &["x", "y"]),
    ]))
}

#[test]
fn sqlite_import_remembers_manual_mapping_between_runs() {
    let temp_dir = unique_test_dir("sqlite-import");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    let csv_path = temp_dir.join("protokoll.csv");
    fs::write(
        &csv_path,
        "Kabel-Nr.,Von Ort,Von km,Bis Ort,Bis km,Lieferant\nc1,a,0,b,10,x\n",
    )
    .expect("should write csv");

    let imported = import_csv_to_sqlite(&db_path, &csv_path).expect("csv should import");
    assert_eq!(imported.row_count, 1);

    let host = Arc::new(SqliteHost::new(db_path.clone(), imported.dataset_id));
    let mapping_prompt = Arc::new(RecordingMappingPrompt::answering(&[(
        "Lieferant",
        Some("Lieferant"),
    )]));
    let duplicate_prompt = Arc::new(RecordingDuplicatePrompt::new(DuplicateDecision::Keep, None));
    let extractor: Arc<dyn Extractor> = Arc::new(survey_extract);
    let service = ImportService::new(
        ImportConfig::default(),
        ImportPorts {
            host: host.clone(),
            store: Arc::new(SqliteMappingStore::new(db_path.clone())),
            extractor,
            mapping_prompt: mapping_prompt.clone(),
            duplicate_prompt: duplicate_prompt.clone(),
            notifier: Arc::new(LogNotifier),
        },
    );
    let documents = vec![SourceDocument::new("protokoll.pdf", Vec::new())];

    let (_, first) = service
        .import_documents(&documents)
        .expect("first import should succeed");
    let (_, second) = service
        .import_documents(&documents)
        .expect("second import should succeed");

    assert_eq!(first.inserted, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped_duplicates, 2);
    assert_eq!(mapping_prompt.requests().len(), 1, "second run must reuse the stored mapping");
    assert_eq!(duplicate_prompt.reports().len(), 2);

    let out_path = temp_dir.join("export.csv");
    let exported = export_csv(host.as_ref(), &out_path).expect("export should succeed");
    assert_eq!(exported, 2);
    assert_eq!(
        fs::read_to_string(&out_path).expect("should read export"),
        "Kabel-Nr.,Von Ort,Von km,Bis Ort,Bis km,Lieferant\nc1,a,0,b,10,x\nc2,a,0,b,10,y\n"
    );

    service.reset_mappings().expect("reset should succeed");
    service
        .import_documents(&documents)
        .expect("third import should succeed");
    assert_eq!(mapping_prompt.requests().len(), 2, "reset forgets the manual mapping");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn unattended_import_follows_config_file() {
    init_logging();
    let temp_dir = unique_test_dir("config");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let config_path = temp_dir.join("pmfusion.json");
    fs::write(
        &config_path,
        r##"{"key_columns": {"columns": ["Kabelnummer", "Trommelnummer"]}, "highlight_color": "#FF0000"}"##,
    )
    .expect("should write config");
    let config = ImportConfig::load(&config_path).expect("config should load");

    let host = Arc::new(MemoryHost::new(
        strings(&["Kabelnummer", "Trommelnummer", "Bemerkung"]),
        vec![
            strings(&["c1", "T1", "alt"]),
            strings(&["c1", "T2", ""]),
        ],
    ));
    let extractor: Arc<dyn Extractor> = Arc::new(|_document: &SourceDocument| {
        Ok::<_, String>(batch(&[
            ("Kabelnummer", &["c1", "c1"]),
            ("Trommel", &["T1", "T3"]),
            ("Bemerkung", &["neu", "neu"]),
        ]))
    });
    let service = ImportService::new(
        config,
        ImportPorts {
            host: host.clone(),
            store: Arc::new(MemoryMappingStore::new()),
            extractor,
            mapping_prompt: Arc::new(DeclineMappings),
            duplicate_prompt: Arc::new(FixedDuplicateDecision(DuplicateDecision::Delete)),
            notifier: Arc::new(LogNotifier),
        },
    );

    let (extracted, report) = service
        .import_documents(&[SourceDocument::new("run.pdf", Vec::new())])
        .expect("import should succeed");

    assert_eq!(extracted.candidates.value("Trommelnummer", 1), "T3");
    assert_eq!(report.inserted, 1);
    assert_eq!(report.skipped_duplicates, 1);
    assert_eq!(report.removed_duplicate_rows, 0);
    assert_eq!(
        host.read_rows().expect("rows should load"),
        vec![
            strings(&["c1", "T1", "alt"]),
            strings(&["c1", "T2", ""]),
            strings(&["c1", "T3", "neu"]),
        ]
    );

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn stored_target_outlives_a_batch_without_that_field() {
    let store = Arc::new(MemoryMappingStore::with_payload(r#"{"Lieferant": "Lieferant"}"#));
    let prompt = Arc::new(RecordingMappingPrompt::default());
    let resolver = resolver(store.clone(), prompt.clone(), Arc::new(LogNotifier));
    let headers = strings(&["Kabelnummer", "Lieferant"]);

    let first = resolver
        .resolve(&headers, &candidates(&[("Kabelnummer", &["c1"])]))
        .expect("first mapping should resolve");

    assert_eq!(first.target("Lieferant"), None);
    assert_eq!(prompt.requests().len(), 1);
    assert_eq!(
        store.load().expect("store should load").get("Lieferant"),
        Some("Lieferant"),
        "declining an unavailable field must keep the remembered column"
    );

    let second = resolver
        .resolve(
            &headers,
            &candidates(&[("Kabelnummer", &["c2"]), ("Lieferant", &["ACME"])]),
        )
        .expect("second mapping should resolve");

    assert_eq!(second.target("Lieferant"), Some("Lieferant"));
    assert_eq!(
        second.resolution("Lieferant").map(|r| r.origin),
        Some(MappingOrigin::Stored)
    );
    assert_eq!(prompt.requests().len(), 1, "second run must not ask again");
}

#[test]
fn unavailable_store_is_reported_to_the_user() {
    let notifier = Arc::new(RecordingNotifier::default());
    let resolver = resolver(
        Arc::new(UnavailableStore),
        Arc::new(DeclineMappings),
        notifier.clone(),
    );

    let mapping = resolver
        .resolve(
            &strings(&["Kabelnummer", "Lieferant"]),
            &candidates(&[("Kabelnummer", &["c1"])]),
        )
        .expect("mapping still resolves without a store");

    assert_eq!(mapping.target("Kabelnummer"), Some("Kabelnummer"));
    let errors = notifier.errors();
    assert_eq!(errors.len(), 2, "load and save failures: {errors:?}");
    assert!(errors[0].contains("could not be loaded"));
    assert!(errors[1].contains("could not be saved"));
    assert!(errors.iter().all(|message| message.contains("database is locked")));

    assert!(matches!(resolver.reset(), Err(ImportError::Store(_))));
}

#[test]
fn import_xlsx_sheet_trims_headers_and_selects_sheet() {
    let temp_dir = unique_test_dir("import-xlsx");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("app.sqlite");
    let xlsx_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("Kabelprotokoll_test.xlsx");

    let first = import_xlsx_sheet_to_sqlite(&db_path, &xlsx_path, None)
        .expect("first sheet should import");
    assert_eq!(first.row_count, 2);

    let host = SqliteHost::new(db_path.clone(), first.dataset_id);
    assert_eq!(
        host.read_headers().expect("headers should load"),
        strings(&["Kabelnummer", "von Ort", "von km"]),
        "trailing blank header should be dropped"
    );
    assert_eq!(
        host.read_rows().expect("rows should load"),
        vec![strings(&["c1", "a", "0"]), strings(&["c2", "b", "1.5"])]
    );

    let named = import_xlsx_sheet_to_sqlite(&db_path, &xlsx_path, Some("Nachtrag"))
        .expect("named sheet should import");
    let host = SqliteHost::new(db_path.clone(), named.dataset_id);
    assert_eq!(
        host.read_rows().expect("rows should load"),
        vec![strings(&["c9", "neu"])]
    );

    let empty = import_xlsx_sheet_to_sqlite(&db_path, &xlsx_path, Some("Leer"));
    assert!(empty.is_err(), "sheet without header row must be rejected");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let names: Vec<String> = conn
        .prepare("SELECT name FROM dataset ORDER BY id")
        .expect("prepare should succeed")
        .query_map([], |row| row.get(0))
        .expect("query should succeed")
        .collect::<rusqlite::Result<Vec<_>>>()
        .expect("collect should succeed");
    assert_eq!(names, strings(&["Protokoll", "Nachtrag"]));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn default_db_path_points_at_dataset_file() {
    let path = default_db_path().expect("data directory should resolve");

    assert_eq!(
        path.file_name().and_then(|name| name.to_str()),
        Some("datasets.sqlite")
    );
    assert!(path.parent().is_some(), "database lives in a data directory");
}
