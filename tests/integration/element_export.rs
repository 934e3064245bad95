//! Integration tests for diagram elements, opening diagrams and configuration.

use std::fs;
use std::time::Duration;

use diacache::config::{load_config, load_effective};
use diacache::element::DiagramElement;
use diacache::error::DiaError;
use diacache::export::{DiagramExporter, NAMESPACE};
use diacache::platform::UnixProfile;
use diacache::source::{BookResolver, DiagramRef};

use crate::common::fixtures::TestBook;
use crate::common::init_test_logging;
use crate::common::mocks::FakeDia;

#[test]
fn test_export_element_in_current_book() {
    init_test_logging();
    let book = TestBook::new();
    book.write_source("/img/network.dia");
    let fake = FakeDia::new();
    let exporter = DiagramExporter::new(BookResolver::new().with_book("/guide", book.root()))
        .with_profile(UnixProfile::new())
        .with_runner(fake.clone());

    let element = DiagramElement::builder()
        .id("dia1")
        .path("/img/network.dia")
        .width(0)
        .height(80)
        .build();
    assert_eq!(element.label().unwrap(), "network");

    let result = exporter
        .export_element(&element, "/guide", &book.cache_root())
        .unwrap();
    assert_eq!(
        result.artifact_path,
        book.canonical_cache_root()
            .join(NAMESPACE)
            .join("guide")
            .join("img")
            .join("network-_x80.png")
    );
    assert_eq!(fake.calls()[0].size_arg(), Some("x80"));
    assert_eq!((result.width, result.height), (160, 80));
}

#[test]
fn test_export_element_own_book_wins() {
    let book = TestBook::new();
    book.write_source("/a.dia");
    let fake = FakeDia::new();
    let exporter = DiagramExporter::new(BookResolver::new().with_book("/other", book.root()))
        .with_profile(UnixProfile::new())
        .with_runner(fake);

    let element = DiagramElement::builder()
        .book("/other")
        .path("/a.dia")
        .build();
    let result = exporter
        .export_element(&element, "/current", &book.cache_root())
        .unwrap();
    assert!(result
        .artifact_path
        .starts_with(book.canonical_cache_root().join(NAMESPACE).join("other")));
}

#[test]
fn test_export_element_without_path() {
    let book = TestBook::new();
    let fake = FakeDia::new();
    let exporter = DiagramExporter::new(BookResolver::new().with_book("", book.root()))
        .with_profile(UnixProfile::new())
        .with_runner(fake.clone());

    let element = DiagramElement::builder().label("Orphan").build();
    let result = exporter.export_element(&element, "", &book.cache_root());
    assert!(matches!(result, Err(DiaError::InvalidElement(_))));
    assert_eq!(fake.call_count(), 0);
}

#[test]
fn test_open_spawns_editor_detached() {
    let book = TestBook::new();
    let source = book.write_source("/a.dia");
    let fake = FakeDia::new();
    let exporter = DiagramExporter::new(BookResolver::new().with_book("", book.root()))
        .with_profile(UnixProfile::with_executable("/opt/dia/bin/dia"))
        .with_runner(fake.clone());

    let opened = exporter.open(&DiagramRef::root("/a.dia").unwrap()).unwrap();
    assert_eq!(opened, source.canonicalize().unwrap());

    let calls = fake.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].detached);
    assert_eq!(calls[0].program.display().to_string(), "/opt/dia/bin/dia");
    assert_eq!(calls[0].args, [opened.display().to_string()]);
}

#[test]
fn test_open_missing_source() {
    let book = TestBook::new();
    let fake = FakeDia::new();
    let exporter = DiagramExporter::new(BookResolver::new().with_book("", book.root()))
        .with_runner(fake.clone());

    let result = exporter.open(&DiagramRef::root("/nope.dia").unwrap());
    assert!(matches!(result, Err(DiaError::NotFound { .. })));
    assert_eq!(fake.call_count(), 0);
}

#[test]
fn test_configured_exporter_end_to_end() {
    let book = TestBook::new();
    book.write_source("/d/flow.dia");
    let config_path = book.dir.path().join("diacache.toml");
    fs::write(
        &config_path,
        r#"
cache_dir = "./cache"
dia_path = "/opt/dia/bin/dia"
timeout_secs = 7

[books]
"/manual" = "./book"
"#,
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    assert_eq!(config.cache_dir.as_deref(), Some(book.cache_root().as_path()));
    assert_eq!(config.books["/manual"], book.root());

    let fake = FakeDia::new();
    let exporter = config.exporter().with_runner(fake.clone());
    assert_eq!(exporter.timeout(), Some(Duration::from_secs(7)));

    let reference = DiagramRef::new("/manual", "/d/flow.dia").unwrap();
    let result = exporter
        .export(&reference, Some(100), Some(100), &config.cache_dir().unwrap())
        .unwrap();

    let call = &fake.calls()[0];
    assert_eq!(call.program.display().to_string(), "/opt/dia/bin/dia");
    assert_eq!(call.timeout, Some(Duration::from_secs(7)));
    assert_eq!((result.width, result.height), (100, 100));
    assert!(result.artifact_path.ends_with("manual/d/flow-100x100.png"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_load_effective_uses_default_location() {
    use crate::common::env::with_config_home;

    let dir = tempfile::TempDir::new().unwrap();
    let config_dir = dir.path().join("diacache");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "timeout_secs = 0\n").unwrap();

    let home = dir.path().display().to_string();
    let _guard = with_config_home(&home);
    let config = load_effective(None).unwrap();
    assert_eq!(config.timeout(), None);
}

#[cfg(target_os = "linux")]
#[test]
fn test_load_effective_defaults_without_file() {
    use crate::common::env::with_config_home;

    let dir = tempfile::TempDir::new().unwrap();
    let home = dir.path().display().to_string();
    let _guard = with_config_home(&home);
    let config = load_effective(None).unwrap();
    assert_eq!(config, diacache::config::ExporterConfig::default());
}

#[test]
fn test_load_effective_explicit_missing() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = load_effective(Some(&dir.path().join("missing.toml")));
    assert!(matches!(result, Err(DiaError::ConfigNotFound { .. })));
}
