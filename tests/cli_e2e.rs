use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn schemaflow_bin() -> &'static str {
    env!("CARGO_BIN_EXE_schemaflow")
}

fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "schemaflow-cli-e2e-{tag}-{}-{ts}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_schemaflow(args: &[&str]) -> Output {
    Command::new(schemaflow_bin())
        .args(args)
        .output()
        .expect("run schemaflow")
}

fn write_xsd(path: &Path, xsd: &str) {
    fs::write(path, xsd).expect("write xsd");
}

const MAIN_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:lib="urn:library" targetNamespace="urn:library">
  <xs:include schemaLocation="common.xsd"/>
  <xs:complexType name="Book">
    <xs:sequence>
      <xs:element name="title" type="xs:string"/>
    </xs:sequence>
    <xs:attributeGroup ref="lib:ids"/>
  </xs:complexType>
  <xs:element name="book" type="lib:Book"/>
</xs:schema>
"#;

const COMMON_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           targetNamespace="urn:library">
  <xs:attributeGroup name="ids">
    <xs:attribute name="id" type="xs:ID"/>
  </xs:attributeGroup>
</xs:schema>
"#;

fn library(tag: &str) -> PathBuf {
    let dir = test_temp_dir(tag);
    write_xsd(&dir.join("main.xsd"), MAIN_XSD);
    write_xsd(&dir.join("common.xsd"), COMMON_XSD);
    dir.join("main.xsd")
}

#[test]
fn cli_outline_lists_registries() {
    let main = library("outline");
    let out = run_schemaflow(&["outline", main.to_str().unwrap()]);
    assert!(out.status.success(), "outline failed: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).expect("utf-8 stdout");
    assert!(stdout.contains("main.xsd"), "{stdout}");
    assert!(stdout.contains("common.xsd"), "{stdout}");
    assert!(stdout.contains("elements: 1"), "{stdout}");
    assert!(stdout.contains("{urn:library}Book"), "{stdout}");
    assert!(stdout.contains("attributeGroups: 1"), "{stdout}");
    assert!(!stdout.contains("unresolved"), "{stdout}");
}

#[test]
fn cli_outline_json() {
    let main = library("outline-json");
    let out = run_schemaflow(&["outline", main.to_str().unwrap(), "--json"]);
    assert!(out.status.success(), "outline failed: {}", String::from_utf8_lossy(&out.stderr));

    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("valid json");
    assert_eq!(value["documents"].as_array().map(Vec::len), Some(2));
    assert_eq!(value["documents"][0]["targetNamespace"], "urn:library");
    assert_eq!(value["registries"]["elements"][0], "{urn:library}book");
    assert_eq!(value["registries"]["attributeGroups"][0], "{urn:library}ids");
    assert_eq!(value["diagnostics"].as_array().map(Vec::len), Some(0));
}

#[test]
fn cli_outline_reports_unresolved_references() {
    let dir = test_temp_dir("unresolved");
    let path = dir.join("broken.xsd");
    write_xsd(
        &path,
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="a" type="Missing"/>
</xs:schema>"#,
    );
    let out = run_schemaflow(&["outline", path.to_str().unwrap()]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("unresolved type"), "{stdout}");
    assert!(stdout.contains("Missing"), "{stdout}");
}

#[test]
fn cli_text_prints_document() {
    let main = library("text");
    let out = run_schemaflow(&["text", main.to_str().unwrap()]);
    assert!(out.status.success(), "text failed: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim_end(), MAIN_XSD.trim_end());
}

#[test]
fn cli_fragment_prints_subtree() {
    let main = library("fragment");
    let out = run_schemaflow(&[
        "fragment",
        main.to_str().unwrap(),
        "--line",
        "4",
        "--column",
        "3",
    ]);
    assert!(out.status.success(), "fragment failed: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("<xs:complexType name=\"Book\""), "{stdout}");
    assert!(stdout.contains("xmlns:lib=\"urn:library\""), "{stdout}");
    assert!(stdout.trim_end().ends_with("</xs:complexType>"), "{stdout}");
}

#[test]
fn cli_fragment_miss_exits_with_error() {
    let main = library("fragment-miss");
    let out = run_schemaflow(&[
        "fragment",
        main.to_str().unwrap(),
        "--line",
        "4",
        "--column",
        "4",
    ]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Fehler"), "{stderr}");
    assert!(stderr.contains(":4:4"), "{stderr}");
}

#[test]
fn cli_remote_locator_is_rejected() {
    let out = run_schemaflow(&["text", "http://example.org/schema.xsd"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unsupported"));
}
