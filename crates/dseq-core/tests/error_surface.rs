use dseq_core::errors::{codes, DseqError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("path", "/tmp/positions.txt")
        .with_context("reason", "example")
}

#[test]
fn source_error_surface() {
    let err = DseqError::source_not_found("position file", std::path::Path::new("/nope.txt"));
    assert!(err.info().is(codes::SOURCE_NOT_FOUND));
    assert_eq!(err.info().context.get("path").map(String::as_str), Some("/nope.txt"));
}

#[test]
fn process_error_surface() {
    let err = DseqError::Process(sample_info(codes::PROCESS_TIMEOUT, "sequence timed out"));
    assert_eq!(err.info().code, "process-timeout");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = DseqError::Filesystem(
        sample_info(codes::CONFIG_RESTORE_FAILURE, "restore failed").with_hint("check permissions"),
    );
    let text = err.to_string();
    assert!(text.starts_with("filesystem error: restore failed (code: config-restore-failure)"));
    assert!(text.contains("path=/tmp/positions.txt"));
    assert!(text.ends_with("| hint: check permissions"));
}

#[test]
fn into_info_returns_payload() {
    let err = DseqError::Manifest(sample_info(codes::SPECTRAL_MANIFEST_UNAVAILABLE, "no bands"));
    let info = err.into_info();
    assert_eq!(info.message, "no bands");
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = DseqError::Descriptor(ErrorInfo::new(codes::XML_WRITE, "broken"));
    let json = serde_json::to_value(&err).expect("json");
    assert_eq!(json["family"], "Descriptor");
    assert_eq!(json["detail"]["code"], "xml-write");
}
