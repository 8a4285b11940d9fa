use std::fs;

use dseq_core::codes;
use dseq_run::soil_ref::{backup_path, rewrite_identity};
use dseq_run::SoilReferenceGuard;
use tempfile::tempdir;


#[test]
fn rewrite_touches_only_the_identity() {
    let (patched, previous) = rewrite_identity(fixtures::MAKET, "loam").unwrap();
    assert_eq!(previous, "base_soil");
    assert_eq!(
        patched,
        fixtures::MAKET.replace("ident=\"base_soil\"", "ident=\"loam\"")
    );
}

#[test]
fn rewrite_without_link_fails() {
    let err = rewrite_identity("<DartFile><Maket/></DartFile>", "loam").unwrap_err();
    assert!(err.is(codes::SOIL_REFERENCE_PATCH));
}

#[test]
fn guard_restores_original_on_drop() {
    let dir = tempdir().unwrap();
    let maket = dir.path().join("maket.xml");
    fs::write(&maket, fixtures::MAKET).unwrap();
    {
        let guard = SoilReferenceGuard::acquire(&maket).unwrap();
        assert_eq!(guard.backup(), backup_path(&maket));
        guard.patch("clay").unwrap();
        assert!(fs::read_to_string(&maket).unwrap().contains("ident=\"clay\""));
    }
    assert_eq!(fs::read_to_string(&maket).unwrap(), fixtures::MAKET);
    assert!(!dir.path().join("maket.xml.backup").exists());
}

#[test]
fn existing_backup_is_kept_as_the_original() {
    let dir = tempdir().unwrap();
    let maket = dir.path().join("maket.xml");
    let stale = fixtures::MAKET.replace("base_soil", "left_over");
    fs::write(&maket, &stale).unwrap();
    fs::write(dir.path().join("maket.xml.backup"), fixtures::MAKET).unwrap();

    let guard = SoilReferenceGuard::acquire(&maket).unwrap();
    assert_eq!(guard.patch("sand").unwrap(), "left_over");
    guard.restore().unwrap();
    assert_eq!(fs::read_to_string(&maket).unwrap(), fixtures::MAKET);
}
