// Extraction and relocation working together on a staging tree


use quantum_launcher::error::{ExtractError, MoveError};
use quantum_launcher::extract;
use quantum_launcher::relocate;
use test_helpers::{TestEnvironment, zip_bytes};

#[test]
fn test_source_zipball_lands_flattened_in_version_slot() {
    let env = TestEnvironment::new();
    let paths = env.paths();
    let archive = env.temp.join("0.0.1-indev.zip");
    std::fs::write(
        &archive,
        zip_bytes(&[
            ("QuantumVoxel-game-abc123/", b""),
            ("QuantumVoxel-game-abc123/gradlew", b"#!/bin/sh"),
            ("QuantumVoxel-game-abc123/lwjgl3/build.gradle", b"// lwjgl3"),
        ]),
    )
    .unwrap();

    let staging = paths.staging_dir("0.0.1-indev");
    extract::extract_zip(&archive, &staging, "").unwrap();
    let top = relocate::single_child_dir(&staging).unwrap().unwrap();
    relocate::move_tree(&top, &paths.version_dir("0.0.1-indev")).unwrap();

    let installed = paths.version_dir("0.0.1-indev");
    assert!(installed.join("gradlew").is_file());
    assert!(installed.join("lwjgl3/build.gradle").is_file());
    assert!(!installed.join("QuantumVoxel-game-abc123").exists());
}

#[test]
fn test_prefix_strip_only_keeps_matching_entries() {
    let env = TestEnvironment::new();
    let archive = env.temp.join("pkg.zip");
    std::fs::write(
        &archive,
        zip_bytes(&[
            ("foo/a.txt", b"a"),
            ("foo/bar/b.txt", b"b"),
            ("other/c.txt", b"c"),
        ]),
    )
    .unwrap();
    let dest = env.temp.join("out");

    extract::extract_zip(&archive, &dest, "foo/").unwrap();

    let mut found: Vec<String> = walkdir::WalkDir::new(&dest)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(&dest)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    found.sort();
    assert_eq!(found, vec!["a.txt", "bar/b.txt"]);
}

#[test]
fn test_failed_extraction_leaves_version_slot_untouched() {
    let env = TestEnvironment::new();
    let paths = env.paths();
    let archive = env.temp.join("1.2.0.zip");
    std::fs::write(&archive, b"truncated").unwrap();

    let err = extract::extract_zip(&archive, &paths.staging_dir("1.2.0"), "").unwrap_err();
    assert!(matches!(err, ExtractError::Failed { .. }));
    assert!(!paths.version_dir("1.2.0").exists());

    let err = extract::extract_zip(&env.temp.join("gone.zip"), &env.temp, "").unwrap_err();
    assert!(matches!(err, ExtractError::NotFound(_)));
}

#[test]
fn test_move_onto_installed_version_is_refused() {
    let env = TestEnvironment::new();
    let paths = env.paths();
    let installed = paths.version_dir("1.2.0");
    std::fs::create_dir_all(installed.join("lib")).unwrap();
    std::fs::write(installed.join("lib/game.jar"), b"v1").unwrap();

    let staging = paths.staging_dir("1.2.0");
    std::fs::create_dir_all(staging.join("lib")).unwrap();
    std::fs::write(staging.join("lib/game.jar"), b"v2").unwrap();

    for _ in 0..3 {
        let err = relocate::move_tree(&staging, &installed).unwrap_err();
        assert!(matches!(err, MoveError::DestinationExists(_)));
    }
    assert_eq!(std::fs::read(installed.join("lib/game.jar")).unwrap(), b"v1");
}
