//! Integration tests for bevy-tagpack-fs.

use bevy_tagpack::{ElementRegistry, RegistryKey, ResourceLocation, TagId};
use bevy_tagpack_fs::{DirectoryProvider, PackConfig, load_registry};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const LOGS: TagId = TagId::from_static("block", "minecraft", "logs");
const FUEL: TagId = TagId::from_static("block", "minecraft", "fuel");

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn blocks() -> ElementRegistry {
    ElementRegistry::build(
        RegistryKey::from_static("block"),
        ["oak_log", "birch_log", "spruce_log", "coal_block"]
            .into_iter()
            .map(|n| ResourceLocation::parse(n).unwrap()),
    )
    .unwrap()
}

fn names(elements: &[bevy_tagpack::Holder]) -> Vec<String> {
    elements.iter().map(|h| h.location().path().to_string()).collect()
}

/// Pack with three layers: vanilla, a disabled experiment, and an override.
fn setup_pack() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::write(
        root.join("tagpack.toml"),
        r#"
registries = ["block"]

[[layers]]
name = "vanilla"
path = "packs/vanilla"

[[layers]]
name = "experiment"
path = "packs/experiment"
enabled = false

[[layers]]
name = "mymod"
path = "packs/mymod"
"#,
    )
    .unwrap();

    write(
        root,
        "packs/vanilla/data/minecraft/tags/block/logs.json",
        r#"{"values": ["oak_log", "birch_log"]}"#,
    );
    write(
        root,
        "packs/vanilla/data/minecraft/tags/block/fuel.json",
        r##"{"values": ["#logs", "coal_block"]}"##,
    );
    write(
        root,
        "packs/experiment/data/minecraft/tags/block/logs.json",
        r#"{"replace": true, "values": ["coal_block"]}"#,
    );
    write(
        root,
        "packs/mymod/data/minecraft/tags/block/logs.json",
        r#"{"values": ["spruce_log", {"id": "mymod:palm_log", "required": false}]}"#,
    );

    let config = root.join("tagpack.toml");
    (dir, config)
}

#[test]
fn relative_layer_paths_resolve_against_config() {
    let (dir, config_path) = setup_pack();
    let config = PackConfig::from_file(&config_path).unwrap();

    assert_eq!(config.layers()[0].path, dir.path().join("packs/vanilla"));
}

#[test]
fn layers_apply_in_config_order() {
    let (_dir, config_path) = setup_pack();
    let config = PackConfig::from_file(&config_path).unwrap();
    let provider = DirectoryProvider::from_config(&config);
    assert_eq!(provider.layer_count(), 2);

    let registry = blocks();
    let result = load_registry(&provider, &registry);

    assert!(result.failures.is_empty());
    assert_eq!(
        names(result.tags.get(&LOGS).unwrap()),
        vec!["oak_log", "birch_log", "spruce_log"]
    );
    assert_eq!(
        names(result.tags.get(&FUEL).unwrap()),
        vec!["oak_log", "birch_log", "spruce_log", "coal_block"]
    );
}

#[test]
fn replace_in_higher_layer_discards_lower_entries() {
    let (dir, _config) = setup_pack();
    let root = dir.path();
    write(
        root,
        "packs/mymod/data/minecraft/tags/block/logs.json",
        r#"{"replace": true, "values": ["spruce_log"]}"#,
    );

    let provider = DirectoryProvider::new()
        .with_layer("vanilla", root.join("packs/vanilla"))
        .with_layer("mymod", root.join("packs/mymod"));
    let result = load_registry(&provider, &blocks());

    assert_eq!(names(result.tags.get(&LOGS).unwrap()), vec!["spruce_log"]);
}

#[test]
fn malformed_document_skips_only_that_layer() {
    let (dir, _config) = setup_pack();
    let root = dir.path();
    write(root, "packs/mymod/data/minecraft/tags/block/logs.json", "{ not json");

    let provider = DirectoryProvider::new()
        .with_layer("vanilla", root.join("packs/vanilla"))
        .with_layer("mymod", root.join("packs/mymod"));
    let result = load_registry(&provider, &blocks());

    assert_eq!(result.document_failures.len(), 1);
    assert_eq!(result.document_failures[0].source.as_str(), "mymod");
    assert_eq!(names(result.tags.get(&LOGS).unwrap()), vec!["oak_log", "birch_log"]);
}

#[test]
fn missing_required_element_fails_tag_and_dependents() {
    let (dir, _config) = setup_pack();
    let root = dir.path();
    write(
        root,
        "packs/mymod/data/minecraft/tags/block/logs.json",
        r#"{"values": ["mymod:palm_log"]}"#,
    );

    let provider = DirectoryProvider::new()
        .with_layer("vanilla", root.join("packs/vanilla"))
        .with_layer("mymod", root.join("packs/mymod"));
    let result = load_registry(&provider, &blocks());

    assert!(result.tags.get(&LOGS).is_none());
    assert!(result.tags.get(&FUEL).is_none());
    let failure = result.failure(&LOGS).unwrap();
    assert_eq!(failure.missing.len(), 1);
    assert_eq!(failure.missing[0].source.as_str(), "mymod");
}

#[test]
fn missing_config_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = PackConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, bevy_tagpack_fs::PackConfigError::Io { .. }));
}
