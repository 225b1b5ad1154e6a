//! Typed tag keys declared with `tag_keys!`.

#![allow(deprecated)]

use bevy_tagpack::{RegistryKey, TagId, tag_keys};

tag_keys! {
    /// Block tags used by these tests.
    pub mod BlockTags for "block" {
        /// Every log block.
        LOGS = "minecraft:logs";
        MINEABLE_AXE = "mineable/axe";
        #[deprecated(note = "use LOGS")]
        WOOD = "mymod:wood";
    }
}

tag_keys! {
    mod BiomeTags for "worldgen/biome" {
        IS_OCEAN = "is_ocean";
    }
}

#[test]
fn constants_match_parsed_ids() {
    let block = RegistryKey::from_static("block");
    assert_eq!(BlockTags::LOGS, TagId::parse(block.clone(), "logs").unwrap());
    assert_eq!(BlockTags::MINEABLE_AXE, TagId::parse(block.clone(), "minecraft:mineable/axe").unwrap());
    assert_eq!(BlockTags::WOOD, TagId::parse(block, "mymod:wood").unwrap());
    assert_eq!(
        BiomeTags::IS_OCEAN.registry(),
        &RegistryKey::new("worldgen/biome").unwrap()
    );
}

#[test]
fn all_lists_keys_in_declaration_order() {
    assert_eq!(BlockTags::REGISTRY, "block");
    assert_eq!(BlockTags::COUNT, 3);
    let paths: Vec<&str> = BlockTags::ALL.iter().map(|id| id.location().path()).collect();
    assert_eq!(paths, vec!["logs", "mineable/axe", "wood"]);
}
