//! Naming and projection properties

use metabase_git_sync::model::{NodeId, RemoteNode, COLLECTION_KIND};
use metabase_git_sync::tree::path::{directory_name, leaf_body_file, leaf_metadata_file};
use metabase_git_sync::tree::{Tree, ITEMS_KEY};
use proptest::prelude::*;
use serde_json::json;
use std::collections::HashSet;

proptest! {
    /// A directory name is a single path segment that starts with the id.
    #[test]
    fn directory_name_is_one_segment(id in 1u64..1_000_000, slug in ".{0,40}") {
        let name = directory_name(&NodeId::from(id), Some(slug.as_str()));
        prop_assert!(!name.contains('/'));
        prop_assert!(!name.contains('\\'));
        prop_assert!(!name.contains('\0'));
        prop_assert!(name.starts_with(&id.to_string()));
    }

    /// Distinct ids never share a directory, whatever the slugs.
    #[test]
    fn distinct_ids_get_distinct_names(
        entries in proptest::collection::btree_map(1u64..10_000, "[a-z-]{0,12}", 1..40)
    ) {
        let names: HashSet<String> = entries
            .iter()
            .map(|(id, slug)| directory_name(&NodeId::from(*id), Some(slug.as_str())))
            .collect();
        prop_assert_eq!(names.len(), entries.len());
    }

    /// Leaf file names are stable functions of kind and id.
    #[test]
    fn leaf_names_are_deterministic(id in 1u64..1_000_000, kind in "[a-z]{1,10}") {
        let id = NodeId::from(id);
        prop_assert_eq!(leaf_metadata_file(&kind, &id), format!("{}-{}-metadata.json", kind, id));
        prop_assert_eq!(leaf_body_file(&kind, &id), format!("{}-{}.sql", kind, id));
    }

    /// Every expanded node's projection lists exactly its children, in order.
    #[test]
    fn projection_mirrors_children(child_ids in proptest::collection::vec(100u64..200, 0..20)) {
        let mut tree = Tree::new();
        let root = tree.push_root(
            RemoteNode::from_value(json!({"id": 1}), COLLECTION_KIND).unwrap(),
        );
        tree.mark_expanded(root);
        for id in &child_ids {
            tree.push_child(
                root,
                RemoteNode::from_value(json!({"id": id, "model": "card"}), COLLECTION_KIND).unwrap(),
            );
        }

        let projections = tree.projections();
        let items = projections[root][ITEMS_KEY].as_array().unwrap();
        let listed: Vec<u64> = items.iter().map(|v| v["id"].as_u64().unwrap()).collect();
        prop_assert_eq!(listed, child_ids);
    }
}
