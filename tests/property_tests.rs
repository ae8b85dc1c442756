//! Property-based tests using proptest.
//!
//! These tests verify invariants that must hold for all possible inputs,
//! finding edge cases that unit tests might miss.

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use callgraph::import::{select_newest, UploadedFile};
use callgraph::types::{normalize_column, FileRole, Method, MethodDescriptor};
use callgraph::viz::elements::{edge_element, node_element, ElementCollector};
use callgraph::viz::tree::{build_tree, TreeItem};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_descriptor() -> impl Strategy<Value = MethodDescriptor> {
    (
        "[a-z0-9]{1,6}",
        "[a-z]{1,8}",
        prop::option::of(prop_oneof![
            Just(String::new()),
            "[A-C][a-z]{0,3}".prop_map(String::from),
        ]),
    )
        .prop_map(|(id, name, parent)| MethodDescriptor { id, name, parent })
}

fn arb_role() -> impl Strategy<Value = FileRole> {
    prop_oneof![
        Just(FileRole::Methods),
        Just(FileRole::Invokes),
        Just(FileRole::Targets),
    ]
}

fn method(id: &str) -> Method {
    Method {
        graph: "g".into(),
        id: id.into(),
        name: format!("m{id}"),
        parent: None,
        is_entry_point: false,
        attributes: serde_json::Map::new(),
    }
}

// ---------------------------------------------------------------------------
// Tree builder
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every input method appears exactly once as a leaf.
    #[test]
    fn tree_leaf_count_equals_input(methods in prop::collection::vec(arb_descriptor(), 0..60)) {
        let tree = build_tree(&methods);
        let leaves: usize = tree.iter().map(TreeItem::leaf_count).sum();
        prop_assert_eq!(leaves, methods.len());
    }

    /// Groups are exactly the distinct non-empty grouping keys.
    #[test]
    fn tree_groups_are_distinct_keys(methods in prop::collection::vec(arb_descriptor(), 0..60)) {
        let tree = build_tree(&methods);
        let groups: Vec<&str> = tree
            .iter()
            .filter_map(|item| match item {
                TreeItem::Group { name, .. } => Some(name.as_str()),
                TreeItem::Leaf(_) => None,
            })
            .collect();
        let expected: BTreeSet<&str> = methods
            .iter()
            .filter_map(|m| m.parent.as_deref())
            .filter(|p| !p.is_empty())
            .collect();

        prop_assert_eq!(groups.len(), expected.len());
        prop_assert_eq!(groups.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    /// Top-level ids are unique even when a method id equals a grouping key.
    #[test]
    fn tree_top_level_ids_are_unique(
        methods in prop::collection::vec(arb_descriptor(), 0..60)
            .prop_map(|ms| {
                let mut seen = HashSet::new();
                ms.into_iter().filter(|m| seen.insert(m.id.clone())).collect::<Vec<_>>()
            }),
        clash in "[A-C][a-z]{0,3}",
    ) {
        let mut methods = methods;
        methods.push(MethodDescriptor { id: clash.clone(), name: "x".into(), parent: None });
        methods.push(MethodDescriptor { id: "0000000".into(), name: "y".into(), parent: Some(clash) });

        let tree = build_tree(&methods);
        let ids: Vec<&str> = tree
            .iter()
            .map(|item| match item {
                TreeItem::Group { id, .. } => id.as_str(),
                TreeItem::Leaf(leaf) => leaf.id.as_str(),
            })
            .collect();
        let distinct: HashSet<&str> = ids.iter().copied().collect();
        prop_assert_eq!(distinct.len(), ids.len());
    }
}

// ---------------------------------------------------------------------------
// File selection
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// With distinct timestamps, each role resolves to its newest file.
    #[test]
    fn selection_picks_greatest_timestamp(
        roles in prop::collection::vec(arb_role(), 3..20),
        seed in any::<u64>(),
    ) {
        // Guarantee each role at least once, then shuffle timestamps.
        let mut roles = roles;
        roles[0] = FileRole::Methods;
        roles[1] = FileRole::Invokes;
        roles[2] = FileRole::Targets;

        let files: Vec<UploadedFile> = roles
            .iter()
            .enumerate()
            .map(|(i, role)| {
                let ts = (i as i64 * 7919 + seed as i64 % 1000).rem_euclid(100_003);
                UploadedFile::new(format!("{i}_{role}.csv"), ts, Vec::new())
            })
            .collect();
        let distinct: HashSet<i64> = files.iter().map(|f| f.timestamp).collect();
        prop_assume!(distinct.len() == files.len());

        let selected = select_newest(&files).unwrap();
        for role in FileRole::ALL {
            let best = files
                .iter()
                .filter(|f| role.matches(&f.file_name))
                .map(|f| f.timestamp)
                .max()
                .unwrap();
            prop_assert_eq!(selected.get(role).timestamp, best);
        }
    }

    /// Selection never errors when every role is present.
    #[test]
    fn selection_succeeds_with_all_roles(extra in prop::collection::vec(arb_role(), 0..10)) {
        let mut files: Vec<UploadedFile> = FileRole::ALL
            .iter()
            .map(|r| UploadedFile::new(format!("{r}.csv"), 0, Vec::new()))
            .collect();
        files.extend(extra.iter().map(|r| UploadedFile::new(format!("x_{r}.csv"), 1, Vec::new())));
        prop_assert!(select_newest(&files).is_ok());
    }
}

// ---------------------------------------------------------------------------
// Element collapsing
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Repeated node ids and (source, target) pairs collapse to one element.
    #[test]
    fn collector_collapses_by_key(
        ids in prop::collection::vec("[a-e]", 0..40),
        pairs in prop::collection::vec(("[a-e]", "[a-e]"), 0..40),
    ) {
        let mut collector = ElementCollector::new();
        for id in &ids {
            collector.add_node(node_element(&method(id)));
        }
        for (s, t) in &pairs {
            collector.add_edge(edge_element(s, t, Some(1)));
        }

        let distinct_ids: HashSet<&String> = ids.iter().collect();
        let distinct_pairs: HashSet<&(String, String)> = pairs.iter().collect();
        let set = collector.finish();
        prop_assert_eq!(set.nodes.len(), distinct_ids.len());
        prop_assert_eq!(set.edges.len(), distinct_pairs.len());
    }
}

// ---------------------------------------------------------------------------
// Header normalization
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn normalize_column_is_idempotent(name in "[A-Za-z_ -]{0,16}") {
        let once = normalize_column(&name);
        prop_assert_eq!(normalize_column(&once), once.clone());
        prop_assert!(!once.contains(['_', '-', ' ']));
    }
}
