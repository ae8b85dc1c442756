//! Method tree for the UI sidebar.
//!
//! Methods sharing a grouping key (their containing class/type) become the
//! children of one group item; methods without a key sit at the top level.
//! Input order is preserved, so the caller decides the sort.
//!
//! Group ids carry [`GROUP_ID_PREFIX`] so they never collide with a method
//! id at the same level; the bare key is the group's `name`.

use std::collections::HashMap;

use serde::Serialize;

use crate::types::MethodDescriptor;

pub const GROUP_ID_PREFIX: &str = "group:";

/// A method leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeLeaf {
    pub id: String,
    pub name: String,
}

/// One top-level tree item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TreeItem {
    Group {
        id: String,
        name: String,
        children: Vec<TreeLeaf>,
    },
    Leaf(TreeLeaf),
}

impl TreeItem {
    /// Number of methods under this item.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Group { children, .. } => children.len(),
            Self::Leaf(_) => 1,
        }
    }
}

/// Group `methods` by their grouping key.
///
/// Groups appear in order of first occurrence; an empty key counts as no
/// key.
pub fn build_tree(methods: &[MethodDescriptor]) -> Vec<TreeItem> {
    let mut items: Vec<TreeItem> = Vec::new();
    let mut group_index: HashMap<&str, usize> = HashMap::new();

    for method in methods {
        let leaf = TreeLeaf {
            id: method.id.clone(),
            name: method.name.clone(),
        };

        let key = match method.parent.as_deref() {
            Some(k) if !k.is_empty() => k,
            _ => {
                items.push(TreeItem::Leaf(leaf));
                continue;
            }
        };

        match group_index.get(key) {
            Some(&idx) => {
                if let TreeItem::Group { children, .. } = &mut items[idx] {
                    children.push(leaf);
                }
            }
            None => {
                group_index.insert(key, items.len());
                items.push(TreeItem::Group {
                    id: format!("{GROUP_ID_PREFIX}{key}"),
                    name: key.to_string(),
                    children: vec![leaf],
                });
            }
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn desc(id: &str, name: &str, parent: Option<&str>) -> MethodDescriptor {
        MethodDescriptor {
            id: id.into(),
            name: name.into(),
            parent: parent.map(String::from),
        }
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(build_tree(&[]).is_empty());
    }

    #[test]
    fn groups_by_parent_and_keeps_order() {
        let tree = build_tree(&[
            desc("0", "main", None),
            desc("1", "a", Some("Foo")),
            desc("2", "b", Some("Foo")),
            desc("3", "c", Some("Bar")),
        ]);

        assert_eq!(tree.len(), 3);
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!([
                { "id": "0", "name": "main" },
                {
                    "id": "group:Foo",
                    "name": "Foo",
                    "children": [
                        { "id": "1", "name": "a" },
                        { "id": "2", "name": "b" }
                    ]
                },
                { "id": "group:Bar", "name": "Bar", "children": [{ "id": "3", "name": "c" }] }
            ])
        );
    }

    #[test]
    fn empty_parent_is_top_level() {
        let tree = build_tree(&[desc("1", "a", Some("")), desc("2", "b", None)]);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|item| matches!(item, TreeItem::Leaf(_))));
    }

    #[test]
    fn group_id_does_not_clash_with_method_id() {
        let tree = build_tree(&[desc("Util", "x", None), desc("1", "y", Some("Util"))]);
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!([
                { "id": "Util", "name": "x" },
                { "id": "group:Util", "name": "Util", "children": [{ "id": "1", "name": "y" }] }
            ])
        );
    }

    #[test]
    fn non_adjacent_keys_still_share_a_group() {
        let tree = build_tree(&[
            desc("1", "a", Some("Foo")),
            desc("2", "b", Some("Bar")),
            desc("3", "c", Some("Foo")),
        ]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].leaf_count(), 2);
        assert_eq!(tree.iter().map(TreeItem::leaf_count).sum::<usize>(), 3);
    }
}
