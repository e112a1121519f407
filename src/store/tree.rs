//! Derived folder/file tree over the store's path set

use serde::Serialize;

/// Node in the derived file tree
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    /// Slash-join of the ancestors' names and this node's name
    pub path: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Folder { children: Vec<TreeNode> },
    File,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn children(&self) -> &[TreeNode] {
        match &self.kind {
            NodeKind::Folder { children } => children,
            NodeKind::File => &[],
        }
    }
}

/// Build the tree for a set of normalized paths.
///
/// Roots and every folder's children are ordered folders first, then by name.
pub fn build_tree<'a, I>(paths: I) -> Vec<TreeNode>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut roots: Vec<TreeNode> = Vec::new();

    for path in paths {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }
        insert(&mut roots, &segments, String::new());
    }

    sort_nodes(&mut roots);
    roots
}

fn insert(level: &mut Vec<TreeNode>, segments: &[&str], prefix: String) {
    let name = segments[0];
    let path = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    };

    if segments.len() == 1 {
        level.push(TreeNode {
            name: name.to_string(),
            path,
            kind: NodeKind::File,
        });
        return;
    }

    let position = level
        .iter()
        .position(|n| n.is_folder() && n.name == name);
    let index = match position {
        Some(index) => index,
        None => {
            level.push(TreeNode {
                name: name.to_string(),
                path: path.clone(),
                kind: NodeKind::Folder {
                    children: Vec::new(),
                },
            });
            level.len() - 1
        }
    };

    if let NodeKind::Folder { children } = &mut level[index].kind {
        insert(children, &segments[1..], path);
    }
}

fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        b.is_folder()
            .cmp(&a.is_folder())
            .then_with(|| a.name.cmp(&b.name))
    });
    for node in nodes.iter_mut() {
        if let NodeKind::Folder { children } = &mut node.kind {
            sort_nodes(children);
        }
    }
}

/// Flatten the tree back into file paths, depth-first in display order
pub fn file_paths(nodes: &[TreeNode]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        match &node.kind {
            NodeKind::File => out.push(node.path.clone()),
            NodeKind::Folder { children } => out.extend(file_paths(children)),
        }
    }
    out
}
