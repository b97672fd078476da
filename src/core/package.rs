//! PackageTree - the declared package nesting of the install tree.
//!
//! Nodes live in a flat arena and refer to each other by `NodeId`. The root
//! node stands for the top of the install tree and has an empty name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::artifact::ArtifactId;
use crate::errors::LayoutError;

/// Index of a node in a `PackageTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// A position in the install tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNode {
    /// Dotted package name, empty for the root
    pub dotted: String,

    /// Directory relative to the install root
    pub dir: PathBuf,

    pub parent: Option<NodeId>,

    pub children: Vec<NodeId>,
}

impl PackageNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// The package tree artifacts attach to.
#[derive(Debug, Clone)]
pub struct PackageTree {
    nodes: Vec<PackageNode>,
    by_name: HashMap<String, NodeId>,
}

impl Default for PackageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageTree {
    /// Create a tree with only the root.
    pub fn new() -> Self {
        PackageTree {
            nodes: vec![PackageNode {
                dotted: String::new(),
                dir: PathBuf::new(),
                parent: None,
                children: Vec::new(),
            }],
            by_name: HashMap::new(),
        }
    }

    /// Build a tree from dotted package names. Intermediate packages are
    /// created as needed, so `["mypkg.sub"]` also declares `mypkg`.
    pub fn from_names<I, S>(names: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = Self::new();
        for name in names {
            tree.add(name.as_ref())?;
        }
        Ok(tree)
    }

    /// Declare a package and all its ancestors.
    pub fn add(&mut self, dotted: &str) -> Result<NodeId, LayoutError> {
        let id = ArtifactId::parse(dotted).map_err(|reason| LayoutError::MalformedArtifact {
            identity: dotted.to_string(),
            reason: format!("invalid package name: {}", reason),
        })?;

        let mut current = self.root();
        let mut name = String::new();
        for segment in id.as_str().split('.') {
            if !name.is_empty() {
                name.push('.');
            }
            name.push_str(segment);

            current = match self.by_name.get(&name) {
                Some(&node) => node,
                None => {
                    let node = NodeId(self.nodes.len());
                    let dir = self.nodes[current.0].dir.join(segment);
                    self.nodes.push(PackageNode {
                        dotted: name.clone(),
                        dir,
                        parent: Some(current),
                        children: Vec::new(),
                    });
                    self.nodes[current.0].children.push(node);
                    self.by_name.insert(name.clone(), node);
                    node
                }
            };
        }

        Ok(current)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, node: NodeId) -> &PackageNode {
        &self.nodes[node.0]
    }

    /// Find a declared package by dotted name.
    pub fn find(&self, dotted: &str) -> Option<NodeId> {
        if dotted.is_empty() {
            return Some(self.root());
        }
        self.by_name.get(dotted).copied()
    }

    pub fn contains(&self, dotted: &str) -> bool {
        self.by_name.contains_key(dotted)
    }

    pub fn dir(&self, node: NodeId) -> &Path {
        &self.nodes[node.0].dir
    }

    /// Display name of a node, `<root>` for the root.
    pub fn display_name(&self, node: NodeId) -> &str {
        let node = &self.nodes[node.0];
        if node.is_root() {
            "<root>"
        } else {
            &node.dotted
        }
    }

    /// Every declared package name, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The node that owns an extension module: the package named by its
    /// dotted parent, or the root for top-level modules.
    pub fn owner_of(&self, id: &ArtifactId) -> Option<NodeId> {
        match id.parent() {
            None => Some(self.root()),
            Some(parent) => self.find(parent),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}
