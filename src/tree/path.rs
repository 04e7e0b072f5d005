// src/tree/path.rs

use std::fmt;

/// A sequence of names locating a node along one axis.
///
/// - global: every ancestor name, root first.
/// - sample: `samples/<sample>` for nodes below a sample root, else empty.
/// - algorithm: like global, but with the sample name removed, so the same
///   task in two samples shares one algorithm path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// A new path with `name` appended.
    pub fn join(&self, name: &str) -> NodePath {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        NodePath(segments)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl From<Vec<String>> for NodePath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}
