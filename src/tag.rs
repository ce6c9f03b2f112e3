//! Tag identifiers and the registry that resolves tag names.
//!
//! A *tag* names one of the global systems that element contributions are routed into, for example
//! the steady residual, the time-derivative residual or the system Jacobian. Vector tags and matrix
//! tags live in separate namespaces, which is reflected by the distinct types [`VectorTagId`] and
//! [`MatrixTagId`].
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

/// Identifies a tagged global vector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VectorTagId(pub usize);

/// Identifies a tagged global matrix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatrixTagId(pub usize);

impl VectorTagId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl MatrixTagId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for VectorTagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for MatrixTagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolves tag names into tag ids.
///
/// The registry owns the set of tags. Consumers only ever hold ids, and must check that an id
/// exists before relying on it.
pub trait TagRegistry {
    /// Returns the id of the vector tag with the given name, or `None` if no such tag exists.
    fn vector_tag_id(&self, name: &str) -> Option<VectorTagId>;

    /// Returns the id of the matrix tag with the given name, or `None` if no such tag exists.
    fn matrix_tag_id(&self, name: &str) -> Option<MatrixTagId>;

    fn vector_tag_exists(&self, tag: VectorTagId) -> bool;

    fn matrix_tag_exists(&self, tag: MatrixTagId) -> bool;

    fn vector_tag_name_exists(&self, name: &str) -> bool {
        self.vector_tag_id(name).is_some()
    }

    fn matrix_tag_name_exists(&self, name: &str) -> bool {
        self.matrix_tag_id(name).is_some()
    }
}

impl<R: TagRegistry + ?Sized> TagRegistry for &R {
    fn vector_tag_id(&self, name: &str) -> Option<VectorTagId> {
        (**self).vector_tag_id(name)
    }

    fn matrix_tag_id(&self, name: &str) -> Option<MatrixTagId> {
        (**self).matrix_tag_id(name)
    }

    fn vector_tag_exists(&self, tag: VectorTagId) -> bool {
        (**self).vector_tag_exists(tag)
    }

    fn matrix_tag_exists(&self, tag: MatrixTagId) -> bool {
        (**self).matrix_tag_exists(tag)
    }
}

/// A simple in-memory tag registry.
///
/// Tag ids are assigned consecutively from zero in each namespace, so they can be used directly
/// to index per-tag storage.
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    vector_names: Vec<String>,
    vector_ids: FxHashMap<String, VectorTagId>,
    matrix_names: Vec<String>,
    matrix_ids: FxHashMap<String, MatrixTagId>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the tags that most residual/Jacobian evaluations need.
    ///
    /// The vector tags are `nontime` and `time`, the matrix tags are `nontime` and `system`.
    pub fn with_default_tags() -> Self {
        let mut table = Self::new();
        table.add_vector_tag("nontime");
        table.add_vector_tag("time");
        table.add_matrix_tag("nontime");
        table.add_matrix_tag("system");
        table
    }

    /// Registers a vector tag and returns its id.
    ///
    /// If a vector tag with the same name already exists, its id is returned instead.
    pub fn add_vector_tag(&mut self, name: &str) -> VectorTagId {
        if let Some(&id) = self.vector_ids.get(name) {
            return id;
        }
        let id = VectorTagId(self.vector_names.len());
        self.vector_names.push(name.to_string());
        self.vector_ids.insert(name.to_string(), id);
        id
    }

    /// Registers a matrix tag and returns its id.
    ///
    /// If a matrix tag with the same name already exists, its id is returned instead.
    pub fn add_matrix_tag(&mut self, name: &str) -> MatrixTagId {
        if let Some(&id) = self.matrix_ids.get(name) {
            return id;
        }
        let id = MatrixTagId(self.matrix_names.len());
        self.matrix_names.push(name.to_string());
        self.matrix_ids.insert(name.to_string(), id);
        id
    }

    pub fn vector_tag_name(&self, tag: VectorTagId) -> Option<&str> {
        self.vector_names.get(tag.index()).map(String::as_str)
    }

    pub fn matrix_tag_name(&self, tag: MatrixTagId) -> Option<&str> {
        self.matrix_names.get(tag.index()).map(String::as_str)
    }

    pub fn num_vector_tags(&self) -> usize {
        self.vector_names.len()
    }

    pub fn num_matrix_tags(&self) -> usize {
        self.matrix_names.len()
    }
}

impl TagRegistry for TagTable {
    fn vector_tag_id(&self, name: &str) -> Option<VectorTagId> {
        self.vector_ids.get(name).copied()
    }

    fn matrix_tag_id(&self, name: &str) -> Option<MatrixTagId> {
        self.matrix_ids.get(name).copied()
    }

    fn vector_tag_exists(&self, tag: VectorTagId) -> bool {
        tag.index() < self.vector_names.len()
    }

    fn matrix_tag_exists(&self, tag: MatrixTagId) -> bool {
        tag.index() < self.matrix_names.len()
    }
}
