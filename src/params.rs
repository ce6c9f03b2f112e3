//! Tag selection parameters for objects that contribute residuals and Jacobians.
use serde::{Deserialize, Serialize};

/// Selects which tagged vectors and matrices an object contributes to.
///
/// `vector_tags` and `matrix_tags` are the primary selection and must each name at least one
/// tag. The `extra_*` lists supplement the primary selection and may be empty.
///
/// Missing fields take their default values when deserializing, so an empty map yields the
/// same parameters as [`TagParameters::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagParameters {
    pub vector_tags: Vec<String>,
    pub matrix_tags: Vec<String>,
    pub extra_vector_tags: Vec<String>,
    pub extra_matrix_tags: Vec<String>,
}

impl Default for TagParameters {
    fn default() -> Self {
        Self {
            vector_tags: vec!["nontime".to_string()],
            matrix_tags: vec!["system".to_string()],
            extra_vector_tags: Vec::new(),
            extra_matrix_tags: Vec::new(),
        }
    }
}

impl TagParameters {
    /// Replaces the primary vector tag selection.
    pub fn with_vector_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vector_tags = names.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the primary matrix tag selection.
    pub fn with_matrix_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.matrix_tags = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_vector_tag(mut self, name: impl Into<String>) -> Self {
        self.extra_vector_tags.push(name.into());
        self
    }

    pub fn with_extra_matrix_tag(mut self, name: impl Into<String>) -> Self {
        self.extra_matrix_tags.push(name.into());
        self
    }

    /// All requested vector tag names, primary selection first.
    pub fn all_vector_tags(&self) -> impl Iterator<Item = &str> {
        self.vector_tags
            .iter()
            .chain(&self.extra_vector_tags)
            .map(String::as_str)
    }

    /// All requested matrix tag names, primary selection first.
    pub fn all_matrix_tags(&self) -> impl Iterator<Item = &str> {
        self.matrix_tags
            .iter()
            .chain(&self.extra_matrix_tags)
            .map(String::as_str)
    }
}
