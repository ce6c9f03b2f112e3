//! Errors raised while binding tags.
use crate::tag::{MatrixTagId, VectorTagId};
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Identifies a requested tag either by name or by raw id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKey {
    Name(String),
    Id(usize),
}

impl Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKey::Name(name) => write!(f, "'{}'", name),
            TagKey::Id(id) => write!(f, "with id {}", id),
        }
    }
}

impl From<&str> for TagKey {
    fn from(name: &str) -> Self {
        TagKey::Name(name.to_string())
    }
}

impl From<VectorTagId> for TagKey {
    fn from(tag: VectorTagId) -> Self {
        TagKey::Id(tag.index())
    }
}

impl From<MatrixTagId> for TagKey {
    fn from(tag: MatrixTagId) -> Self {
        TagKey::Id(tag.index())
    }
}

/// Error produced when the tags requested by an object cannot be bound.
///
/// All variants describe a misconfiguration. `owner` is the name of the object that requested
/// the tags.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagError {
    /// No primary vector tag was requested.
    EmptyVectorTags { owner: String },
    /// No primary matrix tag was requested.
    EmptyMatrixTags { owner: String },
    /// The requested vector tag is not known to the registry.
    UnknownVectorTag { owner: String, tag: TagKey },
    /// The requested matrix tag is not known to the registry.
    UnknownMatrixTag { owner: String, tag: TagKey },
}

impl TagError {
    /// The name of the object whose tags failed to bind.
    pub fn owner(&self) -> &str {
        match self {
            TagError::EmptyVectorTags { owner }
            | TagError::EmptyMatrixTags { owner }
            | TagError::UnknownVectorTag { owner, .. }
            | TagError::UnknownMatrixTag { owner, .. } => owner,
        }
    }
}

impl Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagError::EmptyVectorTags { owner } => {
                write!(f, "At least one vector tag must be provided for {}", owner)
            }
            TagError::EmptyMatrixTags { owner } => {
                write!(f, "At least one matrix tag must be provided for {}", owner)
            }
            TagError::UnknownVectorTag { owner, tag } => {
                write!(f, "Vector tag {} requested by {} does not exist", tag, owner)
            }
            TagError::UnknownMatrixTag { owner, tag } => {
                write!(f, "Matrix tag {} requested by {} does not exist", tag, owner)
            }
        }
    }
}

impl Error for TagError {}
