//! Routing of local element blocks into tagged global systems.
//!
//! An object that contributes to residuals and Jacobians (say, one term of a PDE) computes a single
//! local residual block and a single local Jacobian block per variable (pair). The [`TagRouter`]
//! deposits these blocks into every tagged vector and matrix the object is bound to.
//!
//! Usage follows a fixed cycle for every variable (pair) on an element:
//!
//! 1. [`TagRouter::prepare_vector_block`] or [`TagRouter::prepare_matrix_block`] to select the
//!    target blocks and reset the local block,
//! 2. write the local contribution through [`TagRouter::local_residual_mut`] or
//!    [`TagRouter::local_jacobian_mut`],
//! 3. write it out with one of the `accumulate_*` or `assign_*` methods.
//!
//! The router never holds references into the block storage between calls. Instead, preparing
//! records which (variable, tag) blocks are targeted, and each write-out resolves the blocks
//! anew in the recorded order.
use crate::assembly::blocks::BlockAssembly;
use crate::error::{TagError, TagKey};
use crate::nalgebra::{ClosedAdd, DMatrix, DMatrixView, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Scalar};
use crate::params::TagParameters;
use crate::tag::{MatrixTagId, TagRegistry, VectorTagId};
use log::debug;
use num::Zero;
use std::collections::BTreeSet;

/// The residual blocks selected by the last prepare. `tags` is kept as a buffer between prepares.
#[derive(Debug, Clone, Default)]
struct ResidualTarget {
    variable: Option<usize>,
    tags: Vec<VectorTagId>,
}

#[derive(Debug, Clone, Default)]
struct JacobianTarget {
    variables: Option<(usize, usize)>,
    tags: Vec<MatrixTagId>,
}

/// Routes a local residual block and a local Jacobian block to a set of tagged global systems.
///
/// See the [module-level documentation](self) for the intended usage.
#[derive(Debug, Clone)]
pub struct TagRouter<T: Scalar> {
    owner: String,
    vector_tags: BTreeSet<VectorTagId>,
    matrix_tags: BTreeSet<MatrixTagId>,
    local_residual: DVector<T>,
    local_jacobian: DMatrix<T>,
    residual_target: ResidualTarget,
    jacobian_target: JacobianTarget,
}

impl<T> TagRouter<T>
where
    T: Scalar + Zero + ClosedAdd,
{
    /// Binds the tags selected by the parameters.
    ///
    /// `owner` names the object the router works on behalf of, and is only used for diagnostics.
    ///
    /// # Errors
    ///
    /// Fails if either primary tag selection is empty, or if any requested tag is not known to
    /// the registry.
    pub fn new(
        params: &TagParameters,
        registry: &impl TagRegistry,
        owner: impl Into<String>,
    ) -> Result<Self, TagError> {
        let owner = owner.into();

        if params.vector_tags.is_empty() {
            return Err(TagError::EmptyVectorTags { owner });
        }
        if params.matrix_tags.is_empty() {
            return Err(TagError::EmptyMatrixTags { owner });
        }

        let mut vector_tags = BTreeSet::new();
        for name in params.all_vector_tags() {
            match registry.vector_tag_id(name) {
                Some(tag) => vector_tags.insert(tag),
                None => {
                    return Err(TagError::UnknownVectorTag {
                        owner,
                        tag: TagKey::from(name),
                    })
                }
            };
        }

        let mut matrix_tags = BTreeSet::new();
        for name in params.all_matrix_tags() {
            match registry.matrix_tag_id(name) {
                Some(tag) => matrix_tags.insert(tag),
                None => {
                    return Err(TagError::UnknownMatrixTag {
                        owner,
                        tag: TagKey::from(name),
                    })
                }
            };
        }

        debug!(
            "{}: bound vector tags {:?} and matrix tags {:?}",
            owner, vector_tags, matrix_tags
        );

        Ok(Self {
            owner,
            vector_tags,
            matrix_tags,
            local_residual: DVector::zeros(0),
            local_jacobian: DMatrix::zeros(0, 0),
            residual_target: ResidualTarget::default(),
            jacobian_target: JacobianTarget::default(),
        })
    }

    /// Additionally route residuals to the vector tag with the given id.
    ///
    /// If this adds a new tag, any prepared residual block must be prepared again before writing.
    ///
    /// # Errors
    ///
    /// Fails if the tag does not exist, in which case the tag set is left unchanged.
    pub fn use_vector_tag(&mut self, registry: &impl TagRegistry, tag: VectorTagId) -> Result<(), TagError> {
        if !registry.vector_tag_exists(tag) {
            return Err(TagError::UnknownVectorTag {
                owner: self.owner.clone(),
                tag: TagKey::from(tag),
            });
        }
        self.insert_vector_tag(tag);
        Ok(())
    }

    /// Additionally route residuals to the vector tag with the given name.
    ///
    /// Otherwise identical to [`use_vector_tag`](Self::use_vector_tag).
    pub fn use_vector_tag_by_name(&mut self, registry: &impl TagRegistry, name: &str) -> Result<(), TagError> {
        let tag = registry
            .vector_tag_id(name)
            .ok_or_else(|| TagError::UnknownVectorTag {
                owner: self.owner.clone(),
                tag: TagKey::from(name),
            })?;
        self.insert_vector_tag(tag);
        Ok(())
    }

    /// Additionally route Jacobians to the matrix tag with the given id.
    ///
    /// If this adds a new tag, any prepared Jacobian block must be prepared again before writing.
    ///
    /// # Errors
    ///
    /// Fails if the tag does not exist, in which case the tag set is left unchanged.
    pub fn use_matrix_tag(&mut self, registry: &impl TagRegistry, tag: MatrixTagId) -> Result<(), TagError> {
        if !registry.matrix_tag_exists(tag) {
            return Err(TagError::UnknownMatrixTag {
                owner: self.owner.clone(),
                tag: TagKey::from(tag),
            });
        }
        self.insert_matrix_tag(tag);
        Ok(())
    }

    /// Additionally route Jacobians to the matrix tag with the given name.
    ///
    /// Otherwise identical to [`use_matrix_tag`](Self::use_matrix_tag).
    pub fn use_matrix_tag_by_name(&mut self, registry: &impl TagRegistry, name: &str) -> Result<(), TagError> {
        let tag = registry
            .matrix_tag_id(name)
            .ok_or_else(|| TagError::UnknownMatrixTag {
                owner: self.owner.clone(),
                tag: TagKey::from(name),
            })?;
        self.insert_matrix_tag(tag);
        Ok(())
    }

    fn insert_vector_tag(&mut self, tag: VectorTagId) {
        if self.vector_tags.insert(tag) {
            debug!("{}: using additional vector tag {}", self.owner, tag);
            self.residual_target.variable = None;
        } else {
            debug!("{}: vector tag {} is already in use", self.owner, tag);
        }
    }

    fn insert_matrix_tag(&mut self, tag: MatrixTagId) {
        if self.matrix_tags.insert(tag) {
            debug!("{}: using additional matrix tag {}", self.owner, tag);
            self.jacobian_target.variables = None;
        } else {
            debug!("{}: matrix tag {} is already in use", self.owner, tag);
        }
    }

    /// Selects the residual blocks of `variable` for every bound vector tag, and resizes the
    /// local residual to match them. The local residual is zeroed.
    ///
    /// # Panics
    ///
    /// Panics if the residual blocks of `variable` do not have the same length for every tag.
    pub fn prepare_vector_block(&mut self, assembly: &impl BlockAssembly<T>, variable: usize) {
        debug_assert!(!self.vector_tags.is_empty(), "At least one vector tag must be active");

        let target = &mut self.residual_target;
        target.variable = None;
        target.tags.clear();
        target.tags.extend(self.vector_tags.iter().copied());

        let len = assembly.residual_block(variable, target.tags[0]).len();
        for &tag in &target.tags[1..] {
            let tag_len = assembly.residual_block(variable, tag).len();
            assert_eq!(
                tag_len, len,
                "{}: residual block of variable {} for vector tag {} has length {}, expected {}",
                self.owner, variable, tag, tag_len, len
            );
        }

        self.local_residual.resize_vertically_mut(len, T::zero());
        self.local_residual.fill(T::zero());
        target.variable = Some(variable);
    }

    /// Selects the Jacobian blocks of the given variable pair for every bound matrix tag, and
    /// resizes the local Jacobian to match them. The local Jacobian is zeroed.
    ///
    /// # Panics
    ///
    /// Panics if the Jacobian blocks of the variable pair do not have the same shape for every tag.
    pub fn prepare_matrix_block(&mut self, assembly: &impl BlockAssembly<T>, row_variable: usize, col_variable: usize) {
        debug_assert!(!self.matrix_tags.is_empty(), "At least one matrix tag must be active");

        let target = &mut self.jacobian_target;
        target.variables = None;
        target.tags.clear();
        target.tags.extend(self.matrix_tags.iter().copied());

        let shape = assembly
            .jacobian_block(row_variable, col_variable, target.tags[0])
            .shape();
        for &tag in &target.tags[1..] {
            let tag_shape = assembly
                .jacobian_block(row_variable, col_variable, tag)
                .shape();
            assert_eq!(
                tag_shape, shape,
                "{}: Jacobian block of variables ({}, {}) for matrix tag {} has shape {:?}, expected {:?}",
                self.owner, row_variable, col_variable, tag, tag_shape, shape
            );
        }

        let (nrows, ncols) = shape;
        self.local_jacobian.resize_mut(nrows, ncols, T::zero());
        self.local_jacobian.fill(T::zero());
        target.variables = Some((row_variable, col_variable));
    }

    /// Adds the local residual to the prepared residual block of every bound vector tag.
    ///
    /// # Panics
    ///
    /// Panics if no residual block is prepared, or if a block no longer matches the local residual in size.
    pub fn accumulate_residual(&self, assembly: &mut impl BlockAssembly<T>) {
        let (variable, tags) = self.residual_target();
        for &tag in tags {
            let mut block = assembly.residual_block_mut(variable, tag);
            block += &self.local_residual;
        }
    }

    /// Overwrites the prepared residual block of every bound vector tag with the local residual.
    ///
    /// # Panics
    ///
    /// Panics if no residual block is prepared, or if a block no longer matches the local residual in size.
    pub fn assign_residual(&self, assembly: &mut impl BlockAssembly<T>) {
        let (variable, tags) = self.residual_target();
        for &tag in tags {
            let mut block = assembly.residual_block_mut(variable, tag);
            block.copy_from(&self.local_residual);
        }
    }

    /// Adds the local Jacobian to the prepared Jacobian block of every bound matrix tag.
    ///
    /// # Panics
    ///
    /// Panics if no Jacobian block is prepared, or if a block no longer matches the local Jacobian in shape.
    pub fn accumulate_jacobian(&self, assembly: &mut impl BlockAssembly<T>) {
        let ((row_variable, col_variable), tags) = self.jacobian_target();
        for &tag in tags {
            let mut block = assembly.jacobian_block_mut(row_variable, col_variable, tag);
            block += &self.local_jacobian;
        }
    }

    /// Overwrites the prepared Jacobian block of every bound matrix tag with the local Jacobian.
    ///
    /// # Panics
    ///
    /// Panics if no Jacobian block is prepared, or if a block no longer matches the local Jacobian in shape.
    pub fn assign_jacobian(&self, assembly: &mut impl BlockAssembly<T>) {
        let ((row_variable, col_variable), tags) = self.jacobian_target();
        for &tag in tags {
            let mut block = assembly.jacobian_block_mut(row_variable, col_variable, tag);
            block.copy_from(&self.local_jacobian);
        }
    }
}

impl<T: Scalar> TagRouter<T> {
    fn residual_target(&self) -> (usize, &[VectorTagId]) {
        match self.residual_target.variable {
            Some(variable) => (variable, &self.residual_target.tags),
            None => panic!(
                "{}: no residual block is prepared, call prepare_vector_block before writing",
                self.owner
            ),
        }
    }

    fn jacobian_target(&self) -> ((usize, usize), &[MatrixTagId]) {
        match self.jacobian_target.variables {
            Some(variables) => (variables, &self.jacobian_target.tags),
            None => panic!(
                "{}: no Jacobian block is prepared, call prepare_matrix_block before writing",
                self.owner
            ),
        }
    }

    /// The name of the object this router works on behalf of.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The bound vector tags, in the order in which they are written.
    pub fn vector_tags(&self) -> impl Iterator<Item = VectorTagId> + '_ {
        self.vector_tags.iter().copied()
    }

    /// The bound matrix tags, in the order in which they are written.
    pub fn matrix_tags(&self) -> impl Iterator<Item = MatrixTagId> + '_ {
        self.matrix_tags.iter().copied()
    }

    pub fn num_vector_tags(&self) -> usize {
        self.vector_tags.len()
    }

    pub fn num_matrix_tags(&self) -> usize {
        self.matrix_tags.len()
    }

    pub fn has_vector_tag(&self, tag: VectorTagId) -> bool {
        self.vector_tags.contains(&tag)
    }

    pub fn has_matrix_tag(&self, tag: MatrixTagId) -> bool {
        self.matrix_tags.contains(&tag)
    }

    /// The variable whose residual blocks are currently prepared, if any.
    pub fn prepared_variable(&self) -> Option<usize> {
        self.residual_target.variable
    }

    /// The variable pair whose Jacobian blocks are currently prepared, if any.
    pub fn prepared_variable_pair(&self) -> Option<(usize, usize)> {
        self.jacobian_target.variables
    }

    pub fn local_residual(&self) -> DVectorView<T> {
        DVectorView::from(&self.local_residual)
    }

    /// Mutable access to the local residual.
    ///
    /// The length is fixed by the last call to [`prepare_vector_block`](Self::prepare_vector_block).
    pub fn local_residual_mut(&mut self) -> DVectorViewMut<T> {
        DVectorViewMut::from(&mut self.local_residual)
    }

    pub fn local_jacobian(&self) -> DMatrixView<T> {
        DMatrixView::from(&self.local_jacobian)
    }

    /// Mutable access to the local Jacobian.
    ///
    /// The shape is fixed by the last call to [`prepare_matrix_block`](Self::prepare_matrix_block).
    pub fn local_jacobian_mut(&mut self) -> DMatrixViewMut<T> {
        DMatrixViewMut::from(&mut self.local_jacobian)
    }
}
