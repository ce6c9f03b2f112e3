use crate::nalgebra::{DMatrix, DMatrixView, DMatrixViewMut, DVector, DVectorView, DVectorViewMut, Scalar};
use crate::tag::{MatrixTagId, TagTable, VectorTagId};
use itertools::izip;
use num::Zero;

/// Provides access to the element-level blocks of every tagged residual vector and Jacobian matrix.
///
/// A residual block is the part of a tagged global vector that belongs to the degrees of freedom of
/// a single variable on the current element. A Jacobian block is the part of a tagged global matrix
/// that couples the degrees of freedom of a pair of variables.
///
/// All residual blocks of one variable have the same length regardless of tag, and likewise all
/// Jacobian blocks of a variable pair have the same shape.
pub trait BlockAssembly<T: Scalar> {
    fn residual_block(&self, variable: usize, tag: VectorTagId) -> DVectorView<T>;

    fn residual_block_mut(&mut self, variable: usize, tag: VectorTagId) -> DVectorViewMut<T>;

    fn jacobian_block(&self, row_variable: usize, col_variable: usize, tag: MatrixTagId) -> DMatrixView<T>;

    fn jacobian_block_mut(&mut self, row_variable: usize, col_variable: usize, tag: MatrixTagId)
        -> DMatrixViewMut<T>;
}

/// Element-level residual and Jacobian blocks for every tag.
///
/// The blocks are sized by [`ElementBlocks::reinit_element`] from the global degree of freedom
/// indices of each variable on the element. The same indices are later used to scatter the
/// blocks into global storage, see [`TaggedSystem`](crate::assembly::global::TaggedSystem).
#[derive(Debug, Clone)]
pub struct ElementBlocks<T: Scalar> {
    variable_dofs: Vec<Vec<usize>>,
    // Indexed by [tag][variable]
    residual_blocks: Vec<Vec<DVector<T>>>,
    // Indexed by [tag][row_variable * num_variables + col_variable]
    jacobian_blocks: Vec<Vec<DMatrix<T>>>,
}

impl<T: Scalar + Zero> ElementBlocks<T> {
    pub fn new(num_vector_tags: usize, num_matrix_tags: usize) -> Self {
        Self {
            variable_dofs: Vec::new(),
            residual_blocks: (0..num_vector_tags).map(|_| Vec::new()).collect(),
            jacobian_blocks: (0..num_matrix_tags).map(|_| Vec::new()).collect(),
        }
    }

    /// Creates blocks for every tag currently registered in the table.
    pub fn from_registry(tags: &TagTable) -> Self {
        Self::new(tags.num_vector_tags(), tags.num_matrix_tags())
    }

    /// Prepares the blocks for a new element.
    ///
    /// `variable_dofs[i]` holds the global degree of freedom indices of variable `i` on the element.
    /// Every block is resized accordingly and zeroed.
    pub fn reinit_element(&mut self, variable_dofs: &[&[usize]]) {
        let n = variable_dofs.len();
        self.variable_dofs.resize_with(n, Vec::new);
        for (dofs, element_dofs) in izip!(&mut self.variable_dofs, variable_dofs) {
            dofs.clear();
            dofs.extend_from_slice(element_dofs);
        }

        for blocks in &mut self.residual_blocks {
            blocks.resize_with(n, || DVector::zeros(0));
            for (block, dofs) in izip!(blocks.iter_mut(), &self.variable_dofs) {
                block.resize_vertically_mut(dofs.len(), T::zero());
                block.fill(T::zero());
            }
        }

        for blocks in &mut self.jacobian_blocks {
            blocks.resize_with(n * n, || DMatrix::zeros(0, 0));
            for (i, row_dofs) in self.variable_dofs.iter().enumerate() {
                for (j, col_dofs) in self.variable_dofs.iter().enumerate() {
                    let block = &mut blocks[n * i + j];
                    block.resize_mut(row_dofs.len(), col_dofs.len(), T::zero());
                    block.fill(T::zero());
                }
            }
        }
    }
}

impl<T: Scalar> ElementBlocks<T> {
    pub fn num_variables(&self) -> usize {
        self.variable_dofs.len()
    }

    pub fn num_vector_tags(&self) -> usize {
        self.residual_blocks.len()
    }

    pub fn num_matrix_tags(&self) -> usize {
        self.jacobian_blocks.len()
    }

    /// The global degree of freedom indices of the given variable on the current element.
    pub fn variable_dofs(&self, variable: usize) -> &[usize] {
        &self.variable_dofs[variable]
    }

    fn residual_index(&self, variable: usize, tag: VectorTagId) -> (usize, usize) {
        assert!(
            tag.index() < self.residual_blocks.len(),
            "Vector tag {} has no element blocks",
            tag
        );
        assert!(variable < self.num_variables(), "Variable {} is out of bounds", variable);
        (tag.index(), variable)
    }

    fn jacobian_index(&self, row_variable: usize, col_variable: usize, tag: MatrixTagId) -> (usize, usize) {
        let n = self.num_variables();
        assert!(
            tag.index() < self.jacobian_blocks.len(),
            "Matrix tag {} has no element blocks",
            tag
        );
        assert!(row_variable < n, "Variable {} is out of bounds", row_variable);
        assert!(col_variable < n, "Variable {} is out of bounds", col_variable);
        (tag.index(), n * row_variable + col_variable)
    }
}

impl<T: Scalar> BlockAssembly<T> for ElementBlocks<T> {
    fn residual_block(&self, variable: usize, tag: VectorTagId) -> DVectorView<T> {
        let (t, v) = self.residual_index(variable, tag);
        DVectorView::from(&self.residual_blocks[t][v])
    }

    fn residual_block_mut(&mut self, variable: usize, tag: VectorTagId) -> DVectorViewMut<T> {
        let (t, v) = self.residual_index(variable, tag);
        DVectorViewMut::from(&mut self.residual_blocks[t][v])
    }

    fn jacobian_block(&self, row_variable: usize, col_variable: usize, tag: MatrixTagId) -> DMatrixView<T> {
        let (t, b) = self.jacobian_index(row_variable, col_variable, tag);
        DMatrixView::from(&self.jacobian_blocks[t][b])
    }

    fn jacobian_block_mut(&mut self, row_variable: usize, col_variable: usize, tag: MatrixTagId) -> DMatrixViewMut<T> {
        let (t, b) = self.jacobian_index(row_variable, col_variable, tag);
        DMatrixViewMut::from(&mut self.jacobian_blocks[t][b])
    }
}
