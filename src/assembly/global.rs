use crate::assembly::blocks::{BlockAssembly, ElementBlocks};
use crate::nalgebra::{ClosedAdd, DMatrixView, DVector, DVectorView, DVectorViewMut, Scalar};
use crate::nalgebra_sparse::pattern::SparsityPattern;
use crate::nalgebra_sparse::CsrMatrix;
use crate::tag::{MatrixTagId, VectorTagId};
use eyre::eyre;
use itertools::izip;
use num::Zero;
use std::collections::BTreeSet;

/// Assembles the sparsity pattern that couples all degrees of freedom within each element.
///
/// Each item of `element_dofs` holds the global degree of freedom indices of one element.
pub fn assemble_element_pattern<'a>(
    num_dofs: usize,
    element_dofs: impl IntoIterator<Item = &'a [usize]>,
) -> eyre::Result<SparsityPattern> {
    // Collecting into a BTreeSet stores each matrix entry exactly once, sorted by row and then
    // by column
    let mut matrix_entries = BTreeSet::new();
    for dofs in element_dofs {
        for &i in dofs {
            for &j in dofs {
                matrix_entries.insert((i, j));
            }
        }
    }

    let mut offsets = Vec::with_capacity(num_dofs + 1);
    let mut column_indices = Vec::with_capacity(matrix_entries.len());

    offsets.push(0);
    for (i, j) in matrix_entries {
        if i >= num_dofs || j >= num_dofs {
            return Err(eyre!(
                "Element degree of freedom {} is out of bounds for {} degrees of freedom",
                i.max(j),
                num_dofs
            ));
        }
        // Consecutive empty rows require more than one new offset
        while i + 1 > offsets.len() {
            offsets.push(column_indices.len());
        }
        column_indices.push(j);
    }

    while offsets.len() < (num_dofs + 1) {
        offsets.push(column_indices.len());
    }

    Ok(SparsityPattern::try_from_offsets_and_indices(
        num_dofs,
        num_dofs,
        offsets,
        column_indices,
    )?)
}

/// Adds a local vector to the entries of a global vector given by `indices`.
///
/// # Errors
///
/// Fails if the local vector does not match the indices in length, or if an index is out of
/// bounds. The global vector is left untouched in that case.
pub fn scatter_local_to_global<'a, 'b, T>(
    global: impl Into<DVectorViewMut<'a, T>>,
    local: impl Into<DVectorView<'b, T>>,
    indices: &[usize],
) -> eyre::Result<()>
where
    T: Scalar + ClosedAdd,
{
    scatter_local_to_global_(global.into(), local.into(), indices)
}

fn scatter_local_to_global_<T>(
    mut global: DVectorViewMut<T>,
    local: DVectorView<T>,
    indices: &[usize],
) -> eyre::Result<()>
where
    T: Scalar + ClosedAdd,
{
    check_scatter_indices(global.len(), local.len(), indices)?;
    for (&i_global, value) in izip!(indices, local.iter()) {
        global[i_global] += value.clone();
    }
    Ok(())
}

fn check_scatter_indices(global_len: usize, local_len: usize, indices: &[usize]) -> eyre::Result<()> {
    if local_len != indices.len() {
        return Err(eyre!(
            "Local vector of length {} cannot be scattered to {} global indices",
            local_len,
            indices.len()
        ));
    }
    match indices.iter().find(|&&i| i >= global_len) {
        Some(i) => Err(eyre!(
            "Global index {} is out of bounds for vector of length {}",
            i,
            global_len
        )),
        None => Ok(()),
    }
}

/// Adds a local matrix block to a CSR matrix.
///
/// Entry `(i, j)` of `local` is added to entry `(row_indices[i], col_indices[j])` of the CSR matrix.
///
/// # Errors
///
/// Fails if an index is out of bounds or an entry is not part of the sparsity pattern. The CSR
/// matrix is left untouched in that case.
pub fn add_local_block_to_csr<'a, T>(
    csr: &mut CsrMatrix<T>,
    local: impl Into<DMatrixView<'a, T>>,
    row_indices: &[usize],
    col_indices: &[usize],
) -> eyre::Result<()>
where
    T: Scalar + ClosedAdd,
{
    let local = local.into();
    check_local_block_shape(&local, row_indices, col_indices)?;
    let value_indices = csr_value_indices(csr.pattern(), row_indices, col_indices)?;
    add_local_block_to_csr_values(csr.values_mut(), local, &value_indices);
    Ok(())
}

fn check_local_block_shape<T: Scalar>(
    local: &DMatrixView<T>,
    row_indices: &[usize],
    col_indices: &[usize],
) -> eyre::Result<()> {
    if local.shape() != (row_indices.len(), col_indices.len()) {
        return Err(eyre!(
            "Local block of shape {:?} does not match {} row and {} column indices",
            local.shape(),
            row_indices.len(),
            col_indices.len()
        ));
    }
    Ok(())
}

/// Looks up the position in the CSR value array of every entry `(row_indices[i], col_indices[j])`,
/// stored row by row.
fn csr_value_indices(
    pattern: &SparsityPattern,
    row_indices: &[usize],
    col_indices: &[usize],
) -> eyre::Result<Vec<usize>> {
    let mut value_indices = Vec::with_capacity(row_indices.len() * col_indices.len());
    for &global_row_idx in row_indices {
        let cols = pattern.get_lane(global_row_idx).ok_or_else(|| {
            eyre!(
                "Row index {} is out of bounds for matrix with {} rows",
                global_row_idx,
                pattern.major_dim()
            )
        })?;
        let row_offset = pattern.major_offsets()[global_row_idx];

        for &global_col_idx in col_indices {
            // Column indices in a CSR row are sorted
            let idx_in_row = cols.binary_search(&global_col_idx).map_err(|_| {
                eyre!(
                    "Entry ({}, {}) is not part of the sparsity pattern",
                    global_row_idx,
                    global_col_idx
                )
            })?;
            value_indices.push(row_offset + idx_in_row);
        }
    }
    Ok(value_indices)
}

fn add_local_block_to_csr_values<T>(values: &mut [T], local: DMatrixView<T>, value_indices: &[usize])
where
    T: Scalar + ClosedAdd,
{
    let ncols = local.ncols();
    for (k, &value_idx) in value_indices.iter().enumerate() {
        values[value_idx] += local[(k / ncols, k % ncols)].clone();
    }
}

/// Global residual vectors and Jacobian matrices, one per tag.
///
/// All Jacobian matrices share the same sparsity pattern.
#[derive(Debug, Clone)]
pub struct TaggedSystem<T: Scalar> {
    residuals: Vec<DVector<T>>,
    jacobians: Vec<CsrMatrix<T>>,
}

impl<T> TaggedSystem<T>
where
    T: Scalar + Zero + ClosedAdd,
{
    /// Creates zeroed residuals and Jacobians for the given number of tags.
    ///
    /// The number of degrees of freedom is the number of rows of the pattern.
    pub fn from_pattern(
        num_vector_tags: usize,
        num_matrix_tags: usize,
        pattern: SparsityPattern,
    ) -> eyre::Result<Self> {
        let num_dofs = pattern.major_dim();
        let residuals = (0..num_vector_tags)
            .map(|_| DVector::zeros(num_dofs))
            .collect();
        let jacobians = (0..num_matrix_tags)
            .map(|_| {
                let values = vec![T::zero(); pattern.nnz()];
                CsrMatrix::try_from_pattern_and_values(pattern.clone(), values)
                    .map_err(|err| eyre!("Failed to create Jacobian from sparsity pattern: {}", err))
            })
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(Self { residuals, jacobians })
    }

    pub fn num_dofs(&self) -> usize {
        self.residuals
            .first()
            .map(|r| r.len())
            .or_else(|| self.jacobians.first().map(|j| j.nrows()))
            .unwrap_or(0)
    }

    pub fn residual(&self, tag: VectorTagId) -> &DVector<T> {
        &self.residuals[tag.index()]
    }

    pub fn jacobian(&self, tag: MatrixTagId) -> &CsrMatrix<T> {
        &self.jacobians[tag.index()]
    }

    /// Zeroes all residuals and Jacobians, keeping the sparsity pattern.
    pub fn zero(&mut self) {
        for residual in &mut self.residuals {
            residual.fill(T::zero());
        }
        for jacobian in &mut self.jacobians {
            jacobian.values_mut().fill(T::zero());
        }
    }

    /// Adds every block of the current element to the residual or Jacobian of the same tag.
    ///
    /// # Errors
    ///
    /// Fails if the blocks do not match the tags of the system, if a degree of freedom is out of
    /// bounds, or if a Jacobian entry is not part of the sparsity pattern. Every index is checked
    /// before the first entry is added, so the system is left untouched on failure.
    pub fn add_element_blocks(&mut self, blocks: &ElementBlocks<T>) -> eyre::Result<()> {
        if blocks.num_vector_tags() != self.residuals.len() || blocks.num_matrix_tags() != self.jacobians.len() {
            return Err(eyre!(
                "Element blocks for {} vector and {} matrix tags do not match system with {} vector and {} matrix tags",
                blocks.num_vector_tags(),
                blocks.num_matrix_tags(),
                self.residuals.len(),
                self.jacobians.len()
            ));
        }

        let n = blocks.num_variables();
        for (t, residual) in self.residuals.iter().enumerate() {
            for v in 0..n {
                let block_len = blocks.residual_block(v, VectorTagId(t)).len();
                check_scatter_indices(residual.len(), block_len, blocks.variable_dofs(v))?;
            }
        }

        // All Jacobians share the pattern, so the value indices of each variable pair are found once
        let mut jacobian_value_indices = Vec::with_capacity(n * n);
        if let Some(jacobian) = self.jacobians.first() {
            for i in 0..n {
                for j in 0..n {
                    let (rows, cols) = (blocks.variable_dofs(i), blocks.variable_dofs(j));
                    for t in 0..self.jacobians.len() {
                        check_local_block_shape(&blocks.jacobian_block(i, j, MatrixTagId(t)), rows, cols)?;
                    }
                    jacobian_value_indices.push(csr_value_indices(jacobian.pattern(), rows, cols)?);
                }
            }
        }

        for (t, residual) in self.residuals.iter_mut().enumerate() {
            for v in 0..n {
                let block = blocks.residual_block(v, VectorTagId(t));
                for (&i_global, value) in izip!(blocks.variable_dofs(v), block.iter()) {
                    residual[i_global] += value.clone();
                }
            }
        }

        for (t, jacobian) in self.jacobians.iter_mut().enumerate() {
            for i in 0..n {
                for j in 0..n {
                    let block = blocks.jacobian_block(i, j, MatrixTagId(t));
                    add_local_block_to_csr_values(jacobian.values_mut(), block, &jacobian_value_indices[n * i + j]);
                }
            }
        }

        Ok(())
    }
}
