use matrixcompare::assert_matrix_eq;
use tagged_assembly::assembly::blocks::{BlockAssembly, ElementBlocks};
use tagged_assembly::assembly::global::{
    add_local_block_to_csr, assemble_element_pattern, scatter_local_to_global, TaggedSystem,
};
use tagged_assembly::nalgebra::{DMatrix, DVector};
use tagged_assembly::nalgebra_sparse::CsrMatrix;
use tagged_assembly::tag::{MatrixTagId, VectorTagId};

#[test]
fn assemble_element_pattern_couples_element_dofs() {
    // Two elements sharing dof 1, dof 3 is not touched by any element
    let elements: Vec<Vec<usize>> = vec![vec![0, 1], vec![1, 2]];
    let pattern = assemble_element_pattern(4, elements.iter().map(Vec::as_slice)).unwrap();

    assert_eq!(pattern.major_dim(), 4);
    assert_eq!(pattern.minor_dim(), 4);
    assert_eq!(pattern.major_offsets(), &[0, 2, 5, 7, 7]);
    assert_eq!(pattern.minor_indices(), &[0, 1, 0, 1, 2, 1, 2]);
}

#[test]
fn assemble_element_pattern_handles_leading_empty_rows() {
    let elements: Vec<Vec<usize>> = vec![vec![3, 2]];
    let pattern = assemble_element_pattern(4, elements.iter().map(Vec::as_slice)).unwrap();
    assert_eq!(pattern.major_offsets(), &[0, 0, 0, 2, 4]);
    assert_eq!(pattern.minor_indices(), &[2, 3, 2, 3]);
}

#[test]
fn assemble_element_pattern_rejects_out_of_bounds_dofs() {
    let elements: Vec<Vec<usize>> = vec![vec![0, 4]];
    assert!(assemble_element_pattern(4, elements.iter().map(Vec::as_slice)).is_err());
}

#[test]
fn scatter_local_to_global_adds_entries() {
    let mut global = DVector::from_element(5, 1.0);
    let local = DVector::from_column_slice(&[2.0, 3.0]);
    scatter_local_to_global(&mut global, &local, &[4, 1]).unwrap();
    assert_matrix_eq!(global, DVector::from_column_slice(&[1.0, 4.0, 1.0, 1.0, 3.0]));
}

#[test]
fn scatter_local_to_global_rejects_bad_indices() {
    let mut global = DVector::<f64>::zeros(2);
    let local = DVector::from_column_slice(&[2.0, 3.0]);
    assert!(scatter_local_to_global(&mut global, &local, &[0]).is_err());
    assert!(scatter_local_to_global(&mut global, &local, &[0, 2]).is_err());
}

#[test]
fn add_local_block_to_csr_adds_entries() {
    let mut csr = CsrMatrix::from(&DMatrix::from_element(3, 3, 1.0));
    let local = DMatrix::from_row_slice(2, 1, &[5.0, 7.0]);
    add_local_block_to_csr(&mut csr, &local, &[2, 0], &[1]).unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        1.0, 8.0, 1.0,
        1.0, 1.0, 1.0,
        1.0, 6.0, 1.0,
    ]);
    assert_eq!(DMatrix::from(&csr), expected);
}

#[test]
fn add_local_block_to_csr_rejects_entries_outside_pattern() {
    let identity = DMatrix::<f64>::identity(3, 3);
    let mut csr = CsrMatrix::from(&identity);
    let local = DMatrix::from_element(1, 1, 1.0);
    assert!(add_local_block_to_csr(&mut csr, &local, &[0], &[2]).is_err());
    assert!(add_local_block_to_csr(&mut csr, &local, &[3], &[0]).is_err());
    assert!(add_local_block_to_csr(&mut csr, &local, &[0, 1], &[0]).is_err());
}

#[test]
fn tagged_system_accumulates_element_blocks_per_tag() {
    // Two 1D linear elements with nodes [0, 1] and [1, 2]
    let elements: Vec<Vec<usize>> = vec![vec![0, 1], vec![1, 2]];
    let pattern = assemble_element_pattern(3, elements.iter().map(Vec::as_slice)).unwrap();
    let mut system = TaggedSystem::<f64>::from_pattern(2, 1, pattern).unwrap();
    assert_eq!(system.num_dofs(), 3);

    let mut blocks = ElementBlocks::<f64>::new(2, 1);
    for dofs in &elements {
        blocks.reinit_element(&[dofs.as_slice()]);
        blocks.residual_block_mut(0, VectorTagId(0)).fill(1.0);
        blocks.residual_block_mut(0, VectorTagId(1)).fill(-1.0);
        blocks
            .jacobian_block_mut(0, 0, MatrixTagId(0))
            .copy_from_slice(&[1.0, -1.0, -1.0, 1.0]);
        system.add_element_blocks(&blocks).unwrap();
    }

    assert_matrix_eq!(system.residual(VectorTagId(0)), DVector::from_column_slice(&[1.0, 2.0, 1.0]));
    assert_matrix_eq!(system.residual(VectorTagId(1)), DVector::from_column_slice(&[-1.0, -2.0, -1.0]));

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
         1.0, -1.0,  0.0,
        -1.0,  2.0, -1.0,
         0.0, -1.0,  1.0,
    ]);
    assert_eq!(DMatrix::from(system.jacobian(MatrixTagId(0))), expected);

    system.zero();
    assert_matrix_eq!(system.residual(VectorTagId(0)), DVector::<f64>::zeros(3));
    assert_eq!(DMatrix::from(system.jacobian(MatrixTagId(0))), DMatrix::zeros(3, 3));
    assert_eq!(system.jacobian(MatrixTagId(0)).nnz(), 7);
}

#[test]
fn tagged_system_rejects_blocks_with_other_tags() {
    let elements: Vec<Vec<usize>> = vec![vec![0, 1]];
    let pattern = assemble_element_pattern(2, elements.iter().map(Vec::as_slice)).unwrap();
    let mut system = TaggedSystem::<f64>::from_pattern(2, 1, pattern).unwrap();

    let mut blocks = ElementBlocks::<f64>::new(1, 1);
    blocks.reinit_element(&[&[0, 1]]);
    assert!(system.add_element_blocks(&blocks).is_err());
}

#[test]
fn failed_element_add_leaves_system_unchanged() {
    let elements: Vec<Vec<usize>> = vec![vec![0, 1]];
    let pattern = assemble_element_pattern(3, elements.iter().map(Vec::as_slice)).unwrap();
    let mut system = TaggedSystem::<f64>::from_pattern(1, 1, pattern).unwrap();

    let mut blocks = ElementBlocks::<f64>::new(1, 1);
    blocks.reinit_element(&[&[0, 1]]);
    blocks.residual_block_mut(0, VectorTagId(0)).fill(2.0);
    blocks.jacobian_block_mut(0, 0, MatrixTagId(0)).fill(2.0);
    system.add_element_blocks(&blocks).unwrap();
    let residual_before = system.residual(VectorTagId(0)).clone();
    let jacobian_before = system.jacobian(MatrixTagId(0)).values().to_vec();

    // Dof 2 is in bounds for the residual, but (0, 2) is not part of the pattern
    blocks.reinit_element(&[&[0, 2]]);
    blocks.residual_block_mut(0, VectorTagId(0)).fill(1.0);
    blocks.jacobian_block_mut(0, 0, MatrixTagId(0)).fill(1.0);
    assert!(system.add_element_blocks(&blocks).is_err());

    assert_matrix_eq!(system.residual(VectorTagId(0)), residual_before);
    assert_eq!(system.jacobian(MatrixTagId(0)).values(), jacobian_before.as_slice());
}

#[test]
fn failed_scatter_leaves_global_vector_unchanged() {
    let mut global = DVector::from_element(3, 1.0);
    let local = DVector::from_column_slice(&[1.0, 1.0]);
    assert!(scatter_local_to_global(&mut global, &local, &[0, 3]).is_err());
    assert_matrix_eq!(global, DVector::from_element(3, 1.0));
}

#[test]
fn failed_csr_add_leaves_matrix_unchanged() {
    let identity = DMatrix::<f64>::identity(2, 2);
    let mut csr = CsrMatrix::from(&identity);
    let local = DMatrix::from_element(1, 2, 5.0);
    // (0, 0) is in the pattern, (0, 1) is not
    assert!(add_local_block_to_csr(&mut csr, &local, &[0], &[0, 1]).is_err());
    assert_eq!(DMatrix::from(&csr), identity);
}
