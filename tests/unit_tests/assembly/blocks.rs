use matrixcompare::assert_matrix_eq;
use tagged_assembly::assembly::blocks::{BlockAssembly, ElementBlocks};
use tagged_assembly::nalgebra::{DMatrix, DVector};
use tagged_assembly::tag::{MatrixTagId, TagTable, VectorTagId};

#[test]
fn reinit_element_sizes_blocks_from_variable_dofs() {
    let tags = TagTable::with_default_tags();
    let mut blocks = ElementBlocks::<f64>::from_registry(&tags);
    assert_eq!(blocks.num_vector_tags(), 2);
    assert_eq!(blocks.num_matrix_tags(), 2);
    assert_eq!(blocks.num_variables(), 0);

    blocks.reinit_element(&[&[4, 5, 6], &[0]]);
    assert_eq!(blocks.num_variables(), 2);
    assert_eq!(blocks.variable_dofs(0), &[4, 5, 6]);
    assert_eq!(blocks.variable_dofs(1), &[0]);

    for t in 0..2 {
        assert_eq!(blocks.residual_block(0, VectorTagId(t)).len(), 3);
        assert_eq!(blocks.residual_block(1, VectorTagId(t)).len(), 1);
        assert_eq!(blocks.jacobian_block(0, 0, MatrixTagId(t)).shape(), (3, 3));
        assert_eq!(blocks.jacobian_block(0, 1, MatrixTagId(t)).shape(), (3, 1));
        assert_eq!(blocks.jacobian_block(1, 0, MatrixTagId(t)).shape(), (1, 3));
        assert_eq!(blocks.jacobian_block(1, 1, MatrixTagId(t)).shape(), (1, 1));
    }
}

#[test]
fn reinit_element_zeroes_previous_contents() {
    let mut blocks = ElementBlocks::<f64>::new(1, 1);
    blocks.reinit_element(&[&[0, 1]]);
    blocks.residual_block_mut(0, VectorTagId(0)).fill(3.0);
    blocks.jacobian_block_mut(0, 0, MatrixTagId(0)).fill(3.0);

    // Same sizes, so the storage is reused, but it must still be cleared
    blocks.reinit_element(&[&[2, 3]]);
    assert_eq!(blocks.variable_dofs(0), &[2, 3]);
    assert_matrix_eq!(blocks.residual_block(0, VectorTagId(0)), DVector::<f64>::zeros(2));
    assert_matrix_eq!(blocks.jacobian_block(0, 0, MatrixTagId(0)), DMatrix::<f64>::zeros(2, 2));

    // Fewer variables than before
    blocks.reinit_element(&[]);
    assert_eq!(blocks.num_variables(), 0);
}

#[test]
fn blocks_of_different_tags_are_independent() {
    let mut blocks = ElementBlocks::<f64>::new(2, 2);
    blocks.reinit_element(&[&[0, 1]]);
    blocks.residual_block_mut(0, VectorTagId(1)).fill(1.0);
    blocks.jacobian_block_mut(0, 0, MatrixTagId(0)).fill(2.0);

    assert_matrix_eq!(blocks.residual_block(0, VectorTagId(0)), DVector::<f64>::zeros(2));
    assert_matrix_eq!(blocks.residual_block(0, VectorTagId(1)), DVector::from_element(2, 1.0));
    assert_matrix_eq!(blocks.jacobian_block(0, 0, MatrixTagId(0)), DMatrix::from_element(2, 2, 2.0));
    assert_matrix_eq!(blocks.jacobian_block(0, 0, MatrixTagId(1)), DMatrix::<f64>::zeros(2, 2));
}

#[test]
#[should_panic(expected = "Vector tag 2 has no element blocks")]
fn residual_block_of_unknown_tag_panics() {
    let mut blocks = ElementBlocks::<f64>::new(2, 1);
    blocks.reinit_element(&[&[0]]);
    blocks.residual_block(0, VectorTagId(2));
}

#[test]
#[should_panic(expected = "Variable 1 is out of bounds")]
fn jacobian_block_of_unknown_variable_panics() {
    let mut blocks = ElementBlocks::<f64>::new(1, 1);
    blocks.reinit_element(&[&[0]]);
    blocks.jacobian_block(0, 1, MatrixTagId(0));
}
