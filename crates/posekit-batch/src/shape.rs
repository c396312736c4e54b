use crate::error::ShapeError;

/// Number of elements held by a batch of the given shape.
///
/// The empty shape `[]` describes a single element.
#[inline]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Computes the strides for a row-major (C-contiguous) layout.
///
/// The rightmost dimension has stride 1, and each dimension's stride is the
/// product of all dimensions to its right.
///
/// # Examples
///
/// ```rust
/// use posekit_batch::shape::strides_from_shape;
///
/// assert_eq!(strides_from_shape(&[2, 3]), vec![3, 1]);
/// assert_eq!(strides_from_shape(&[2, 3, 4]), vec![12, 4, 1]);
/// assert!(strides_from_shape(&[]).is_empty());
/// ```
pub fn strides_from_shape(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// Concatenates a batch shape and a trailing per-element shape.
pub fn with_trailing(batch_shape: &[usize], trailing: &[usize]) -> Vec<usize> {
    let mut shape = Vec::with_capacity(batch_shape.len() + trailing.len());
    shape.extend_from_slice(batch_shape);
    shape.extend_from_slice(trailing);
    shape
}

/// Computes the common shape of several batch shapes.
///
/// Broadcasting rules:
/// 1. Shapes are aligned from the right; missing leading axes count as 1.
/// 2. On each aligned axis, all sizes different from 1 must be equal.
/// 3. The output size of an axis is that common size, or 1 if every operand has 1.
///
/// # Errors
///
/// Returns [`ShapeError::Incompatible`] naming the first conflicting axis,
/// counted from the right.
///
/// # Examples
///
/// ```rust
/// use posekit_batch::shape::broadcast_shapes;
///
/// assert_eq!(broadcast_shapes(&[&[5], &[]]).unwrap(), vec![5]);
/// assert_eq!(broadcast_shapes(&[&[3, 1, 2], &[4, 1]]).unwrap(), vec![3, 4, 2]);
/// assert!(broadcast_shapes(&[&[3], &[4]]).is_err());
/// ```
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>, ShapeError> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1; ndim];

    for shape in shapes {
        let offset = ndim - shape.len();
        for (i, &size) in shape.iter().enumerate() {
            let slot = &mut out[offset + i];
            if *slot == 1 {
                *slot = size;
            } else if size != 1 && size != *slot {
                let axis = ndim - (offset + i) - 1;
                log::debug!("broadcast failed for shapes {:?} on axis {}", shapes, axis);
                return Err(ShapeError::incompatible(shapes, axis));
            }
        }
    }

    Ok(out)
}
