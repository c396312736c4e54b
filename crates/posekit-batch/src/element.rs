use glam::{DMat2, DMat3, DMat4, DQuat, DVec2, DVec3, DVec4};

/// Fixed-size value stored once per batch entry.
///
/// An element knows its trailing shape inside a numeric [`Array`](crate::Array)
/// and how to read and write itself from a flat, row-major `f64` slice of
/// exactly [`Element::SIZE`] values.
pub trait Element: Copy {
    /// Trailing dimensions occupied by one element.
    const SHAPE: &'static [usize];

    /// Number of scalars in one element, the product of `SHAPE`.
    const SIZE: usize;

    /// Reads an element from `values[..Self::SIZE]`.
    fn read(values: &[f64]) -> Self;

    /// Writes the element into `out[..Self::SIZE]`.
    fn write(&self, out: &mut [f64]);
}

impl Element for f64 {
    const SHAPE: &'static [usize] = &[];
    const SIZE: usize = 1;

    #[inline]
    fn read(values: &[f64]) -> Self {
        values[0]
    }

    #[inline]
    fn write(&self, out: &mut [f64]) {
        out[0] = *self;
    }
}

macro_rules! impl_element_for_array {
    ($($n:literal),+) => {
        $(
            impl Element for [f64; $n] {
                const SHAPE: &'static [usize] = &[$n];
                const SIZE: usize = $n;

                #[inline]
                fn read(values: &[f64]) -> Self {
                    let mut out = [0.0; $n];
                    out.copy_from_slice(&values[..$n]);
                    out
                }

                #[inline]
                fn write(&self, out: &mut [f64]) {
                    out[..$n].copy_from_slice(self);
                }
            }
        )+
    };
}

impl_element_for_array!(1, 2, 3, 4, 5, 6, 7, 8, 9);

macro_rules! impl_element_for_vec {
    ($ty:ty, $n:literal) => {
        impl Element for $ty {
            const SHAPE: &'static [usize] = &[$n];
            const SIZE: usize = $n;

            #[inline]
            fn read(values: &[f64]) -> Self {
                <$ty>::from_slice(&values[..$n])
            }

            #[inline]
            fn write(&self, out: &mut [f64]) {
                self.write_to_slice(&mut out[..$n]);
            }
        }
    };
}

impl_element_for_vec!(DVec2, 2);
impl_element_for_vec!(DVec3, 3);
impl_element_for_vec!(DVec4, 4);

/// Quaternions are laid out scalar first: `[w, x, y, z]`.
impl Element for DQuat {
    const SHAPE: &'static [usize] = &[4];
    const SIZE: usize = 4;

    #[inline]
    fn read(values: &[f64]) -> Self {
        DQuat::from_xyzw(values[1], values[2], values[3], values[0])
    }

    #[inline]
    fn write(&self, out: &mut [f64]) {
        out[..4].copy_from_slice(&[self.w, self.x, self.y, self.z]);
    }
}

// glam stores matrices column-major while arrays are row-major, so reading
// the row-major values as columns yields the transpose.
macro_rules! impl_element_for_mat {
    ($ty:ty, $n:literal) => {
        impl Element for $ty {
            const SHAPE: &'static [usize] = &[$n, $n];
            const SIZE: usize = $n * $n;

            #[inline]
            fn read(values: &[f64]) -> Self {
                <$ty>::from_cols_slice(&values[..$n * $n]).transpose()
            }

            #[inline]
            fn write(&self, out: &mut [f64]) {
                self.transpose().write_cols_to_slice(&mut out[..$n * $n]);
            }
        }
    };
}

impl_element_for_mat!(DMat2, 2);
impl_element_for_mat!(DMat3, 3);
impl_element_for_mat!(DMat4, 4);
