//! Dense row-major int8 arrays with fixed dimensions

/// A fixed-size n-dimensional int8 array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageArray {
    dims: Vec<usize>,
    strides: Vec<usize>,
    data: Vec<i8>,
}

impl StorageArray {
    /// Zero-filled array with the given dimensions
    pub fn zeros(dims: Vec<usize>) -> Self {
        let mut strides = Vec::with_capacity(dims.len());
        let mut stride: usize = 1;
        for dim in dims.iter().rev() {
            strides.push(stride);
            stride = stride.saturating_mul(*dim);
        }
        strides.reverse();
        Self {
            data: vec![0; stride],
            dims,
            strides,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat offset of `index`, or `None` when any coordinate is out of range
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &dim), &stride) in index.iter().zip(&self.dims).zip(&self.strides) {
            if i >= dim {
                return None;
            }
            offset += i * stride;
        }
        Some(offset)
    }

    pub fn get(&self, index: &[usize]) -> Option<i8> {
        self.offset(index).map(|o| self.data[o])
    }

    /// Write one element; returns `false` when the index is out of range
    pub fn set(&mut self, index: &[usize], value: i8) -> bool {
        match self.offset(index) {
            Some(o) => {
                self.data[o] = value;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.data
    }

    /// Number of non-zero elements
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}
