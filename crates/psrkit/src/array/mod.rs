use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArrayError {
    #[error("shape {shape:?} holds {expected} elements but {actual} were given")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("rows must all have the same length: row {row} has {actual}, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("input array has only {0} dimensions")]
    AxisOutOfRange(usize),
    #[error("cannot downsample array by factor {0}")]
    InvalidFactor(usize),
    #[error("axis length {len} not divisible by factor {factor}")]
    NotDivisible { len: usize, factor: usize },
}

/// Dense row-major array of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdArray {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, ArrayError> {
        let expected = shape.iter().product::<usize>();
        if expected != data.len() {
            return Err(ArrayError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    #[must_use]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ArrayError> {
        let width = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(width * rows.len());
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width {
                return Err(ArrayError::RaggedRows {
                    row,
                    expected: width,
                    actual: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self {
            shape: vec![rows.len(), width],
            data,
        })
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Splits a 2-D array back into rows; `None` for any other rank.
    #[must_use]
    pub fn rows(&self) -> Option<Vec<Vec<f64>>> {
        match self.shape.as_slice() {
            [_, 0] => Some(vec![Vec::new(); self.shape[0]]),
            [_, width] => Some(self.data.chunks(*width).map(<[f64]>::to_vec).collect()),
            _ => None,
        }
    }

    pub fn normalize_axis(&self, axis: isize) -> Result<usize, ArrayError> {
        let ndim = self.ndim();
        let resolved = if axis < 0 {
            axis + ndim as isize
        } else {
            axis
        };
        if resolved < 0 || resolved >= ndim as isize {
            return Err(ArrayError::AxisOutOfRange(ndim));
        }
        Ok(resolved as usize)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reduction {
    #[default]
    Mean,
    Sum,
    Product,
    Max,
    Min,
}

impl Reduction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Product => "product",
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    #[must_use]
    pub fn apply(self, block: &[f64]) -> f64 {
        match self {
            Self::Mean => block.iter().sum::<f64>() / block.len() as f64,
            Self::Sum => block.iter().sum(),
            Self::Product => block.iter().product(),
            Self::Max => block.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Min => block.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

impl FromStr for Reduction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "product" | "prod" => Ok(Self::Product),
            "max" | "maximum" => Ok(Self::Max),
            "min" | "minimum" => Ok(Self::Min),
            other => Err(format!(
                "unknown reduction `{other}` (expected mean, sum, product, max or min)"
            )),
        }
    }
}

/// Reduces `axis` of `a` in consecutive blocks of `factor` elements.
///
/// `func` receives each block as a contiguous slice and returns the value
/// that replaces it. The reduced axis stays in the output shape even when
/// it shrinks to length 1. Negative axes count from the end.
pub fn downsample<F>(a: &NdArray, factor: usize, axis: isize, func: F) -> Result<NdArray, ArrayError>
where
    F: Fn(&[f64]) -> f64,
{
    let axis = a.normalize_axis(axis)?;
    if factor == 0 {
        return Err(ArrayError::InvalidFactor(factor));
    }
    let len = a.shape[axis];
    if len % factor != 0 {
        return Err(ArrayError::NotDivisible { len, factor });
    }

    // View the data as [outer, len, inner] with the reduced axis in the middle.
    let outer = a.shape[..axis].iter().product::<usize>();
    let inner = a.shape[axis + 1..].iter().product::<usize>();
    let blocks = len / factor;

    let mut shape = a.shape.clone();
    shape[axis] = blocks;
    let mut data = Vec::with_capacity(outer * blocks * inner);
    let mut block = Vec::with_capacity(factor);

    for o in 0..outer {
        for b in 0..blocks {
            for i in 0..inner {
                block.clear();
                for k in 0..factor {
                    let index = (o * len + b * factor + k) * inner + i;
                    block.push(a.data[index]);
                }
                data.push(func(&block));
            }
        }
    }

    Ok(NdArray { shape, data })
}

pub fn downsample_with(
    a: &NdArray,
    factor: usize,
    axis: isize,
    reduction: Reduction,
) -> Result<NdArray, ArrayError> {
    downsample(a, factor, axis, |block| reduction.apply(block))
}
