//! Serializers for n-dimensional arrays.
//!
//! The three variants differ only in how much shape information goes on the
//! wire:
//! - [`DynamicNDArraySerializer`]: varint rank, then one varint per dimension
//! - [`NDArraySerializer`]: one varint per dimension (rank fixed by schema)
//! - [`FixedNDArraySerializer`]: nothing (shape fixed by schema)
//!
//! Element data follows in row-major order. Contiguous arrays of trivially
//! serializable elements are written with a single bulk transfer; every
//! other array is written element by element. Both produce identical bytes.

use std::io::{Read, Write};

use tracing::trace;

use super::Serializer;
use crate::codec::{CodedInputStream, CodedOutputStream};
use crate::error::{Error, Result};
use crate::model::NDArray;

fn write_elements<S, W>(element: &S, stream: &mut CodedOutputStream<W>, array: &NDArray<S::Value>) -> Result<()>
where
    S: Serializer,
    W: Write,
{
    if element.is_trivially_serializable() {
        if let Some(slice) = array.as_slice() {
            trace!(len = slice.len(), "array elements: bulk");
            return element.write_slice(stream, slice);
        }
    }
    trace!(len = array.len(), "array elements: element-wise");
    array.iter().try_for_each(|value| element.write(stream, value))
}

fn read_elements<S, R>(element: &S, stream: &mut CodedInputStream<R>, shape: Vec<usize>) -> Result<NDArray<S::Value>>
where
    S: Serializer,
    R: Read,
{
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| Error::OutOfRange {
            type_name: "array element count",
            value: shape.iter().fold(1i128, |acc, &d| acc.saturating_mul(d as i128)),
        })?;
    let data = element.read_vec(stream, count)?;
    NDArray::from_vec(shape, data)
}

fn read_dims<R: Read>(stream: &mut CodedInputStream<R>, rank: usize) -> Result<Vec<usize>> {
    let mut shape = Vec::with_capacity(rank.min(64));
    for _ in 0..rank {
        let dim = stream.read_unsigned_varint("array dimension")?;
        let dim = usize::try_from(dim).map_err(|_| Error::OutOfRange {
            type_name: "array dimension",
            value: dim as i128,
        })?;
        shape.push(dim);
    }
    Ok(shape)
}

fn write_dims<W: Write>(stream: &mut CodedOutputStream<W>, shape: &[usize]) -> Result<()> {
    shape
        .iter()
        .try_for_each(|&dim| stream.write_unsigned_varint(dim as u64))
}

/// Arrays whose rank is only known at runtime.
#[derive(Debug, Clone, Default)]
pub struct DynamicNDArraySerializer<S> {
    element: S,
}

impl<S> DynamicNDArraySerializer<S> {
    pub fn new(element: S) -> Self {
        Self { element }
    }
}

impl<S: Serializer> Serializer for DynamicNDArraySerializer<S> {
    type Value = NDArray<S::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        stream.write_unsigned_varint(value.ndim() as u64)?;
        write_dims(stream, value.shape())?;
        write_elements(&self.element, stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        let rank = stream.read_unsigned_varint("array rank")? as usize;
        let shape = read_dims(stream, rank)?;
        read_elements(&self.element, stream, shape)
    }
}

/// Arrays with a schema-fixed number of dimensions.
#[derive(Debug, Clone)]
pub struct NDArraySerializer<S> {
    element: S,
    rank: usize,
}

impl<S> NDArraySerializer<S> {
    pub fn new(element: S, rank: usize) -> Self {
        Self { element, rank }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl<S: Serializer> Serializer for NDArraySerializer<S> {
    type Value = NDArray<S::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        if value.ndim() != self.rank {
            return Err(Error::RankMismatch {
                expected: self.rank,
                actual: value.ndim(),
            });
        }
        write_dims(stream, value.shape())?;
        write_elements(&self.element, stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        let shape = read_dims(stream, self.rank)?;
        read_elements(&self.element, stream, shape)
    }
}

/// Arrays with a schema-fixed shape.
#[derive(Debug, Clone)]
pub struct FixedNDArraySerializer<S> {
    element: S,
    shape: Vec<usize>,
}

impl<S> FixedNDArraySerializer<S> {
    pub fn new(element: S, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            element,
            shape: shape.into(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

impl<S: Serializer> Serializer for FixedNDArraySerializer<S> {
    type Value = NDArray<S::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        if value.shape() != self.shape.as_slice() {
            return Err(Error::ShapeMismatch {
                expected: self.shape.clone(),
                actual: value.shape().to_vec(),
            });
        }
        write_elements(&self.element, stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        read_elements(&self.element, stream, self.shape.clone())
    }

    fn is_trivially_serializable(&self) -> bool {
        self.element.is_trivially_serializable()
    }
}
