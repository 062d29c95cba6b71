//! Schema-driven serializers.
//!
//! Every schema type maps to a value implementing [`Serializer`]. Serializers
//! compose into a tree that mirrors the type tree: a vector of records is a
//! [`VectorSerializer`] wrapping a record serializer wrapping one serializer
//! per field. Self-referencing types close the loop through [`Recursive`].

use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};

use crate::codec::{CodedInputStream, CodedOutputStream};
use crate::error::Result;
use crate::limits::MAX_PREALLOC_BYTES;

pub mod containers;
pub mod ndarray;
pub mod primitives;
pub mod record;

pub use containers::{
    FixedVectorSerializer, MapSerializer, OptionalSerializer, StreamSerializer, VectorSerializer,
};
pub use ndarray::{DynamicNDArraySerializer, FixedNDArraySerializer, NDArraySerializer};
pub use primitives::{
    BoolSerializer, Complex32Serializer, Complex64Serializer, DateSerializer, DateTimeSerializer,
    EnumSerializer, Float32Serializer, Float64Serializer, Int8Serializer, Int16Serializer,
    Int32Serializer, Int64Serializer, NoneSerializer, SizeSerializer, StringSerializer,
    TimeSerializer, Uint8Serializer, Uint16Serializer, Uint32Serializer, Uint64Serializer,
};

/// Encodes and decodes values of one schema type.
pub trait Serializer: Send + Sync {
    /// The in-memory value type.
    type Value;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()>;

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value>;

    /// True when the encoding is a fixed-width copy of the in-memory value,
    /// so runs of values can be transferred in bulk.
    fn is_trivially_serializable(&self) -> bool {
        false
    }

    /// Writes consecutive values with no separators.
    ///
    /// Overrides must produce the same bytes as writing each value in turn.
    fn write_slice<W: Write>(&self, stream: &mut CodedOutputStream<W>, values: &[Self::Value]) -> Result<()> {
        values.iter().try_for_each(|value| self.write(stream, value))
    }

    /// Reads `count` consecutive values written by [`Serializer::write_slice`].
    fn read_vec<R: Read>(&self, stream: &mut CodedInputStream<R>, count: usize) -> Result<Vec<Self::Value>> {
        read_each(self, stream, count)
    }
}

impl<S: Serializer + ?Sized> Serializer for &S {
    type Value = S::Value;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        (**self).write(stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        (**self).read(stream)
    }

    fn is_trivially_serializable(&self) -> bool {
        (**self).is_trivially_serializable()
    }

    fn write_slice<W: Write>(&self, stream: &mut CodedOutputStream<W>, values: &[Self::Value]) -> Result<()> {
        (**self).write_slice(stream, values)
    }

    fn read_vec<R: Read>(&self, stream: &mut CodedInputStream<R>, count: usize) -> Result<Vec<Self::Value>> {
        (**self).read_vec(stream, count)
    }
}

/// Reads `count` values one at a time.
pub(crate) fn read_each<S, R>(serializer: &S, stream: &mut CodedInputStream<R>, count: usize) -> Result<Vec<S::Value>>
where
    S: Serializer + ?Sized,
    R: Read,
{
    let mut values = Vec::with_capacity(prealloc_len::<S::Value>(count));
    for _ in 0..count {
        values.push(serializer.read(stream)?);
    }
    Ok(values)
}

/// Capacity to reserve for `count` decoded values of type `T`.
pub(crate) fn prealloc_len<T>(count: usize) -> usize {
    let per_item = std::mem::size_of::<T>().max(1);
    count.min(MAX_PREALLOC_BYTES / per_item)
}

// =============================================================================
// RECURSION
// =============================================================================

/// A lazily constructed serializer for self-referencing types.
///
/// The inner serializer is built by `factory` on first use, so a record can
/// hold a `Recursive` handle to its own serializer without constructing an
/// infinite tree. Values are boxed.
pub struct Recursive<S> {
    factory: Arc<dyn Fn() -> S + Send + Sync>,
    inner: OnceLock<Box<S>>,
}

impl<S> Recursive<S> {
    pub fn new(factory: impl Fn() -> S + Send + Sync + 'static) -> Self {
        Self {
            factory: Arc::new(factory),
            inner: OnceLock::new(),
        }
    }

    /// Returns the inner serializer, building it if needed.
    pub fn get(&self) -> &S {
        self.inner.get_or_init(|| Box::new((self.factory)()))
    }
}

impl<S> Clone for Recursive<S> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            inner: OnceLock::new(),
        }
    }
}

impl<S> fmt::Debug for Recursive<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recursive")
            .field("initialized", &self.inner.get().is_some())
            .finish()
    }
}

impl<S: Serializer> Serializer for Recursive<S> {
    type Value = Box<S::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        self.get().write(stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        self.get().read(stream).map(Box::new)
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Node {
        value: i32,
        next: Option<Box<Node>>,
    }

    #[derive(Debug, Clone)]
    struct NodeSerializer {
        next: OptionalSerializer<Recursive<NodeSerializer>>,
    }

    impl NodeSerializer {
        fn new() -> Self {
            Self {
                next: OptionalSerializer::new(Recursive::new(NodeSerializer::new)),
            }
        }
    }

    impl Serializer for NodeSerializer {
        type Value = Node;

        fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Node) -> Result<()> {
            Int32Serializer.write(stream, &value.value)?;
            self.next.write(stream, &value.next)
        }

        fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Node> {
            Ok(Node {
                value: Int32Serializer.read(stream)?,
                next: self.next.read(stream)?,
            })
        }
    }

    #[test]
    fn test_recursive_is_lazy() {
        let serializer = NodeSerializer::new();
        assert!(format!("{:?}", serializer).contains("initialized: false"));

        let list = Node {
            value: 1,
            next: Some(Box::new(Node {
                value: 2,
                next: Some(Box::new(Node { value: 3, next: None })),
            })),
        };
        assert_eq!(encode(&serializer, &list), [2, 1, 4, 1, 6, 0]);
        assert_roundtrip(&serializer, list);
    }

    #[test]
    fn test_reference_delegates() {
        let serializer = Float64Serializer;
        let by_ref = &serializer;
        assert!(by_ref.is_trivially_serializable());
        assert_roundtrip(&by_ref, 2.5);
    }
}
