//! Optional, vector, map and stream serializers.

use std::hash::Hash;
use std::io::{Read, Write};

use rustc_hash::FxHashMap;

use super::{Serializer, prealloc_len};
use crate::codec::{CodedInputStream, CodedOutputStream};
use crate::error::{Error, Result};

/// `T?`: a presence byte (0 or 1), then the value when present.
#[derive(Debug, Clone, Default)]
pub struct OptionalSerializer<S> {
    inner: S,
}

impl<S> OptionalSerializer<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: Serializer> Serializer for OptionalSerializer<S> {
    type Value = Option<S::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        match value {
            None => stream.write_byte(0),
            Some(inner) => {
                stream.write_byte(1)?;
                self.inner.write(stream, inner)
            }
        }
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        match stream.read_byte("optional")? {
            0 => Ok(None),
            1 => self.inner.read(stream).map(Some),
            value => Err(Error::InvalidByte {
                context: "optional",
                value,
            }),
        }
    }
}

/// `T*`: varint length, then the elements.
#[derive(Debug, Clone, Default)]
pub struct VectorSerializer<S> {
    element: S,
}

impl<S> VectorSerializer<S> {
    pub fn new(element: S) -> Self {
        Self { element }
    }
}

impl<S: Serializer> Serializer for VectorSerializer<S> {
    type Value = Vec<S::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        stream.write_unsigned_varint(value.len() as u64)?;
        self.element.write_slice(stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        let len = stream.read_unsigned_varint("vector length")?;
        let len = usize::try_from(len).map_err(|_| Error::OutOfRange {
            type_name: "vector length",
            value: len as i128,
        })?;
        self.element.read_vec(stream, len)
    }
}

/// `T[N]`: exactly `N` elements with no length prefix.
#[derive(Debug, Clone)]
pub struct FixedVectorSerializer<S> {
    element: S,
    len: usize,
}

impl<S> FixedVectorSerializer<S> {
    pub fn new(element: S, len: usize) -> Self {
        Self { element, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<S: Serializer> Serializer for FixedVectorSerializer<S> {
    type Value = Vec<S::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        if value.len() != self.len {
            return Err(Error::LengthMismatch {
                expected: self.len,
                actual: value.len(),
            });
        }
        self.element.write_slice(stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        self.element.read_vec(stream, self.len)
    }

    fn is_trivially_serializable(&self) -> bool {
        self.element.is_trivially_serializable()
    }
}

/// `K->V`: varint entry count, then key/value pairs.
///
/// Entry order on the wire is unspecified; readers must not depend on it.
#[derive(Debug, Clone, Default)]
pub struct MapSerializer<K, V> {
    key: K,
    value: V,
}

impl<K, V> MapSerializer<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

impl<K, V> Serializer for MapSerializer<K, V>
where
    K: Serializer,
    K::Value: Eq + Hash,
    V: Serializer,
{
    type Value = FxHashMap<K::Value, V::Value>;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Self::Value) -> Result<()> {
        stream.write_unsigned_varint(value.len() as u64)?;
        for (k, v) in value {
            self.key.write(stream, k)?;
            self.value.write(stream, v)?;
        }
        Ok(())
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Self::Value> {
        let len = stream.read_unsigned_varint("map length")? as usize;
        let mut map = FxHashMap::default();
        map.reserve(prealloc_len::<(K::Value, V::Value)>(len));
        for _ in 0..len {
            let k = self.key.read(stream)?;
            let v = self.value.read(stream)?;
            map.insert(k, v);
        }
        Ok(map)
    }
}

/// `!T`: the element encoding of a stream step.
///
/// Each item is preceded by a continuation byte `1`; a single `0` ends the
/// stream. Items may be written in any number of batches before the end
/// marker. This is not a [`Serializer`]: streams only appear as protocol
/// steps.
#[derive(Debug, Clone, Default)]
pub struct StreamSerializer<S> {
    item: S,
}

impl<S: Serializer> StreamSerializer<S> {
    pub fn new(item: S) -> Self {
        Self { item }
    }

    pub fn item_serializer(&self) -> &S {
        &self.item
    }

    /// Writes one item with its continuation byte.
    pub fn write_item<W: Write>(&self, stream: &mut CodedOutputStream<W>, item: &S::Value) -> Result<()> {
        stream.write_byte(1)?;
        self.item.write(stream, item)
    }

    /// Writes the end-of-stream marker.
    pub fn write_end<W: Write>(&self, stream: &mut CodedOutputStream<W>) -> Result<()> {
        stream.write_byte(0)
    }

    /// Reads the next item, or `None` at the end marker.
    pub fn read_item<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Option<S::Value>> {
        match stream.read_byte("stream continuation")? {
            0 => Ok(None),
            1 => self.item.read(stream).map(Some),
            value => Err(Error::InvalidByte {
                context: "stream continuation",
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::primitives::*;
    use crate::serializer::test_util::*;

    #[test]
    fn test_optional() {
        let serializer = OptionalSerializer::new(Int32Serializer);
        assert_eq!(encode(&serializer, &None), [0]);
        assert_eq!(encode(&serializer, &Some(-1)), [1, 1]);
        assert_roundtrip(&serializer, Some(i32::MAX));
        assert!(matches!(
            decode(&serializer, &[2]),
            Err(Error::InvalidByte { context: "optional", value: 2 })
        ));
    }

    #[test]
    fn test_vector() {
        let serializer = VectorSerializer::new(StringSerializer);
        assert_roundtrip(&serializer, vec![]);
        assert_roundtrip(&serializer, vec!["a".to_string(), String::new(), "ccc".to_string()]);

        let ints = VectorSerializer::new(Int32Serializer);
        assert_eq!(encode(&ints, &vec![1, 2, 3]), [3, 2, 4, 6]);
    }

    #[test]
    fn test_vector_of_fixed_width_uses_bulk_bytes() {
        let serializer = VectorSerializer::new(Float32Serializer);
        let bytes = encode(&serializer, &vec![1.0, 2.0]);
        assert_eq!(bytes.len(), 1 + 8);
        assert_eq!(&bytes[1..5], &1.0f32.to_le_bytes());
        assert_roundtrip(&serializer, vec![0.5; 100]);
    }

    #[test]
    fn test_vector_length_beyond_input_is_eof() {
        // Claims 2^40 elements; decoding must fail without allocating them.
        let mut bytes = encode(&Uint64Serializer, &(1u64 << 40));
        bytes.push(0);
        let err = decode(&VectorSerializer::new(Float64Serializer), &bytes).unwrap_err();
        assert!(matches!(err, Error::Eof { .. }));
    }

    #[test]
    fn test_fixed_vector() {
        let serializer = FixedVectorSerializer::new(Int16Serializer, 3);
        assert_eq!(encode(&serializer, &vec![0, -1, 1]), [0, 1, 2]);
        assert_roundtrip(&serializer, vec![i16::MIN, 0, i16::MAX]);
        assert!(!serializer.is_trivially_serializable());
        assert!(FixedVectorSerializer::new(Uint8Serializer, 4).is_trivially_serializable());

        let mut stream = CodedOutputStream::new(Vec::new());
        let err = serializer.write(&mut stream, &vec![1, 2]).unwrap_err();
        assert_eq!(err.to_string(), "expected 3 elements, got 2");
    }

    #[test]
    fn test_map() {
        let serializer = MapSerializer::new(StringSerializer, Int32Serializer);
        let mut map = FxHashMap::default();
        map.insert("one".to_string(), 1);
        map.insert("minus two".to_string(), -2);
        assert_roundtrip(&serializer, map);
        assert_roundtrip(&serializer, FxHashMap::default());
    }

    #[test]
    fn test_stream_items() {
        let serializer = StreamSerializer::new(Uint32Serializer);
        let mut out = CodedOutputStream::new(Vec::new());
        serializer.write_item(&mut out, &5).unwrap();
        serializer.write_item(&mut out, &300).unwrap();
        serializer.write_end(&mut out).unwrap();
        let bytes = out.into_inner().unwrap();
        assert_eq!(bytes, [1, 5, 1, 0xAC, 0x02, 0]);

        let mut input = CodedInputStream::new(&bytes[..]);
        assert_eq!(serializer.read_item(&mut input).unwrap(), Some(5));
        assert_eq!(serializer.read_item(&mut input).unwrap(), Some(300));
        assert_eq!(serializer.read_item(&mut input).unwrap(), None);
    }
}
