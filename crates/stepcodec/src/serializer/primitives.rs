//! Serializers for primitive schema types.
//!
//! Wire forms:
//! - `bool`, `int8`, `uint8`: one byte
//! - `float32`, `float64`, `complexfloat32`, `complexfloat64`: fixed-width
//!   little-endian
//! - `int16`, `int32`, `int64`: zigzag varint
//! - `uint16`, `uint32`, `uint64`, `size`: varint
//! - `string`: varint byte length, then UTF-8
//! - `date`, `time`, `datetime`: signed varint (days, nanoseconds)
//! - `none`: nothing

use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;

use bytemuck::Pod;

use super::{Serializer, prealloc_len, read_each};
use crate::codec::{CodedInputStream, CodedOutputStream};
use crate::error::{Error, Result};
use crate::model::{Complex32, Complex64, Date, DateTime, Time};

// =============================================================================
// FIXED WIDTH
// =============================================================================

/// Writes a run of plain-old-data values as one byte transfer.
fn write_pod_slice<T: Pod, W: Write>(stream: &mut CodedOutputStream<W>, values: &[T]) -> Result<()> {
    stream.write_bytes(bytemuck::cast_slice(values))
}

/// Reads `count` plain-old-data values, growing the buffer in bounded chunks.
fn read_pod_vec<T: Pod, R: Read>(
    stream: &mut CodedInputStream<R>,
    count: usize,
    context: &'static str,
) -> Result<Vec<T>> {
    let chunk = prealloc_len::<T>(count).max(1);
    let mut values: Vec<T> = Vec::new();
    while values.len() < count {
        let start = values.len();
        let end = start + chunk.min(count - start);
        values.resize(end, T::zeroed());
        stream.read_into(bytemuck::cast_slice_mut(&mut values[start..end]), context)?;
    }
    Ok(values)
}

macro_rules! fixed_serializer {
    (
        $(#[$meta:meta])*
        $name:ident, $ty:ty, $context:literal,
        write($ws:ident, $wv:ident) $write:block
        read($rs:ident) $read:block
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Serializer for $name {
            type Value = $ty;

            fn write<W: Write>(&self, $ws: &mut CodedOutputStream<W>, $wv: &$ty) -> Result<()> $write

            fn read<R: Read>(&self, $rs: &mut CodedInputStream<R>) -> Result<$ty> $read

            fn is_trivially_serializable(&self) -> bool {
                true
            }

            fn write_slice<W: Write>(&self, stream: &mut CodedOutputStream<W>, values: &[$ty]) -> Result<()> {
                if cfg!(target_endian = "little") {
                    write_pod_slice(stream, values)
                } else {
                    values.iter().try_for_each(|value| self.write(stream, value))
                }
            }

            fn read_vec<R: Read>(&self, stream: &mut CodedInputStream<R>, count: usize) -> Result<Vec<$ty>> {
                if cfg!(target_endian = "little") {
                    read_pod_vec(stream, count, $context)
                } else {
                    read_each(self, stream, count)
                }
            }
        }
    };
}

fixed_serializer!(
    /// `int8`: one byte, two's complement.
    Int8Serializer, i8, "int8",
    write(stream, value) { stream.write_byte(*value as u8) }
    read(stream) { Ok(stream.read_byte("int8")? as i8) }
);

fixed_serializer!(
    /// `uint8`: one byte.
    Uint8Serializer, u8, "uint8",
    write(stream, value) { stream.write_byte(*value) }
    read(stream) { stream.read_byte("uint8") }
);

fixed_serializer!(
    /// `float32`: 4 bytes little-endian.
    Float32Serializer, f32, "float32",
    write(stream, value) { stream.write_bytes(&value.to_le_bytes()) }
    read(stream) {
        let mut bytes = [0u8; 4];
        stream.read_into(&mut bytes, "float32")?;
        Ok(f32::from_le_bytes(bytes))
    }
);

fixed_serializer!(
    /// `float64`: 8 bytes little-endian.
    Float64Serializer, f64, "float64",
    write(stream, value) { stream.write_bytes(&value.to_le_bytes()) }
    read(stream) {
        let mut bytes = [0u8; 8];
        stream.read_into(&mut bytes, "float64")?;
        Ok(f64::from_le_bytes(bytes))
    }
);

fixed_serializer!(
    /// `complexfloat32`: real then imaginary part, each a `float32`.
    Complex32Serializer, Complex32, "complexfloat32",
    write(stream, value) {
        Float32Serializer.write(stream, &value.re)?;
        Float32Serializer.write(stream, &value.im)
    }
    read(stream) {
        let re = Float32Serializer.read(stream)?;
        let im = Float32Serializer.read(stream)?;
        Ok(Complex32::new(re, im))
    }
);

fixed_serializer!(
    /// `complexfloat64`: real then imaginary part, each a `float64`.
    Complex64Serializer, Complex64, "complexfloat64",
    write(stream, value) {
        Float64Serializer.write(stream, &value.re)?;
        Float64Serializer.write(stream, &value.im)
    }
    read(stream) {
        let re = Float64Serializer.read(stream)?;
        let im = Float64Serializer.read(stream)?;
        Ok(Complex64::new(re, im))
    }
);

/// `bool`: one byte, 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoolSerializer;

fn decode_bool(byte: u8) -> Result<bool> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        value => Err(Error::InvalidByte {
            context: "bool",
            value,
        }),
    }
}

impl Serializer for BoolSerializer {
    type Value = bool;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &bool) -> Result<()> {
        stream.write_byte(*value as u8)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<bool> {
        decode_bool(stream.read_byte("bool")?)
    }

    fn is_trivially_serializable(&self) -> bool {
        true
    }

    fn write_slice<W: Write>(&self, stream: &mut CodedOutputStream<W>, values: &[bool]) -> Result<()> {
        let bytes: Vec<u8> = values.iter().map(|&b| b as u8).collect();
        stream.write_bytes(&bytes)
    }

    fn read_vec<R: Read>(&self, stream: &mut CodedInputStream<R>, count: usize) -> Result<Vec<bool>> {
        let bytes: Vec<u8> = read_pod_vec(stream, count, "bool")?;
        bytes.into_iter().map(decode_bool).collect()
    }
}

// =============================================================================
// VARINT
// =============================================================================

macro_rules! unsigned_varint_serializer {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $type_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Serializer for $name {
            type Value = $ty;

            fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &$ty) -> Result<()> {
                stream.write_unsigned_varint(*value as u64)
            }

            fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<$ty> {
                let value = stream.read_unsigned_varint($type_name)?;
                <$ty>::try_from(value).map_err(|_| Error::OutOfRange {
                    type_name: $type_name,
                    value: value as i128,
                })
            }
        }
    };
}

macro_rules! signed_varint_serializer {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $type_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl Serializer for $name {
            type Value = $ty;

            fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &$ty) -> Result<()> {
                stream.write_signed_varint(*value as i64)
            }

            fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<$ty> {
                let value = stream.read_signed_varint($type_name)?;
                <$ty>::try_from(value).map_err(|_| Error::OutOfRange {
                    type_name: $type_name,
                    value: value as i128,
                })
            }
        }
    };
}

signed_varint_serializer!(
    /// `int16`: zigzag varint.
    Int16Serializer, i16, "int16"
);
signed_varint_serializer!(
    /// `int32`: zigzag varint.
    Int32Serializer, i32, "int32"
);
signed_varint_serializer!(
    /// `int64`: zigzag varint.
    Int64Serializer, i64, "int64"
);
unsigned_varint_serializer!(
    /// `uint16`: varint.
    Uint16Serializer, u16, "uint16"
);
unsigned_varint_serializer!(
    /// `uint32`: varint.
    Uint32Serializer, u32, "uint32"
);
unsigned_varint_serializer!(
    /// `uint64`: varint.
    Uint64Serializer, u64, "uint64"
);
unsigned_varint_serializer!(
    /// `size`: varint, decoded into the platform's `usize`.
    SizeSerializer, usize, "size"
);

// =============================================================================
// STRING
// =============================================================================

/// `string`: varint byte length, then UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringSerializer;

impl Serializer for StringSerializer {
    type Value = String;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &String) -> Result<()> {
        stream.write_string(value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<String> {
        stream.read_string("string")
    }
}

// =============================================================================
// TEMPORAL
// =============================================================================

/// `date`: signed varint days since 1970-01-01.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateSerializer;

impl Serializer for DateSerializer {
    type Value = Date;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Date) -> Result<()> {
        stream.write_signed_varint(value.days_since_epoch())
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Date> {
        stream
            .read_signed_varint("date")
            .map(Date::from_days_since_epoch)
    }
}

/// `time`: signed varint nanoseconds since midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSerializer;

impl Serializer for TimeSerializer {
    type Value = Time;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &Time) -> Result<()> {
        stream.write_signed_varint(value.nanos_since_midnight())
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<Time> {
        Time::from_nanos_since_midnight(stream.read_signed_varint("time")?)
    }
}

/// `datetime`: signed varint nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateTimeSerializer;

impl Serializer for DateTimeSerializer {
    type Value = DateTime;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &DateTime) -> Result<()> {
        stream.write_signed_varint(value.nanos_since_epoch())
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<DateTime> {
        stream
            .read_signed_varint("datetime")
            .map(DateTime::from_nanos_since_epoch)
    }
}

// =============================================================================
// ENUM / NONE
// =============================================================================

/// An enum encoded through its underlying integer serializer.
///
/// `E` converts into the integer losslessly and back fallibly; integers with
/// no matching variant fail with [`Error::InvalidValue`].
pub struct EnumSerializer<E, S> {
    integer: S,
    name: &'static str,
    _enum: PhantomData<fn() -> E>,
}

impl<E, S> EnumSerializer<E, S> {
    pub fn new(name: &'static str, integer: S) -> Self {
        Self {
            integer,
            name,
            _enum: PhantomData,
        }
    }
}

impl<E, S: Clone> Clone for EnumSerializer<E, S> {
    fn clone(&self) -> Self {
        Self::new(self.name, self.integer.clone())
    }
}

impl<E, S: fmt::Debug> fmt::Debug for EnumSerializer<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumSerializer")
            .field("name", &self.name)
            .field("integer", &self.integer)
            .finish()
    }
}

impl<E, S> Serializer for EnumSerializer<E, S>
where
    S: Serializer,
    S::Value: Copy + Into<i128>,
    E: Copy + Into<S::Value> + TryFrom<S::Value>,
{
    type Value = E;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &E) -> Result<()> {
        self.integer.write(stream, &(*value).into())
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> Result<E> {
        let raw = self.integer.read(stream)?;
        E::try_from(raw).map_err(|_| Error::InvalidValue {
            type_name: self.name,
            value: raw.into(),
        })
    }

    fn is_trivially_serializable(&self) -> bool {
        false
    }
}

/// `none`: the unit type, zero bytes on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoneSerializer;

impl Serializer for NoneSerializer {
    type Value = ();

    fn write<W: Write>(&self, _stream: &mut CodedOutputStream<W>, _value: &()) -> Result<()> {
        Ok(())
    }

    fn read<R: Read>(&self, _stream: &mut CodedInputStream<R>) -> Result<()> {
        Ok(())
    }
}
