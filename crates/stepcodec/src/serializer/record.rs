//! Record and union serializers.
//!
//! Records are encoded field by field in declaration order with no framing.
//! Unions are encoded as a one-byte case index followed by the case value.
//! Both are declared with a macro over a user-defined Rust type.

/// Declares a serializer for a record struct.
///
/// Each entry names a field of the record, the serializer type for it, and
/// the expression that constructs that serializer.
///
/// ```
/// use stepcodec::record_serializer;
/// use stepcodec::serializer::{StringSerializer, Uint32Serializer};
///
/// #[derive(Debug, Clone, PartialEq)]
/// pub struct Person {
///     pub name: String,
///     pub age: u32,
/// }
///
/// record_serializer! {
///     pub struct PersonSerializer for Person {
///         name: StringSerializer = StringSerializer,
///         age: Uint32Serializer = Uint32Serializer,
///     }
/// }
///
/// assert_eq!(PersonSerializer::FIELD_NAMES, &["name", "age"]);
/// ```
#[macro_export]
macro_rules! record_serializer {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident for $record:ident {
            $( $field:ident : $ser:ty = $init:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $( $field: $ser, )+
        }

        impl $name {
            /// Field names in wire order.
            pub const FIELD_NAMES: &'static [&'static str] = &[$(stringify!($field)),+];

            pub fn new() -> Self {
                Self {
                    $( $field: $init, )+
                }
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::serializer::Serializer for $name {
            type Value = $record;

            fn write<W: ::std::io::Write>(
                &self,
                stream: &mut $crate::codec::CodedOutputStream<W>,
                value: &$record,
            ) -> $crate::Result<()> {
                $( $crate::serializer::Serializer::write(&self.$field, stream, &value.$field)?; )+
                ::std::result::Result::Ok(())
            }

            fn read<R: ::std::io::Read>(
                &self,
                stream: &mut $crate::codec::CodedInputStream<R>,
            ) -> $crate::Result<$record> {
                ::std::result::Result::Ok($record {
                    $( $field: $crate::serializer::Serializer::read(&self.$field, stream)?, )+
                })
            }

            fn is_trivially_serializable(&self) -> bool {
                true $( && $crate::serializer::Serializer::is_trivially_serializable(&self.$field) )+
            }
        }
    };
}

/// Declares a serializer for a union enum.
///
/// Case indices follow declaration order starting at 0. An optional leading
/// `_ => Variant` entry names a unit variant that stands for the "no value"
/// case and takes index 0.
///
/// ```
/// use stepcodec::union_serializer;
/// use stepcodec::serializer::{Int32Serializer, StringSerializer};
///
/// #[derive(Debug, Clone, PartialEq)]
/// pub enum IntOrString {
///     Null,
///     Int(i32),
///     String(String),
/// }
///
/// union_serializer! {
///     pub struct IntOrStringSerializer for IntOrString {
///         _ => Null,
///         int: Int(Int32Serializer) = Int32Serializer,
///         string: String(StringSerializer) = StringSerializer,
///     }
/// }
///
/// assert_eq!(IntOrStringSerializer::CASES, &["Null", "Int", "String"]);
/// ```
#[macro_export]
macro_rules! union_serializer {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident for $union:ident {
            $( _ => $none:ident, )?
            $( $field:ident : $variant:ident ( $ser:ty ) = $init:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $( $field: $ser, )+
        }

        impl $name {
            /// Case names in index order.
            pub const CASES: &'static [&'static str] = &[
                $( stringify!($none), )?
                $( stringify!($variant), )+
            ];

            pub fn new() -> Self {
                Self {
                    $( $field: $init, )+
                }
            }
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl $crate::serializer::Serializer for $name {
            type Value = $union;

            fn write<W: ::std::io::Write>(
                &self,
                stream: &mut $crate::codec::CodedOutputStream<W>,
                value: &$union,
            ) -> $crate::Result<()> {
                #[allow(dead_code)]
                #[repr(u8)]
                enum Case {
                    $( $none, )?
                    $( $variant, )+
                }

                match value {
                    $( $union::$none => stream.write_byte(Case::$none as u8), )?
                    $(
                        $union::$variant(inner) => {
                            stream.write_byte(Case::$variant as u8)?;
                            $crate::serializer::Serializer::write(&self.$field, stream, inner)
                        }
                    )+
                }
            }

            fn read<R: ::std::io::Read>(
                &self,
                stream: &mut $crate::codec::CodedInputStream<R>,
            ) -> $crate::Result<$union> {
                #[allow(dead_code)]
                #[repr(u8)]
                enum Case {
                    $( $none, )?
                    $( $variant, )+
                }

                let index = stream.read_byte("union case")?;
                $(
                    if index == Case::$none as u8 {
                        return ::std::result::Result::Ok($union::$none);
                    }
                )?
                $(
                    if index == Case::$variant as u8 {
                        let inner = $crate::serializer::Serializer::read(&self.$field, stream)?;
                        return ::std::result::Result::Ok($union::$variant(inner));
                    }
                )+
                ::std::result::Result::Err($crate::Error::InvalidUnionCase {
                    union: stringify!($union),
                    index,
                    cases: Self::CASES.len(),
                })
            }
        }
    };
}
