//! Sample protocol shared by the integration tests.
//!
//! ```text
//! protocol MyProtocol {
//!   header: Header           # { subject: string }
//!   samples: !stream Sample  # { id: uint32, data: int32[] }
//! }
//! ```

#![allow(dead_code)]

use std::borrow::Borrow;
use std::io::{Read, Seek};

use stepcodec::serializer::{Int32Serializer, NDArraySerializer, StringSerializer, Uint32Serializer};
use stepcodec::{
    BinaryReader, IndexedBinaryReader, NDArray, ProtocolDescriptor, Result, StepDescriptor, StepWriter, record_serializer,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub id: u32,
    pub data: NDArray<i32>,
}

record_serializer! {
    pub struct HeaderSerializer for Header {
        subject: StringSerializer = StringSerializer,
    }
}

record_serializer! {
    pub struct SampleSerializer for Sample {
        id: Uint32Serializer = Uint32Serializer,
        data: NDArraySerializer<Int32Serializer> = NDArraySerializer::new(Int32Serializer, 1),
    }
}

pub const HEADER: usize = 0;
pub const SAMPLES: usize = 1;

pub static STEPS: [StepDescriptor; 2] = [StepDescriptor::scalar("header"), StepDescriptor::stream("samples")];

pub static MY_PROTOCOL: ProtocolDescriptor = ProtocolDescriptor {
    name: "MyProtocol",
    schema: r#"{"protocol":{"name":"MyProtocol","sequence":[{"name":"header","type":"Header"},{"name":"samples","type":{"stream":{"items":"Sample"}}}]}}"#,
    steps: &STEPS,
};

pub fn sample(id: u32) -> Sample {
    let i = id as i32;
    Sample {
        id,
        data: NDArray::from_vec([3], vec![i, i + 1, i + 2]).unwrap(),
    }
}

pub fn hello() -> Header {
    Header {
        subject: "Hello World!".to_string(),
    }
}

/// Typed writer over either binary format.
pub struct MyProtocolWriter<W: StepWriter> {
    inner: W,
}

impl<W: StepWriter> MyProtocolWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_header(&mut self, value: &Header) -> Result<()> {
        self.inner.write_step(HEADER, &HeaderSerializer::new(), value)
    }

    pub fn write_samples<I>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Borrow<Sample>,
    {
        self.inner.write_stream(SAMPLES, &SampleSerializer::new(), items)
    }

    pub fn close(self) -> Result<W::Output> {
        self.inner.close()
    }
}

/// Replays every step of `reader` into `writer`.
pub fn copy_to<R: Read, W: StepWriter>(reader: &mut BinaryReader<R>, writer: &mut W) -> Result<()> {
    reader.copy_step(HEADER, &HeaderSerializer::new(), writer)?;
    reader.copy_step(SAMPLES, &SampleSerializer::new(), writer)
}

pub fn read_samples_from<R: Read + Seek>(reader: &mut IndexedBinaryReader<R>, start: u64) -> Result<Vec<Sample>> {
    reader.read_stream(SAMPLES, SampleSerializer::new(), start)?.collect()
}
