//! End-to-end tests for the sequential binary writer and reader.

mod common;

use std::io::Cursor;

use common::*;
use stepcodec::{
    BinaryOptions, BinaryReader, BinaryWriter, Error, IndexedBinaryReader, IndexedBinaryWriter, ProtocolDescriptor,
    StepWriter,
};

fn write_plain(samples: &[Sample]) -> Vec<u8> {
    let mut writer = MyProtocolWriter::new(BinaryWriter::new(Vec::new(), &MY_PROTOCOL).unwrap());
    writer.write_header(&hello()).unwrap();
    writer.write_samples(samples).unwrap();
    writer.close().unwrap()
}

fn open(bytes: Vec<u8>) -> BinaryReader<Cursor<Vec<u8>>> {
    BinaryReader::new(Cursor::new(bytes), &MY_PROTOCOL).unwrap()
}

#[test]
fn test_roundtrip() {
    let samples: Vec<Sample> = (0..10).map(sample).collect();
    let mut reader = open(write_plain(&samples));

    assert_eq!(reader.schema(), MY_PROTOCOL.schema);
    assert_eq!(reader.read_step(HEADER, &HeaderSerializer::new()).unwrap(), hello());
    let read: Vec<Sample> = reader
        .read_stream(SAMPLES, SampleSerializer::new())
        .unwrap()
        .collect::<stepcodec::Result<_>>()
        .unwrap();
    assert_eq!(read, samples);
    reader.close().unwrap();
}

#[test]
fn test_stream_written_in_several_calls() {
    let mut writer = MyProtocolWriter::new(BinaryWriter::new(Vec::new(), &MY_PROTOCOL).unwrap());
    writer.write_header(&hello()).unwrap();
    writer.write_samples((0..3).map(sample)).unwrap();
    writer.write_samples(Vec::<Sample>::new()).unwrap();
    writer.write_samples((3..5).map(sample)).unwrap();
    let bytes = writer.close().unwrap();

    assert_eq!(bytes, write_plain(&(0..5).map(sample).collect::<Vec<_>>()));
}

#[test]
fn test_empty_stream() {
    let mut reader = open(write_plain(&[]));
    reader.read_step(HEADER, &HeaderSerializer::new()).unwrap();
    let mut items = reader.read_stream(SAMPLES, SampleSerializer::new()).unwrap();
    assert!(items.next().is_none());
    assert!(items.is_finished());
    reader.close().unwrap();
}

#[test]
fn test_write_out_of_order() {
    let mut writer = MyProtocolWriter::new(BinaryWriter::new(Vec::new(), &MY_PROTOCOL).unwrap());
    let err = writer.write_samples([sample(0)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Expected call to 'write_header' but received call to 'write_samples'."
    );
}

#[test]
fn test_write_header_twice() {
    let mut writer = MyProtocolWriter::new(BinaryWriter::new(Vec::new(), &MY_PROTOCOL).unwrap());
    writer.write_header(&hello()).unwrap();
    writer.write_samples([sample(0)]).unwrap();
    let err = writer.write_header(&hello()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Expected call to 'close' but received call to 'write_header'."
    );
}

#[test]
fn test_premature_writer_close() {
    let mut writer = MyProtocolWriter::new(BinaryWriter::new(Vec::new(), &MY_PROTOCOL).unwrap());
    writer.write_header(&hello()).unwrap();
    let err = writer.close().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Protocol writer closed before all steps were called. Expected call to 'write_samples'."
    );
}

#[test]
fn test_partially_consumed_stream() {
    let samples: Vec<Sample> = (0..10).map(sample).collect();
    let mut reader = open(write_plain(&samples));
    reader.read_step(HEADER, &HeaderSerializer::new()).unwrap();
    let first: Vec<Sample> = reader
        .read_stream(SAMPLES, SampleSerializer::new())
        .unwrap()
        .take(3)
        .collect::<stepcodec::Result<_>>()
        .unwrap();
    assert_eq!(first, samples[..3]);

    let err = reader.close().unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(
        err.to_string(),
        "Protocol reader closed before all data was consumed. The iterable returned by 'read_samples' was not fully consumed."
    );
}

#[test]
fn test_read_out_of_order() {
    let mut reader = open(write_plain(&[sample(0)]));
    let err = match reader.read_stream(SAMPLES, SampleSerializer::new()) {
        Err(err) => err,
        Ok(_) => panic!("reading samples before the header must fail"),
    };
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(
        err.to_string(),
        "Expected call to 'read_header' but received call to 'read_samples'."
    );

    reader.read_step(HEADER, &HeaderSerializer::new()).unwrap();
    let err = reader.read_step(HEADER, &HeaderSerializer::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Expected call to 'read_samples' but received call to 'read_header'."
    );
}

#[test]
fn test_read_past_unconsumed_stream() {
    let mut reader = open(write_plain(&[sample(0), sample(1)]));
    reader.read_step(HEADER, &HeaderSerializer::new()).unwrap();
    reader
        .read_stream(SAMPLES, SampleSerializer::new())
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    let err = reader.read_step(HEADER, &HeaderSerializer::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Received call to 'read_header' but the iterable returned by 'read_samples' was not fully consumed."
    );
}

#[test]
fn test_skip_completed_check() {
    let bytes = write_plain(&(0..4).map(sample).collect::<Vec<_>>());
    let options = BinaryOptions::new().with_skip_completed_check(true);
    let mut reader = BinaryReader::with_options(Cursor::new(bytes), &MY_PROTOCOL, options).unwrap();
    assert_eq!(reader.read_step(HEADER, &HeaderSerializer::new()).unwrap(), hello());
    reader.close().unwrap();
}

#[test]
fn test_schema_mismatch() {
    static OTHER: ProtocolDescriptor = ProtocolDescriptor {
        name: "MyProtocol",
        schema: r#"{"protocol":{"name":"MyProtocol","sequence":[]}}"#,
        steps: &STEPS,
    };

    let bytes = write_plain(&[sample(0)]);
    let err = BinaryReader::new(Cursor::new(bytes.clone()), &OTHER).unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));

    let options = BinaryOptions::new().with_verify_schema(false);
    let reader = BinaryReader::with_options(Cursor::new(bytes), &OTHER, options).unwrap();
    assert_eq!(reader.schema(), MY_PROTOCOL.schema);
}

#[test]
fn test_bad_magic() {
    let mut bytes = write_plain(&[]);
    bytes[0] = b'X';
    let err = BinaryReader::new(Cursor::new(bytes), &MY_PROTOCOL).unwrap_err();
    assert!(matches!(err, Error::InvalidMagic { .. }));
}

#[test]
fn test_truncated_stream() {
    let mut bytes = write_plain(&(0..3).map(sample).collect::<Vec<_>>());
    bytes.truncate(bytes.len() - 2);
    let mut reader = open(bytes);
    reader.read_step(HEADER, &HeaderSerializer::new()).unwrap();
    let results: Vec<_> = reader.read_stream(SAMPLES, SampleSerializer::new()).unwrap().collect();
    assert!(matches!(results.last(), Some(Err(Error::Eof { .. }))));
}

#[test]
fn test_copy_to_plain_writer() {
    let bytes = write_plain(&(0..6).map(sample).collect::<Vec<_>>());
    let mut reader = open(bytes.clone());
    let mut writer = BinaryWriter::new(Vec::new(), &MY_PROTOCOL).unwrap();
    copy_to(&mut reader, &mut writer).unwrap();
    reader.close().unwrap();
    assert_eq!(writer.close().unwrap(), bytes);
}

#[test]
fn test_copy_to_indexed_writer() {
    let samples: Vec<Sample> = (0..6).map(sample).collect();
    let bytes = write_plain(&samples);
    let mut reader = open(bytes.clone());
    let mut writer = IndexedBinaryWriter::new(Vec::new(), &MY_PROTOCOL).unwrap();
    copy_to(&mut reader, &mut writer).unwrap();
    reader.close().unwrap();
    let indexed = writer.close().unwrap();
    assert!(indexed.starts_with(&bytes));

    let mut reader = IndexedBinaryReader::new(Cursor::new(indexed), &MY_PROTOCOL).unwrap();
    assert_eq!(read_samples_from(&mut reader, 4).unwrap(), samples[4..]);
}
