//! Benchmark for stepcodec using a synthetic telemetry protocol.
//!
//! Measures plain vs indexed writes, sequential vs random-access reads and
//! the bulk array path against element-wise encoding.
//!
//! Usage: `bench-telemetry [SAMPLES] [--json REPORT_PATH]`

use std::fs;
use std::io::{Cursor, Read, Write};
use std::time::{Duration, Instant};

use serde::Serialize;
use stepcodec::codec::{CodedInputStream, CodedOutputStream};
use stepcodec::serializer::{
    DateTimeSerializer, Float32Serializer, NDArraySerializer, StringSerializer, Uint64Serializer,
};
use stepcodec::{
    BinaryReader, BinaryWriter, DateTime, IndexedBinaryReader, IndexedBinaryWriter, NDArray, ProtocolDescriptor,
    Serializer, StepDescriptor, StepWriter, record_serializer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

// =============================================================================
// PROTOCOL
// =============================================================================

const CHANNELS: usize = 16;

#[derive(Debug, Clone, PartialEq)]
struct Header {
    subject: String,
    recorded_at: DateTime,
}

#[derive(Debug, Clone, PartialEq)]
struct Sample {
    id: u64,
    values: NDArray<f32>,
}

record_serializer! {
    struct HeaderSerializer for Header {
        subject: StringSerializer = StringSerializer,
        recorded_at: DateTimeSerializer = DateTimeSerializer,
    }
}

record_serializer! {
    struct SampleSerializer for Sample {
        id: Uint64Serializer = Uint64Serializer,
        values: NDArraySerializer<Float32Serializer> = NDArraySerializer::new(Float32Serializer, 1),
    }
}

static STEPS: [StepDescriptor; 2] = [StepDescriptor::scalar("header"), StepDescriptor::stream("samples")];

static TELEMETRY: ProtocolDescriptor = ProtocolDescriptor {
    name: "Telemetry",
    schema: r#"{"protocol":{"name":"Telemetry","sequence":[{"name":"header","type":"Header"},{"name":"samples","type":{"stream":{"items":"Sample"}}}]}}"#,
    steps: &STEPS,
};

/// Forwards to the wrapped serializer but never takes the bulk path.
#[derive(Debug, Clone)]
struct ElementWise<S>(S);

impl<S: Serializer> Serializer for ElementWise<S> {
    type Value = S::Value;

    fn write<W: Write>(&self, stream: &mut CodedOutputStream<W>, value: &S::Value) -> stepcodec::Result<()> {
        self.0.write(stream, value)
    }

    fn read<R: Read>(&self, stream: &mut CodedInputStream<R>) -> stepcodec::Result<S::Value> {
        self.0.read(stream)
    }
}

// =============================================================================
// DATA
// =============================================================================

/// Deterministic xorshift generator so runs are comparable.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

fn make_samples(count: usize) -> Vec<Sample> {
    let mut rng = Rng(0x9e37_79b9_7f4a_7c15);
    (0..count as u64)
        .map(|id| {
            let values: Vec<f32> = (0..CHANNELS).map(|_| rng.next_f32()).collect();
            Sample {
                id,
                values: NDArray::from_vec([CHANNELS], values).expect("channel shape"),
            }
        })
        .collect()
}

fn header() -> Header {
    Header {
        subject: "synthetic telemetry".to_string(),
        recorded_at: "2024-06-01T12:00:00Z".parse().expect("valid datetime"),
    }
}

#[derive(Serialize)]
struct JsonSample<'a> {
    id: u64,
    values: &'a [f32],
}

// =============================================================================
// BENCHMARKS
// =============================================================================

/// Writes the protocol, splitting the stream into `blocks` write calls.
fn write_protocol<W: StepWriter>(mut writer: W, samples: &[Sample], blocks: usize) -> W::Output {
    writer
        .write_step(0, &HeaderSerializer::new(), &header())
        .expect("Failed to write header");
    let serializer = SampleSerializer::new();
    if samples.is_empty() {
        writer
            .write_stream(1, &serializer, samples)
            .expect("Failed to write samples");
    }
    for chunk in samples.chunks(samples.len().div_ceil(blocks).max(1)) {
        writer
            .write_stream(1, &serializer, chunk)
            .expect("Failed to write samples");
    }
    writer.close().expect("Failed to close writer")
}

fn encode<S: Serializer>(serializer: &S, value: &S::Value) -> Vec<u8> {
    let mut stream = CodedOutputStream::new(Vec::new());
    serializer.write(&mut stream, value).expect("Failed to encode");
    stream.into_inner().expect("Failed to flush")
}

fn time<T>(iters: u32, mut f: impl FnMut() -> T) -> (T, Duration) {
    let start = Instant::now();
    let mut out = f();
    for _ in 1..iters {
        out = f();
    }
    (out, start.elapsed() / iters)
}

fn throughput(bytes: usize, elapsed: Duration) -> f64 {
    (bytes as f64 / 1_000_000.0) / elapsed.as_secs_f64()
}

#[derive(Serialize)]
struct Report {
    samples: usize,
    json_bytes: usize,
    plain_bytes: usize,
    indexed_bytes: usize,
    plain_write_us: u128,
    indexed_write_us: u128,
    sequential_read_us: u128,
    random_access_us_per_read: u128,
    bulk_array_write_us: u128,
    elementwise_array_write_us: u128,
    bulk_array_read_us: u128,
    elementwise_array_read_us: u128,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let mut count = 100_000usize;
    let mut report_path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => report_path = args.next(),
            n => count = n.parse().expect("SAMPLES must be a number"),
        }
    }

    println!("=== stepcodec Benchmark ===");
    let samples = make_samples(count);
    println!("Samples: {} x {} channels", samples.len(), CHANNELS);

    let json: Vec<JsonSample> = samples
        .iter()
        .map(|s| JsonSample {
            id: s.id,
            values: s.values.as_slice().expect("standard layout"),
        })
        .collect();
    let json_bytes = serde_json::to_vec(&json).expect("Failed to encode JSON").len();

    // Writes
    const WRITE_ITERS: u32 = 5;
    let (plain, plain_time) = time(WRITE_ITERS, || {
        write_protocol(
            BinaryWriter::new(Vec::new(), &TELEMETRY).expect("Failed to open writer"),
            &samples,
            8,
        )
    });
    println!("\nPlain write: {} bytes in {:?}", plain.len(), plain_time);
    println!("  Throughput: {:.2} MB/s", throughput(plain.len(), plain_time));

    let (indexed, indexed_time) = time(WRITE_ITERS, || {
        write_protocol(
            IndexedBinaryWriter::new(Vec::new(), &TELEMETRY).expect("Failed to open writer"),
            &samples,
            8,
        )
    });
    println!("\nIndexed write: {} bytes in {:?}", indexed.len(), indexed_time);
    println!("  Index overhead: {} bytes", indexed.len() - plain.len());
    assert!(indexed.starts_with(&plain), "indexed output should extend plain output");

    // Sequential read
    let (read_count, read_time) = time(WRITE_ITERS, || {
        let mut reader = BinaryReader::new(Cursor::new(&plain), &TELEMETRY).expect("Failed to open reader");
        reader
            .read_step(0, &HeaderSerializer::new())
            .expect("Failed to read header");
        let mut n = 0usize;
        for item in reader.read_stream(1, SampleSerializer::new()).expect("Failed to read samples") {
            item.expect("Failed to decode sample");
            n += 1;
        }
        reader.close().expect("Failed to close reader");
        n
    });
    assert_eq!(read_count, samples.len());
    println!("\nSequential read: {:?}", read_time);
    println!("  Throughput: {:.2} MB/s", throughput(plain.len(), read_time));

    // Random access
    const RANDOM_READS: u32 = 200;
    let mut reader = IndexedBinaryReader::new(Cursor::new(&indexed), &TELEMETRY).expect("Failed to open index");
    info!(steps = 2, samples = reader.count(1).expect("count"), "opened indexed reader");
    let mut rng = Rng(42);
    let random_start = Instant::now();
    for _ in 0..RANDOM_READS {
        let start = rng.next_u64() % count.max(1) as u64;
        let first = reader
            .read_stream(1, SampleSerializer::new(), start)
            .expect("Failed to seek")
            .next();
        if let Some(sample) = first {
            assert_eq!(sample.expect("Failed to decode sample").id, start);
        }
    }
    let random_time = random_start.elapsed() / RANDOM_READS;
    println!("\nRandom access (first item after seek): {:?} per read", random_time);

    // Array paths
    let values: Vec<f32> = (0..1_000_000).map(|i| i as f32 * 0.5).collect();
    let array = NDArray::from_vec([1000, 1000], values).expect("array shape");
    let bulk = NDArraySerializer::new(Float32Serializer, 2);
    let element_wise = NDArraySerializer::new(ElementWise(Float32Serializer), 2);

    let (bulk_bytes, bulk_time) = time(WRITE_ITERS, || encode(&bulk, &array));
    let (slow_bytes, slow_time) = time(WRITE_ITERS, || encode(&element_wise, &array));
    assert_eq!(bulk_bytes, slow_bytes, "bulk and element-wise encodings must match");

    let (_, bulk_read_time) = time(WRITE_ITERS, || {
        bulk.read(&mut CodedInputStream::new(Cursor::new(&bulk_bytes)))
            .expect("Failed to decode array")
    });
    let (decoded, slow_read_time) = time(WRITE_ITERS, || {
        element_wise
            .read(&mut CodedInputStream::new(Cursor::new(&bulk_bytes)))
            .expect("Failed to decode array")
    });
    assert_eq!(decoded, array);

    println!("\nArray 1000x1000 f32: {} bytes", bulk_bytes.len());
    println!("  Bulk write:         {:?}", bulk_time);
    println!("  Element-wise write: {:?}", slow_time);
    println!("  Bulk read:          {:?}", bulk_read_time);
    println!("  Element-wise read:  {:?}", slow_read_time);
    println!(
        "  Bulk speedup: {:.1}x write, {:.1}x read",
        slow_time.as_secs_f64() / bulk_time.as_secs_f64(),
        slow_read_time.as_secs_f64() / bulk_read_time.as_secs_f64()
    );

    // Summary
    println!("\n=== Summary ===");
    println!("JSON size: {} bytes ({:.1} MB)", json_bytes, json_bytes as f64 / 1_000_000.0);
    println!(
        "Binary: {} bytes ({:.1}% of JSON), indexed {} bytes",
        plain.len(),
        100.0 * plain.len() as f64 / json_bytes as f64,
        indexed.len()
    );
    println!("{}", reader.index());

    if let Some(path) = report_path {
        let report = Report {
            samples: samples.len(),
            json_bytes,
            plain_bytes: plain.len(),
            indexed_bytes: indexed.len(),
            plain_write_us: plain_time.as_micros(),
            indexed_write_us: indexed_time.as_micros(),
            sequential_read_us: read_time.as_micros(),
            random_access_us_per_read: random_time.as_micros(),
            bulk_array_write_us: bulk_time.as_micros(),
            elementwise_array_write_us: slow_time.as_micros(),
            bulk_array_read_us: bulk_read_time.as_micros(),
            elementwise_array_read_us: slow_read_time.as_micros(),
        };
        let json = serde_json::to_string_pretty(&report).expect("Failed to encode report");
        fs::write(&path, json).expect("Failed to write report");
        println!("\nReport written to {}", path);
    }
}
