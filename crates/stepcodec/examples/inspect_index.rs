//! Prints the header schema and index trailer of an indexed stepcodec file.

use std::fs::File;
use std::io::BufReader;

use stepcodec::{BinaryOptions, IndexedBinaryReader, ProtocolDescriptor};

// Accepts any protocol: the schema is printed rather than verified.
static ANY: ProtocolDescriptor = ProtocolDescriptor {
    name: "any",
    schema: "",
    steps: &[],
};

fn main() {
    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: inspect_index <file>");
            std::process::exit(2);
        }
    };

    println!("Reading: {}", path);
    let file = File::open(&path).expect("Failed to open file");
    let size = file.metadata().map(|m| m.len()).unwrap_or(0);
    println!("File size: {} bytes", size);

    let options = BinaryOptions::new().with_verify_schema(false);
    let reader = match IndexedBinaryReader::with_options(BufReader::new(file), &ANY, options) {
        Ok(reader) => reader,
        Err(err) => {
            eprintln!("Failed to open: {} ({})", err, err.kind().as_str());
            std::process::exit(1);
        }
    };

    println!("\n=== Schema ===");
    println!("{}", reader.schema());
    println!("\n=== {}", reader.index());
}
