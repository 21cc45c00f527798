//! blockcsv - a SIMD-accelerated CSV parser
//!
//! Loads a file, runs it through the scan/parse/build pipeline, and reports
//! throughput. `--dump` prints each record's fields.

use std::time::Instant;

use clap::Parser;

use blockcsv::io::get_corpus;
use blockcsv::{parse_bytes, BLOCK_SIZE};

#[derive(Parser, Debug)]
#[command(name = "blockcsv")]
#[command(about = "A fast SIMD parser for CSV files", long_about = None)]
struct Args {
    /// CSV file to parse
    #[arg(value_name = "FILE")]
    file: String,

    /// Field separator byte
    #[arg(short, long, default_value = ",")]
    separator: char,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dump parsed records
    #[arg(short, long)]
    dump: bool,

    /// Number of iterations for benchmarking
    #[arg(short, long, default_value = "100")]
    iterations: usize,
}

fn main() {
    let args = Args::parse();
    let separator = args.separator as u8;

    if args.verbose {
        println!("[verbose] loading {}", args.file);
    }

    let buffer = match get_corpus(&args.file, BLOCK_SIZE) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("Could not load the file {}: {}", args.file, e);
            std::process::exit(1);
        }
    };

    if args.verbose {
        println!("[verbose] loaded {} ({} bytes)", args.file, buffer.len());
    }

    // Warmup / correctness run.
    let records = parse_bytes(buffer.data(), separator);

    if args.verbose {
        println!("number of records found     : {}", records.len());
        if !records.is_empty() {
            println!(
                "average fields per record  : {:.2}",
                records.iter().map(|r| r.len()).sum::<usize>() as f64 / records.len() as f64
            );
        }
    }

    if args.dump {
        for record in &records {
            let fields: Vec<String> = record
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            println!("{}", fields.join("|"));
        }
    }

    let mut total_time = 0.0;
    for _ in 0..args.iterations {
        let start = Instant::now();
        let _ = parse_bytes(buffer.data(), separator);
        total_time += start.elapsed().as_secs_f64();
    }

    let volume = args.iterations as f64 * buffer.len() as f64;

    if args.verbose {
        println!("Total time in (s)          = {:.6}", total_time);
        println!("Number of iterations       = {}", args.iterations);
    }

    let gb_per_s = volume / total_time / (1024.0 * 1024.0 * 1024.0);
    println!(" GB/s: {:.5}", gb_per_s);

    if args.verbose {
        println!("[verbose] done");
    }
}
