use std::{
    error::Error,
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
};

use binance_book::{BookFeed, FeedMessage, DEFAULT_DEPTH};
use clap::Parser;
use log::*;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args: Cli = Cli::parse();

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut feed = BookFeed::new(args.depth);
    let mut applied = 0usize;
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let msg = match FeedMessage::parse(line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("line {}: {}", line_no + 1, e);
                skipped += 1;
                continue;
            }
        };

        if feed.apply(msg) {
            applied += 1;
            if args.every {
                println!("{}", feed.book());
            }
        } else {
            skipped += 1;
        }
    }

    info!("applied {} messages, skipped {}", applied, skipped);
    if !args.every {
        print!("{}", feed.book());
    }

    Ok(())
}

/// Replays recorded binance depth and book ticker messages (one JSON message per line)
/// and prints the resulting book.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// File with one message per line. Reads stdin if omitted.
    input: Option<PathBuf>,

    /// Maximum number of levels kept per side.
    #[clap(short, long, default_value_t = DEFAULT_DEPTH)]
    depth: usize,

    /// Print the book after every applied message instead of only at the end.
    #[clap(short, long)]
    every: bool,
}
