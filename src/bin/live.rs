use std::{error::Error, time::Duration};

use binance_book::exchange::binance::{start_feed_task, SUPPORTED_DEPTHS};
use binance_book::DEFAULT_DEPTH;
use clap::Parser;
use log::*;
use tokio::{select, sync::watch};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    // setup cli
    let args: Cli = Cli::parse();
    if !SUPPORTED_DEPTHS.contains(&args.depth) {
        return Err(format!(
            "unsupported depth {}, binance offers {:?}",
            args.depth, SUPPORTED_DEPTHS
        )
        .into());
    }

    let (book_sender, mut book_receiver) = watch::channel(None);
    let (shutdown_sender, shutdown_receiver) = watch::channel(());
    start_feed_task(
        args.symbol.clone(),
        args.depth,
        Duration::from_secs(args.timeout),
        book_sender,
        shutdown_receiver,
    );

    info!("Streaming {} book with depth {}...", args.symbol, args.depth);
    loop {
        select! {
            changed = book_receiver.changed() => {
                if changed.is_err() {
                    // feed task is gone
                    break;
                }
                if let Some(book) = book_receiver.borrow().as_ref() {
                    match book.spread() {
                        Some(spread) => println!("{} spread {:.8}", args.symbol, spread),
                        None => println!("{}", args.symbol),
                    }
                    println!("{}", book);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                let _ = shutdown_sender.send(());
                break;
            }
        }
    }

    Ok(())
}

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Depth levels per side, binance offers 5, 10 or 20.
    #[clap(short, long, default_value_t = DEFAULT_DEPTH)]
    depth: usize,

    /// Seconds without a message before reconnecting.
    #[clap(short, long, default_value_t = 60)]
    timeout: u64,

    /// The book of this symbol will be streamed, e.g. BTCUSDT.
    symbol: String,
}
