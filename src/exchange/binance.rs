use std::time::Duration;

use log::*;
use tokio::{select, sync::watch};
use tokio_stream::{Stream, StreamExt};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{error::Error as TError, error::ProtocolError, Message},
};

use super::common::{handle_feed_stream, SocketError, StreamEnd};
use crate::{
    book::Book,
    feed::{BookFeed, FeedMessage},
};

const BINANCE_WS_ENDPOINT: &str = "wss://stream.binance.com:9443/stream";

/// Depths binance offers for partial book depth streams.
pub const SUPPORTED_DEPTHS: [usize; 3] = [5, 10, 20];

/// Builds the combined stream url carrying both the depth snapshots and the book ticker of `symbol`.
pub fn stream_url(symbol: &str, depth: usize) -> String {
    // binance expects lower case symbol for websocket streams
    let symbol = symbol.to_lowercase();
    format!(
        "{}?streams={}@depth{}@100ms/{}@bookTicker",
        BINANCE_WS_ENDPOINT, symbol, depth, symbol
    )
}

/// Spawns a task that keeps a book of `symbol` up to date and publishes it on `sender`.
/// The task reconnects on errors until `shutdown` changes.
pub fn start_feed_task(
    symbol: String,
    depth: usize,
    timeout_after: Duration,
    sender: watch::Sender<Option<Book>>,
    mut shutdown: watch::Receiver<()>,
) {
    tokio::spawn(async move {
        select! {
            _ = feed_task(symbol, depth, timeout_after, sender) => {},
            _ = shutdown.changed() => {}
        }
    });
}

async fn feed_task(
    symbol: String,
    depth: usize,
    timeout_after: Duration,
    sender: watch::Sender<Option<Book>>,
) {
    let mut feed = BookFeed::new(depth);
    // this loop is responsible for reconnecting in case of error
    loop {
        match feed_stream(&symbol, depth).await {
            Err(e) => {
                error!("Failed to connect to binance stream: {:?}", e);
                // not doing exponential backoff, we need to reconnect as soon as possible
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Ok(stream) => {
                info!("connected to binance streams for {}", symbol);
                let end =
                    handle_feed_stream(stream, &mut feed, &sender, "binance", timeout_after).await;
                if end == StreamEnd::ReceiverGone {
                    info!("nobody listens for the {} book anymore, stopping", symbol);
                    return;
                }
            }
        }
        if sender.is_closed() {
            return;
        }
    }
}

/// Returns a stream of depth snapshots and book tickers from binance or an error if the connection failed.
pub async fn feed_stream(
    symbol: &str,
    depth: usize,
) -> Result<impl Stream<Item = Result<FeedMessage, SocketError>>, TError> {
    let (ws_stream, _) = connect_async(stream_url(symbol, depth)).await?;

    Ok(ws_stream.filter_map(|maybe_msg| match maybe_msg {
        Ok(Message::Text(msg)) => match FeedMessage::parse(&msg) {
            Ok(msg) => Some(Ok(msg)),
            Err(e) => {
                error!("Error decoding: {} {}", msg, e);
                Some(Err(SocketError::Decode(e)))
            }
        },
        Ok(Message::Ping(_) | Message::Pong(_)) => None, // ignore ping and pong
        Ok(Message::Close(_))
        | Err(TError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
            info!("binance socket was closed. Restarting...");
            Some(Err(SocketError::Closed))
        }
        Err(e) => Some(Err(SocketError::Unexpected(Box::new(e)))),
        _ => {
            info!("Unexpected message from binance {:?}", maybe_msg);
            None
        } // ignore other messages
    }))
}
