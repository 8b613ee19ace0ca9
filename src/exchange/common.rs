use log::*;
use std::{error::Error, fmt, fmt::Debug, time::Duration};
use tokio::{select, sync::watch};
use tokio_stream::{Stream, StreamExt};

use crate::{
    book::Book,
    feed::{BookFeed, DecodeError, FeedMessage},
};

#[derive(Debug)]
pub enum SocketError {
    Decode(DecodeError),
    Closed,
    Unexpected(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketError::Decode(e) => write!(f, "{}", e),
            SocketError::Closed => write!(f, "socket was closed"),
            SocketError::Unexpected(e) => write!(f, "unexpected socket error: {}", e),
        }
    }
}

impl Error for SocketError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SocketError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Why [`handle_feed_stream`] returned.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamEnd {
    /// The connection failed or went silent, the caller should reconnect.
    Reconnect,
    /// Nobody listens for the book anymore, the caller should stop.
    ReceiverGone,
}

/// Applies a stream of feed messages to `feed` and publishes the book after every applied message.
///
/// Returns when the stream errors, ends or stays silent for `timeout_after`. The book is then
/// cleared and `None` is published, so nobody works with stale data while the caller reconnects.
/// Returns [`StreamEnd::ReceiverGone`] once every receiver of `sender` is dropped.
pub async fn handle_feed_stream<E, S>(
    mut stream: S,
    feed: &mut BookFeed,
    sender: &watch::Sender<Option<Book>>,
    exchange_name: &'static str,
    timeout_after: Duration,
) -> StreamEnd
where
    E: Debug,
    S: Stream<Item = Result<FeedMessage, E>> + Unpin,
{
    let end = loop {
        // a timeout for the next message, in case we lose network connectivity
        select! {
            maybe_msg = stream.next() => {
                match maybe_msg {
                    Some(Ok(msg)) => {
                        if feed.apply(msg) && sender.send(Some(feed.book().clone())).is_err() {
                            debug!("{} book receiver dropped, stopping", exchange_name);
                            break StreamEnd::ReceiverGone;
                        }
                    }
                    e => {
                        error!("{} stream errored: {:?}", exchange_name, e);
                        break StreamEnd::Reconnect; // leave loop, caller will have to reconnect
                    }
                }
            },
            _ = tokio::time::sleep(timeout_after) => {
                error!("{} websocket timeout", exchange_name);
                break StreamEnd::Reconnect;
            },
        }
    };

    feed.reset();
    // receivers may already be gone on shutdown
    let _ = sender.send(None);
    end
}
