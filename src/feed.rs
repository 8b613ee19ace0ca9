//! Binance market data messages and the glue that applies them to a [`Book`].

use std::{error::Error, fmt, time::Instant};

use log::*;
use serde::{Deserialize, Deserializer};

use crate::{book::Book, level::Level};

/// Full partial-depth snapshot, e.g. from the `<symbol>@depth20@100ms` stream.
#[derive(Debug, Deserialize, PartialEq)]
pub struct DepthSnapshot {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// Best bid / offer update from the `<symbol>@bookTicker` stream.
#[derive(Debug, PartialEq)]
pub struct BookTicker {
    pub update_id: u64,
    pub symbol: String,
    pub bid: Level,
    pub ask: Level,
}

// wire layout: {"u":400900217,"s":"BNBUSDT","b":"25.35190000","B":"31.21000000","a":"25.36520000","A":"40.66000000"}
#[derive(Deserialize)]
struct RawBookTicker {
    u: u64,
    s: String,
    #[serde(deserialize_with = "decimal_str")]
    b: f64,
    #[serde(rename = "B", deserialize_with = "decimal_str")]
    bid_qty: f64,
    #[serde(deserialize_with = "decimal_str")]
    a: f64,
    #[serde(rename = "A", deserialize_with = "decimal_str")]
    ask_qty: f64,
}

impl<'de> Deserialize<'de> for BookTicker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawBookTicker::deserialize(deserializer)?;
        Ok(BookTicker {
            update_id: raw.u,
            symbol: raw.s,
            bid: Level::new(raw.b, raw.bid_qty),
            ask: Level::new(raw.a, raw.ask_qty),
        })
    }
}

fn decimal_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<f64>().map_err(|_| {
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&s),
            &"a valid f64 string was expected",
        )
    })
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FeedMessage {
    Depth(DepthSnapshot),
    Ticker(BookTicker),
}

// combined streams wrap every payload: {"stream":"btcusdt@bookTicker","data":{...}}
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Combined {
        #[allow(dead_code)]
        stream: String,
        data: FeedMessage,
    },
    Bare(FeedMessage),
}

impl FeedMessage {
    /// Decodes a single text frame, either bare or wrapped in a combined stream envelope.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        match serde_json::from_str::<Envelope>(text)? {
            Envelope::Combined { data, .. } => Ok(data),
            Envelope::Bare(msg) => Ok(msg),
        }
    }

    pub fn update_id(&self) -> u64 {
        match self {
            FeedMessage::Depth(depth) => depth.last_update_id,
            FeedMessage::Ticker(ticker) => ticker.update_id,
        }
    }
}

#[derive(Debug)]
pub struct DecodeError(serde_json::Error);

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode feed message: {}", self.0)
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError(e)
    }
}

/// Keeps a [`Book`] current from a sequence of feed messages.
///
/// Depth snapshots and book tickers share Binance's order book update id. Anything older than
/// the last applied message is stale and skipped.
#[derive(Debug, Default)]
pub struct BookFeed {
    book: Book,
    last_update_id: Option<u64>,
}

impl BookFeed {
    pub fn new(max_depth: usize) -> Self {
        Self {
            book: Book::new(max_depth),
            last_update_id: None,
        }
    }

    #[inline]
    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn last_update_id(&self) -> Option<u64> {
        self.last_update_id
    }

    /// Applies the message to the book. Returns false if it was skipped as stale.
    pub fn apply(&mut self, msg: FeedMessage) -> bool {
        let update_id = msg.update_id();
        if let Some(last) = self.last_update_id {
            if update_id < last {
                debug!("skipping stale update {} (last applied {})", update_id, last);
                return false;
            }
        }

        let started = Instant::now();
        match msg {
            FeedMessage::Depth(depth) => self.book.replace(depth.bids, depth.asks),
            FeedMessage::Ticker(ticker) => self.book.apply_bbo(ticker.bid, ticker.ask),
        }
        trace!("applied update {} in {:?}", update_id, started.elapsed());

        self.last_update_id = Some(update_id);
        true
    }

    /// Drops all levels and forgets the last update id, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.book.clear();
        self.last_update_id = None;
    }
}

#[cfg(test)]
mod test {
    use super::{BookFeed, BookTicker, DepthSnapshot, FeedMessage};
    use crate::level::Level;

    fn ticker(update_id: u64, bid: (f64, f64), ask: (f64, f64)) -> FeedMessage {
        FeedMessage::Ticker(BookTicker {
            update_id,
            symbol: "BTCUSDT".to_string(),
            bid: bid.into(),
            ask: ask.into(),
        })
    }

    fn depth(last_update_id: u64) -> FeedMessage {
        FeedMessage::Depth(DepthSnapshot {
            last_update_id,
            bids: vec![Level::new(99.0, 1.0), Level::new(97.0, 1.0)],
            asks: vec![Level::new(101.0, 1.0), Level::new(103.0, 1.0)],
        })
    }

    #[test]
    fn parse_depth_snapshot() {
        let json = serde_json::json!({
            "lastUpdateId": 34698491742u64,
            "bids": [["20078.54000000", "0.00431000"], ["20078.39000000", "0.00100000"]],
            "asks": [["20078.91000000", "0.03437000"]]
        });
        let msg = FeedMessage::parse(&json.to_string()).unwrap();

        assert_eq!(
            msg,
            FeedMessage::Depth(DepthSnapshot {
                last_update_id: 34698491742,
                bids: vec![Level::new(20078.54, 0.00431), Level::new(20078.39, 0.001)],
                asks: vec![Level::new(20078.91, 0.03437)],
            })
        );
    }

    #[test]
    fn parse_book_ticker() {
        let json = r#"{"u":34698491814,"s":"BTCUSDT","b":"20078.54000000","B":"0.00431000","a":"20078.91000000","A":"0.03497000"}"#;
        let msg = FeedMessage::parse(json).unwrap();

        assert_eq!(msg, ticker(34698491814, (20078.54, 0.00431), (20078.91, 0.03497)));
        assert_eq!(msg.update_id(), 34698491814);
    }

    #[test]
    fn parse_combined_stream() {
        let json = serde_json::json!({
            "stream": "btcusdt@bookTicker",
            "data": {"u": 7, "s": "BTCUSDT", "b": "1.5", "B": "2", "a": "1.6", "A": "3"}
        });
        let msg = FeedMessage::parse(&json.to_string()).unwrap();
        assert_eq!(msg, ticker(7, (1.5, 2.0), (1.6, 3.0)));
    }

    #[test]
    fn reject_garbage() {
        assert!(FeedMessage::parse("not json").is_err());
        assert!(FeedMessage::parse(r#"{"result":null,"id":1}"#).is_err());
        assert!(FeedMessage::parse(r#"{"u":1,"s":"X","b":"x","B":"1","a":"1","A":"1"}"#).is_err());
    }

    #[test]
    fn feed_applies_messages() {
        let mut feed = BookFeed::new(20);
        assert!(feed.apply(depth(10)));
        assert!(feed.apply(ticker(11, (100.0, 2.0), (102.0, 2.0))));

        let (bids, asks) = feed.book().extract();
        assert_eq!(
            bids,
            vec![Level::new(100.0, 2.0), Level::new(99.0, 1.0), Level::new(97.0, 1.0)]
        );
        assert_eq!(asks, vec![Level::new(102.0, 2.0), Level::new(103.0, 1.0)]);
        assert_eq!(feed.last_update_id(), Some(11));
    }

    #[test]
    fn feed_skips_stale_messages() {
        let mut feed = BookFeed::new(20);
        assert!(feed.apply(depth(10)));
        assert!(!feed.apply(ticker(9, (100.0, 2.0), (102.0, 2.0))));
        assert_eq!(feed.book().best_bid(), Some(Level::new(99.0, 1.0)));

        // same id is not stale, a ticker may carry the id of the snapshot it follows
        assert!(feed.apply(ticker(10, (99.0, 5.0), (101.0, 5.0))));
        assert_eq!(feed.book().best_bid(), Some(Level::new(99.0, 5.0)));
    }

    #[test]
    fn replay_recorded_session() {
        let mut feed = BookFeed::default();
        let mut skipped = 0;
        for line in include_str!("../demos/btcusdt.jsonl").lines() {
            if !feed.apply(FeedMessage::parse(line).unwrap()) {
                skipped += 1;
            }
        }

        assert_eq!(skipped, 1);
        assert_eq!(feed.last_update_id(), Some(34698491833));

        let book = feed.book();
        assert_eq!(book.bids().len(), 18);
        assert_eq!(book.best_bid(), Some(Level::new(20078.39, 0.003)));
        assert_eq!(book.bids().last().map(|l| l.price), Some(20077.43));

        assert_eq!(book.asks().len(), 20);
        assert_eq!(book.best_ask(), Some(Level::new(20078.8, 0.01)));
        assert_eq!(book.asks()[1], Level::new(20078.95, 0.0025));
        assert_eq!(book.asks().last().map(|l| l.price), Some(20079.66));
    }

    #[test]
    fn reset_forgets_sequence() {
        let mut feed = BookFeed::new(20);
        feed.apply(depth(10));
        feed.reset();
        assert!(feed.book().is_empty());
        assert_eq!(feed.last_update_id(), None);
        assert!(feed.apply(depth(3)));
    }
}
