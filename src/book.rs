use crate::level::{Level, Side};

/// Maximum number of levels per side in a Binance partial depth snapshot.
pub const DEFAULT_DEPTH: usize = 20;

/// A two sided order book, bounded to `max_depth` levels per side.
///
/// The book is built from full depth snapshots ([`Book::replace`]) and kept current in between
/// with best bid / offer updates ([`Book::apply_bbo`]). A bbo update only tells us the new top of
/// one side, so any levels that can no longer exist are inferred removed ("uncrossing").
///
/// Between calls the following holds:
/// - prices on each side are unique
/// - bids are sorted from high to low, asks from low to high
/// - the best bid is below the best ask
/// - an incremental update never leaves a side longer than `max_depth`
///
/// ```rust
/// use binance_book::{Book, Level};
///
/// let mut book = Book::new(20);
/// book.replace(
///     vec![Level::new(99.0, 1.0), Level::new(97.0, 1.0), Level::new(95.0, 1.0)],
///     vec![Level::new(101.0, 1.0), Level::new(103.0, 1.0), Level::new(105.0, 1.0)],
/// );
/// book.apply_bbo(Level::new(100.0, 1.0), Level::new(102.0, 1.0));
///
/// let (bids, asks) = book.extract();
/// assert_eq!(bids.iter().map(|l| l.price).collect::<Vec<_>>(), vec![100.0, 99.0, 97.0, 95.0]);
/// assert_eq!(asks.iter().map(|l| l.price).collect::<Vec<_>>(), vec![102.0, 103.0, 105.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Book {
    bids: Vec<Level>,
    asks: Vec<Level>,
    max_depth: usize,
}

impl Default for Book {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

impl Book {
    /// Creates an empty book keeping at most `max_depth` levels per side.
    pub fn new(max_depth: usize) -> Self {
        // one spare slot per side, an insert may overflow by one before it is trimmed
        Self {
            bids: Vec::with_capacity(max_depth + 1),
            asks: Vec::with_capacity(max_depth + 1),
            max_depth,
        }
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Bids sorted by price from high to low.
    #[inline]
    pub fn bids(&self) -> &[Level] {
        &self.bids
    }

    /// Asks sorted by price from low to high.
    #[inline]
    pub fn asks(&self) -> &[Level] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<Level> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<Level> {
        self.asks.first().copied()
    }

    /// Best ask minus best bid, if both sides have levels.
    pub fn spread(&self) -> Option<f64> {
        let best_ask = self.asks.first()?.price;
        let best_bid = self.bids.first()?.price;

        Some(best_ask - best_bid)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Replaces the whole book with the given levels.
    ///
    /// Both sides must already be in canonical order with unique prices, as sent in a depth
    /// snapshot. They are taken verbatim: no sorting, no uncrossing and no depth limit.
    pub fn replace<B, A>(&mut self, bids: B, asks: A)
    where
        B: IntoIterator<Item = Level>,
        A: IntoIterator<Item = Level>,
    {
        self.bids.clear();
        self.bids.extend(bids);
        self.asks.clear();
        self.asks.extend(asks);
    }

    /// Returns copies of both sides in canonical order, the same shape [`Book::replace`] accepts.
    pub fn extract(&self) -> (Vec<Level>, Vec<Level>) {
        (self.bids.clone(), self.asks.clone())
    }

    /// Applies a new best bid, then a new best ask.
    ///
    /// The order matters: the bid update may already remove asks, and the ask update is then
    /// applied to that partially uncrossed book.
    pub fn apply_bbo(&mut self, best_bid: Level, best_ask: Level) {
        self.apply_top_of_book(Side::Bid, best_bid);
        self.apply_top_of_book(Side::Ask, best_ask);
    }

    /// Makes `new_top` the best level of `side`.
    ///
    /// Every level that was better than `new_top` is dropped, since the feed always reports the
    /// real best price and those levels must have been filled or cancelled. If the price already
    /// exists only its quantity is updated. Levels on the other side that are at or through the
    /// new price are removed as well. A price of zero or below is ignored.
    pub fn apply_top_of_book(&mut self, side: Side, new_top: Level) {
        if new_top.price <= 0.0 {
            return;
        }

        let (levels, opposite) = match side {
            Side::Bid => (&mut self.bids, &mut self.asks),
            Side::Ask => (&mut self.asks, &mut self.bids),
        };

        // first level that is not strictly better than the new top
        let pos = levels.partition_point(|level| side.is_better(level.price, new_top.price));

        if levels.get(pos).map_or(false, |level| level.price == new_top.price) {
            levels[pos].quantity = new_top.quantity;
        } else {
            levels.insert(pos, new_top);
        }

        // everything before pos was better than the reported best, so it is gone
        levels.drain(..pos);
        levels.truncate(self.max_depth);

        // opposite side levels are sorted best first, so the crossed ones form a prefix
        let crossed = opposite.partition_point(|level| !side.is_better(level.price, new_top.price));
        opposite.drain(..crossed);
    }
}
