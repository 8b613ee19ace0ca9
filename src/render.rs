//! Human readable layout of the book, one row per depth level.
//!
//! ```text
//! [ 1] [    0.00431000]    20078.54000000 | 20078.91000000    [0.03497000    ]
//! [ 2] [    0.00100000]    20078.39000000 | 20078.95000000    [0.00100000    ]
//! ```

use std::fmt::{self, Write};

use crate::{book::Book, level::Level};

const PRECISION: usize = 8;
const QTY_WIDTH: usize = 14;
const PRICE_WIDTH: usize = 17;
// "[" qty "] " price
const BID_WIDTH: usize = QTY_WIDTH + PRICE_WIDTH + 3;

/// Writes one row per level index, up to the longer side. Missing bids are padded with blanks.
pub fn write_levels<W: Write>(out: &mut W, bids: &[Level], asks: &[Level]) -> fmt::Result {
    let rows = bids.len().max(asks.len());
    let mut line = String::with_capacity(BID_WIDTH * 2 + 16);

    for i in 0..rows {
        line.clear();
        write!(line, "[{:>2}] ", i + 1)?;

        match bids.get(i) {
            Some(bid) => write!(
                line,
                "[{:>qw$.p$}] {:>pw$.p$}",
                bid.quantity,
                bid.price,
                qw = QTY_WIDTH,
                pw = PRICE_WIDTH,
                p = PRECISION
            )?,
            None => write!(line, "{:w$}", "", w = BID_WIDTH)?,
        }

        line.push_str(" | ");

        if let Some(ask) = asks.get(i) {
            write!(
                line,
                "{:<pw$.p$} [{:<qw$.p$}]",
                ask.price,
                ask.quantity,
                qw = QTY_WIDTH,
                pw = PRICE_WIDTH,
                p = PRECISION
            )?;
        }

        out.write_str(line.trim_end())?;
        out.write_char('\n')?;
    }

    Ok(())
}

pub fn render_levels(bids: &[Level], asks: &[Level]) -> String {
    let mut out = String::with_capacity(bids.len().max(asks.len()) * 80);
    // writing into a String never fails
    let _ = write_levels(&mut out, bids, asks);
    out
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_levels(f, self.bids(), self.asks())
    }
}
