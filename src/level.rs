use serde::Deserialize;

/// One price level of the book.
///
/// Equality is exact on both fields. The feed reports prices on a fixed decimal grid,
/// so a price either names an existing level or it does not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub price: f64,
    pub quantity: f64,
}

impl Level {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

impl From<(f64, f64)> for Level {
    fn from((price, quantity): (f64, f64)) -> Self {
        Self { price, quantity }
    }
}

// binance sends levels as a pair of decimal strings: ["20078.54000000", "0.00431000"]
impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut vec = Vec::<String>::deserialize(deserializer)?;

        let len = vec.len();
        if len != 2 {
            return Err(serde::de::Error::invalid_length(
                len,
                &"a vec of length 2 was expected",
            ));
        }
        let invalid_value = |v: &str| {
            serde::de::Error::invalid_value(
                serde::de::Unexpected::Str(v),
                &"a valid f64 string was expected",
            )
        };

        // length was checked above
        let quantity = vec.pop().unwrap_or_default();
        let price = vec.pop().unwrap_or_default();

        let quantity = quantity
            .parse::<f64>()
            .map_err(|_| invalid_value(&quantity))?;
        let price = price.parse::<f64>().map_err(|_| invalid_value(&price))?;
        Ok(Level { price, quantity })
    }
}

/// The two sides of the book. Bids are kept highest price first, asks lowest price first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Returns true if price `a` is strictly better than `b` on this side.
    #[inline]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Side::Bid => a > b,
            Side::Ask => a < b,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

/// Tolerant comparison for test expectations built with float arithmetic (e.g. `100.0 - i * 0.1`).
#[cfg(test)]
pub(crate) fn essentially_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= a.abs().min(b.abs()) * f64::EPSILON
}

#[cfg(test)]
pub(crate) fn assert_levels_eq(actual: &[Level], expected: &[Level]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "level count differs: {:?} vs {:?}",
        actual,
        expected
    );
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            essentially_equal(a.price, e.price) && essentially_equal(a.quantity, e.quantity),
            "{:?} != {:?}",
            a,
            e
        );
    }
}
