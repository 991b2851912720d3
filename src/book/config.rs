//! Price-grid geometry for the dense order book.

use crate::types::{Price, scale};

/// Levels per lazily-allocated bucket.
pub const BUCKET_SIZE: usize = 4096;
/// Bits per bitmap word.
pub const BITS_PER_WORD: usize = 64;
/// log2 of [`BITS_PER_WORD`].
pub const WORD_SHIFT: usize = 6;
/// Bit index mask within a word.
pub const WORD_MASK: usize = BITS_PER_WORD - 1;
/// Bitmap words per bucket.
pub const BUCKET_BITMAP_WORDS: usize = BUCKET_SIZE / BITS_PER_WORD;

const DEFAULT_MIN_PRICE_RAW: i64 = 100_000;
const DEFAULT_MAX_PRICE_RAW: i64 = 30_000_000;

/// Geometry of one book: the raw price range it covers and the derived
/// bucket/summary sizing. One grid index per raw price unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookConfig {
    pub min_price_raw: i64,
    pub max_price_raw: i64,
    pub num_levels: usize,
    pub bucket_count: usize,
    pub summary_words: usize,
}

impl BookConfig {
    /// Build a config covering `[min_price_raw, max_price_raw]` inclusive.
    ///
    /// # Panics
    /// Panics if the range is empty.
    pub fn new(min_price_raw: i64, max_price_raw: i64) -> Self {
        assert!(
            max_price_raw > min_price_raw,
            "empty book price range [{min_price_raw}, {max_price_raw}]"
        );
        let num_levels = (max_price_raw - min_price_raw + 1) as usize;
        let bucket_count = num_levels.div_ceil(BUCKET_SIZE);
        let summary_words = bucket_count.div_ceil(BITS_PER_WORD);
        Self {
            min_price_raw,
            max_price_raw,
            num_levels,
            bucket_count,
            summary_words,
        }
    }

    /// Grid index for a price, or `None` when the price is outside the
    /// configured range. Prices are never indexed unchecked.
    #[inline]
    pub fn price_to_index(&self, price: Price) -> Option<usize> {
        let raw = price.raw();
        if !price.is_valid() || raw < self.min_price_raw || raw > self.max_price_raw {
            return None;
        }
        Some((raw - self.min_price_raw) as usize)
    }

    #[inline]
    pub fn index_to_price(&self, index: usize) -> Price {
        Price::from_raw(self.min_price_raw + index as i64)
    }

    /// Integer tick for a price: one tick per raw unit of price, offset so
    /// the layer book can compare quote levels symbol-independently.
    #[inline]
    pub fn price_to_tick(&self, price: Price) -> u64 {
        price.raw() as u64
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        // Wide enough for the default symbol at its internal scale.
        Self::new(
            DEFAULT_MIN_PRICE_RAW.min(scale::PRICE_SCALE),
            DEFAULT_MAX_PRICE_RAW,
        )
    }
}
