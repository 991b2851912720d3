//! Dense, bitmap-indexed limit order book with O(1) top-of-book.

mod bbo;
mod book;
mod bucket;
mod config;

#[cfg(test)]
mod tests;

pub use bbo::Bbo;
pub use book::{BookEvent, LevelView, MarketOrderBook};
pub use bucket::{Bucket, MarketLevel};
pub use config::{BITS_PER_WORD, BUCKET_BITMAP_WORDS, BUCKET_SIZE, BookConfig};
