//! Social network page clients and extractors used by reelwatch.
//!
//! Only Facebook reels are supported. The page is fetched as HTML and the
//! interesting value is cut out with a literal delimiter scan.
pub mod facebook;
