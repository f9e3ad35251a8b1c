//! Static HTML document driver
//!
//! Parses an HTML string once into an element arena (pre-order, so handle
//! order is document order) and answers driver queries against it. CSS
//! selectors go through `scraper`; XPath goes through a small evaluator
//! covering the expressions the resolver emits.

mod document;
mod xpath;

pub use document::StaticDocument;
pub use xpath::{parse_xpath, XPathExpr};
