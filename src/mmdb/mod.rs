//! MaxMind DB (MMDB) file writer.
//!
//! File structure:
//! ```text
//! +--------------------+
//! |  SEARCH TREE       |  node_count nodes, two records each
//! +--------------------+
//! |  16 zero bytes     |
//! +--------------------+
//! |  DATA SECTION      |  records referenced by the tree
//! +--------------------+
//! |  "\xAB\xCD\xEFMaxMind.com"
//! +--------------------+
//! |  METADATA MAP      |
//! +--------------------+
//! ```
//!
//! A record value below `node_count` is a node index, `node_count` itself
//! means "no data", and anything above points into the data section at
//! `value - node_count - 16`.

pub mod tree;
pub mod value;
pub mod writer;

pub use value::{DataSection, Value};
pub use writer::{DatabaseWriter, MmdbOptions, MmdbWriter, METADATA_START_MARKER};
