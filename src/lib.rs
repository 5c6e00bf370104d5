//! Document-indexing MCP server library.
//!
//! Pipeline: `fingerprint` enumerates and hashes files, `parsers` extracts
//! normalized content per format, `chunker` splits that content into
//! reconstructable chunks, `embedding` turns chunks into vectors, `store`
//! persists documents/chunks/embeddings, `indexer` drives an incremental
//! pass over the three, `watcher` feeds it live filesystem changes, and
//! `tools`/`protocol` expose the whole thing as an MCP tool server over
//! stdio.

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fingerprint;
pub mod indexer;
pub mod logging;
pub mod parsers;
pub mod protocol;
pub mod store;
pub mod tokenizer;
pub mod tools;
pub mod watcher;
