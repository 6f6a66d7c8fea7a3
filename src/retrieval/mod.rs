//! Document retrieval from the hosted search index.

mod client;
mod document;
mod retriever;

pub use client::{SearchBackend, SearchClient, SearchRequest, VectorQuery};
pub use document::{CONTENT_FIELDS, ChunkMetadata, FILEPATH_FIELDS, ID_FIELDS, RetrievedDocument};
pub use retriever::Retriever;
