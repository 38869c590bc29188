pub mod chunker;
pub mod loader;

pub use chunker::{Chunk, ChunkerConfig, TextChunker};
pub use loader::{load_documents, load_documents_from_file, DocMetadata, Document};
