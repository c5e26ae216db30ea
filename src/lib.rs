//! # pdf-rag
//!
//! A Rust web application that answers questions about uploaded PDF documents
//! with retrieval-augmented generation: PDFs are split into overlapping text
//! chunks, embedded into a vector index, and the chunks closest to a question
//! are handed to a language model as the only context it may answer from.
//!
//! ## Architecture
//!
//! ```text
//!   Upload (multipart PDF)                    Question
//!            │                                    │
//!            ▼                                    ▼
//!   ┌─────────────────┐                 ┌──────────────────┐
//!   │ Extract pages   │                 │ Embed question   │
//!   │ (pdf-extract)   │                 └────────┬─────────┘
//!   └────────┬────────┘                          │
//!            ▼                                   ▼
//!   ┌─────────────────┐                 ┌──────────────────┐
//!   │ Chunk pages     │                 │ Top-k cosine     │
//!   │ 1000 / 200 ovl  │                 │ search           │
//!   └────────┬────────┘                 └────────┬─────────┘
//!            ▼                                   ▼
//!   ┌─────────────────┐   append-only   ┌──────────────────┐
//!   │ Embed batches   │ ──────────────▶ │  Vector index    │
//!   └─────────────────┘                 └────────┬─────────┘
//!                                                ▼
//!                                       ┌──────────────────┐
//!                                       │ Prompt + model   │
//!                                       │ answer + sources │
//!                                       └──────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, data dirs, chunking and LLM settings
//! - [`models`] - Shared data types: `DocumentRecord`, `Chunk`, `RetrievalResult`,
//!   request/response types
//! - [`chunking`] - Overlapping, boundary-aware text windows over page text
//! - [`extract`] - PDF page text extraction powered by pdf-extract
//! - [`llm::embeddings`] - Batch embedding generation via Ollama or OpenAI-compatible APIs
//! - [`llm::chat`] - Single-turn completions via Ollama or OpenAI-compatible APIs
//! - [`search::vector`] - In-memory vector store with cosine similarity and append-only persistence
//! - [`ingest`] - Extraction, chunking, embedding and indexing of one document
//! - [`retriever`] - Top-k semantic retrieval for a question
//! - [`composer`] - Context-restricted prompt assembly and source attribution
//! - [`api`] - Axum HTTP handlers for upload, documents, chat and config
//! - [`state`] - Shared application state holding the index, models and document registry

pub mod api;
pub mod chunking;
pub mod composer;
pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod retriever;
pub mod search;
pub mod state;
