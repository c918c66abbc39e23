//! # nlp-rag-server
//!
//! HTTP front end for [`nlp_rag`]: document ingestion, retrieval and
//! context-augmented generation over JSON.
//!
//! Routes:
//!
//! - `GET /`, `GET /health`
//! - `POST /rag/documents/add`
//! - `GET /rag/documents/list`
//! - `POST /rag/query`
//! - `POST /rag/generate`

pub mod config;
pub mod routes;
pub mod server;
pub mod telemetry;

pub use config::{LogFormat, ServerConfig};
pub use routes::{AppState, app_router};
pub use server::run_server;
pub use telemetry::init_tracing;
