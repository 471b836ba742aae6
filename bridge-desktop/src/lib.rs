//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with streamed range-aware downloads
//! - `FileSystemAccess` using `tokio::fs` and the `dirs` app directories
//! - `TransferRecordStore` using SQLite through `sqlx`
//!
//! The catalog client, native player and media control surface are always
//! supplied by the host application.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteTransferRecordStore, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http = ReqwestHttpClient::new();
//!     let fs = TokioFileSystem::new();
//!     let store = SqliteTransferRecordStore::new("transfers.db".into()).await.unwrap();
//! }
//! ```

mod filesystem;
mod http;
mod transfer_store;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use transfer_store::SqliteTransferRecordStore;
