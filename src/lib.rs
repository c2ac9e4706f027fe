//! # FlashRead
//!
//! Summarize web pages, pasted text, and uploaded documents through hosted
//! LLM and article-extraction APIs, then chat with the result.
//!
//! FlashRead has two halves. The server exposes four stateless JSON
//! endpoints (summarize, chat, enhance, process-document) that each translate
//! one request into one external call. The client side keeps documents,
//! summary history, credentials, and the active chat session in a
//! [`state::StateManager`] persisted through a pluggable [`storage::Storage`]
//! port, and drives the server through [`client::ApiClient`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   HTTP   ┌────────────┐   ┌───────────┐
//! │ StateManager │◀──│  FlashRead │─────────▶│   server   │──▶│   Groq    │
//! │  + Storage   │   │ (app/CLI)  │          │  gateways  │──▶│ RapidAPI  │
//! └──────────────┘   └────────────┘          └────────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! flashread serve                              # start the HTTP server
//! flashread credentials set --groq gsk_...     # store keys locally
//! flashread summarize --url https://example.com --provider groq
//! flashread upload report.docx
//! flashread chat --doc <id> "What are the main findings?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy and HTTP status mapping |
//! | [`models`] | Core data types and wire bodies |
//! | [`llm`] | Chat-completion provider abstraction |
//! | [`html`] | HTML → plain text |
//! | [`summarize`] | Summarization gateway |
//! | [`chat`] | Chat gateway |
//! | [`enhance`] | Enhancement gateway |
//! | [`extract`] | Text extraction adapter |
//! | [`storage`] | Durable key-value storage port |
//! | [`state`] | Document/session state manager |
//! | [`client`] | HTTP client for the server endpoints |
//! | [`app`] | Client-side user actions |
//! | [`markdown`] | Markdown → display blocks |
//! | [`server`] | HTTP server |

pub mod app;
pub mod chat;
pub mod client;
pub mod config;
pub mod enhance;
pub mod error;
pub mod extract;
pub mod html;
pub mod llm;
pub mod markdown;
pub mod models;
pub mod server;
pub mod state;
pub mod storage;
pub mod summarize;
