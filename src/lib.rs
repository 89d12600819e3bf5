//! App Store Orchestrator
//!
//! Autonomous health monitoring and remediation for containerized apps on a
//! self-hosted "app store" host.
//!
//! # Features
//!
//! - Per-app check, analyze and act cycle on a staggered fixed interval
//! - LLM analysis through any OpenAI-compatible chat-completions API, with a
//!   strictly validated response schema
//! - Deterministic rule-based fallback when the reasoning service fails
//! - Container restarts with port-conflict detection
//! - Six-step first-run bootstrap with image version pinning
//! - `SQLite` audit trail of every decision
//!
//! # Quick Start
//!
//! ```bash
//! REASONING_API_KEY=sk-xxx APPS_ROOT=/srv/apps ./appstore-orchestrator
//! ```
//!
//! # Architecture
//!
//! ```text
//!  apps/<id>/app.yml ──▶ ┌──────────────┐ ──▶ docker CLI
//!                        │ Orchestrator │ ──▶ reasoning API
//!  uptime monitor ─────▶ └──────┬───────┘
//!                               │
//!                               ▼
//!                            SQLite
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod apps;
pub mod bootstrap;
pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod reasoning;
pub mod runtime;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod test_utils;
