//! MACC backend: natural-language spec in, reviewed Python program out,
//! optionally pushed to GitHub.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, CORS, graceful stop)   │
//! │  (CLI)   │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘  polling │         │                                        │
//!                       │         │ PipelineRunner::start_generation()     │
//!                       │         v                                        │
//!                       │  pipeline.rs  (plan → code → review, refine)     │
//!                       │         │                                        │
//!                       │         │ Crew::kickoff(agent, task)             │
//!                       │         v                                        │
//!                       │  agents.rs  (Agent roles, Task, Crew semaphore)  │
//!                       │         │                                        │
//!                       │         v                                        │
//!                       │  llm.rs  (ChatModel trait, OpenRouterClient)     │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                              |
//! |------------|-------------------------------------------------------------|
//! | `models`   | Request/response payloads, `SessionMessage`, `RepoTarget`   |
//! | `sessions` | In-memory `SessionStore` (message queue, done flag, TTL)    |
//! | `planner`  | Tolerant parsing of the planner's task list                 |
//! | `sandbox`  | Optional short-lived execution check of generated code      |
//! | `github`   | `CodePublisher` trait and the GitHub REST client            |
//!
//! ## Typical Request Flow
//!
//! 1. `POST /generate-project` validates input, opens a session and spawns
//!    the pipeline; the session id is returned immediately.
//! 2. The pipeline queues `status` and `code` messages as each agent finishes.
//! 3. The client polls `GET /updates/{session_id}` until `done` is true.
//! 4. `POST /suggest-changes` reruns the reviewer on the stored code.
//! 5. `POST /commit` pushes the code and README, creating the repo if needed.

pub mod agents;
pub mod api;
pub mod github;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod planner;
pub mod sandbox;
pub mod server;
pub mod sessions;
