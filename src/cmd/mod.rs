//! CLI command implementations.
//!
//! | Module    | Commands handled                               |
//! |-----------|------------------------------------------------|
//! | `serve`   | `Serve`                                        |
//! | `session` | `Generate`, `Suggest`, `Commit`, `Updates`     |
//! | `config`  | `Config`                                       |

pub mod config;
pub mod serve;
pub mod session;

pub use config::cmd_config;
pub use serve::cmd_serve;
pub use session::{GenerateOptions, cmd_commit, cmd_generate, cmd_suggest, cmd_updates};
