//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled      |
//! |------------|-----------------------|
//! | `generate` | `Generate`, `Seed`    |
//! | `history`  | `History`             |
//! | `plan`     | `Plan`                |
//! | `config`   | `Config`              |

pub mod config;
pub mod generate;
pub mod history;
pub mod plan;

pub use config::cmd_config;
pub use generate::{cmd_generate, cmd_seed};
pub use history::cmd_history;
pub use plan::cmd_plan;
