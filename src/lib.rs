pub mod bit;
pub mod board;
pub mod config;
pub mod engine;
pub mod errors;
pub mod finalize;
pub mod generate;
pub mod history;
pub mod plan;
pub mod session;
pub mod ui;

pub use board::Board;
pub use generate::{GenerateOptions, Generated, generate, generate_with};
pub use history::History;
pub use plan::{AdderKind, Placement, Plan, Stage};
pub use session::{Command, Outcome, Planner};
