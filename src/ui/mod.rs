pub mod board_view;
pub mod icons;

pub use board_view::{board_table, history_report, operand_summary};
