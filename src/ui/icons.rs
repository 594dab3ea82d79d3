//! Console icons used by the planner commands.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");

// Stage lifecycle
pub static STAGE: Emoji<'_, '_> = Emoji("🧱 ", "[STAGE]");
pub static UNDO: Emoji<'_, '_> = Emoji("↩️  ", "[UNDO]");
pub static REDO: Emoji<'_, '_> = Emoji("↪️  ", "[REDO]");
pub static REPLAY: Emoji<'_, '_> = Emoji("🔄 ", "[REPLAY]");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "[SAVE]");
