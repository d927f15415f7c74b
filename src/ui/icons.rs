//! Shared UI icons and emojis.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Session output
pub static ROBOT: Emoji<'_, '_> = Emoji("🤖 ", "[AI]");
pub static LINK: Emoji<'_, '_> = Emoji("🔗 ", "->");
