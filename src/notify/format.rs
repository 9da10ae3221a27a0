//! Telegram message bodies (HTML parse mode).

use chrono::{DateTime, Local};

use crate::model::Listing;

/// Listings detailed in one message; the rest are only counted.
pub const MAX_DETAILED: usize = 5;
const ID_PREVIEW_CHARS: usize = 20;

pub fn listings_message(listings: &[Listing], area: &str, link: &str, now: DateTime<Local>) -> String {
    let total = listings.len();
    let mut message = format!(
        "🏠 <b>CROUS {} Area - {} Rooms Available!</b>\n\n",
        escape_html(area),
        total
    );

    for (i, listing) in listings.iter().take(MAX_DETAILED).enumerate() {
        let id_preview: String = listing.id.chars().take(ID_PREVIEW_CHARS).collect();
        message.push_str(&format!("<b>Room {}:</b>\n", i + 1));
        message.push_str(&format!("📍 {}\n", escape_html(&listing.location)));
        message.push_str(&format!("🏡 {}\n", escape_html(&listing.kind)));
        message.push_str(&format!("💰 {}\n", escape_html(&listing.rent)));
        message.push_str(&format!("🆔 {}...\n\n", escape_html(&id_preview)));
    }

    if total > MAX_DETAILED {
        message.push_str(&format!("... and {} more rooms!\n\n", total - MAX_DETAILED));
    }

    message.push_str(&format!("📊 Total: {} rooms found\n", total));
    message.push_str(&format!("⏰ {}\n", now.format("%H:%M:%S")));
    message.push_str(&format!("🔗 <a href=\"{}\">View all on CROUS</a>", escape_html(link)));
    message
}

pub fn startup_message(recipients: usize, interval_minutes: u64, area: &str, now: DateTime<Local>) -> String {
    format!(
        "🤖 <b>CROUS Checker Started!</b>\n\n\
         👥 Notifying: {} user(s)\n\
         ⏰ Check interval: {} minutes\n\
         🎯 Monitoring: {} area\n\
         📅 Started at: {}\n\n\
         I'll notify you when rooms become available! 🏠",
        recipients,
        interval_minutes,
        escape_html(area),
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn shutdown_message(now: DateTime<Local>) -> String {
    format!(
        "🛑 <b>CROUS Checker Stopped</b>\n\nStopped at: {}\n\nService has been terminated. 👋",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn error_message(error: &str, now: DateTime<Local>) -> String {
    format!(
        "❌ <b>CROUS Checker Error</b>\n\nError: {}\nTime: {}",
        escape_html(error),
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

pub fn test_message(index: usize, total: usize, recipient: &str, now: DateTime<Local>) -> String {
    format!(
        "🧪 Test message {}/{} from CROUS Checker\nTime: {}\nRecipient: {}",
        index,
        total,
        now.format("%Y-%m-%d %H:%M:%S"),
        escape_html(recipient)
    )
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
