//! Rendering of the broadcast payload (HTML, Telegram-flavored).

use super::dispatch_traits::{Keyboard, KeyboardButton};
use crate::counters::LeaderboardEntry;

/// Escapes the characters Telegram's HTML parse mode is sensitive to.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn format_leaderboard(top: &[LeaderboardEntry]) -> String {
    if top.is_empty() {
        return "—".to_string();
    }
    top.iter()
        .enumerate()
        .map(|(i, entry)| {
            let name = entry.username.as_deref().unwrap_or("anon");
            format!("{}. {} — <b>{}</b>", i + 1, escape_html(name), entry.total)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The full welcome/update message body.
pub fn render_update(user_total: u64, global_total: u64, top: &[LeaderboardEntry]) -> String {
    format!(
        "\n<b>Welcome to Clickrace</b> ✨\n\n\
         <b>Your clicks:</b> {user_total}\n\
         <b>Global clicks:</b> {global_total}\n\n\
         <b>Top {}</b>\n{}\n\nUse the Mini App to click!",
        top.len().max(1),
        format_leaderboard(top)
    )
}

/// Inline keyboard: the Mini App launcher plus a manual refresh button.
pub fn welcome_keyboard(miniapp_url: &str) -> Keyboard {
    Keyboard {
        rows: vec![
            vec![KeyboardButton::WebApp {
                label: "🚀 Open Mini App".to_string(),
                url: miniapp_url.to_string(),
            }],
            vec![KeyboardButton::Callback {
                label: "🔄 Refresh".to_string(),
                data: "refresh".to_string(),
            }],
        ],
    }
}
