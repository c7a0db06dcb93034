// App Category Classification
//
// Classifies an app by case-insensitive keyword match against fixed sets,
// and derives a stable display color for each record.

use sha2::{Digest, Sha256};

use crate::types::AppCategory;

const SOCIAL_MEDIA: &[&str] = &[
    "facebook", "instagram", "twitter", "tiktok", "snapchat", "reddit", "pinterest", "linkedin",
    "threads", "mastodon",
];

const ENTERTAINMENT: &[&str] = &[
    "youtube", "netflix", "spotify", "twitch", "hulu", "disney", "prime video", "vlc", "music",
    "podcast",
];

const PRODUCTIVITY: &[&str] = &[
    "chrome", "firefox", "safari", "edge", "docs", "sheets", "slides", "office", "word", "excel",
    "notion", "calendar", "notes", "drive", "keep", "todo",
];

const GAMES: &[&str] = &[
    "game", "minecraft", "roblox", "fortnite", "clash", "candy crush", "pubg", "among us",
    "genshin", "chess",
];

const EDUCATION: &[&str] = &[
    "duolingo", "khan", "coursera", "udemy", "quizlet", "brilliant", "kindle", "wikipedia",
    "anki", "learn",
];

const COMMUNICATION: &[&str] = &[
    "whatsapp", "telegram", "signal", "messenger", "messages", "gmail", "mail", "outlook",
    "discord", "slack", "teams", "zoom", "meet", "phone",
];

/// Classify an app by its display name. Unmatched names land in `Other`.
pub fn classify(name: &str) -> AppCategory {
    let lower = name.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    // Communication is checked before productivity so "Gmail" does not match
    // the browser/office set via "mail" lookalikes.
    if matches(SOCIAL_MEDIA) {
        AppCategory::SocialMedia
    } else if matches(COMMUNICATION) {
        AppCategory::Communication
    } else if matches(ENTERTAINMENT) {
        AppCategory::Entertainment
    } else if matches(GAMES) {
        AppCategory::Games
    } else if matches(EDUCATION) {
        AppCategory::Education
    } else if matches(PRODUCTIVITY) {
        AppCategory::Productivity
    } else {
        AppCategory::Other
    }
}

/// Fixed display palette, one color per category.
pub fn category_color(category: AppCategory) -> &'static str {
    match category {
        AppCategory::SocialMedia => "#e1306c",
        AppCategory::Entertainment => "#ff0000",
        AppCategory::Productivity => "#4285f4",
        AppCategory::Games => "#9146ff",
        AppCategory::Education => "#00a86b",
        AppCategory::Communication => "#25d366",
        AppCategory::Other => "#8e8e93",
    }
}

/// Stable color for apps in `Other`, derived from the app name so the same
/// app always renders the same color without a lookup table.
pub fn fallback_color(name: &str) -> String {
    let digest = Sha256::digest(name.to_lowercase().as_bytes());
    format!("#{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2])
}

/// Display color for a record: palette color, or the name-derived fallback
/// for uncategorized apps.
pub fn color_for(name: &str, category: AppCategory) -> String {
    match category {
        AppCategory::Other => fallback_color(name),
        _ => category_color(category).to_string(),
    }
}
