//! Markdown rendering of the digest and of failure notices.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

use crate::stage::TranslatedIdea;

const RANK_MARKERS: [&str; 5] = ["🥇", "🥈", "🥉", "4️⃣", "5️⃣"];

fn rank_marker(rank: u8) -> String {
    RANK_MARKERS
        .get(usize::from(rank).wrapping_sub(1))
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("#{}", rank))
}

/// Render the translated ideas as the Telegram digest.
pub fn format_digest<Tz>(ideas: &[TranslatedIdea], generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut lines = vec![
        format!("🚀 *TOP {} IDÉES LLM/AI - AUJOURD'HUI*", ideas.len()),
        String::new(),
        format!(
            "Voici les {} idées les plus intéressantes du moment:",
            ideas.len()
        ),
        String::new(),
    ];

    for idea in ideas {
        lines.push(format!("{} *{}*", rank_marker(idea.rank), idea.title));
        lines.push(idea.explanation.clone());
        lines.push(format!("🔗 [Source]({})", idea.source_url));
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push("💡 *Veille LLM*".to_string());
    lines.push(format!("📅 {}", generated_at.format("%d/%m/%Y à %H:%M")));

    lines.join("\n")
}

/// Render the short notice sent when a run fails before delivery.
pub fn format_failure_notice<Tz>(
    execution_id: &str,
    stage: &str,
    error: &str,
    at: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "⚠️ *ERREUR - Veille LLM*\n\nLe pipeline a échoué ({}):\n{}\n\nExecution ID: {}\nTimestamp: {}",
        stage,
        error,
        execution_id,
        at.format("%d/%m/%Y à %H:%M")
    )
}
