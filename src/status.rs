//! Index overview for `papisqa status`.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};

use crate::config::Config;
use crate::store::{FileIndexStore, IndexStore};

/// Print where the index lives, how big it is, and what it holds.
pub fn run_status(config: &Config) -> Result<()> {
    let path = config.index_path()?;
    let library_dir = config
        .library_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(not configured)".to_string());

    println!("papisqa index status");
    println!("====================");
    println!();
    println!("  Library:     {} ({})", config.library.name, library_dir);
    println!("  Index:       {}", path.display());

    let store = FileIndexStore::new(&path);
    let Some(docs) = store.load()? else {
        println!("  State:       not indexed");
        println!();
        return Ok(());
    };

    println!("  Size:        {}", human_size(file_size(&path)));
    println!("  Updated:     {}", modified(&path));
    println!();
    println!("  Documents:   {}", docs.len());
    println!("  Texts:       {}", docs.texts().len());
    println!("  LLM:         {}", docs.llm);
    println!("  Embedding:   {}", docs.embedding);
    println!("  Max tokens:  {}", docs.max_tokens);
    println!();
    Ok(())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn modified(path: &Path) -> String {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|t| age(DateTime::<Utc>::from(t), Utc::now()))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Size in the largest binary unit that keeps the value at or above 1.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// How long ago `then` was, coarsely; older than a month (or in the
/// future) prints the date instead.
fn age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - then;
    let (count, unit) = if elapsed < TimeDelta::zero() || elapsed >= TimeDelta::days(30) {
        return then.format("%Y-%m-%d %H:%M").to_string();
    } else if elapsed >= TimeDelta::days(1) {
        (elapsed.num_days(), "day")
    } else if elapsed >= TimeDelta::hours(1) {
        (elapsed.num_hours(), "hour")
    } else if elapsed >= TimeDelta::minutes(1) {
        (elapsed.num_minutes(), "min")
    } else {
        return "just now".to_string();
    };
    format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
}
