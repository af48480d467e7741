use std::error::Error;

use uuid::Uuid;

use crate::core::config::Config;
use crate::store::{FileSessionStore, RoastSession, SessionStore};

fn open_store() -> Result<FileSessionStore, Box<dyn Error>> {
    let config = Config::load()?;
    Ok(FileSessionStore::in_dir(
        &config.data_dir()?,
        config.history_limit(),
    ))
}

fn one_line(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

pub fn format_session(session: &RoastSession) -> String {
    let mut out = format!(
        "{}  {}  [{}]\n  > {}\n  {}",
        session.id,
        session.created_at.format("%Y-%m-%d %H:%M"),
        session.style,
        one_line(&session.input_text, 60),
        session.roast.trim()
    );
    if let Some(path) = &session.image_path {
        out.push_str(&format!("\n  🖼️  {}", path.display()));
    }
    out
}

pub fn list_history(limit: Option<usize>) -> Result<(), Box<dyn Error>> {
    let sessions = open_store()?.list()?;
    if sessions.is_empty() {
        println!("No roasts yet.");
        return Ok(());
    }

    let shown = limit.unwrap_or(sessions.len());
    for session in sessions.iter().rev().take(shown) {
        println!("{}\n", format_session(session));
    }
    Ok(())
}

pub fn delete_session(id: &str) -> Result<(), Box<dyn Error>> {
    let id = Uuid::parse_str(id.trim()).map_err(|e| format!("Invalid session id '{id}': {e}"))?;
    if open_store()?.delete(id)? {
        println!("✅ Deleted session {id}");
    } else {
        eprintln!("⚠️  No session with id {id}");
        std::process::exit(1);
    }
    Ok(())
}

pub fn clear_history() -> Result<(), Box<dyn Error>> {
    let removed = open_store()?.clear()?;
    println!("✅ Removed {removed} session(s)");
    Ok(())
}
