// FILE: crates/cli/src/commands.rs

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use console::style;
use std::path::Path;
use storyplayer_core::{format_clock, BookDescriptor, Validator};
use storyplayer_playback::PositionStore;

/// Remember a book so `listen` starts it from the beginning
pub async fn add_book(store: &PositionStore, matches: &ArgMatches) -> Result<()> {
    let book = book_from_matches(matches)?;

    store
        .remember_book(&book)
        .await
        .context("Failed to save book")?;

    println!("{} Book saved", style("✓").green().bold());
    print_book_summary(&book);

    Ok(())
}

/// Show the saved book and where playback will resume
pub async fn show_status(store: &PositionStore) -> Result<()> {
    let saved = store.load().await.context("Failed to read playback state")?;

    match saved {
        Some((book, position_ms)) => {
            print_book_summary(&book);
            println!("  Resume at: {}", style(format_clock(position_ms)).bold());
        }
        None => {
            println!("No book saved yet. Use 'add' to choose one.");
        }
    }

    Ok(())
}

fn book_from_matches(matches: &ArgMatches) -> Result<BookDescriptor> {
    let audio = matches
        .get_one::<String>("audio")
        .ok_or_else(|| anyhow::anyhow!("Audio path is required"))?;

    let title = matches
        .get_one::<String>("title")
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            Path::new(audio)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        });

    let mut book = BookDescriptor::new(title, audio.as_str());
    if let Some(author) = matches.get_one::<String>("author") {
        book = book.with_author(author.as_str());
    }
    if let Some(description) = matches.get_one::<String>("description") {
        book = book.with_description(description.as_str());
    }
    if let Some(cover) = matches.get_one::<String>("cover") {
        book = book.with_cover(cover.as_str());
    }

    if let Err(problems) = book.validate() {
        bail!("Invalid book: {}", problems.join("; "));
    }

    Ok(book)
}

pub(crate) fn print_book_summary(book: &BookDescriptor) {
    println!("  Title: {}", style(book.display_title()).bold().cyan());
    if !book.author.is_empty() {
        println!("  Author: {}", book.author);
    }
    if !book.description.is_empty() {
        println!("  About: {}", truncate(&book.description, 70));
    }
    println!("  Audio: {}", book.audio_uri);
    if let Some(cover) = &book.cover_uri {
        println!("  Cover: {}", cover);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
