use std::error::Error;
use std::io::{BufRead, Write};

use recall_core::model::{Flashcard, SessionStateError};
use services::{AppServices, SessionError};

use crate::Command;

// Millisecond timer resolution can report 0 for an instant answer.
const MIN_RESPONSE_SECONDS: f64 = 0.001;

pub(crate) async fn execute<R: BufRead, W: Write>(
    services: &AppServices,
    command: Command,
    input: &mut R,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let flashcards = services.flashcards();
    match command {
        Command::Add { front, back } => {
            let card = flashcards.create_flashcard(front, back).await?;
            writeln!(out, "Added {}", card.id())?;
        }
        Command::List => {
            let cards = flashcards.list_flashcards().await?;
            if cards.is_empty() {
                writeln!(out, "No flashcards yet.")?;
            }
            for card in &cards {
                write_summary_line(out, card)?;
            }
        }
        Command::Show { id } => match flashcards.get_flashcard(&id).await? {
            Some(card) => write_details(out, &card)?,
            None => writeln!(out, "No flashcard with id {id}")?,
        },
        Command::Search { query } => {
            let cards = flashcards.search(&query).await?;
            writeln!(out, "{} match(es) for {query:?}", cards.len())?;
            for card in &cards {
                write_summary_line(out, card)?;
            }
        }
        Command::Edit { id, front, back } => {
            let card = flashcards
                .update_flashcard(&id, front.as_deref(), back.as_deref())
                .await?;
            write_details(out, &card)?;
        }
        Command::Remove { id } => {
            if flashcards.delete_flashcard(&id).await? {
                writeln!(out, "Removed {id}")?;
            } else {
                writeln!(out, "No flashcard with id {id}")?;
            }
        }
        Command::Study { limit } => study(services, limit, input, out).await?,
        Command::Status => {
            let status = services.status().await?;
            writeln!(out, "flashcards:       {}", status.flashcard_count)?;
            writeln!(out, "active sessions:  {}", status.session_count)?;
        }
    }
    Ok(())
}

fn write_summary_line(out: &mut impl Write, card: &Flashcard) -> std::io::Result<()> {
    writeln!(
        out,
        "{}  {} -> {}",
        card.id(),
        card.front().as_str(),
        card.back().as_str()
    )
}

fn write_details(out: &mut impl Write, card: &Flashcard) -> std::io::Result<()> {
    writeln!(out, "id:       {}", card.id())?;
    writeln!(out, "front:    {}", card.front().as_str())?;
    writeln!(out, "back:     {}", card.back().as_str())?;
    writeln!(out, "created:  {}", card.created_at().to_rfc3339())?;
    writeln!(out, "updated:  {}", card.updated_at().to_rfc3339())?;
    writeln!(
        out,
        "studied:  {} time(s), {:.0}% correct",
        card.study_count(),
        card.accuracy() * 100.0
    )
}

fn read_line(input: &mut impl BufRead) -> std::io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_lowercase()))
}

/// Interactive loop over one registered session. End of input behaves like `q`.
async fn study<R: BufRead, W: Write>(
    services: &AppServices,
    limit: Option<usize>,
    input: &mut R,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    let registry = services.sessions();
    let clock = registry.orchestrator().clock();

    let session = registry.start_with_limit(limit).await?;
    let sid = session.session_id();
    writeln!(
        out,
        "Studying {} card(s). Enter reveals, y/n answers, b goes back, s skips, q quits.",
        session.total_cards()
    )?;

    'cards: loop {
        let card = match registry.current_flashcard(sid).await {
            Ok(Some(card)) => card,
            Ok(None) => break,
            Err(SessionError::DanglingReference(id)) => {
                writeln!(out, "Flashcard {id} was deleted, skipping.")?;
                registry.navigate_forward(sid).await?;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let session = registry.get(sid).await?;
        let progress = session.progress();
        writeln!(out)?;
        writeln!(
            out,
            "[{}/{}] {}",
            progress.current_position,
            progress.total_cards,
            card.front().as_str()
        )?;
        if let Some(previous) = session.response_for(card.id()) {
            let verdict = if previous.is_correct() { "correct" } else { "incorrect" };
            writeln!(out, "(answered {verdict} earlier)")?;
        }

        let shown_at = clock.now();
        let mut revealed = false;
        loop {
            let Some(line) = read_line(input)? else {
                break 'cards;
            };
            match line.as_str() {
                "" if !revealed => {
                    writeln!(out, "  {}", card.back().as_str())?;
                    writeln!(out, "Correct? [y/n]")?;
                    revealed = true;
                }
                "y" | "n" if revealed => {
                    let secs = clock.seconds_since(shown_at).max(MIN_RESPONSE_SECONDS);
                    registry.answer_current(sid, line == "y", secs).await?;
                    continue 'cards;
                }
                "b" => match registry.navigate_back(sid).await {
                    Ok(_) => continue 'cards,
                    Err(SessionError::State(SessionStateError::AtStart)) => {
                        writeln!(out, "Already at the first card.")?;
                    }
                    Err(err) => return Err(err.into()),
                },
                "s" => {
                    registry.navigate_forward(sid).await?;
                    continue 'cards;
                }
                "q" => break 'cards,
                _ if revealed => writeln!(out, "Answer y or n (b back, s skip, q quit).")?,
                _ => writeln!(out, "Press Enter to reveal (b back, s skip, q quit).")?,
            }
        }
    }

    let done = registry.complete(sid).await?;
    let progress = done.progress();
    writeln!(out)?;
    writeln!(
        out,
        "Session complete: {} answered, {} correct, {} incorrect ({:.0}% accuracy).",
        progress.completed_count,
        progress.correct_count,
        progress.incorrect_count,
        progress.accuracy_percent
    )?;
    registry.evict(sid).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_core::time::fixed_clock;
    use std::io::Cursor;

    async fn services_with(fronts: &[&str]) -> AppServices {
        let services = AppServices::in_memory(fixed_clock());
        for front in fronts {
            services
                .flashcards()
                .create_flashcard(*front, format!("{front}!"))
                .await
                .unwrap();
        }
        services
    }

    async fn run(services: &AppServices, command: Command, input: &str) -> String {
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        execute(services, command, &mut input, &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn add_then_list() {
        let services = services_with(&[]).await;
        let out = run(
            &services,
            Command::Add {
                front: "Hola".into(),
                back: "Hello".into(),
            },
            "",
        )
        .await;
        assert!(out.starts_with("Added "));

        let out = run(&services, Command::List, "").await;
        assert!(out.contains("Hola -> Hello"));
    }

    #[tokio::test]
    async fn study_answers_every_card_and_records_stats() {
        let services = services_with(&["Q1", "Q2"]).await;
        let out = run(&services, Command::Study { limit: None }, "\ny\n\nn\n").await;

        assert!(out.contains("[1/2] Q1"));
        assert!(out.contains("Q1!"));
        assert!(out.contains("[2/2] Q2"));
        assert!(out.contains("2 answered, 1 correct, 1 incorrect (50% accuracy)"));

        let cards = services.flashcards().list_flashcards().await.unwrap();
        assert_eq!(cards[0].correct_count(), 1);
        assert_eq!(cards[1].study_count(), 1);
        assert!(services.sessions().recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn study_back_shows_earlier_answer() {
        let services = services_with(&["Q1", "Q2"]).await;
        let out = run(&services, Command::Study { limit: None }, "\ny\nb\nq\n").await;

        assert!(out.contains("(answered correct earlier)"));
        assert!(out.contains("1 answered, 1 correct"));
    }

    #[tokio::test]
    async fn study_quits_on_end_of_input() {
        let services = services_with(&["Q1"]).await;
        let out = run(&services, Command::Study { limit: None }, "b\n").await;

        assert!(out.contains("Already at the first card."));
        assert!(out.contains("0 answered"));
    }

    #[tokio::test]
    async fn status_reports_cards_and_open_sessions() {
        let services = services_with(&["Q1", "Q2"]).await;
        services.sessions().start().await.unwrap();

        let out = run(&services, Command::Status, "").await;
        assert!(out.contains("flashcards:       2"));
        assert!(out.contains("active sessions:  1"));
    }

    #[tokio::test]
    async fn study_without_cards_fails() {
        let services = services_with(&[]).await;
        let mut out = Vec::new();
        let err = execute(
            &services,
            Command::Study { limit: None },
            &mut Cursor::new(Vec::new()),
            &mut out,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("no flashcards"));
    }
}
