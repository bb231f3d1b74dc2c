//! Poll command handlers.

use anyhow::{Context, Result};
use pollr_core::model::{PollId, UserProfile};
use pollr_core::screens::AppContext;
use pollr_core::screens::poll_create::{PollForm, SubmitError};
use pollr_core::screens::poll_detail::{
    DetailState, MSG_ALREADY_VOTED, MSG_NOT_FOUND, PollDetailScreen, ReadyPoll, VoteOutcome,
};
use pollr_core::screens::poll_list::{MSG_EMPTY, PollListScreen};

use super::render;

pub async fn list(ctx: &AppContext, user: &UserProfile) -> Result<()> {
    let mut screen = PollListScreen::new();
    screen.load(ctx).await;
    if let Some(alert) = screen.take_alert() {
        anyhow::bail!("{alert}");
    }

    println!("{}", PollListScreen::welcome(Some(user)));
    if screen.is_empty_state() {
        println!("{MSG_EMPTY}.");
        println!("Create one with: pollr polls new --question <Q> --option <A> --option <B>");
    } else {
        println!("{}", render::poll_table(screen.polls()));
    }
    Ok(())
}

pub async fn create(ctx: &AppContext, question: &str, options: &[String]) -> Result<()> {
    let mut form = PollForm::new();
    form.set_question(question);
    for (index, option) in options.iter().enumerate() {
        if !form.set_option(index, option.as_str()) {
            let added = form.add_option();
            form.set_option(added, option.as_str());
        }
    }

    match form.submit(ctx).await {
        Ok(_) => {
            println!("✓ Poll created: {}", question.trim());
            Ok(())
        }
        Err(SubmitError::Invalid(errors)) => {
            anyhow::bail!("Poll not created:\n{}", render::validation_errors(&errors))
        }
        Err(SubmitError::Backend(alert)) => anyhow::bail!("{alert}"),
    }
}

/// Loads a poll screen, failing unless it ends up ready.
async fn load_ready(ctx: &AppContext, id: PollId) -> Result<PollDetailScreen> {
    let mut screen = PollDetailScreen::new(id);
    screen.load(ctx).await;
    match screen.state() {
        DetailState::Ready(_) => {
            // Partial failures (tally or existing vote) still render.
            if let Some(alert) = screen.take_alert() {
                eprintln!("{}", render::alert(&alert));
            }
            Ok(screen)
        }
        DetailState::NotFound => anyhow::bail!("{MSG_NOT_FOUND}: {id}"),
        DetailState::Loading => {
            let alert = screen
                .take_alert()
                .map_or_else(|| "poll did not load".to_string(), |a| a.to_string());
            anyhow::bail!("{alert}")
        }
    }
}

fn ready(screen: &PollDetailScreen) -> Result<&ReadyPoll> {
    match screen.state() {
        DetailState::Ready(ready) => Ok(ready),
        _ => anyhow::bail!("poll is not loaded"),
    }
}

pub async fn show(ctx: &AppContext, id: PollId) -> Result<()> {
    let screen = load_ready(ctx, id).await?;
    println!("{}", render::poll_detail(ready(&screen)?));
    Ok(())
}

/// Resolves a 1-based option number or the option text itself.
pub fn resolve_option(options: &[String], input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(option) = options.iter().find(|o| o.as_str() == input) {
        return Some(option.clone());
    }
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| options.get(index))
        .cloned()
}

pub async fn vote(ctx: &AppContext, id: PollId, option: &str) -> Result<()> {
    let mut screen = load_ready(ctx, id).await?;
    let options = ready(&screen)?.poll.options.clone();

    let choice = resolve_option(&options, option)
        .with_context(|| format!("No option \"{option}\" on poll {id}"))?;

    if !screen.select(&choice) && !ready(&screen)?.has_voted() {
        anyhow::bail!("Cannot select \"{choice}\"");
    }

    match screen.submit(ctx).await {
        Ok(VoteOutcome::Recorded) => println!("✓ Vote recorded for \"{choice}\""),
        Ok(VoteOutcome::AlreadyVoted | VoteOutcome::Unchanged) => println!("{MSG_ALREADY_VOTED}"),
        Err(err) => anyhow::bail!("{err}"),
    }
    println!();
    println!("{}", render::poll_detail(ready(&screen)?));
    Ok(())
}
