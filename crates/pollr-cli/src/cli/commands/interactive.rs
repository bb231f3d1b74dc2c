//! Line-driven interactive mode.
//!
//! Walks the route graph: auth gate, then poll list, poll creation, and poll
//! detail. Each screen reads commands until it yields the next route, or
//! `None` to quit.

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use pollr_core::model::PollId;
use pollr_core::screens::auth::{LoginForm, ResetPasswordForm, UpdatePasswordForm};
use pollr_core::screens::gate::{self, GateDecision};
use pollr_core::screens::poll_create::{PollForm, SubmitError};
use pollr_core::screens::poll_detail::{
    DetailState, MSG_ALREADY_VOTED, MSG_NOT_FOUND, PollDetailScreen, VoteOutcome,
};
use pollr_core::screens::poll_list::{MSG_EMPTY, PollListScreen, SIGN_OUT_PROMPT};
use pollr_core::screens::{AppContext, Route};
use pollr_core::session::AppState;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use super::{polls, prompt, render};

struct Input {
    lines: Lines<BufReader<Stdin>>,
}

impl Input {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Prompts and reads one trimmed line. `None` on end of input.
    async fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{prompt}");
        std::io::stdout().flush()?;
        let line = self.lines.next_line().await.context("read from stdin")?;
        Ok(line.map(|l| l.trim().to_string()))
    }

    /// Like [`Input::ask`], but without echo when stdin is a terminal.
    /// Cancelling the prompt counts as end of input.
    async fn ask_secret(&mut self, prompt: &str) -> Result<Option<String>> {
        if !std::io::stdin().is_terminal() {
            return self.ask(prompt).await;
        }
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || prompt::read_hidden(&prompt))
            .await
            .context("password prompt")?
    }

    async fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let answer = self.ask(&format!("{prompt} [y/N] ")).await?;
        Ok(answer.is_some_and(|a| a.eq_ignore_ascii_case("y")))
    }
}

pub async fn run(ctx: &AppContext) -> Result<()> {
    ctx.session.set_app_state(AppState::Active);
    if ctx.session.user().is_some()
        && let Err(err) = ctx.session.reload_user().await
    {
        tracing::warn!(error = %err, "could not verify session");
    }
    let result = event_loop(ctx).await;
    ctx.session.set_app_state(AppState::Background);
    result
}

/// Sends protected routes to login when nobody is signed in.
fn guard(ctx: &AppContext, route: Route) -> Route {
    if !route.is_protected() {
        return route;
    }
    match gate::evaluate(&ctx.session.snapshot()) {
        GateDecision::Allow(_) => route,
        GateDecision::Loading | GateDecision::RedirectToLogin => Route::Login,
    }
}

async fn event_loop(ctx: &AppContext) -> Result<()> {
    let mut input = Input::new();
    let mut route = match gate::resolve(&ctx.session).await {
        GateDecision::Allow(_) => Route::PollList,
        GateDecision::Loading | GateDecision::RedirectToLogin => Route::Login,
    };

    loop {
        let next = match route {
            Route::Login => login_screen(ctx, &mut input).await?,
            Route::ResetPassword => reset_password_screen(ctx, &mut input).await?,
            Route::UpdatePassword => update_password_screen(ctx, &mut input).await?,
            Route::PollList => poll_list_screen(ctx, &mut input).await?,
            Route::NewPoll => new_poll_screen(ctx, &mut input).await?,
            Route::PollDetail(id) => poll_detail_screen(ctx, &mut input, id).await?,
        };
        let Some(next) = next else {
            return Ok(());
        };
        route = guard(ctx, next);
    }
}

fn parse_index(arg: Option<&str>) -> Option<usize> {
    arg?.parse::<usize>().ok()?.checked_sub(1)
}

async fn login_screen(ctx: &AppContext, input: &mut Input) -> Result<Option<Route>> {
    println!();
    println!("Sign In or create an account:");
    println!("Commands: login, signup, reset, quit");

    loop {
        let Some(line) = input.ask("login> ").await? else {
            return Ok(None);
        };
        match line.as_str() {
            "" => {}
            "quit" | "exit" => return Ok(None),
            "reset" => return Ok(Some(LoginForm::forgot_password())),
            "login" | "signup" => {
                let mut form = LoginForm::new();
                let Some(email) = input.ask("Email: ").await? else {
                    return Ok(None);
                };
                let Some(password) = input.ask_secret("Password: ").await? else {
                    return Ok(None);
                };
                form.email = email;
                form.password = password;

                if line == "login" {
                    match form.sign_in(ctx).await {
                        Ok(route) => return Ok(Some(route)),
                        Err(alert) => println!("{}", render::alert(&alert)),
                    }
                } else {
                    match form.sign_up(ctx).await {
                        Ok((alert, route)) => {
                            println!("{}", render::alert(&alert));
                            if route.is_some() {
                                return Ok(route);
                            }
                        }
                        Err(alert) => println!("{}", render::alert(&alert)),
                    }
                }
            }
            other => println!("Unknown command: {other}"),
        }
    }
}

async fn reset_password_screen(ctx: &AppContext, input: &mut Input) -> Result<Option<Route>> {
    println!();
    println!("Reset Password");
    println!("Enter your email address and we'll send you instructions to reset your password");
    println!("(empty line goes back to login)");

    let mut form = ResetPasswordForm::new();
    loop {
        let Some(email) = input.ask("Email: ").await? else {
            return Ok(None);
        };
        if email.is_empty() {
            return Ok(Some(ResetPasswordForm::back()));
        }
        form.email = email;
        let message = form.submit(ctx).await;
        if message.is_error() {
            println!("✗ {}", message.text);
        } else {
            println!("✓ {}", message.text);
            return Ok(Some(ResetPasswordForm::back()));
        }
    }
}

async fn update_password_screen(ctx: &AppContext, input: &mut Input) -> Result<Option<Route>> {
    println!();
    println!("Create New Password");

    let mut form = UpdatePasswordForm::new();
    loop {
        let Some(password) = input.ask_secret("New password (empty to cancel): ").await? else {
            return Ok(None);
        };
        if password.is_empty() {
            return Ok(Some(Route::PollList));
        }
        let Some(confirm) = input.ask_secret("Confirm password: ").await? else {
            return Ok(None);
        };
        form.set_password(password);
        form.set_confirm(confirm);

        match form.submit(ctx).await {
            Ok((alert, route)) => {
                println!("{}", render::alert(&alert));
                if input.confirm("Go to Login?").await? {
                    return Ok(Some(route));
                }
                return Ok(Some(Route::PollList));
            }
            Err(message) => println!("✗ {message}"),
        }
    }
}

async fn poll_list_screen(ctx: &AppContext, input: &mut Input) -> Result<Option<Route>> {
    let mut screen = PollListScreen::new();
    let mut stale = true;

    loop {
        if stale {
            screen.load(ctx).await;
            println!();
            println!("{}", PollListScreen::welcome(ctx.session.user().as_ref()));
            if let Some(alert) = screen.take_alert() {
                println!("{}", render::alert(&alert));
            }
            if screen.is_empty_state() {
                println!("{MSG_EMPTY}. Type `new` to create one.");
            } else {
                println!("{}", render::poll_table(screen.polls()));
            }
            println!("Commands: new, open <n>, reload, password, logout, quit");
            stale = false;
        }

        let Some(line) = input.ask("polls> ").await? else {
            return Ok(None);
        };
        let mut parts = line.split_whitespace();
        match parts.next() {
            None => {}
            Some("quit" | "exit") => return Ok(None),
            Some("new") => return Ok(Some(PollListScreen::new_poll())),
            Some("reload") => stale = true,
            Some("password") => return Ok(Some(Route::UpdatePassword)),
            Some("open") => match parse_index(parts.next()).and_then(|i| screen.open(i)) {
                Some(route) => return Ok(Some(route)),
                None => println!("Usage: open <n> (1-{})", screen.polls().len()),
            },
            Some("logout") => {
                screen.request_sign_out();
                if input.confirm(SIGN_OUT_PROMPT).await? {
                    if let Some(route) = screen.confirm_sign_out(ctx).await {
                        println!("✓ Signed out");
                        return Ok(Some(route));
                    }
                } else {
                    screen.cancel_sign_out();
                }
            }
            Some(other) => println!("Unknown command: {other}"),
        }
    }
}

async fn new_poll_screen(ctx: &AppContext, input: &mut Input) -> Result<Option<Route>> {
    println!();
    println!("Create New Poll (type `back` at any prompt to cancel)");

    loop {
        let mut form = PollForm::new();

        let Some(question) = input.ask("Question: ").await? else {
            return Ok(None);
        };
        if question == "back" {
            return Ok(Some(Route::PollList));
        }
        form.set_question(question);

        println!("Options (empty line to finish):");
        let mut index = 0;
        loop {
            let Some(option) = input.ask(&format!("  Option {}: ", index + 1)).await? else {
                return Ok(None);
            };
            if option == "back" {
                return Ok(Some(Route::PollList));
            }
            if option.is_empty() {
                break;
            }
            if !form.set_option(index, option.as_str()) {
                let added = form.add_option();
                form.set_option(added, option);
            }
            index += 1;
        }

        match form.submit(ctx).await {
            Ok(route) => {
                println!("✓ Poll created");
                return Ok(Some(route));
            }
            Err(SubmitError::Invalid(errors)) => {
                println!("✗ Poll not created:");
                println!("{}", render::validation_errors(&errors));
                if !input.confirm("Try again?").await? {
                    return Ok(Some(Route::PollList));
                }
            }
            Err(SubmitError::Backend(alert)) => {
                println!("{}", render::alert(&alert));
                return Ok(Some(Route::PollList));
            }
        }
    }
}

async fn poll_detail_screen(
    ctx: &AppContext,
    input: &mut Input,
    id: PollId,
) -> Result<Option<Route>> {
    let mut screen = PollDetailScreen::new(id);
    let mut stale = true;

    loop {
        if stale {
            screen.load(ctx).await;
            stale = false;
            println!();
            if let Some(alert) = screen.take_alert() {
                println!("{}", render::alert(&alert));
            }
            match screen.state() {
                DetailState::Ready(ready) => {
                    println!("{}", render::poll_detail(ready));
                    println!("Commands: vote <n>, reload, back, quit");
                }
                DetailState::NotFound => {
                    println!("{MSG_NOT_FOUND}.");
                    println!("Commands: back, quit");
                }
                DetailState::Loading => println!("Commands: reload, back, quit"),
            }
        }

        let Some(line) = input.ask("poll> ").await? else {
            return Ok(None);
        };
        let mut parts = line.split_whitespace();
        match parts.next() {
            None => {}
            Some("quit" | "exit") => return Ok(None),
            Some("back") => return Ok(Some(PollDetailScreen::back())),
            Some("reload") => stale = true,
            Some("vote") => {
                let DetailState::Ready(ready) = screen.state() else {
                    println!("Nothing to vote on.");
                    continue;
                };
                let Some(choice) = parts
                    .next()
                    .and_then(|arg| polls::resolve_option(&ready.poll.options, arg))
                else {
                    println!("Usage: vote <n> (1-{})", ready.poll.options.len());
                    continue;
                };
                screen.select(&choice);
                match screen.submit(ctx).await {
                    Ok(VoteOutcome::Recorded) => println!("✓ Vote recorded for \"{choice}\""),
                    Ok(VoteOutcome::AlreadyVoted | VoteOutcome::Unchanged) => {
                        println!("{MSG_ALREADY_VOTED}");
                    }
                    Err(err) => println!("✗ {err}"),
                }
                screen.take_alert();
                if let DetailState::Ready(ready) = screen.state() {
                    println!("{}", render::poll_detail(ready));
                }
            }
            Some(other) => println!("Unknown command: {other}"),
        }
    }
}
