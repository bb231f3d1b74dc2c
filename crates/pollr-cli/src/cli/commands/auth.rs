//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal};

use anyhow::{Context, Result};
use pollr_core::config::paths;
use pollr_core::model::UserProfile;
use pollr_core::screens::AppContext;
use pollr_core::screens::auth::{LoginForm, ResetPasswordForm, UpdatePasswordForm};
use pollr_core::session::mask_token;

use super::prompt;

/// Uses the flag value when given, otherwise asks on the terminal without
/// echo, or reads one line from piped stdin.
pub fn read_secret(value: Option<String>, label: &str) -> Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    if io::stdin().is_terminal() {
        return prompt::read_hidden(&format!("{label}: "))?.context("Cancelled");
    }
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(ctx: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let mut form = LoginForm::new();
    form.email = email.to_string();
    form.password = read_secret(password, "Password")?;

    if let Err(alert) = form.sign_in(ctx).await {
        anyhow::bail!("{alert}");
    }

    let name = ctx
        .session
        .user()
        .and_then(|u| u.email)
        .unwrap_or_else(|| email.to_string());
    println!("✓ Signed in as {name}");
    println!("  Session saved to: {}", paths::session_path().display());
    Ok(())
}

pub async fn signup(ctx: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let mut form = LoginForm::new();
    form.email = email.to_string();
    form.password = read_secret(password, "Password")?;

    match form.sign_up(ctx).await {
        Ok((alert, _)) => {
            println!("✓ {}", alert.message);
            Ok(())
        }
        Err(alert) => anyhow::bail!("{alert}"),
    }
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    if ctx.session.user().is_none() {
        println!("Not signed in (no session found).");
        return Ok(());
    }
    ctx.session.sign_out().await;
    println!("✓ Signed out");
    println!("  Session removed from: {}", paths::session_path().display());
    Ok(())
}

/// Prints the signed-in user, re-read from the auth service when reachable.
///
/// # Errors
/// Fails when the backend no longer accepts the session, which is then
/// removed locally.
pub async fn whoami(ctx: &AppContext, cached: UserProfile) -> Result<()> {
    let user = match ctx.session.reload_user().await {
        Ok(user) => user,
        Err(err) if ctx.session.user().is_none() => {
            anyhow::bail!(
                "{}. Session removed; run `pollr login --email <EMAIL>` to sign in again.",
                err.user_message()
            );
        }
        Err(err) => {
            eprintln!("• Could not verify session: {}", err.user_message());
            cached
        }
    };
    print_user(ctx, &user);
    Ok(())
}

fn print_user(ctx: &AppContext, user: &UserProfile) {
    println!("{}", user.email.as_deref().unwrap_or("(no email)"));
    println!("  id:      {}", user.id);
    if let Some(token) = ctx.session.access_token() {
        println!("  token:   {}", mask_token(&token));
    }
    println!("  backend: {}", ctx.backend().base_url());
}

pub async fn reset_password(ctx: &AppContext, email: &str) -> Result<()> {
    let mut form = ResetPasswordForm::new();
    form.email = email.to_string();
    let message = form.submit(ctx).await;
    if message.is_error() {
        anyhow::bail!("{}", message.text);
    }
    println!("✓ {}", message.text);
    Ok(())
}

pub async fn update_password(
    ctx: &AppContext,
    password: Option<String>,
    confirm: Option<String>,
) -> Result<()> {
    let mut form = UpdatePasswordForm::new();
    form.set_password(read_secret(password, "New password")?);
    form.set_confirm(read_secret(confirm, "Confirm password")?);

    match form.submit(ctx).await {
        Ok((alert, _)) => {
            if let Some(message) = form.message() {
                println!("✓ {}", message.text);
            }
            println!("  {}", alert.message);
            Ok(())
        }
        Err(message) => anyhow::bail!("{message}"),
    }
}
