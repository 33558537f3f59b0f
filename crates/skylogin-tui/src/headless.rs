//! Non-interactive subcommands: `login`, `logout` and `status`.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::warn;

use skylogin_core::auth::{Credentials, LoginFlow, Resolved, RouteGuard, SubmitOutcome, HOME_PATH};
use skylogin_core::{Authenticator, Config, SessionStore};

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

pub async fn login(
    mut config: Config,
    store: Arc<dyn SessionStore>,
    auth: Arc<dyn Authenticator>,
    identifier: Option<String>,
) -> Result<()> {
    println!("\n=== Sign in with Bluesky ({}) ===\n", config.service_url);

    let identifier = match identifier.or_else(|| config.last_identifier.clone()) {
        Some(id) if !id.is_empty() => {
            println!("Username or Email: {}", id);
            id
        }
        _ => prompt("Username or Email: ")?,
    };
    let password = prompt_password()?;

    let flow = LoginFlow::new(auth, store, config.service_url.clone());
    let mut outcome = flow.submit(Credentials::new(identifier.clone(), password)).await;

    loop {
        match outcome {
            SubmitOutcome::Succeeded { session, .. } => {
                config.last_identifier = Some(identifier);
                if let Err(e) = config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("\nSigned in as @{} ({})", session.handle, session.did);
                return Ok(());
            }
            SubmitOutcome::SecondFactorRequired { notification } => {
                println!("\n{}", notification.description);
                let code = prompt("Verification Code: ")?;
                outcome = flow.submit_code(&code).await;
            }
            SubmitOutcome::Invalid(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                bail!(messages.join("\n"));
            }
            SubmitOutcome::Failed { notification } => bail!(notification.description),
            SubmitOutcome::Busy => bail!("A sign-in is already in progress"),
        }
    }
}

pub async fn logout(
    config: Config,
    store: Arc<dyn SessionStore>,
    auth: Arc<dyn Authenticator>,
) -> Result<()> {
    if store.read().is_none() {
        println!("Not signed in.");
        return Ok(());
    }
    let flow = LoginFlow::new(auth, store, config.service_url);
    flow.logout().await?;
    println!("Signed out.");
    Ok(())
}

pub fn status(store: Arc<dyn SessionStore>) -> Result<()> {
    write_status(store, &mut io::stdout().lock())
}

/// Print the route the guard resolves `/` to, plus the stored account if any.
fn write_status(store: Arc<dyn SessionStore>, out: &mut impl Write) -> Result<()> {
    let resolved = RouteGuard::new(store).resolve(HOME_PATH);
    let path = resolved.route().path().unwrap_or(HOME_PATH);
    writeln!(out, "Route: {}", path)?;
    match resolved {
        Resolved::Home(session) => {
            writeln!(out, "Signed in as @{} ({})", session.handle, session.did)?;
            if let Some(email) = session.email {
                writeln!(out, "Email: {}", email)?;
            }
            writeln!(out, "Since: {}", session.created_at.format("%Y-%m-%d %H:%M UTC"))?;
        }
        _ => writeln!(out, "Not signed in.")?,
    }
    Ok(())
}
