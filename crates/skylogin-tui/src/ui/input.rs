//! Keyboard input handling for the TUI.
//!
//! This module translates key events into application state changes.

use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use skylogin_core::auth::{LoginStep, Route, HOME_PATH};

use crate::app::{
    can_add_code_char, can_add_identifier_char, can_add_password_char, App, AppState, LoginFocus,
};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent, now: Instant) -> Result<bool> {
    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    // Esc closes the visible notification before doing anything else
    if key.code == KeyCode::Esc && app.notifications.current().is_some() {
        app.notifications.dismiss();
        return Ok(false);
    }

    match app.route() {
        Route::Login => handle_login_input(app, key),
        Route::Home => handle_home_input(app, key, now),
        Route::NotFound => handle_not_found_input(app, key),
    }
    Ok(false)
}

fn handle_login_input(app: &mut App, key: KeyEvent) {
    let step = app.login_step();
    match key.code {
        KeyCode::Esc => match step {
            LoginStep::AwaitingCredentials => app.state = AppState::ConfirmingQuit,
            LoginStep::AwaitingSecondFactor => app.cancel_second_factor(),
        },
        KeyCode::Down | KeyCode::Tab => {
            // Move to next field
            app.form.focus = match (step, app.form.focus) {
                (LoginStep::AwaitingCredentials, LoginFocus::Identifier) => LoginFocus::Password,
                (LoginStep::AwaitingCredentials, LoginFocus::Password) => LoginFocus::Button,
                (LoginStep::AwaitingCredentials, _) => LoginFocus::Identifier,
                (LoginStep::AwaitingSecondFactor, LoginFocus::Code) => LoginFocus::Button,
                (LoginStep::AwaitingSecondFactor, _) => LoginFocus::Code,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            // Move to previous field
            app.form.focus = match (step, app.form.focus) {
                (LoginStep::AwaitingCredentials, LoginFocus::Button) => LoginFocus::Password,
                (LoginStep::AwaitingCredentials, LoginFocus::Password) => LoginFocus::Identifier,
                (LoginStep::AwaitingCredentials, _) => LoginFocus::Button,
                (LoginStep::AwaitingSecondFactor, LoginFocus::Code) => LoginFocus::Button,
                (LoginStep::AwaitingSecondFactor, _) => LoginFocus::Code,
            };
        }
        KeyCode::Enter => match app.form.focus {
            LoginFocus::Identifier => app.form.focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Code | LoginFocus::Button => app.submit_login(),
        },
        KeyCode::Backspace => match app.form.focus {
            LoginFocus::Identifier => {
                app.form.identifier.pop();
            }
            LoginFocus::Password => {
                app.form.password.pop();
            }
            LoginFocus::Code => {
                app.form.code.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.form.focus {
            LoginFocus::Identifier => {
                if can_add_identifier_char(app.form.identifier.chars().count(), c) {
                    app.form.identifier.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.form.password.chars().count(), c) {
                    app.form.password.push(c);
                }
            }
            LoginFocus::Code => {
                if can_add_code_char(app.form.code.chars().count(), c) {
                    app.form.code.push(c);
                }
            }
            LoginFocus::Button => {
                // Ignore character input on button
            }
        },
        _ => {}
    }
}

fn handle_home_input(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('c') => app.click(now),
        KeyCode::Char('l') => app.logout(),
        KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
        _ => {}
    }
}

fn handle_not_found_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter | KeyCode::Char('h') => app.navigate(HOME_PATH),
        KeyCode::Char('q') | KeyCode::Esc => app.state = AppState::ConfirmingQuit,
        _ => {}
    }
}
