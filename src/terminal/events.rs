use anyhow::Result;
use ratatui::crossterm::event::{KeyCode, KeyEvent};

use crate::app::MailHub;
use crate::terminal::state::{AppState, Screen};

/// What the event loop has to do after a key was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Leave the terminal, run the browser login, come back.
    Login,
    /// Rebuild everything from the config, like a page reload.
    Reload,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState, hub: &mut MailHub) -> Result<Action> {
    if key.code == KeyCode::Char('q') {
        return Ok(Action::Quit);
    }

    match state.screen {
        Screen::Login => handle_login_keys(key, state, hub),
        Screen::Senders => handle_sender_keys(key, state, hub),
        Screen::Messages => handle_message_keys(key, state),
        Screen::Failure => handle_failure_keys(key, state, hub),
    }
}

fn handle_login_keys(key: KeyEvent, state: &mut AppState, hub: &mut MailHub) -> Result<Action> {
    match key.code {
        KeyCode::Enter | KeyCode::Char('l') => return Ok(Action::Login),
        KeyCode::Char('c') => {
            hub.clear_stored_token();
            state.status = Some("Token removed. Try logging in again.".into());
        }
        KeyCode::Char('r') => return Ok(Action::Reload),
        KeyCode::Esc => return Ok(Action::Quit),
        _ => {}
    }
    Ok(Action::None)
}

fn handle_sender_keys(key: KeyEvent, state: &mut AppState, hub: &mut MailHub) -> Result<Action> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::Tab => state.toggle_pane(),
        KeyCode::Enter => state.open_selected(hub)?,
        KeyCode::Char('f') => state.toggle_favorite(hub),
        KeyCode::Char('r') => state.load_senders(hub)?,
        KeyCode::Char('o') => state.logout(hub),
        KeyCode::Esc => return Ok(Action::Quit),
        _ => {}
    }
    Ok(Action::None)
}

fn handle_message_keys(key: KeyEvent, state: &mut AppState) -> Result<Action> {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => state.back_to_senders(),
        _ => {}
    }
    Ok(Action::None)
}

fn handle_failure_keys(key: KeyEvent, state: &mut AppState, hub: &mut MailHub) -> Result<Action> {
    match key.code {
        KeyCode::Char('r') | KeyCode::Enter => state.retry(hub)?,
        KeyCode::Char('R') => return Ok(Action::Reload),
        KeyCode::Esc => return Ok(Action::Quit),
        _ => {}
    }
    Ok(Action::None)
}
