pub mod events;
pub mod state;
pub mod ui;

use std::any::Any;
use std::io::stdout;
use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::{Result, anyhow};
use log::{info, warn};
use ratatui::backend::Backend;
use ratatui::crossterm::event::{self, Event, KeyEventKind};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{EnterAlternateScreen, enable_raw_mode};
use ratatui::{DefaultTerminal, Frame, Terminal};

use crate::app::MailHub;
use crate::config::Config;
use crate::terminal::events::{Action, handle_key};
use crate::terminal::state::{AppState, Screen};

pub fn run_tui(config: Config) -> Result<()> {
    color_eyre::install().map_err(|e| anyhow!("installing error hooks: {e}"))?;

    let mut hub = MailHub::open(config.clone());
    let mut state = AppState::new(&hub);
    if state.screen == Screen::Senders {
        if let Err(e) = state.load_senders(&hub) {
            state.fail(&e);
        }
    }

    // Installed once; its panic hook restores the terminal on every panic.
    let terminal = ratatui::init();
    let result = run(terminal, &config, &mut hub, &mut state);
    ratatui::restore();
    result
}

/// Puts the terminal back into raw mode on the alternate screen after
/// `ratatui::restore` (or the panic hook) left it.
fn reenter(terminal: &mut DefaultTerminal) -> Result<()> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    terminal.clear()?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "render panicked".to_string())
}

/// Draws one frame. A panic inside `render` parks the state on the
/// failure screen and yields `Ok(true)`.
fn draw_guarded<B, F>(terminal: &mut Terminal<B>, state: &mut AppState, render: F) -> Result<bool>
where
    B: Backend,
    F: FnOnce(&mut Frame, &AppState),
{
    let drawn = catch_unwind(AssertUnwindSafe(|| {
        terminal.draw(|f| render(f, state)).map(|_| ())
    }));
    match drawn {
        Ok(res) => {
            res?;
            Ok(false)
        }
        Err(panic) => {
            state.fail(&anyhow!(panic_message(panic.as_ref())));
            Ok(true)
        }
    }
}

fn run(
    mut terminal: DefaultTerminal,
    config: &Config,
    hub: &mut MailHub,
    state: &mut AppState,
) -> Result<()> {
    loop {
        if draw_guarded(&mut terminal, state, ui::render)? {
            reenter(&mut terminal)?;
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let action = match handle_key(key, state, hub) {
            Ok(a) => a,
            Err(e) => {
                state.fail(&e);
                Action::None
            }
        };

        match action {
            Action::None => {}
            Action::Quit => break,
            Action::Login => {
                ratatui::restore();
                let outcome = hub.login_with_browser();
                reenter(&mut terminal)?;
                match outcome {
                    Ok(()) => {
                        info!("logged in");
                        if let Err(e) = state.load_senders(hub) {
                            state.fail(&e);
                        }
                    }
                    Err(e) => {
                        warn!("login failed: {e:#}");
                        state.to_login(Some(format!("Login failed: {e:#}")));
                    }
                }
            }
            Action::Reload => {
                *hub = MailHub::open(config.clone());
                *state = AppState::new(hub);
                if state.screen == Screen::Senders {
                    if let Err(e) = state.load_senders(hub) {
                        state.fail(&e);
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn logged_out_state() -> AppState {
        let hub = MailHub::with_store(Config::default(), Arc::new(MemoryStore::new()));
        AppState::new(&hub)
    }

    #[test]
    fn render_panic_lands_on_failure_screen() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut state = logged_out_state();

        let panicked = draw_guarded(&mut terminal, &mut state, |_, _| {
            panic!("bad layout");
        })
        .unwrap();

        assert!(panicked);
        assert_eq!(state.screen, Screen::Failure);
        assert!(state.failure.as_deref().unwrap().contains("bad layout"));

        // The failure screen itself still draws.
        assert!(!draw_guarded(&mut terminal, &mut state, ui::render).unwrap());
        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Something went wrong"));
    }

    #[test]
    fn clean_draw_keeps_screen() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut state = logged_out_state();
        assert!(!draw_guarded(&mut terminal, &mut state, ui::render).unwrap());
        assert_eq!(state.screen, Screen::Login);
    }

    #[test]
    fn panic_payloads_become_messages() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let literal: Box<dyn Any + Send> = Box::new("literal");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(literal.as_ref()), "literal");
        assert_eq!(panic_message(other.as_ref()), "render panicked");
    }
}
