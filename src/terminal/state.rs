use anyhow::Result;
use log::{error, info};
use ratatui::widgets::ListState;

use crate::app::{MailHub, SENDER_MESSAGES_MAX};
use crate::domain::{MessageSummary, Sender};
use crate::error::Error;
use crate::favorites::FavoriteSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Senders,
    Messages,
    /// Something escaped a view; offers retry or reload.
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenderPane {
    Favorites,
    #[default]
    All,
}

pub struct AppState {
    pub screen: Screen,
    pub pane: SenderPane,

    pub senders: Vec<Sender>,
    pub favorites: FavoriteSet,
    pub sender_list: ListState,

    pub selected_sender: Option<Sender>,
    pub messages: Vec<MessageSummary>,
    pub message_list: ListState,

    /// Shown as a banner on the current screen.
    pub error: Option<String>,
    pub status: Option<String>,

    pub failure: Option<String>,
    failed_screen: Option<Screen>,
}

impl AppState {
    pub fn new(hub: &MailHub) -> Self {
        let screen = if hub.is_authenticated() {
            Screen::Senders
        } else {
            Screen::Login
        };
        Self {
            screen,
            pane: SenderPane::All,
            senders: vec![],
            favorites: hub.favorites(),
            sender_list: ListState::default(),
            selected_sender: None,
            messages: vec![],
            message_list: ListState::default(),
            error: None,
            status: None,
            failure: None,
            failed_screen: None,
        }
    }

    /// Senders listed in the active pane.
    pub fn visible_senders(&self) -> Vec<Sender> {
        match self.pane {
            SenderPane::Favorites => self.favorites.filter_senders(&self.senders),
            SenderPane::All => self.senders.clone(),
        }
    }

    pub fn current_sender(&self) -> Option<Sender> {
        let idx = self.sender_list.selected()?;
        self.visible_senders().into_iter().nth(idx)
    }

    pub fn load_senders(&mut self, hub: &MailHub) -> Result<()> {
        self.error = None;
        self.status = Some("Loading senders...".into());
        let sample = hub.config.sample_size();

        match hub.senders(sample) {
            Ok(senders) => {
                self.status = Some(format!("{} senders", senders.len()));
                self.senders = senders;
                self.favorites = hub.favorites();
                self.screen = Screen::Senders;
                self.reset_sender_selection();
            }
            Err(Error::NotAuthenticated) => {
                self.status = None;
                self.to_login(Some("Not authenticated, please log in again.".into()));
            }
            Err(e) => {
                self.status = None;
                self.error = Some(format!("Could not load senders: {e}"));
            }
        }
        Ok(())
    }

    pub fn open_selected(&mut self, hub: &MailHub) -> Result<()> {
        let Some(sender) = self.current_sender() else {
            return Ok(());
        };
        self.selected_sender = Some(sender.clone());
        self.messages.clear();
        self.message_list.select(None);
        self.screen = Screen::Messages;
        self.load_messages(hub)
    }

    fn load_messages(&mut self, hub: &MailHub) -> Result<()> {
        let Some(sender) = self.selected_sender.clone() else {
            self.screen = Screen::Senders;
            return Ok(());
        };
        self.error = None;
        match hub.messages_from(&sender.address, SENDER_MESSAGES_MAX) {
            Ok(msgs) => {
                self.message_list
                    .select(if msgs.is_empty() { None } else { Some(0) });
                self.messages = msgs;
            }
            Err(Error::NotAuthenticated) => {
                self.to_login(Some("Not authenticated, please log in again.".into()));
            }
            Err(e) => {
                self.error = Some(format!("Could not load messages: {e}"));
            }
        }
        Ok(())
    }

    pub fn back_to_senders(&mut self) {
        self.screen = Screen::Senders;
        self.error = None;
    }

    pub fn toggle_pane(&mut self) {
        self.pane = match self.pane {
            SenderPane::Favorites => SenderPane::All,
            SenderPane::All => SenderPane::Favorites,
        };
        self.reset_sender_selection();
    }

    pub fn toggle_favorite(&mut self, hub: &MailHub) {
        let Some(sender) = self.current_sender() else {
            return;
        };
        let starred = hub.toggle_favorite(&sender.address);
        self.favorites = hub.favorites();
        self.status = Some(if starred {
            format!("{} added to favorites", sender.name)
        } else {
            format!("{} removed from favorites", sender.name)
        });
        // Unstarring from the favorites pane shrinks the list.
        let len = self.visible_senders().len();
        if let Some(i) = self.sender_list.selected() {
            self.sender_list
                .select(if len == 0 { None } else { Some(i.min(len - 1)) });
        }
    }

    pub fn logout(&mut self, hub: &mut MailHub) {
        hub.logout();
        self.favorites = hub.favorites();
        self.senders.clear();
        self.messages.clear();
        self.selected_sender = None;
        self.to_login(None);
    }

    pub fn to_login(&mut self, error: Option<String>) {
        self.screen = Screen::Login;
        self.error = error;
    }

    pub fn move_selection(&mut self, delta: i32) {
        let len = match self.screen {
            Screen::Senders => self.visible_senders().len(),
            Screen::Messages => self.messages.len(),
            _ => return,
        };
        let list = if self.screen == Screen::Senders {
            &mut self.sender_list
        } else {
            &mut self.message_list
        };
        if len == 0 {
            list.select(None);
            return;
        }
        let cur = list.selected().unwrap_or(0) as i32;
        let next = (cur + delta).clamp(0, len as i32 - 1) as usize;
        list.select(Some(next));
    }

    fn reset_sender_selection(&mut self) {
        let empty = self.visible_senders().is_empty();
        self.sender_list.select(if empty { None } else { Some(0) });
    }

    /// Error boundary: park the current view behind the failure screen.
    pub fn fail(&mut self, err: &anyhow::Error) {
        error!("view failed: {err:#}");
        if self.screen != Screen::Failure {
            self.failed_screen = Some(self.screen);
        }
        self.failure = Some(format!("{err:#}"));
        self.screen = Screen::Failure;
    }

    /// Re-runs the view that failed.
    pub fn retry(&mut self, hub: &MailHub) -> Result<()> {
        self.failure = None;
        let target = self.failed_screen.take().unwrap_or(Screen::Senders);
        info!("retrying {target:?}");
        match target {
            Screen::Messages => {
                self.screen = Screen::Messages;
                self.load_messages(hub)
            }
            Screen::Login => {
                self.to_login(None);
                Ok(())
            }
            Screen::Senders | Screen::Failure => self.load_senders(hub),
        }
    }
}
