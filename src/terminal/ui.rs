use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph, Tabs, Wrap},
};

use crate::terminal::state::{AppState, Screen, SenderPane};

pub fn render(f: &mut Frame, state: &AppState) {
    let [header, body, banner, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .margin(1)
    .areas(f.area());

    f.render_widget(
        Paragraph::new(Span::styled(
            "MailHub",
            Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow),
        )),
        header,
    );

    match state.screen {
        Screen::Login => render_login(f, body, state),
        Screen::Senders => render_senders(f, body, state),
        Screen::Messages => render_messages(f, body, state),
        Screen::Failure => render_failure(f, body, state),
    }

    let banner_line = match (&state.error, &state.status) {
        (Some(e), _) => Line::from(Span::styled(e.clone(), Style::default().fg(Color::Red))),
        (None, Some(s)) => Line::from(Span::styled(s.clone(), Style::default().fg(Color::Gray))),
        (None, None) => Line::default(),
    };
    f.render_widget(Paragraph::new(banner_line), banner);

    f.render_widget(Paragraph::new(hints(state.screen)), footer);
}

fn hints(screen: Screen) -> Line<'static> {
    let keys: &[(&'static str, &'static str)] = match screen {
        Screen::Login => &[("l", "login"), ("c", "clear token"), ("r", "reload"), ("q", "quit")],
        Screen::Senders => &[
            ("j/k", "move"),
            ("Tab", "favorites/all"),
            ("Enter", "open"),
            ("f", "favorite"),
            ("r", "refresh"),
            ("o", "logout"),
            ("q", "quit"),
        ],
        Screen::Messages => &[("j/k", "move"), ("Esc", "back"), ("q", "quit")],
        Screen::Failure => &[("r", "retry"), ("R", "reload"), ("q", "quit")],
    };
    let mut spans = Vec::with_capacity(keys.len() * 2);
    for (k, what) in keys {
        spans.push(Span::styled(*k, Style::default().add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(format!(" {what}  ")));
    }
    Line::from(spans)
}

fn render_login(f: &mut Frame, area: Rect, _state: &AppState) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(" Sign in ")
        .border_style(Style::default().fg(Color::Yellow));

    let text = Text::from(vec![
        Line::from("Organize your Gmail inbox by sender."),
        Line::default(),
        Line::from("Press l to sign in with Google in your browser."),
    ]);
    f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: true }), area);
}

fn render_senders(f: &mut Frame, area: Rect, state: &AppState) {
    let [tabs_area, list_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);

    let fav_count = state.favorites.filter_senders(&state.senders).len();
    let selected = match state.pane {
        SenderPane::Favorites => 0,
        SenderPane::All => 1,
    };
    let tabs = Tabs::new(vec![
        format!("Favorites ({fav_count})"),
        format!("All senders ({})", state.senders.len()),
    ])
    .select(selected)
    .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, tabs_area);

    let senders = state.visible_senders();
    let block = Block::default().borders(Borders::ALL);

    if senders.is_empty() {
        let empty = match state.pane {
            SenderPane::Favorites => "No favorite senders yet (press f on a sender).",
            SenderPane::All => "No senders found.",
        };
        f.render_widget(Paragraph::new(empty).block(block), list_area);
        return;
    }

    let items: Vec<ListItem> = senders
        .iter()
        .map(|s| {
            let star = if state.favorites.contains(&s.address) {
                Span::styled("* ", Style::default().fg(Color::Yellow))
            } else {
                Span::raw("  ")
            };
            let name = Span::styled(s.name.clone(), Style::default().add_modifier(Modifier::BOLD));
            let count = Span::styled(format!("  [{}]", s.count), Style::default().fg(Color::Cyan));
            let addr = Span::styled(format!("  {}", s.address), Style::default().fg(Color::Gray));
            ListItem::new(Text::from(vec![
                Line::from(vec![star, name, count]),
                Line::from(addr),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_symbol("➜ ")
        .highlight_style(Style::default().fg(Color::Green));

    f.render_stateful_widget(list, list_area, &mut state.sender_list.clone());
}

fn render_messages(f: &mut Frame, area: Rect, state: &AppState) {
    let title = match &state.selected_sender {
        Some(s) => format!(" {} <{}> - {} message(s) ", s.name, s.address, state.messages.len()),
        None => " Messages ".to_string(),
    };
    let block = Block::default().title(title).borders(Borders::ALL);

    if state.messages.is_empty() {
        f.render_widget(
            Paragraph::new("No messages from this sender in your inbox.").block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = state
        .messages
        .iter()
        .map(|m| {
            let subject = Span::styled(
                m.subject().unwrap_or("(no subject)").to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            );
            let date = Span::styled(
                format!("  {}", m.date().unwrap_or_default()),
                Style::default().fg(Color::Cyan),
            );
            let snip = Span::styled(m.snippet.clone(), Style::default().fg(Color::Gray));
            ListItem::new(Text::from(vec![Line::from(vec![subject, date]), Line::from(snip)]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_symbol("➜ ")
        .highlight_style(Style::default().fg(Color::Green));

    f.render_stateful_widget(list, area, &mut state.message_list.clone());
}

fn render_failure(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(" Something went wrong ")
        .border_style(Style::default().fg(Color::Red));

    let msg = state
        .failure
        .clone()
        .unwrap_or_else(|| "An unexpected error occurred.".to_string());
    let text = Text::from(vec![
        Line::from(msg),
        Line::default(),
        Line::from("Press r to retry this view or R to reload the application."),
    ]);
    f.render_widget(Paragraph::new(text).block(block).wrap(Wrap { trim: false }), area);
}
