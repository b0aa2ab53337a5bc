use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode};
use crate::sync::Source;

pub fn draw(frame: &mut Frame, app: &App) {
    // Main horizontal split: 1/3 left, 2/3 right
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3), // Left pane: show list
            Constraint::Ratio(2, 3), // Right pane: show details
        ])
        .split(frame.area());

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(0),    // Show list
            Constraint::Length(1), // Status line
        ])
        .split(main_chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Show title
            Constraint::Percentage(40), // Description
            Constraint::Min(0),         // Reviews
            Constraint::Length(1),      // Status
        ])
        .split(main_chunks[1]);

    render_header(frame, app, left_chunks[0]);
    if app.is_empty_state() {
        render_empty_state(frame, app, left_chunks[1]);
    } else {
        render_show_list(frame, app, left_chunks[1]);
    }
    render_left_status(frame, app, left_chunks[2]);

    render_show_title(frame, app, right_chunks[0]);
    render_description(frame, app, right_chunks[1]);
    render_reviews(frame, app, right_chunks[2]);
    render_right_status(frame, app, right_chunks[3]);

    if app.show_profile {
        render_profile(frame, app);
    }

    if app.confirm_logout {
        render_logout_confirm(frame);
    }

    if let Some(mode) = app.input_mode {
        render_input(frame, app, mode);
    }

    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let source = match app.last_source {
        Some(Source::Remote) => "online",
        Some(Source::Local) => "offline cache",
        None => "…",
    };

    let title = format!(" Shows [{}] ", app.list.label());
    let stats = format!(
        " {} shows | {} | {} cached",
        app.shows.len(),
        source,
        app.cached_count
    );

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(stats).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_empty_state(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.is_loading {
        "Loading shows..."
    } else {
        "Your shows are not showing. Get it?\n\nPress r to refresh."
    };

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_show_list(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .shows
        .iter()
        .map(|show| {
            let line = Line::from(vec![
                Span::styled(
                    format!("{:>3.1}★ ", show.average_rating),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(&show.title, Style::default().fg(Color::White)),
                Span::styled(
                    format!(" ({})", show.no_of_reviews),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(app.selected_index));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_left_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = if app.is_loading {
        "Loading shows..."
    } else {
        "j/k:nav  r:refresh  t:top rated  p:profile  ?:help  q:quit"
    };

    let paragraph = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_show_title(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .selected_show()
        .map(|s| s.title.as_str())
        .unwrap_or("No show selected");

    let block = Block::default()
        .title(" Show ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let paragraph = Paragraph::new(title)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_description(frame: &mut Frame, app: &App, area: Rect) {
    let content = app
        .selected_show()
        .map(|s| {
            if s.description.is_empty() {
                "No description.".to_string()
            } else {
                s.description.clone()
            }
        })
        .unwrap_or_default();

    let block = Block::default()
        .title(" Description ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_reviews(frame: &mut Frame, app: &App, area: Rect) {
    let reviews = app.visible_reviews();

    let lines: Vec<Line> = if app.is_loading_reviews {
        vec![Line::from("Loading reviews...")]
    } else if reviews.is_empty() {
        vec![Line::from("Press Enter to load reviews, w to write one.")]
    } else {
        reviews
            .iter()
            .flat_map(|review| {
                let stars = "★".repeat(review.rating.clamp(0, 5) as usize);
                let author = review.author_email().unwrap_or("anonymous");
                vec![
                    Line::from(vec![
                        Span::styled(format!("{stars:<5} "), Style::default().fg(Color::Yellow)),
                        Span::styled(author.to_string(), Style::default().fg(Color::Blue)),
                    ]),
                    Line::from(review.comment.clone()),
                    Line::from(""),
                ]
            })
            .collect()
    };

    let block = Block::default()
        .title(format!(" Reviews ({}) ", reviews.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_right_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, color) = match &app.status {
        Some(status) => (status.as_str(), Color::Red),
        None => ("Enter:reviews  w:write review  o:open image  e:empty state", Color::DarkGray),
    };

    let paragraph = Paragraph::new(text).style(Style::default().fg(color));
    frame.render_widget(paragraph, area);
}

fn render_profile(frame: &mut Frame, app: &App) {
    let area = centered_rect(50, 30, frame.area());

    let (email, image) = app
        .profile
        .as_ref()
        .map(|u| (u.email.as_str(), u.image_url.as_deref().unwrap_or("no avatar")))
        .unwrap_or(("user", "no avatar"));

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" {email}"),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(" Avatar: {image}")),
        Line::from(""),
        Line::from(" a: change avatar   l: log out   Esc: close"),
    ];

    let block = Block::default()
        .title(" Profile ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_logout_confirm(frame: &mut Frame) {
    let area = centered_rect(40, 20, frame.area());

    let block = Block::default()
        .title(" Are you sure? ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new("\n Log out of your account?\n\n y: confirm   n: cancel")
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn render_input(frame: &mut Frame, app: &App, mode: InputMode) {
    let area = centered_rect(60, 20, frame.area());

    let title = match mode {
        InputMode::AvatarPath => " Change avatar - path to image file ",
        InputMode::Review => " Write review - <rating 1-5> <comment> ",
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);

    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let input_text = format!("> {}_", app.input);
    let paragraph = Paragraph::new(input_text).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    let help_text = [
        "",
        " Navigation:",
        "   j / ↓    Move down",
        "   k / ↑    Move up",
        "   < / >    Top / bottom",
        "   Enter    Load reviews",
        "",
        " Actions:",
        "   r        Refresh shows",
        "   t        Toggle all / top rated",
        "   w        Write a review",
        "   o        Open show image",
        "   e        Toggle empty state",
        "   p        Profile (avatar, log out)",
        "",
        " General:",
        "   ?        Toggle this help",
        "   q        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
