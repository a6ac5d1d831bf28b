use crate::app::{App, AuthTab, Editor, InputMode, Screen};
use crate::identity::SignInStatus;
use crate::notify::Level;
use crate::todos::Filter;
use chrono::Local;
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length(r.height.saturating_sub(height).div_ceil(2)),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length(r.width.saturating_sub(width).div_ceil(2)),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn key_hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(key, Style::default().fg(Color::Red)),
        Span::raw(action),
    ]
}

fn get_legend(app: &App) -> Text<'static> {
    let hints: Vec<[Span<'static>; 2]> = match (app.input_mode, app.screen) {
        (InputMode::Insert, _) => vec![
            key_hint(" Tab ", ": Next Field "),
            key_hint(" Esc ", ": Stop Typing "),
        ],
        (InputMode::Editing, _) => vec![
            key_hint(" i ", ": Type "),
            key_hint(" Tab ", ": Next Field "),
            key_hint(" Enter ", ": Submit "),
            key_hint(" Esc ", ": Cancel "),
        ],
        (InputMode::Confirm, _) => vec![key_hint(" y ", ": Delete "), key_hint(" n ", ": Keep ")],
        (InputMode::Normal, Screen::Loading) => vec![key_hint(" q ", ": Quit ")],
        (InputMode::Normal, Screen::SignIn) => vec![
            key_hint(" q ", ": Quit "),
            key_hint(" 1/2/3 ", ": Login/Register/Google "),
            key_hint(" i ", ": Type "),
            key_hint(" Tab ", ": Next Field "),
            key_hint(" Enter ", ": Submit "),
        ],
        (InputMode::Normal, Screen::Dashboard) => vec![
            key_hint(" q ", ": Quit "),
            key_hint(" j/k ", ": Move "),
            key_hint(" a ", ": Add "),
            key_hint(" e ", ": Edit "),
            key_hint(" Space ", ": Toggle Done "),
            key_hint(" d ", ": Delete "),
            key_hint(" 1/2/3 ", ": Filter "),
            key_hint(" r ", ": Refresh "),
            key_hint(" L ", ": Logout "),
        ],
    };
    Text::from(Line::from(hints.into_iter().flatten().collect::<Vec<_>>()))
}

fn bold(label: &'static str) -> Span<'static> {
    Span::styled(label, Style::default().add_modifier(Modifier::BOLD))
}

fn field_line<'a>(label: &'static str, value: &'a str, focused: bool, secret: bool) -> Line<'a> {
    let style = if focused {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
    };
    let shown = if secret {
        Span::raw("*".repeat(value.chars().count()))
    } else {
        Span::raw(value)
    };
    Line::from(vec![
        Span::styled(if focused { ">> " } else { "   " }, style),
        Span::styled(label, style.add_modifier(Modifier::BOLD)),
        shown,
    ])
}

fn draw_loading(f: &mut Frame, area: Rect) {
    let area = centered_rect_absolute(30, 3, area);
    let paragraph = Paragraph::new("Restoring session...")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn draw_sign_in(f: &mut Frame, app: &App, area: Rect) {
    let area = centered_rect_absolute(64, 12, area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let selected = AuthTab::ALL
        .iter()
        .position(|t| *t == app.auth_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(AuthTab::ALL.iter().map(|t| t.label()))
        .block(Block::default().borders(Borders::ALL).title("Todo App"))
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, chunks[0]);

    let focus = |i: usize| app.active_field == i;
    let mut lines: Vec<Line> = match app.auth_tab {
        AuthTab::Login => vec![
            field_line("Email: ", &app.login_form.email, focus(0), false),
            field_line("Password: ", &app.login_form.password, focus(1), true),
        ],
        AuthTab::Register => vec![
            field_line("Name: ", &app.register_form.name, focus(0), false),
            field_line("Email: ", &app.register_form.email, focus(1), false),
            field_line("Password: ", &app.register_form.password, focus(2), true),
        ],
        AuthTab::Google => match &app.provider_status {
            SignInStatus::Ready => vec![
                Line::from("Paste the ID token issued by Google Sign-In."),
                field_line("Credential: ", &app.credential_input, true, true),
            ],
            SignInStatus::Failed(message) => vec![
                Line::from(Span::styled(
                    "Google Sign-In could not be loaded",
                    Style::default().fg(Color::Red),
                )),
                Line::from(message.as_str()),
            ],
            SignInStatus::Idle => vec![Line::from("Loading Google Sign-In...")],
            SignInStatus::NotConfigured => vec![
                Line::from(Span::styled(
                    "Google OAuth not configured",
                    Style::default().fg(Color::DarkGray),
                )),
                Line::from(Span::styled(
                    "Set GOOGLE_CLIENT_ID to enable Google Sign-In",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        },
    };
    if app.authenticating {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Signing in...",
            Style::default().fg(Color::Yellow),
        )));
    }

    let title = if app.input_mode == InputMode::Insert {
        "Typing (Esc to stop)"
    } else {
        "Sign in"
    };
    let form = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(form, chunks[1]);
}

fn draw_dashboard(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let counts = app.todos.counts();
    let greeting = app
        .session
        .user()
        .map(|u| format!("Welcome back, {}!", u.name))
        .unwrap_or_default();
    let filters = Tabs::new(
        Filter::ALL
            .iter()
            .map(|f| format!("{} ({})", f.label(), counts.for_filter(*f))),
    )
    .block(Block::default().borders(Borders::ALL).title(greeting))
    .select(
        Filter::ALL
            .iter()
            .position(|f| *f == app.todos.filter())
            .unwrap_or(0),
    )
    .highlight_style(
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(filters, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(chunks[1]);

    let list_title = format!("Todos ({})", app.todos.filter().label());
    let visible = app.todos.visible();
    let tasks_widget = if app.todos.is_loading() {
        List::new(vec![ListItem::new("Loading todos...")])
            .block(Block::default().borders(Borders::ALL).title(list_title))
    } else if visible.is_empty() {
        let empty = match app.todos.filter() {
            Filter::All => "No todos yet. Press a to create your first todo!".to_string(),
            other => format!("No {} todos", other.label().to_lowercase()),
        };
        List::new(vec![ListItem::new(empty)])
            .block(Block::default().borders(Borders::ALL).title(list_title))
    } else {
        let items: Vec<ListItem> = visible
            .iter()
            .map(|todo| {
                let mut content = Vec::new();
                if app.todos.is_pending(todo.id) {
                    content.push(Span::styled("… ", Style::default().fg(Color::Yellow)));
                }
                if todo.completed {
                    content.push(Span::styled("[x] ", Style::default().fg(Color::Green)));
                    content.push(Span::styled(
                        todo.title.as_str(),
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT),
                    ));
                } else {
                    content.push(Span::raw("[ ] "));
                    content.push(Span::raw(todo.title.as_str()));
                }
                ListItem::new(Line::from(content))
            })
            .collect();

        List::new(items)
            .block(Block::default().borders(Borders::ALL).title(list_title))
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ")
    };
    let selected = app.state.selected().and_then(|i| visible.get(i).copied());

    let detail_block = Block::default().borders(Borders::ALL).title("Todo Details");
    let detail = match selected {
        Some(todo) => {
            let fmt = "%b %e, %Y %H:%M";
            let mut lines = vec![
                Line::from(vec![bold("Title: "), Span::raw(todo.title.clone())]),
                Line::from(vec![
                    bold("Status: "),
                    Span::raw(if todo.completed { "Completed" } else { "Active" }),
                ]),
                Line::from(vec![
                    bold("Created: "),
                    Span::raw(todo.created_at.with_timezone(&Local).format(fmt).to_string()),
                ]),
            ];
            if todo.was_edited() {
                lines.push(Line::from(vec![
                    bold("Updated: "),
                    Span::raw(todo.updated_at.with_timezone(&Local).format(fmt).to_string()),
                ]));
            }
            lines.push(Line::from(bold("Description: ")));
            if todo.description.trim().is_empty() {
                lines.push(Line::from("No description"));
            } else {
                lines.extend(todo.description.lines().map(|l| Line::from(l.to_string())));
            }
            Paragraph::new(lines)
        }
        None => Paragraph::new("Select a todo to see its details"),
    };
    f.render_widget(detail.block(detail_block).wrap(Wrap { trim: true }), body[1]);
    f.render_stateful_widget(tasks_widget, body[0], &mut app.state);

    match app.input_mode {
        InputMode::Editing | InputMode::Insert => draw_editor(f, app, area),
        InputMode::Confirm => draw_confirm(f, app, area),
        InputMode::Normal => {}
    }
}

fn draw_editor(f: &mut Frame, app: &App, area: Rect) {
    let popup_width = ((u32::from(area.width) * 60 / 100) as u16)
        .saturating_sub(2)
        .max(10);
    let label_width = 13;
    let text_width = popup_width.saturating_sub(label_width).max(1);
    let required_height = calculate_wrapped_lines(&app.draft.title, text_width).max(1)
        + calculate_wrapped_lines(&app.draft.description, text_width).max(1);
    let popup_height = u16::try_from(required_height)
        .unwrap_or(u16::MAX)
        .saturating_add(2)
        .min(area.height.saturating_sub(2));
    let popup_area = centered_rect_absolute(popup_width + 2, popup_height, area);

    let title = match (app.editor, app.input_mode) {
        (_, InputMode::Insert) => "Typing (Esc to stop)",
        (Editor::Create, _) => "Create New Todo (Enter to Submit)",
        (Editor::Edit(_), _) => "Edit Todo (Enter to Save)",
    };
    let popup_block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Green));

    let lines = vec![
        field_line("Title: ", &app.draft.title, app.active_field == 0, false),
        field_line(
            "Description: ",
            &app.draft.description,
            app.active_field == 1,
            false,
        ),
    ];
    let input = Paragraph::new(lines)
        .style(Style::default().fg(Color::White))
        .block(popup_block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(input, popup_area);
}

fn draw_confirm(f: &mut Frame, app: &App, area: Rect) {
    let title = app
        .confirm_delete
        .and_then(|id| app.todos.get(id))
        .map(|t| t.title.as_str())
        .unwrap_or_default();
    let popup_area = centered_rect_absolute(50, 5, area);
    let prompt = Paragraph::new(vec![
        Line::from("Are you sure you want to delete this todo?"),
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD))),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Delete (y/n)")
            .style(Style::default().fg(Color::Red)),
    )
    .wrap(Wrap { trim: true });
    f.render_widget(Clear, popup_area);
    f.render_widget(prompt, popup_area);
}

fn draw_notifications(f: &mut Frame, app: &App, area: Rect) {
    if app.notifications.is_empty() {
        return;
    }
    let lines: Vec<Line> = app
        .notifications
        .iter()
        .map(|n| {
            let color = match n.level {
                Level::Success => Color::Green,
                Level::Error => Color::Red,
            };
            Line::from(Span::styled(n.message.as_str(), Style::default().fg(color)))
        })
        .collect();
    let height = lines.len() as u16 + 2;
    let width = area.width.min(50);
    let toast_area = Rect {
        x: area.x + area.width.saturating_sub(width),
        y: area.y,
        width,
        height: height.min(area.height),
    };
    f.render_widget(Clear, toast_area);
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true }),
        toast_area,
    );
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Split the main layout into body and footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(size);

    let body_chunk = chunks[0];
    let footer_chunk = chunks[1];

    match app.screen {
        Screen::Loading => draw_loading(f, body_chunk),
        Screen::SignIn => draw_sign_in(f, app, body_chunk),
        Screen::Dashboard => draw_dashboard(f, app, body_chunk),
    }
    draw_notifications(f, app, body_chunk);

    let legend = Paragraph::new(get_legend(app))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    f.render_widget(legend, footer_chunk);
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, &mut app))?;

        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_input(key) {
                    return Ok(());
                }
            }
        }

        app.drain_outcomes();
    }
}

fn calculate_wrapped_lines(text: &str, max_width: u16) -> usize {
    let max_width = usize::from(max_width.max(1));
    text.lines()
        .map(|line| line.chars().count().div_ceil(max_width))
        .sum()
}
