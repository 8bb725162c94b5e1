use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode};
use crate::chat::{Sender, QUICK_QUESTIONS};
use crate::notify::NoticeLevel;

/// Split a line on `**bold**` markers into styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            // "****" has nothing to embolden
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after[2..];
            continue;
        }
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, disclaimer, footer
    let [header_area, body_area, disclaimer_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [sidebar_area, chat_area] = Layout::horizontal([
        Constraint::Length(32),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_quick_questions(app, frame, sidebar_area);
    render_chat(app, frame, chat_area);
    render_disclaimer(frame, disclaimer_area);
    render_footer(app, frame, footer_area);

    if app.show_attach_prompt {
        render_attach_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.is_busy() {
        Span::styled(" waiting for answer ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" ready ", Style::default().fg(Color::Green))
    };

    let title = Line::from(vec![
        Span::styled(" Arogya Mitra ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("(आरोग्य मित्र) ", Style::default().fg(Color::Gray)),
        status,
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_quick_questions(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);

    let focused = app.focus == FocusPane::QuickQuestions;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let busy = app.is_busy();

    let items: Vec<ListItem> = QUICK_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let text_style = if busy {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            let mut lines = vec![Line::from(vec![
                Span::styled(format!("F{} ", i + 1), Style::default().fg(Color::Yellow)),
                Span::styled(q.text, text_style),
            ])];
            if app.show_hindi {
                lines.push(Line::from(Span::styled(
                    format!("   {}", q.hindi),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Quick Questions "),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("> ");

    if focused {
        frame.render_stateful_widget(list, area, &mut app.quick_state);
    } else {
        frame.render_widget(list, area);
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let attachment_height = if app.exchange.attachment().is_some() { 1 } else { 0 };
    let [transcript_area, attachment_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(attachment_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas and inner size for hit-testing and scroll calculations
    app.transcript_area = Some(transcript_area);
    app.transcript_height = transcript_area.height.saturating_sub(2);
    app.transcript_width = transcript_area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Transcript;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.exchange.transcript().messages() {
        let time = msg.timestamp.format("%H:%M").to_string();
        let (label, color) = match msg.sender {
            Sender::User => ("You", Color::Cyan),
            Sender::Assistant => ("Arogya Mitra", Color::Yellow),
        };
        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(format!("  {time}"), Style::default().fg(Color::DarkGray)),
        ]));

        if msg.is_placeholder() {
            // Animated ellipsis: cycles through ".", "..", "..."
            let text = msg.text.trim_end_matches('.');
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("{text}{dots}"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        } else {
            match msg.sender {
                Sender::User => {
                    lines.extend(msg.text.lines().map(|l| Line::from(l.to_string())));
                }
                Sender::Assistant => {
                    lines.extend(msg.text.lines().map(parse_markdown_line));
                }
            }
        }
        lines.push(Line::default());
    }

    let transcript = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Chat "),
        )
        .wrap(Wrap { trim: true })
        .scroll((app.transcript_scroll, 0));
    frame.render_widget(transcript, transcript_area);

    if let Some(doc) = app.exchange.attachment() {
        let kib = doc.size().div_ceil(1024);
        let line = Line::from(vec![
            Span::styled(" PDF ", Style::default().bg(Color::Red).fg(Color::White)),
            Span::raw(format!(" {} ({kib} KiB)  ", doc.name())),
            Span::styled("x to remove", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), attachment_area);
    }

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing && !app.is_busy();
    let border_color = if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Input {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let draft = app.exchange.draft();
    let content = if app.is_busy() {
        Span::styled("Waiting for Arogya Mitra...", Style::default().fg(Color::DarkGray))
    } else if draft.is_empty() && !editing {
        Span::styled(
            "Ask about medical reports, symptoms, or health questions...",
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::raw(draft.to_string())
    };

    let input = Paragraph::new(Line::from(content)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(" Message "),
    );
    frame.render_widget(input, area);

    if editing {
        let before_cursor: String = draft.chars().take(app.input_cursor).collect();
        let x = area.x + 1 + Line::from(before_cursor).width() as u16;
        frame.set_cursor_position((x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn render_disclaimer(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        " General health information only. For emergencies, call 108. Always consult a qualified doctor.",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // A live notice takes over the footer
    if let Some(notice) = app.exchange.notices().latest() {
        let style = match notice.level {
            NoticeLevel::Info => Style::default().bg(Color::Blue).fg(Color::White),
            NoticeLevel::Error => Style::default().bg(Color::Red).fg(Color::White),
        };
        let footer = Paragraph::new(Line::from(Span::styled(format!(" {} ", notice.text), style)));
        frame.render_widget(footer, area);
        return;
    }

    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![Span::styled(mode_text, mode_style)];
    let pairs: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[
            (" Enter ", " send "),
            (" F1-F4 ", " quick "),
            (" ^O ", " attach PDF "),
            (" Esc ", " normal "),
        ],
        InputMode::Normal => &[
            (" i ", " type "),
            (" Tab ", " focus "),
            (" j/k ", " scroll "),
            (" F1-F4 ", " quick "),
            (" ^O ", " attach "),
            (" h ", " हिन्दी "),
            (" q ", " quit "),
        ],
    };
    for (k, label) in pairs {
        hints.push(Span::styled(*k, key_style));
        hints.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let [popup] = Layout::horizontal([Constraint::Percentage(60)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::vertical([Constraint::Length(5)])
        .flex(Flex::Center)
        .areas(popup);

    frame.render_widget(Clear, popup);

    let text = Text::from(vec![
        Line::from(app.attach_input.as_str()),
        Line::default(),
        Line::from(Span::styled(
            "Enter attach  Esc cancel  (PDF only)",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    let prompt = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Attach report: path to PDF "),
    );
    frame.render_widget(prompt, popup);

    let before_cursor: String = app.attach_input.chars().take(app.attach_cursor).collect();
    let x = popup.x + 1 + Line::from(before_cursor).width() as u16;
    frame.set_cursor_position((x.min(popup.right().saturating_sub(2)), popup.y + 1));
}
