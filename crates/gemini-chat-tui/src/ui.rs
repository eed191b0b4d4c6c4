use gemini_chat_core::{Speaker, Transcript};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Screen};

const USER_LABEL: &str = "Você:";
const MODEL_LABEL: &str = "Gemini:";

/// Style `**bold**` runs in a reply line. Unclosed or empty runs stay literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        match after.find("**") {
            Some(0) => {
                plain.push_str(&rest[..open + 4]);
                rest = &after[2..];
            }
            Some(close) => {
                plain.push_str(&rest[..open]);
                if !plain.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut plain)));
                }
                spans.push(Span::styled(after[..close].to_string(), bold));
                rest = &after[close + 2..];
            }
            None => break,
        }
    }

    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }
    Line::from(spans)
}

/// Split turn text into lines, keeping empty text as one blank line.
fn text_lines(text: &str) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        vec![""]
    } else {
        lines
    }
}

/// Project the transcript into styled lines.
///
/// Turn text is only ever placed in spans, so nothing a user or the model
/// writes can change the layout beyond `**bold**` in model replies.
pub fn transcript_lines(
    transcript: &Transcript,
    pending: bool,
    animation_frame: u8,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for turn in transcript {
        match turn.speaker {
            Speaker::User => {
                lines.push(Line::from(Span::styled(
                    USER_LABEL,
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in text_lines(&turn.text) {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Speaker::Model => {
                lines.push(Line::from(Span::styled(
                    MODEL_LABEL,
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in text_lines(&turn.text) {
                    lines.push(parse_markdown_line(line));
                }
            }
            Speaker::SystemError => {
                for line in text_lines(&turn.text) {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(Color::Red),
                    )));
                }
            }
        }
        lines.push(Line::default());
    }

    if pending {
        lines.push(Line::from(Span::styled(
            MODEL_LABEL,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize % 3) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_chat(app, frame, body_area);
    render_footer(app, frame, footer_area);

    if app.screen == Screen::ApiKey {
        render_api_key_input(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Gemini Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Gemini: {} ", app.model_name()));

    let lines = transcript_lines(
        app.session.transcript(),
        app.session.is_pending(),
        app.animation_frame,
    );
    let inner = chat_block.inner(chat_area);

    let chat_text = if lines.is_empty() {
        Text::from(Span::styled(
            "Type a message and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text).wrap(Wrap { trim: false });

    // Rows as the paragraph word-wraps them; keep the scroll inside that and
    // stick to the bottom when following
    let rows = chat.line_count(inner.width).min(u16::MAX as usize) as u16;
    let max_scroll = rows.saturating_sub(inner.height);
    if app.follow_bottom || app.scroll >= max_scroll {
        app.scroll = max_scroll;
        app.follow_bottom = true;
    }

    let chat = chat.block(chat_block).scroll((app.scroll, 0));
    frame.render_widget(chat, chat_area);

    let input_title = if app.session.is_pending() {
        " Message (waiting for reply) "
    } else {
        " Message "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(input_title);
    let input_inner = input_block.inner(input_area);

    // Scroll the input horizontally so the cursor stays visible
    let visible = input_inner.width.max(1) as usize;
    let cursor = app.session.cursor();
    let offset = cursor.saturating_sub(visible - 1);
    let shown: String = app.session.input().chars().skip(offset).take(visible).collect();

    frame.render_widget(Paragraph::new(shown).block(input_block), input_area);

    if app.screen == Screen::Chat {
        let cursor_x = (cursor - offset) as u16;
        frame.set_cursor_position((input_inner.x + cursor_x, input_inner.y));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.screen {
        Screen::ApiKey => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" connect ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ],
        Screen::Chat => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" ↑↓ PgUp PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7;

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height.min(area.height));

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Enter Gemini API Key ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    if inner.height < 5 {
        return;
    }

    let instructions =
        Paragraph::new("Paste your API key below. Press Enter to connect, Esc to quit.")
            .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    // Never draw the key itself
    let key_len = app.api_key_input.chars().count();
    let masked = "*".repeat(key_len.min(inner.width as usize));
    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let masked_input = Paragraph::new(masked.clone()).style(Style::default().fg(Color::Cyan));
    frame.render_widget(masked_input, input_area);
    frame.set_cursor_position((input_area.x + masked.chars().count() as u16, input_area.y));

    let status = match &app.api_key_error {
        Some(err) => Paragraph::new(err.as_str()).style(Style::default().fg(Color::Red)),
        None => Paragraph::new(format!("{} characters", key_len))
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}
