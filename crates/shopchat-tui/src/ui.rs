use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use shopchat_core::ChatRole;

use crate::app::{App, FocusPane};
use crate::markdown::render_markdown;

const TITLE: &str = " 🛍️ Shopify AI Agent ";
const STORE_PLACEHOLDER: &str = "Enter Shopify store URL";
const QUESTION_PLACEHOLDER: &str = "Ask a question...";

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, store field, chat log, question field, footer
    let [header_area, store_area, log_area, question_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    // Store areas for mouse hit-testing
    app.store_area = Some(store_area);
    app.log_area = Some(log_area);
    app.question_area = Some(question_area);

    render_header(app, frame, header_area);
    render_store_field(app, frame, store_area);
    render_log(app, frame, log_area);
    render_question_field(app, frame, question_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(TITLE, Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.endpoint().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// One-line text input with horizontal scrolling that keeps the cursor visible.
struct TextField<'a> {
    title: &'a str,
    value: &'a str,
    cursor: usize,
    placeholder: &'a str,
    focused: bool,
    disabled: bool,
}

fn render_text_field(field: TextField<'_>, frame: &mut Frame, area: Rect) {
    let border_color = if field.disabled {
        Color::DarkGray
    } else if field.focused {
        Color::Yellow
    } else {
        Color::Gray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(field.title);

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_field(field.value, field.cursor, inner_width);

    let paragraph = if field.value.is_empty() {
        Paragraph::new(Span::styled(
            field.placeholder,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else {
        let style = if field.disabled {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Cyan)
        };
        Paragraph::new(visible_text).style(style)
    };

    frame.render_widget(paragraph.block(block), area);

    if field.focused && !field.disabled {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Terminal columns taken by `c`; wide CJK and emoji take two.
fn char_width(c: char) -> usize {
    let mut buf = [0u8; 4];
    Span::raw(&*c.encode_utf8(&mut buf)).width()
}

/// Slice of `value` that fits in `width` columns with the cursor (a char
/// index) on screen, plus the cursor's column within that slice.
fn visible_field(value: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = value.chars().collect();
    let cursor = cursor.min(chars.len());

    // Drop leading chars until the cursor cell itself fits
    let mut start = 0;
    let mut before: usize = chars[..cursor].iter().map(|&c| char_width(c)).sum();
    while start < cursor && before >= width {
        before -= char_width(chars[start]);
        start += 1;
    }

    let mut used = 0;
    let visible: String = chars[start..]
        .iter()
        .take_while(|&&c| {
            used += char_width(c);
            used <= width
        })
        .collect();
    (visible, before.min(u16::MAX as usize) as u16)
}

fn render_store_field(app: &App, frame: &mut Frame, area: Rect) {
    let field = TextField {
        title: " Store ",
        value: app.session.store_url(),
        cursor: app.store_cursor,
        placeholder: STORE_PLACEHOLDER,
        focused: app.focus == FocusPane::Store,
        disabled: false,
    };
    render_text_field(field, frame, area);
}

fn render_question_field(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.session.is_busy();
    let field = TextField {
        title: if busy { " Ask (waiting for the agent) " } else { " Ask " },
        value: app.session.draft(),
        cursor: app.draft_cursor,
        placeholder: QUESTION_PLACEHOLDER,
        focused: app.focus == FocusPane::Question,
        disabled: busy,
    };
    render_text_field(field, frame, area);
}

/// Styled lines for the whole chat log, plus the thinking indicator while
/// a request is outstanding.
pub fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.session.messages() {
        let label_color = match msg.role {
            ChatRole::User => Color::Cyan,
            ChatRole::Agent => Color::Yellow,
        };
        lines.push(Line::from(Span::styled(
            format!("{}:", msg.role.label()),
            Style::default().fg(label_color).add_modifier(Modifier::BOLD),
        )));
        lines.extend(render_markdown(&msg.text));
        lines.push(Line::default());
    }

    if app.session.is_busy() {
        lines.push(Line::from(Span::styled(
            format!("🤖 {}", app.thinking_indicator()),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_log(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Log;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Chat ({}) ", app.session.messages().len()));

    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let text = if app.session.messages().is_empty() && !app.session.is_busy() {
        Text::from(Span::styled(
            "Enter a store URL above, then ask the agent about orders, products or customers.",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(chat_lines(app))
    };

    // Measured with the same word wrapping the widget draws with
    let log = Paragraph::new(text).wrap(Wrap { trim: false });
    let total = log.line_count(inner_width).min(u16::MAX as usize) as u16;
    app.log_max_scroll = total.saturating_sub(inner_height);
    app.log_scroll = if app.follow_log {
        app.log_max_scroll
    } else {
        app.log_scroll.min(app.log_max_scroll)
    };
    app.log_height = inner_height;

    frame.render_widget(log.block(block).scroll((app.log_scroll, 0)), area);

    if app.log_max_scroll > 0 {
        let mut scrollbar_state = ScrollbarState::new(app.log_max_scroll as usize)
            .position(app.log_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar_state,
        );
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = if app.session.is_busy() {
        (" BUSY ", Style::default().bg(Color::Magenta).fg(Color::White))
    } else {
        match app.focus {
            FocusPane::Log => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
            _ => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
        }
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.focus {
        FocusPane::Store => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" to question ", label_style),
        ],
        FocusPane::Question if app.session.can_submit() => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
        ],
        FocusPane::Question => vec![],
        FocusPane::Log => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" ask ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    hints.extend(vec![
        Span::styled(" Tab ", key_style),
        Span::styled(" focus ", label_style),
    ]);
    if app.focus != FocusPane::Log {
        hints.extend(vec![
            Span::styled(" Esc ", key_style),
            Span::styled(" chat ", label_style),
        ]);
    }

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
