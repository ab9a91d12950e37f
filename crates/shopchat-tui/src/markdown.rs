//! Markdown to styled terminal lines.
//!
//! Handles the subset agents actually produce: paragraphs, headers, emphasis,
//! inline code, links, lists, blockquotes, rules, fenced code and GFM tables.
//! Pure: text in, lines out.

use std::sync::OnceLock;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use regex::Regex;

fn re_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").expect("header pattern compiles"))
}

fn re_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(`{3,}|~{3,})\s*([\w+#.-]*)\s*$").expect("fence pattern compiles")
    })
}

fn re_blockquote() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*>\s?(.*)$").expect("blockquote pattern compiles"))
}

fn re_unordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)([-*+])\s+(.*)$").expect("list pattern compiles"))
}

fn re_ordered_list() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)(\d+[.)])\s+(.*)$").expect("list pattern compiles"))
}

fn re_task_item() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[([ xX])\]\s+(.*)$").expect("task pattern compiles"))
}

fn re_horizontal_rule() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:-[\s-]*-[\s-]*-[\s-]*|\*[\s*]*\*[\s*]*\*[\s*]*|_[\s_]*_[\s_]*_[\s_]*)$")
            .expect("rule pattern compiles")
    })
}

fn re_table_delimiter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?\s*$")
            .expect("table delimiter pattern compiles")
    })
}

const RULE_WIDTH: usize = 40;
const BULLETS: [&str; 3] = ["•", "◦", "▪"];

fn code_style() -> Style {
    Style::default().fg(Color::Green)
}

fn border_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn header_style(level: usize) -> Style {
    let color = match level {
        1 => Color::Cyan,
        2 => Color::Green,
        3 => Color::Yellow,
        _ => Color::Magenta,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Render markdown text into lines ready for a `Paragraph`.
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<Line<'static>> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = re_fence().captures(line) {
            let marker = caps[1].to_string();
            let language = caps[2].to_string();
            i = render_code_block(&lines, i + 1, &marker, &language, &mut out);
            continue;
        }

        if is_table_start(&lines, i) {
            i = render_table(&lines, i, &mut out);
            continue;
        }

        out.push(render_line(line));
        i += 1;
    }

    out
}

/// Renders the fenced block body starting at `start` and returns the index
/// after the closing fence. An unclosed fence runs to the end of the text.
fn render_code_block(
    lines: &[&str],
    start: usize,
    marker: &str,
    language: &str,
    out: &mut Vec<Line<'static>>,
) -> usize {
    if !language.is_empty() {
        out.push(Line::from(Span::styled(
            format!("  {}", language),
            border_style().add_modifier(Modifier::ITALIC),
        )));
    }

    let fence_char = marker.chars().next().unwrap_or('`');
    let mut i = start;
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed.len() >= marker.len() && trimmed.chars().all(|c| c == fence_char) {
            return i + 1;
        }
        out.push(Line::from(vec![
            Span::styled("│ ", border_style()),
            Span::styled(lines[i].to_string(), code_style()),
        ]));
        i += 1;
    }
    i
}

fn render_line(line: &str) -> Line<'static> {
    if line.trim().is_empty() {
        return Line::default();
    }

    if let Some(caps) = re_header().captures(line) {
        let level = caps[1].len();
        let mut spans = Vec::new();
        parse_inline(&caps[2], header_style(level), &mut spans);
        return Line::from(spans);
    }

    // Before lists: `---` and `* * *` would match a bullet too
    if re_horizontal_rule().is_match(line) {
        return Line::from(Span::styled("─".repeat(RULE_WIDTH), border_style()));
    }

    if let Some(caps) = re_blockquote().captures(line) {
        let mut spans = vec![Span::styled("│ ", border_style())];
        parse_inline(
            &caps[1],
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            &mut spans,
        );
        return Line::from(spans);
    }

    if let Some(caps) = re_unordered_list().captures(line) {
        let level = indent_level(&caps[1]);
        let content = &caps[3];
        let mut spans = vec![Span::raw("  ".repeat(level))];

        if let Some(task) = re_task_item().captures(content) {
            let done = &task[1] != " ";
            spans.push(Span::styled(
                if done { "☑ " } else { "☐ " },
                Style::default().fg(Color::Cyan),
            ));
            parse_inline(&task[2], Style::default(), &mut spans);
        } else {
            spans.push(Span::styled(
                format!("{} ", BULLETS[level % BULLETS.len()]),
                Style::default().fg(Color::Cyan),
            ));
            parse_inline(content, Style::default(), &mut spans);
        }
        return Line::from(spans);
    }

    if let Some(caps) = re_ordered_list().captures(line) {
        let level = indent_level(&caps[1]);
        let mut spans = vec![
            Span::raw("  ".repeat(level)),
            Span::styled(format!("{} ", &caps[2]), Style::default().fg(Color::Cyan)),
        ];
        parse_inline(&caps[3], Style::default(), &mut spans);
        return Line::from(spans);
    }

    let mut spans = Vec::new();
    parse_inline(line, Style::default(), &mut spans);
    Line::from(spans)
}

fn indent_level(indent: &str) -> usize {
    let width: usize = indent.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum();
    width / 2
}

/// Append styled spans for `text`, layering emphasis on top of `base`.
fn parse_inline(text: &str, base: Style, spans: &mut Vec<Span<'static>>) {
    let chars: Vec<char> = text.chars().collect();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Inline code: no formatting inside
        if c == '`' {
            if let Some(end) = find_from(&chars, i + 1, &['`']) {
                if end > i + 1 {
                    flush(&mut plain, base, spans);
                    let code: String = chars[i + 1..end].iter().collect();
                    spans.push(Span::styled(code, base.patch(code_style())));
                    i = end + 1;
                    continue;
                }
            }
        }

        // Strong: ** or __
        if (c == '*' || c == '_') && chars.get(i + 1) == Some(&c) {
            let delim = [c, c];
            if let Some(end) = find_from(&chars, i + 2, &delim) {
                if end > i + 2 {
                    flush(&mut plain, base, spans);
                    let inner: String = chars[i + 2..end].iter().collect();
                    parse_inline(&inner, base.add_modifier(Modifier::BOLD), spans);
                    i = end + 2;
                    continue;
                }
            }
            plain.push(c);
            plain.push(c);
            i += 2;
            continue;
        }

        // Strikethrough
        if c == '~' && chars.get(i + 1) == Some(&'~') {
            if let Some(end) = find_from(&chars, i + 2, &['~', '~']) {
                if end > i + 2 {
                    flush(&mut plain, base, spans);
                    let inner: String = chars[i + 2..end].iter().collect();
                    parse_inline(&inner, base.add_modifier(Modifier::CROSSED_OUT), spans);
                    i = end + 2;
                    continue;
                }
            }
        }

        // Emphasis: * or _ (underscores only at word boundaries)
        if (c == '*' || c == '_') && opens_emphasis(&chars, i) {
            if let Some(end) = find_single_closer(&chars, i + 1, c) {
                flush(&mut plain, base, spans);
                let inner: String = chars[i + 1..end].iter().collect();
                parse_inline(&inner, base.add_modifier(Modifier::ITALIC), spans);
                i = end + 1;
                continue;
            }
        }

        // Link: [text](url)
        if c == '[' {
            if let Some((label_end, url_end)) = find_link(&chars, i) {
                flush(&mut plain, base, spans);
                let label: String = chars[i + 1..label_end].iter().collect();
                let url: String = chars[label_end + 2..url_end].iter().collect();
                parse_inline(
                    &label,
                    base.fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                    spans,
                );
                if url != label {
                    spans.push(Span::styled(format!(" ({})", url), border_style()));
                }
                i = url_end + 1;
                continue;
            }
        }

        plain.push(c);
        i += 1;
    }

    flush(&mut plain, base, spans);
}

fn flush(plain: &mut String, style: Style, spans: &mut Vec<Span<'static>>) {
    if !plain.is_empty() {
        spans.push(Span::styled(std::mem::take(plain), style));
    }
}

fn find_from(chars: &[char], start: usize, delim: &[char]) -> Option<usize> {
    if chars.len() < delim.len() {
        return None;
    }
    (start..=chars.len() - delim.len()).find(|&j| chars[j..j + delim.len()] == *delim)
}

fn opens_emphasis(chars: &[char], i: usize) -> bool {
    let next = match chars.get(i + 1) {
        Some(n) if !n.is_whitespace() => *n,
        _ => return false,
    };
    if next == chars[i] {
        return false;
    }
    if chars[i] == '_' {
        return i == 0 || !chars[i - 1].is_alphanumeric();
    }
    true
}

fn find_single_closer(chars: &[char], start: usize, delim: char) -> Option<usize> {
    (start..chars.len()).find(|&j| {
        chars[j] == delim
            && j > start
            && !chars[j - 1].is_whitespace()
            && chars[j - 1] != delim
            && chars.get(j + 1) != Some(&delim)
            && (delim != '_' || chars.get(j + 1).map_or(true, |n| !n.is_alphanumeric()))
    })
}

/// Returns `(index of ']', index of ')')` for a well-formed `[label](url)`.
fn find_link(chars: &[char], open: usize) -> Option<(usize, usize)> {
    let label_end = find_from(chars, open + 1, &[']'])?;
    if label_end == open + 1 || chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let url_end = find_from(chars, label_end + 2, &[')'])?;
    if url_end == label_end + 2 {
        return None;
    }
    Some((label_end, url_end))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Left,
    Center,
    Right,
}

fn is_table_start(lines: &[&str], i: usize) -> bool {
    lines[i].contains('|')
        && lines
            .get(i + 1)
            .is_some_and(|next| next.contains('-') && re_table_delimiter().is_match(next))
}

fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn parse_alignment(cell: &str) -> Alignment {
    match (cell.starts_with(':'), cell.ends_with(':')) {
        (true, true) => Alignment::Center,
        (false, true) => Alignment::Right,
        _ => Alignment::Left,
    }
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(Span::width).sum()
}

/// Renders a table starting at its header row and returns the index of the
/// first line after it.
fn render_table(lines: &[&str], start: usize, out: &mut Vec<Line<'static>>) -> usize {
    let header = split_row(lines[start]);
    let columns = header.len();
    let alignments: Vec<Alignment> = split_row(lines[start + 1])
        .iter()
        .map(|c| parse_alignment(c))
        .chain(std::iter::repeat(Alignment::Left))
        .take(columns)
        .collect();

    let mut rows = vec![header];
    let mut i = start + 2;
    while i < lines.len() && lines[i].contains('|') && !lines[i].trim().is_empty() {
        rows.push(split_row(lines[i]));
        i += 1;
    }

    // Every row gets exactly `columns` cells
    let rendered: Vec<Vec<Vec<Span<'static>>>> = rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            (0..columns)
                .map(|c| {
                    let base = if r == 0 {
                        Style::default().add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    let mut spans = Vec::new();
                    parse_inline(row.get(c).map(String::as_str).unwrap_or(""), base, &mut spans);
                    spans
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..columns)
        .map(|c| rendered.iter().map(|row| spans_width(&row[c])).max().unwrap_or(0).max(1))
        .collect();

    out.push(table_border(&widths, '┌', '┬', '┐'));
    for (r, row) in rendered.into_iter().enumerate() {
        let mut spans = vec![Span::styled("│", border_style())];
        for (c, cell) in row.into_iter().enumerate() {
            let padding = widths[c] - spans_width(&cell);
            let (left, right) = match alignments[c] {
                Alignment::Left => (0, padding),
                Alignment::Right => (padding, 0),
                Alignment::Center => (padding / 2, padding - padding / 2),
            };
            spans.push(Span::raw(" ".repeat(left + 1)));
            spans.extend(cell);
            spans.push(Span::raw(" ".repeat(right + 1)));
            spans.push(Span::styled("│", border_style()));
        }
        out.push(Line::from(spans));
        if r == 0 {
            out.push(table_border(&widths, '├', '┼', '┤'));
        }
    }
    out.push(table_border(&widths, '└', '┴', '┘'));

    i
}

fn table_border(widths: &[usize], left: char, middle: char, right: char) -> Line<'static> {
    let mut border = String::new();
    border.push(left);
    for (idx, width) in widths.iter().enumerate() {
        if idx > 0 {
            border.push(middle);
        }
        border.push_str(&"─".repeat(width + 2));
    }
    border.push(right);
    Line::from(Span::styled(border, border_style()))
}
