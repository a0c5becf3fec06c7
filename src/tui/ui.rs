use crate::core::{Aggregate, CLIENT_COLUMN, FrequencyTable, SurveyError, filter};
use crate::format::{describe_predicate, truncate_label};
use crate::tui::app::{AppState, AppStep, Focus, TAB_TITLES};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, BorderType, Borders, Cell, Clear, List, ListItem,
        Paragraph, Row, Table, Tabs, Wrap,
        block::{Position, Title},
    },
};

const GOLD: Color = Color::Rgb(255, 215, 0);

/// Columns shown next to `Client` in the raw data tab.
const RAW_COLUMNS: usize = 6;

pub fn draw_ui(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // Title + Tabs
                Constraint::Min(5),    // Main Content
                Constraint::Length(3), // Status
                Constraint::Length(6), // Logs
            ]
            .as_ref(),
        )
        .split(f.size());

    draw_header_tabs(f, state, chunks[0]);

    if state.step == AppStep::Ready {
        match state.active_tab {
            0 => draw_question_explorer(f, state, chunks[1]),
            1 => draw_demographics(f, state, chunks[1]),
            2 => draw_raw_data(f, state, chunks[1]),
            3 => draw_export(f, state, chunks[1]),
            _ => {}
        }
    } else {
        draw_placeholder(f, state, chunks[1]);
    }

    draw_status(f, state, chunks[2]);
    draw_logs(f, state, chunks[3]);

    if state.show_help {
        draw_help_overlay(f);
    }
}

fn draw_header_tabs(f: &mut Frame, state: &AppState, area: Rect) {
    let titles: Vec<String> = TAB_TITLES
        .iter()
        .enumerate()
        .map(|(i, t)| format!(" [{}] {} ", i + 1, t))
        .collect();
    let title = if state.watching {
        "Survey Scope (watching)"
    } else {
        "Survey Scope"
    };
    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title(title))
        .select(state.active_tab)
        .style(Style::default().fg(Color::Cyan))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .fg(Color::Yellow),
        );
    f.render_widget(tabs, area);
}

fn draw_placeholder(f: &mut Frame, state: &AppState, area: Rect) {
    let text = match state.step {
        AppStep::Failed => vec![
            Line::from(Span::styled(
                "No survey data could be loaded.",
                Style::default().fg(Color::Red),
            )),
            Line::from(""),
            Line::from(format!(
                "Put .xlsx files with a '{}' sheet in {} and press 'r' to retry.",
                state.config().sheet_name,
                state.config().data_dir.display()
            )),
        ],
        _ => vec![Line::from("Loading survey data...")],
    };
    let p = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

/// Left column shared by the explorer and demographics tabs.
fn split_sidebar(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(area);
    (chunks[0], chunks[1])
}

fn bottom_title(text: String) -> Title<'static> {
    Title::from(text).position(Position::Bottom)
}

fn focus_border(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn draw_filter_panel(f: &mut Frame, state: &AppState, area: Rect) {
    let active = state.focus == Focus::Filters;
    let items: Vec<ListItem> = state
        .filters
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let value = choice.current().unwrap_or("-");
            let checkbox = if state.is_value_selected(&choice.column, value) {
                "[x]"
            } else {
                "[ ]"
            };
            let count = state
                .predicate
                .values_for(&choice.column)
                .map(|v| v.len())
                .unwrap_or(0);
            let line = format!(
                "{}: < {} > {} ({} selected)",
                truncate_label(&choice.column, 18),
                truncate_label(value, 24),
                checkbox,
                count
            );
            let style = if active && i == state.filter_index {
                Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else if count > 0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .border_style(focus_border(active))
            .title("Filters (f: focus, h/l: value, Space: toggle, c: clear)"),
    );
    f.render_widget(list, area);
}

fn draw_question_explorer(f: &mut Frame, state: &mut AppState, area: Rect) {
    let (sidebar, main) = split_sidebar(area);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(5),
                Constraint::Length(state.filters.len() as u16 + 2),
            ]
            .as_ref(),
        )
        .split(sidebar);

    let active = state.focus == Focus::Questions;
    let items: Vec<ListItem> = state
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            ListItem::new(format!("{:>3}. {}", i + 1, truncate_label(q, 60)))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Thick)
                .border_style(focus_border(active))
                .title(format!("Questions ({})", state.questions.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(30, 30, 30))
                .fg(GOLD)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, side[0], &mut state.question_state);
    draw_filter_panel(f, state, side[1]);

    let title = state
        .selected_question()
        .map(|q| truncate_label(q, 80))
        .unwrap_or_else(|| "No question selected".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .title(title);

    match &state.aggregate {
        Some(Ok(Aggregate::Frequencies(table))) => draw_frequencies(f, state, table, block, main),
        Some(Ok(Aggregate::Responses(list))) => {
            let items: Vec<ListItem> = if list.responses.is_empty() {
                vec![ListItem::new("No responses for the current filters.")]
            } else {
                list.responses
                    .iter()
                    .map(|r| ListItem::new(format!("- {}", r.replace('\n', " "))))
                    .collect()
            };
            let block = block.title(bottom_title(format!(
                "Free response: {} responses | {}",
                list.count(),
                filter_summary(state)
            )));
            f.render_widget(List::new(items).block(block), main);
        }
        Some(Err(e)) => {
            let p = Paragraph::new(Span::styled(e.as_str(), Style::default().fg(Color::Red)))
                .block(block);
            f.render_widget(p, main);
        }
        None => f.render_widget(Paragraph::new("Select a question").block(block), main),
    }
}

fn filter_summary(state: &AppState) -> String {
    format!(
        "Showing {} of {} responses | Filters: {}",
        state.matching,
        state.total,
        describe_predicate(&state.predicate)
    )
}

fn draw_frequencies(
    f: &mut Frame,
    state: &AppState,
    table: &FrequencyTable,
    block: Block,
    area: Rect,
) {
    let block = block.title(bottom_title(format!(
        "{} | {} respondents | {}",
        table.kind,
        table.respondents,
        filter_summary(state)
    )));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = match table.rows() {
        Ok(rows) => rows,
        Err(SurveyError::EmptyResult) => {
            f.render_widget(
                Paragraph::new("No responses match the current filters.")
                    .style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        }
        Err(e) => {
            f.render_widget(Paragraph::new(e.to_string()), inner);
            return;
        }
    };

    let shown = rows.len().min(state.config().top_n.max(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(shown as u16 * 2),
                Constraint::Min(3),
            ]
            .as_ref(),
        )
        .split(inner);

    let bars: Vec<Bar> = rows
        .iter()
        .take(shown)
        .map(|r| {
            Bar::default()
                .value(r.count as u64)
                .label(Line::from(truncate_label(&r.option, 24)))
                .text_value(format!("{} ({:.1}%)", r.count, r.percentage))
        })
        .collect();
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, chunks[0]);

    let table_rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(r.option.clone()),
                Cell::from(r.count.to_string()),
                Cell::from(format!("{:.1}%", r.percentage)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Percentage(70),
        Constraint::Percentage(12),
        Constraint::Percentage(18),
    ];
    let t = Table::new(table_rows, widths).header(
        Row::new(vec!["Option", "Count", "Percentage"])
            .style(Style::default().add_modifier(Modifier::BOLD).fg(GOLD)),
    );
    f.render_widget(t, chunks[1]);
}

fn draw_demographics(f: &mut Frame, state: &AppState, area: Rect) {
    let (sidebar, main) = split_sidebar(area);
    draw_filter_panel(f, state, sidebar);

    let mut lines: Vec<Line> = Vec::new();
    if state.demographics.is_empty() {
        lines.push(Line::from("No demographic columns found."));
    }
    for table in &state.demographics {
        lines.push(Line::from(Span::styled(
            table.question.clone(),
            Style::default().add_modifier(Modifier::BOLD).fg(GOLD),
        )));
        match table.rows() {
            Ok(rows) => {
                let max = rows.iter().map(|r| r.count).max().unwrap_or(1).max(1);
                for row in rows.iter().take(state.config().top_n) {
                    let filled = (row.count * 20).div_ceil(max);
                    lines.push(Line::from(vec![
                        Span::raw(format!("  {:<28} ", truncate_label(&row.option, 28))),
                        Span::styled("█".repeat(filled), Style::default().fg(Color::Cyan)),
                        Span::raw(format!(" {} ({:.1}%)", row.count, row.percentage)),
                    ]));
                }
            }
            Err(_) => lines.push(Line::from("  (no data)")),
        }
        lines.push(Line::from(Span::styled(
            format!(
                "  Unique values: {} | Responses: {}",
                table.options.len(),
                table.respondents
            ),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));
    }

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .title("Demographic Breakdown")
            .title(bottom_title(filter_summary(state))),
    );
    f.render_widget(p, main);
}

fn draw_raw_data(f: &mut Frame, state: &AppState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Thick)
        .title(format!(
            "Raw Data (rows {}-{} of {}, j/k to scroll)",
            (state.raw_offset + 1).min(state.matching),
            (state.raw_offset + area.height as usize).min(state.matching),
            state.matching
        ))
        .title(bottom_title(filter_summary(state)));

    let Ok(dataset) = state.session.dataset() else {
        f.render_widget(block, area);
        return;
    };
    let Ok(view) = filter(&dataset.table, &state.predicate) else {
        f.render_widget(block, area);
        return;
    };

    let columns: Vec<&String> = dataset
        .table
        .columns()
        .iter()
        .filter(|c| !state.config().is_excluded(c))
        .take(RAW_COLUMNS)
        .collect();
    let indices: Vec<Option<usize>> = columns
        .iter()
        .map(|c| dataset.table.column_index(c))
        .collect();

    let mut header = vec![Cell::from(CLIENT_COLUMN)];
    header.extend(columns.iter().map(|c| Cell::from(truncate_label(c, 24))));

    let visible = area.height.saturating_sub(3) as usize;
    let rows: Vec<Row> = view
        .rows()
        .skip(state.raw_offset)
        .take(visible)
        .map(|row| {
            let mut cells = vec![Cell::from(row.client.clone())];
            cells.extend(
                indices
                    .iter()
                    .map(|i| Cell::from(i.map(|i| row.cell(i)).unwrap_or("").to_string())),
            );
            Row::new(cells)
        })
        .collect();

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(14))
        .chain(columns.iter().map(|_| Constraint::Min(10)))
        .collect();
    let table = Table::new(rows, widths)
        .header(Row::new(header).style(Style::default().add_modifier(Modifier::BOLD).fg(GOLD)))
        .block(block);
    f.render_widget(table, area);
}

fn draw_export(f: &mut Frame, state: &AppState, area: Rect) {
    let mut lines = vec![
        Line::from(format!("Exports are written to {}", state.export_dir.display())),
        Line::from(filter_summary(state)),
        Line::from(""),
        Line::from(vec![
            Span::styled("  e ", Style::default().fg(GOLD)),
            Span::raw("Filtered responses (all columns, Client first)"),
        ]),
        Line::from(vec![
            Span::styled("  s ", Style::default().fg(GOLD)),
            Span::raw("Responses per client"),
        ]),
        Line::from(vec![
            Span::styled("  a ", Style::default().fg(GOLD)),
            Span::raw(format!(
                "Answers to the selected question ({})",
                state
                    .selected_question()
                    .map(|q| truncate_label(q, 50))
                    .unwrap_or_else(|| "none".to_string())
            )),
        ]),
        Line::from(""),
    ];
    if !state.exported.is_empty() {
        lines.push(Line::from(Span::styled(
            "Written this session:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for path in state.exported.iter().rev() {
            lines.push(Line::from(format!("  {}", path.display())));
        }
    }

    let p = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Thick)
            .title("Export CSV"),
    );
    f.render_widget(p, area);
}

fn draw_status(f: &mut Frame, state: &AppState, area: Rect) {
    let status_color = if state.status_message.contains("ERROR") {
        Color::Red
    } else if state.is_loading {
        Color::Yellow
    } else if state.step == AppStep::Ready {
        Color::Green
    } else {
        Color::Cyan
    };

    let status = Paragraph::new(Line::from(vec![Span::styled(
        state.status_message.as_str(),
        Style::default().fg(status_color),
    )]))
    .block(Block::default().borders(Borders::ALL).title("Status (? for help)"));
    f.render_widget(status, area);
}

fn draw_logs(f: &mut Frame, state: &AppState, area: Rect) {
    let logs: Vec<ListItem> = state
        .logs
        .iter()
        .rev()
        .map(|s| {
            let style = if s.starts_with("ERROR") {
                Style::default().fg(Color::Red)
            } else if s.starts_with("WARN") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(Span::styled(s.as_str(), style))
        })
        .collect();

    let list = List::new(logs).block(Block::default().borders(Borders::ALL).title("Logs"));
    f.render_widget(list, area);
}

fn draw_help_overlay(f: &mut Frame) {
    let block = Block::default().borders(Borders::ALL).title("Help");
    let area = centered_rect(60, 60, f.size());
    f.render_widget(Clear, area);

    let text = vec![
        Line::from("Survey Scope Help"),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  Tab or 1-4: Switch tab"),
        Line::from("  Arrows or j/k: Move through questions or filters"),
        Line::from("  f: Focus questions / filter panel"),
        Line::from(""),
        Line::from("Filters:"),
        Line::from("  Left/Right or h/l: Pick a value"),
        Line::from("  Space or Enter: Include or exclude the value"),
        Line::from("  c: Clear all filters"),
        Line::from(""),
        Line::from("Data:"),
        Line::from("  r: Reload the data folder"),
        Line::from("  e / s / a: Export on the Export tab"),
        Line::from(""),
        Line::from("General:"),
        Line::from("  q: Quit"),
        Line::from("  ?: Toggle Help"),
    ];

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1]);

    layout[1]
}
