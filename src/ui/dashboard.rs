use crate::model::Status;
use crate::ui::app::{App, FocusPanel};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Row, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Table,
    },
    Frame,
};

// Brandbook colors
const BRAND_DARK: Color = Color::Rgb(0x1F, 0x2F, 0x3C);
const BRAND_SELECT_BG: Color = Color::Rgb(0xC3, 0xD3, 0xE0);
const BRAND_GREEN: Color = Color::Rgb(0x82, 0x9A, 0x68);
const BRAND_RED: Color = Color::Rgb(0xA8, 0x4A, 0x3E);
const BRAND_ORANGE: Color = Color::Rgb(0x9E, 0x68, 0x3C);
const BRAND_MUTED: Color = Color::Rgb(0x71, 0x65, 0x65);

// Styles
const HEADER_STYLE: Style = Style::new().fg(BRAND_DARK).add_modifier(Modifier::BOLD);
const SELECTED_STYLE: Style = Style::new()
    .bg(BRAND_SELECT_BG)
    .fg(BRAND_DARK)
    .add_modifier(Modifier::BOLD);

fn status_style(status: Status) -> Style {
    match status {
        Status::Pass => Style::default().fg(BRAND_GREEN),
        Status::Fail => Style::default().fg(BRAND_RED),
    }
}

fn row_style(is_selected: bool, is_focused: bool) -> Style {
    if is_selected && is_focused {
        SELECTED_STYLE
    } else if is_selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}

fn panel_block(title: String, is_focused: bool) -> Block<'static> {
    let border_style = if is_focused {
        Style::default().fg(BRAND_ORANGE)
    } else {
        Style::default()
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// First row shown so that `selected` stays inside `visible` rows.
fn scroll_offset(selected: usize, visible: usize) -> usize {
    if selected >= visible {
        selected - visible + 1
    } else {
        0
    }
}

fn draw_scrollbar(frame: &mut Frame, area: Rect, len: usize, position: usize) {
    if area.height < 4 {
        return;
    }
    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"));
    let mut scrollbar_state = ScrollbarState::new(len).position(position);

    let scrollbar_area = Rect {
        x: area.x + area.width - 1,
        y: area.y + 2,
        width: 1,
        height: area.height - 3,
    };
    frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
}

pub fn draw_dashboard(frame: &mut Frame, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3), // Header
        Constraint::Min(10),   // Main content
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    draw_header(frame, chunks[0], app);
    draw_main_content(frame, chunks[1], app);
    draw_footer(
        frame,
        chunks[2],
        " ←→ Panel | ↑↓ Select | f Failures only | Enter Details | q Quit ",
    );
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
    let summary = app.report.summary();
    let mut spans = vec![
        Span::styled(" IDS Inspector | ", HEADER_STYLE),
        Span::styled(format!("{} entities | ", summary.total), HEADER_STYLE),
        Span::styled(format!("{} passed", summary.passed), status_style(Status::Pass)),
        Span::raw(" | "),
        Span::styled(format!("{} failed", summary.failed), status_style(Status::Fail)),
        Span::styled(format!(" | {:.1}% ", summary.pass_rate()), HEADER_STYLE),
    ];
    if app.report.aborted {
        spans.push(Span::styled(" ABORTED ", Style::default().fg(BRAND_ORANGE)));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_main_content(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::horizontal([
        Constraint::Percentage(22), // Files
        Constraint::Percentage(30), // Specifications
        Constraint::Percentage(48), // Entities
    ])
    .split(area);

    draw_files(frame, chunks[0], app);
    draw_specifications(frame, chunks[1], app);
    draw_entities(frame, chunks[2], app);
}

fn draw_files(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Files;
    let pairs = app.pairs();

    let items: Vec<ListItem> = pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            let summary = pair.ifc.summary();
            let rate_style = status_style(Status::from_pass(summary.failed == 0));
            let marker = if i == app.selected_pair && is_focused {
                " ◄"
            } else {
                ""
            };
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(&pair.ifc.file_name, row_style(i == app.selected_pair, is_focused)),
                    Span::styled(marker, Style::default().fg(BRAND_ORANGE)),
                ]),
                Line::from(vec![
                    Span::styled(format!("  {} ", pair.ids_name), Style::default().fg(BRAND_MUTED)),
                    Span::styled(format!("{:.0}%", summary.pass_rate()), rate_style),
                ]),
            ])
        })
        .collect();

    let list = List::new(items).block(panel_block(format!(" Files ({}) ", pairs.len()), is_focused));
    frame.render_widget(list, area);
}

fn draw_specifications(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Specifications;
    let specs = app
        .selected_pair_ref()
        .map(|p| p.ifc.specification_results.as_slice())
        .unwrap_or_default();

    let visible_rows = (area.height as usize).saturating_sub(3);
    let offset = scroll_offset(app.selected_spec, visible_rows);

    let header = Row::new(vec!["Specification", "Pass", "Fail"])
        .style(HEADER_STYLE)
        .height(1);

    let rows: Vec<Row> = specs
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(i, spec)| {
            let style = if i == app.selected_spec {
                row_style(true, is_focused)
            } else {
                status_style(spec.status)
            };
            Row::new(vec![
                spec.specification.clone(),
                spec.pass_count.to_string(),
                spec.fail_count.to_string(),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Percentage(64),
        Constraint::Percentage(18),
        Constraint::Percentage(18),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(panel_block(format!(" Specifications ({}) ", specs.len()), is_focused));
    frame.render_widget(table, area);

    if specs.len() > visible_rows {
        draw_scrollbar(frame, area, specs.len(), app.selected_spec);
    }
}

fn draw_entities(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus_panel == FocusPanel::Entities;
    let entities = app.filtered_entities();

    let visible_rows = (area.height as usize).saturating_sub(3);
    let offset = scroll_offset(app.selected_entity, visible_rows);

    let header = Row::new(vec!["Status", "Type", "Name", "GlobalId"])
        .style(HEADER_STYLE)
        .height(1);

    let rows: Vec<Row> = entities
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(i, e)| {
            let style = if i == app.selected_entity {
                row_style(true, is_focused)
            } else {
                status_style(e.status)
            };
            Row::new(vec![
                e.status.as_str().to_uppercase(),
                e.entity_type.clone(),
                e.name.clone(),
                e.guid.clone(),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(26),
        Constraint::Percentage(34),
        Constraint::Percentage(30),
    ];

    let filter = if app.failures_only { ", failures" } else { "" };
    let title = format!(" Entities ({}{filter}) ", entities.len());
    let table = Table::new(rows, widths)
        .header(header)
        .block(panel_block(title, is_focused));
    frame.render_widget(table, area);

    if entities.len() > visible_rows {
        draw_scrollbar(frame, area, entities.len(), app.selected_entity);
    }
}

fn draw_footer(frame: &mut Frame, area: Rect, help: &str) {
    let footer = Paragraph::new(help)
        .style(Style::default().fg(BRAND_MUTED))
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}

pub fn draw_entity_detail(frame: &mut Frame, app: &App) {
    let Some(entity) = app.selected_entity_result() else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(3), // Header: entity
        Constraint::Length(3), // Info: type | file | specification | position
        Constraint::Min(6),    // Facet validations (scrollable)
        Constraint::Length(3), // Footer
    ])
    .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {} ", entity.name), HEADER_STYLE),
        Span::styled(entity.status.as_str().to_uppercase(), status_style(entity.status)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let info_text = format!(
        "{}  |  {}  |  Spec: {}  |  Entity: {}/{}  |  GlobalId: {}",
        entity.entity_type,
        entity.file_name,
        entity.specification,
        app.selected_entity + 1,
        app.filtered_entities().len(),
        entity.guid
    );
    let info_widget = Paragraph::new(info_text).block(Block::default().borders(Borders::ALL));
    frame.render_widget(info_widget, chunks[1]);

    let validations = &entity.validations;
    let visible = (chunks[2].height as usize).saturating_sub(3);

    let rows: Vec<Row> = validations
        .iter()
        .skip(app.validation_scroll_offset)
        .take(visible)
        .map(|v| {
            Row::new(vec![
                v.status.as_str().to_uppercase(),
                v.facet_type.element_name().to_string(),
                v.message.clone(),
                v.details.clone(),
            ])
            .style(status_style(v.status))
        })
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Length(15),
        Constraint::Percentage(40),
        Constraint::Percentage(45),
    ];
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["Status", "Facet", "Requirement", "Details"]).style(HEADER_STYLE))
        .block(
            Block::default()
                .title(format!(" Requirements ({}) ", validations.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, chunks[2]);

    if validations.len() > visible {
        draw_scrollbar(frame, chunks[2], validations.len(), app.validation_scroll_offset);
    }

    draw_footer(
        frame,
        chunks[3],
        " Esc Back | ↑↓ Scroll | ←→ Entity | q Quit ",
    );
}
