use crate::model::{EntityResult, IfcResult, SpecificationResult, Status, ValidationReport};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{DefaultTerminal, Frame};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum View {
    Dashboard,
    EntityDetail,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusPanel {
    Files,
    Specifications,
    Entities,
}

/// One (IDS, IFC) pair of the report, in report order.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePair<'a> {
    pub ids_name: &'a str,
    pub ifc: &'a IfcResult,
}

pub struct App {
    pub report: ValidationReport,
    pub view: View,
    pub focus_panel: FocusPanel,
    pub selected_pair: usize,
    pub selected_spec: usize,
    pub selected_entity: usize,
    pub failures_only: bool,
    pub validation_scroll_offset: usize,
    pub should_quit: bool,
}

impl App {
    #[must_use]
    pub fn new(report: ValidationReport) -> Self {
        Self {
            report,
            view: View::Dashboard,
            focus_panel: FocusPanel::Specifications,
            selected_pair: 0,
            selected_spec: 0,
            selected_entity: 0,
            failures_only: false,
            validation_scroll_offset: 0,
            should_quit: false,
        }
    }

    pub fn run(mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|frame| self.draw(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        match self.view {
            View::Dashboard => super::dashboard::draw_dashboard(frame, self),
            View::EntityDetail => super::dashboard::draw_entity_detail(frame, self),
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                return Ok(());
            }
            self.handle_key(key.code);
        }
        Ok(())
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match self.view {
            View::Dashboard => self.handle_dashboard_keys(code),
            View::EntityDetail => self.handle_detail_keys(code),
        }
    }

    fn handle_dashboard_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.navigate_up(),
            KeyCode::Down | KeyCode::Char('j') => self.navigate_down(),
            KeyCode::Left | KeyCode::Char('h') => self.navigate_left(),
            KeyCode::Right | KeyCode::Char('l') => self.navigate_right(),
            KeyCode::Char('f') => self.toggle_failures_only(),
            KeyCode::Enter => self.enter_entity_detail(),
            _ => {}
        }
    }

    fn handle_detail_keys(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace => {
                self.view = View::Dashboard;
                self.validation_scroll_offset = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll_validations_up(),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_validations_down(),
            KeyCode::Left | KeyCode::Char('h') => self.previous_entity_in_detail(),
            KeyCode::Right | KeyCode::Char('l') => self.next_entity_in_detail(),
            _ => {}
        }
    }

    fn navigate_up(&mut self) {
        match self.focus_panel {
            FocusPanel::Files => {
                if self.selected_pair > 0 {
                    self.selected_pair -= 1;
                    self.reset_spec();
                }
            }
            FocusPanel::Specifications => {
                if self.selected_spec > 0 {
                    self.selected_spec -= 1;
                    self.selected_entity = 0;
                }
            }
            FocusPanel::Entities => self.selected_entity = self.selected_entity.saturating_sub(1),
        }
    }

    fn navigate_down(&mut self) {
        match self.focus_panel {
            FocusPanel::Files => {
                if self.selected_pair < self.pairs().len().saturating_sub(1) {
                    self.selected_pair += 1;
                    self.reset_spec();
                }
            }
            FocusPanel::Specifications => {
                let count = self.selected_pair_ref().map_or(0, |p| p.ifc.specification_results.len());
                if self.selected_spec < count.saturating_sub(1) {
                    self.selected_spec += 1;
                    self.selected_entity = 0;
                }
            }
            FocusPanel::Entities => {
                if self.selected_entity < self.filtered_entities().len().saturating_sub(1) {
                    self.selected_entity += 1;
                }
            }
        }
    }

    fn navigate_left(&mut self) {
        match self.focus_panel {
            FocusPanel::Entities => self.focus_panel = FocusPanel::Specifications,
            FocusPanel::Specifications => self.focus_panel = FocusPanel::Files,
            FocusPanel::Files => {}
        }
    }

    fn navigate_right(&mut self) {
        match self.focus_panel {
            FocusPanel::Files => self.focus_panel = FocusPanel::Specifications,
            FocusPanel::Specifications => self.focus_panel = FocusPanel::Entities,
            FocusPanel::Entities => {}
        }
    }

    fn reset_spec(&mut self) {
        self.selected_spec = 0;
        self.selected_entity = 0;
    }

    fn toggle_failures_only(&mut self) {
        self.failures_only = !self.failures_only;
        self.selected_entity = 0;
    }

    fn enter_entity_detail(&mut self) {
        // Only the entity table opens a detail view
        if self.focus_panel == FocusPanel::Entities && self.selected_entity_result().is_some() {
            self.view = View::EntityDetail;
            self.validation_scroll_offset = 0;
        }
    }

    fn scroll_validations_up(&mut self) {
        self.validation_scroll_offset = self.validation_scroll_offset.saturating_sub(1);
    }

    fn scroll_validations_down(&mut self) {
        let max = self
            .selected_entity_result()
            .map_or(0, |e| e.validations.len().saturating_sub(1));
        if self.validation_scroll_offset < max {
            self.validation_scroll_offset += 1;
        }
    }

    /// Previous entity in the detail view, wrapping around.
    fn previous_entity_in_detail(&mut self) {
        let count = self.filtered_entities().len();
        if count == 0 {
            return;
        }
        self.selected_entity = if self.selected_entity > 0 {
            self.selected_entity - 1
        } else {
            count - 1
        };
        self.validation_scroll_offset = 0;
    }

    /// Next entity in the detail view, wrapping around.
    fn next_entity_in_detail(&mut self) {
        let count = self.filtered_entities().len();
        if count == 0 {
            return;
        }
        self.selected_entity = (self.selected_entity + 1) % count;
        self.validation_scroll_offset = 0;
    }

    /// All (IDS, IFC) pairs of the report.
    #[must_use]
    pub fn pairs(&self) -> Vec<FilePair<'_>> {
        self.report
            .ids_results
            .iter()
            .flat_map(|ids| {
                ids.ifc_results.iter().map(|ifc| FilePair {
                    ids_name: &ids.ids_name,
                    ifc,
                })
            })
            .collect()
    }

    #[must_use]
    pub fn selected_pair_ref(&self) -> Option<FilePair<'_>> {
        self.pairs().into_iter().nth(self.selected_pair)
    }

    #[must_use]
    pub fn selected_spec_result(&self) -> Option<&SpecificationResult> {
        let pair = self.selected_pair_ref()?;
        pair.ifc.specification_results.get(self.selected_spec)
    }

    /// Entity results of the selected specification, failures only when
    /// the filter is on.
    #[must_use]
    pub fn filtered_entities(&self) -> Vec<&EntityResult> {
        let Some(spec) = self.selected_spec_result() else {
            return Vec::new();
        };
        spec.entity_results
            .iter()
            .filter(|e| !self.failures_only || e.status == Status::Fail)
            .collect()
    }

    #[must_use]
    pub fn selected_entity_result(&self) -> Option<&EntityResult> {
        self.filtered_entities().get(self.selected_entity).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Entity, EntityResult, FacetKind, FacetValidation, IdsResult, IfcResult, SpecificationResult,
    };
    use pretty_assertions::assert_eq;

    fn entity_result(guid: &str, pass: bool) -> EntityResult {
        let entity = Entity::new(1, guid.into(), "IFCWALL".into(), "a.ifc".into());
        let validation = if pass {
            FacetValidation::pass(FacetKind::Attribute, "Name", "Value: \"x\"")
        } else {
            FacetValidation::fail(FacetKind::Attribute, "Name", "Attribute not found")
        };
        EntityResult::new(&entity, "Walls", vec![validation])
    }

    fn report() -> ValidationReport {
        let spec = SpecificationResult::from_entity_results(
            "Walls",
            vec![entity_result("A", true), entity_result("B", false), entity_result("C", false)],
        )
        .unwrap();
        let ifc = |name: &str| IfcResult {
            file_name: name.into(),
            entity_count: 3,
            specification_results: vec![spec.clone()],
        };
        ValidationReport {
            ids_results: vec![IdsResult {
                ids_name: "rules.ids".into(),
                ifc_results: vec![ifc("a.ifc"), ifc("b.ifc")],
            }],
            aborted: false,
        }
    }

    fn guids(app: &App) -> Vec<String> {
        app.filtered_entities().iter().map(|e| e.guid.clone()).collect()
    }

    #[test]
    fn pairs_flatten_report_order() {
        let app = App::new(report());
        let names: Vec<&str> = app.pairs().iter().map(|p| p.ifc.file_name.as_str()).collect();
        assert_eq!(names, ["a.ifc", "b.ifc"]);
    }

    #[test]
    fn failure_filter_resets_selection() {
        let mut app = App::new(report());
        app.focus_panel = FocusPanel::Entities;
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected_entity, 1);

        app.handle_key(KeyCode::Char('f'));
        assert_eq!(app.selected_entity, 0);
        assert_eq!(guids(&app), ["B", "C"]);
    }

    #[test]
    fn detail_view_wraps_between_entities() {
        let mut app = App::new(report());
        app.focus_panel = FocusPanel::Entities;
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.view, View::EntityDetail);

        app.handle_key(KeyCode::Left);
        assert_eq!(app.selected_entity_result().unwrap().guid, "C");
        app.handle_key(KeyCode::Right);
        assert_eq!(app.selected_entity_result().unwrap().guid, "A");

        app.handle_key(KeyCode::Esc);
        assert_eq!(app.view, View::Dashboard);
        assert!(!app.should_quit);
    }

    #[test]
    fn enter_outside_entity_panel_stays_on_dashboard() {
        let mut app = App::new(report());
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.view, View::Dashboard);

        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected_pair, 1);
        app.handle_key(KeyCode::Down);
        assert_eq!(app.selected_pair, 1);
    }

    #[test]
    fn empty_report_is_navigable() {
        let mut app = App::new(ValidationReport::default());
        for code in [KeyCode::Down, KeyCode::Right, KeyCode::Down, KeyCode::Enter] {
            app.handle_key(code);
        }
        assert_eq!(app.view, View::Dashboard);
        assert!(app.selected_entity_result().is_none());
    }
}
