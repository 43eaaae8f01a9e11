//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Course URL -> curricula -> years -> date range -> fetch -> optional CSV export.

use crate::adapters::ui::{progress, summary};
use crate::domain::filters::unique_groups;
use crate::domain::{Curriculum, DomainError};
use crate::ports::InputPort;
use crate::usecases::session_service::{SessionRequest, SessionService};
use async_trait::async_trait;
use inquire::ui::{Color, RenderConfig, StyleSheet, Styled};
use inquire::{Confirm, MultiSelect, Select, Text};
use std::path::PathBuf;
use std::sync::Arc;

const ALL_GROUPS: &str = "All groups";
const DEFAULT_EXPORT_PATH: &str = "timetable.csv";

/// Applies the prompt theme for all subsequent inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("?").with_fg(Color::LightYellow))
        .with_highlighted_option_prefix(Styled::new(">").with_fg(Color::LightCyan))
        .with_answer(StyleSheet::new().with_fg(Color::LightCyan));
    inquire::set_global_render_config(config);
}

fn ui_error(e: inquire::InquireError) -> DomainError {
    DomainError::Ui(e.to_string())
}

/// TUI adapter. Prompts are pre-filled from `defaults`.
pub struct TuiInputPort {
    session: Arc<SessionService>,
    defaults: SessionRequest,
    max_year: u32,
}

impl TuiInputPort {
    pub fn new(session: Arc<SessionService>, defaults: SessionRequest, max_year: u32) -> Self {
        Self {
            session,
            defaults,
            max_year,
        }
    }

    fn prompt_course(&self) -> Result<String, DomainError> {
        let mut prompt = Text::new("Course site URL:")
            .with_help_message("e.g. https://corsi.unibo.it/laurea/Informatica");
        if !self.defaults.course_site_url.is_empty() {
            prompt = prompt.with_default(&self.defaults.course_site_url);
        }
        let url = prompt.prompt().map_err(ui_error)?;
        Ok(url.trim().trim_end_matches('/').to_string())
    }

    async fn prompt_curricula(&self, course_site_url: &str) -> Result<Vec<Curriculum>, DomainError> {
        let pb = progress::spinner("Loading curricula");
        let available = self.session.available_curricula(course_site_url).await;
        pb.finish_and_clear();
        if available.is_empty() {
            println!("No curricula listed; fetching unfiltered.");
            return Ok(Vec::new());
        }

        let defaults: Vec<usize> = available
            .iter()
            .enumerate()
            .filter(|(_, c)| c.selected || self.defaults.curricula.contains(c))
            .map(|(i, _)| i)
            .collect();
        MultiSelect::new("Curricula (none = unfiltered):", available)
            .with_default(&defaults)
            .prompt()
            .map_err(ui_error)
    }

    fn prompt_years(&self) -> Result<Vec<u32>, DomainError> {
        let options: Vec<u32> = (1..=self.max_year.max(1)).collect();
        let defaults: Vec<usize> = options
            .iter()
            .enumerate()
            .filter(|(_, y)| self.defaults.years.contains(y))
            .map(|(i, _)| i)
            .collect();
        let years = MultiSelect::new("Years of study:", options)
            .with_default(&defaults)
            .prompt()
            .map_err(ui_error)?;
        if years.is_empty() {
            return Err(DomainError::Ui("select at least one year".to_string()));
        }
        Ok(years)
    }

    fn prompt_export(&self, groups: Vec<String>) -> Result<Option<(Option<String>, PathBuf)>, DomainError> {
        let export = Confirm::new("Export to CSV?")
            .with_default(self.defaults.export_csv.is_some())
            .prompt()
            .map_err(ui_error)?;
        if !export {
            return Ok(None);
        }

        let group = if groups.is_empty() {
            None
        } else {
            let mut options = vec![ALL_GROUPS.to_string()];
            options.extend(groups);
            let start = self
                .defaults
                .group
                .as_ref()
                .and_then(|g| options.iter().position(|o| o == g))
                .unwrap_or(0);
            let choice = Select::new("Group:", options)
                .with_starting_cursor(start)
                .prompt()
                .map_err(ui_error)?;
            (choice != ALL_GROUPS).then_some(choice)
        };

        let default_path = self
            .defaults
            .export_csv
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| DEFAULT_EXPORT_PATH.to_string());
        let path = Text::new("Output file:")
            .with_default(&default_path)
            .prompt()
            .map_err(ui_error)?;
        Ok(Some((group, PathBuf::from(path))))
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let course_site_url = self.prompt_course()?;
        let curricula = self.prompt_curricula(&course_site_url).await?;
        let years = self.prompt_years()?;
        let widen = Confirm::new("Widen the date range by one year on each side?")
            .with_default(self.defaults.widen)
            .prompt()
            .map_err(ui_error)?;

        let request = SessionRequest {
            course_site_url,
            curricula,
            years,
            widen,
            reference: self.defaults.reference,
            group: None,
            export_csv: None,
        };
        let pb = progress::spinner("Fetching timetables");
        let outcome = self.session.run(&request).await;
        pb.finish_and_clear();
        let outcome = outcome?;
        summary::print(&outcome);

        if outcome.collection.total_events() == 0 {
            return Ok(());
        }
        let groups = unique_groups(outcome.collection.flatten());
        if let Some((group, path)) = self.prompt_export(groups)? {
            let rows = self
                .session
                .export(&outcome.collection, group.as_deref(), &path)
                .await?;
            println!("Exported {} events to {}", rows, path.display());
        }
        Ok(())
    }
}
