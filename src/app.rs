//! Application state: which screen is showing, the active room, and reports

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::ai::{AiServices, SummaryRequest};
use crate::session::{SessionReport, SpeechRoom, SUMMARY_FAILED};

/// The three screens of the app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Welcome page
    Intro,
    /// Session setup and report history
    Management,
    /// Live conversation
    SpeechRoom,
}

/// Top-level state, created at start-up and shared by every handler
pub struct App {
    screen: Screen,
    room: Option<Arc<SpeechRoom>>,
    reports: Vec<SessionReport>,
    selected: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            screen: Screen::Intro,
            room: None,
            reports: Vec::new(),
            selected: None,
        }
    }

    /// Current screen; the speech room screen needs a room behind it
    pub fn screen(&self) -> Screen {
        match (self.screen, &self.room) {
            (Screen::SpeechRoom, None) => Screen::Management,
            (screen, _) => screen,
        }
    }

    /// Leave the intro page
    pub fn enter_management(&mut self) {
        if self.room.is_none() {
            self.screen = Screen::Management;
        }
    }

    /// Switch to the speech room for `room`; only one room at a time
    pub fn start_session(&mut self, room: Arc<SpeechRoom>) -> Result<()> {
        if self.room.is_some() {
            bail!("A session is already running");
        }
        info!("Session started: {}", room.data().topic);
        self.room = Some(room);
        self.screen = Screen::SpeechRoom;
        Ok(())
    }

    pub fn room(&self) -> Option<Arc<SpeechRoom>> {
        self.room.clone()
    }

    /// End the active session; the report is stored with a placeholder summary
    pub async fn end_session(&mut self) -> Result<SessionReport> {
        let room = self.room.take().context("No session is running")?;
        self.screen = Screen::Management;

        let report = room.end().await;
        self.reports.push(report.clone());
        Ok(report)
    }

    pub fn reports(&self) -> &[SessionReport] {
        &self.reports
    }

    pub fn report(&self, id: &str) -> Option<&SessionReport> {
        self.reports.iter().find(|r| r.id == id)
    }

    /// Replace a report's summary; false if the report is gone
    pub fn set_summary(&mut self, id: &str, summary: impl Into<String>) -> bool {
        match self.reports.iter_mut().find(|r| r.id == id) {
            Some(report) => {
                report.summary = summary.into();
                true
            }
            None => false,
        }
    }

    /// Remove exactly one report; clears the selection if it pointed there
    pub fn delete_report(&mut self, id: &str) -> bool {
        let before = self.reports.len();
        self.reports.retain(|r| r.id != id);
        let removed = self.reports.len() != before;

        if removed {
            info!("Report deleted: {}", id);
            if self.selected.as_deref() == Some(id) {
                self.selected = None;
            }
        }
        removed
    }

    pub fn select_report(&mut self, id: &str) -> Result<&SessionReport> {
        let report = self
            .reports
            .iter()
            .find(|r| r.id == id)
            .with_context(|| format!("Report {} not found", id))?;
        self.selected = Some(id.to_string());
        Ok(report)
    }

    pub fn selected_report(&self) -> Option<&SessionReport> {
        self.selected.as_deref().and_then(|id| self.report(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }
}

/// Generate the evaluation for `report` in the background and store it
pub fn spawn_summary(app: Arc<RwLock<App>>, ai: AiServices, report: &SessionReport) -> JoinHandle<()> {
    let id = report.id.clone();
    let request = SummaryRequest {
        topic: report.topic.clone(),
        conversation: report.conversation.clone(),
        notes: report.psychological_notes.clone(),
    };

    tokio::spawn(async move {
        let summary = match tokio::spawn(async move { ai.summarize(&request).await }).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Failed to generate and update session summary: {}", e);
                SUMMARY_FAILED.to_string()
            }
        };

        if app.write().await.set_summary(&id, summary) {
            info!("Summary ready for {}", id);
        } else {
            debug!("Report {} was deleted before its summary arrived", id);
        }
    })
}
