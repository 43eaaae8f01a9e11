//! Implements InputPort without prompts: one session straight from config.

use crate::adapters::ui::{progress, summary};
use crate::domain::DomainError;
use crate::ports::InputPort;
use crate::usecases::session_service::{SessionRequest, SessionService};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub struct BatchInputPort {
    session: Arc<SessionService>,
    request: SessionRequest,
}

impl BatchInputPort {
    pub fn new(session: Arc<SessionService>, request: SessionRequest) -> Self {
        Self { session, request }
    }
}

#[async_trait]
impl InputPort for BatchInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        let mut request = self.request.clone();
        if request.curricula.is_empty() && !request.course_site_url.trim().is_empty() {
            request.curricula = self
                .session
                .available_curricula(&request.course_site_url)
                .await;
            info!(count = request.curricula.len(), "curricula discovered");
        }

        let pb = progress::spinner("Fetching timetables");
        let outcome = self.session.run(&request).await;
        pb.finish_and_clear();
        summary::print(&outcome?);
        Ok(())
    }
}
