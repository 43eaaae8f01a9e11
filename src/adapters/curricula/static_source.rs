//! Curricula supplied up front (config or command line).

use crate::domain::{Curriculum, DomainError};
use crate::ports::CurriculaPort;

#[derive(Debug, Clone, Default)]
pub struct StaticCurricula {
    curricula: Vec<Curriculum>,
}

impl StaticCurricula {
    pub fn new(curricula: Vec<Curriculum>) -> Self {
        Self { curricula }
    }
}

#[async_trait::async_trait]
impl CurriculaPort for StaticCurricula {
    /// Same list for every course.
    async fn list_curricula(&self, _course_site_url: &str) -> Result<Vec<Curriculum>, DomainError> {
        Ok(self.curricula.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_configured_list() {
        let source = StaticCurricula::new(vec![Curriculum::new("A", "A")]);
        assert_eq!(source.list_curricula("any").await.unwrap().len(), 1);
        assert!(StaticCurricula::default().list_curricula("any").await.unwrap().is_empty());
    }
}
