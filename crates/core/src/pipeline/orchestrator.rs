//! # Pipeline Orchestrator
//!
//! Drives one onboarding session through the ordered setup steps. One
//! instance per session; callers serialize access per session key.
//! Validation problems come back as values - only persistence failures
//! propagate as errors.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::CoreResult;
use crate::memory::{modify_project, modify_session, MemoryRepository, WipState};

use super::defaults;
use super::validator::{FallbackStrategy, InputValidator, ValidationResult};
use super::{PipelineState, SetupStep};

/// What `complete_step` produced.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Step done; the pipeline moved to this step
    Advanced(SetupStep),
    /// The final step finished; onboarding is over
    PipelineCompleted,
    /// Required inputs missing; the step was not completed
    Failed(ValidationResult),
}

pub struct PipelineOrchestrator {
    session_id: String,
    project_id: String,
    state: PipelineState,
    repo: Arc<dyn MemoryRepository>,
}

impl PipelineOrchestrator {
    pub fn new(
        session_id: impl Into<String>,
        project_id: impl Into<String>,
        repo: Arc<dyn MemoryRepository>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            project_id: project_id.into(),
            state: PipelineState::default(),
            repo,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Enter a step: register questions for missing required fields and
    /// run the fallback policies for missing optional ones.
    pub async fn start_step(&mut self, step: SetupStep) -> CoreResult<()> {
        self.state.current_step = step;
        debug!(step = step.display_name(), "starting pipeline step");

        let missing = InputValidator::missing_fields(step, &self.state.data);
        let mut questions: Vec<(&'static str, &'static str)> = Vec::new();

        for req in missing {
            if req.required {
                if !self.state.pending_inputs.contains(&req.field.to_string()) {
                    self.state.pending_inputs.push(req.field.to_string());
                }
                questions.push((req.field, req.label));
                continue;
            }
            match req.fallback {
                FallbackStrategy::GenerateDefault => {
                    if let Some(value) = defaults::suggest_default(req.field, &self.state.data) {
                        // Apply only while the field is still unset
                        self.state
                            .data
                            .entry(req.field.to_string())
                            .or_insert(value);
                    }
                }
                FallbackStrategy::InferFromContext => {
                    let deps_held = req.depends_on.iter().all(|dep| {
                        self.state
                            .data
                            .get(*dep)
                            .map(|v| !v.trim().is_empty())
                            .unwrap_or(false)
                    });
                    if deps_held {
                        if let Some(value) =
                            defaults::infer_from_context(req.field, &self.state.data)
                        {
                            self.state
                                .data
                                .entry(req.field.to_string())
                                .or_insert(value);
                        }
                    }
                }
                FallbackStrategy::None => {}
            }
        }

        if !questions.is_empty() {
            modify_session(self.repo.as_ref(), &self.session_id, |session| {
                for (field, label) in &questions {
                    session.upsert_pending_question(field, *label);
                }
            })
            .await?;
        }
        Ok(())
    }

    /// Record one collected input and snapshot progress to session memory.
    pub async fn set_input(&mut self, field: &str, value: impl Into<String>) -> CoreResult<()> {
        let value = value.into();
        self.state.data.insert(field.to_string(), value);
        self.state.pending_inputs.retain(|f| f != field);

        let wip = WipState {
            current_step: self.state.current_step,
            partial_data: self.state.data.clone(),
        };
        let field = field.to_string();
        modify_session(self.repo.as_ref(), &self.session_id, |session| {
            session.wip_state = Some(wip.clone());
            session.resolve_question(&field);
        })
        .await?;
        Ok(())
    }

    /// Re-validate and, when the step is satisfied, advance the pipeline.
    pub async fn complete_step(&mut self) -> CoreResult<StepOutcome> {
        let step = self.state.current_step;
        let validation = InputValidator::validate(step, &self.state.data);
        if !validation.valid {
            self.state.errors = validation.errors.clone();
            return Ok(StepOutcome::Failed(validation));
        }

        self.state.errors.clear();
        self.state.mark_completed(step);
        self.snapshot_business_details().await?;
        info!(step = step.display_name(), "pipeline step completed");

        match step.next() {
            Some(next) => {
                self.state.current_step = next;
                Ok(StepOutcome::Advanced(next))
            }
            None => Ok(StepOutcome::PipelineCompleted),
        }
    }

    /// Explicit jump; the only way to move backwards.
    pub fn go_to_step(&mut self, step: SetupStep) {
        self.state.current_step = step;
    }

    /// Restore a previously persisted session: current step plus partial
    /// data, merged under any values already held live.
    pub async fn load_from_session(&mut self) -> CoreResult<bool> {
        let Some(stored) = self.repo.get_session(&self.session_id).await? else {
            return Ok(false);
        };
        let Some(wip) = stored.record.wip_state else {
            return Ok(false);
        };

        self.state.current_step = wip.current_step;
        for (field, value) in wip.partial_data {
            self.state.data.entry(field).or_insert(value);
        }
        Ok(true)
    }

    /// Copy the business-shaped inputs into durable project memory.
    async fn snapshot_business_details(&self) -> CoreResult<()> {
        const BUSINESS_FIELDS: &[&str] = &[
            "business_type",
            "business_name",
            "business_description",
            "target_audience",
            "tagline",
            "contact_email",
        ];
        let snapshot: Vec<(String, String)> = BUSINESS_FIELDS
            .iter()
            .filter_map(|f| {
                self.state
                    .data
                    .get(*f)
                    .map(|v| (f.to_string(), v.clone()))
            })
            .collect();
        let goals: Vec<String> = self
            .state
            .data
            .get("site_goals")
            .map(|g| g.split(',').map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();

        modify_project(self.repo.as_ref(), &self.project_id, |project| {
            for (field, value) in &snapshot {
                project
                    .business_details
                    .insert(field.clone(), value.clone());
            }
            if !goals.is_empty() {
                project.site_goals = goals.clone();
            }
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;

    fn orchestrator() -> (PipelineOrchestrator, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        (
            PipelineOrchestrator::new("sess-1", "proj-1", repo.clone()),
            repo,
        )
    }

    #[tokio::test]
    async fn test_complete_step_fails_while_required_missing() {
        let (mut orch, _repo) = orchestrator();
        orch.start_step(SetupStep::Discovery).await.unwrap();

        let outcome = orch.complete_step().await.unwrap();
        match outcome {
            StepOutcome::Failed(validation) => {
                assert!(validation
                    .missing_required
                    .contains(&"business_type".to_string()));
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(orch.state().completed_steps.is_empty());
        assert_eq!(orch.state().current_step, SetupStep::Discovery);
    }

    #[tokio::test]
    async fn test_complete_step_advances_when_satisfied() {
        let (mut orch, _repo) = orchestrator();
        orch.start_step(SetupStep::Discovery).await.unwrap();
        orch.set_input("business_type", "bakery").await.unwrap();
        orch.set_input("business_name", "Crumb & Co").await.unwrap();

        let outcome = orch.complete_step().await.unwrap();
        assert_eq!(outcome, StepOutcome::Advanced(SetupStep::BusinessInfo));
        assert!(orch.state().is_completed(SetupStep::Discovery));
    }

    #[tokio::test]
    async fn test_questions_registered_once_per_field() {
        let (mut orch, repo) = orchestrator();
        orch.start_step(SetupStep::Discovery).await.unwrap();
        // Entering the step twice must not duplicate questions
        orch.start_step(SetupStep::Discovery).await.unwrap();

        let session = repo.get_session("sess-1").await.unwrap().unwrap();
        let fields: Vec<&str> = session
            .record
            .pending_questions
            .iter()
            .map(|q| q.field.as_str())
            .collect();
        assert_eq!(fields, vec!["business_type", "business_name"]);
    }

    #[tokio::test]
    async fn test_set_input_resolves_pending_question() {
        let (mut orch, repo) = orchestrator();
        orch.start_step(SetupStep::Discovery).await.unwrap();
        orch.set_input("business_type", "gym").await.unwrap();

        let session = repo.get_session("sess-1").await.unwrap().unwrap();
        assert!(session
            .record
            .pending_questions
            .iter()
            .all(|q| q.field != "business_type"));
        // Write-ahead snapshot captured the input
        let wip = session.record.wip_state.unwrap();
        assert_eq!(wip.partial_data.get("business_type").unwrap(), "gym");
    }

    #[tokio::test]
    async fn test_generate_default_applies_only_when_unset() {
        let (mut orch, _repo) = orchestrator();
        orch.set_input("business_type", "saas startup").await.unwrap();
        orch.set_input("heading_font", "Space Grotesk").await.unwrap();

        orch.start_step(SetupStep::Branding).await.unwrap();
        // Caller-provided value survives; untouched fields get defaults
        assert_eq!(orch.state().data.get("heading_font").unwrap(), "Space Grotesk");
        assert_eq!(orch.state().data.get("body_font").unwrap(), "Inter");
    }

    #[tokio::test]
    async fn test_inference_waits_for_dependencies() {
        let (mut orch, _repo) = orchestrator();
        orch.start_step(SetupStep::Branding).await.unwrap();
        assert!(orch.state().data.get("secondary_color").is_none());

        orch.set_input("primary_color", "#506070").await.unwrap();
        orch.start_step(SetupStep::Branding).await.unwrap();
        assert_eq!(
            orch.state().data.get("secondary_color").unwrap(),
            "#283848"
        );
        assert_eq!(orch.state().data.get("accent_color").unwrap(), "#af9f8f");
    }

    #[tokio::test]
    async fn test_full_pipeline_reaches_completion() {
        let (mut orch, repo) = orchestrator();
        orch.start_step(SetupStep::Discovery).await.unwrap();
        orch.set_input("business_type", "design agency").await.unwrap();
        orch.set_input("business_name", "North Studio").await.unwrap();
        assert_eq!(
            orch.complete_step().await.unwrap(),
            StepOutcome::Advanced(SetupStep::BusinessInfo)
        );

        for expected in [SetupStep::Branding, SetupStep::Structure, SetupStep::Review] {
            let step = orch.state().current_step;
            orch.start_step(step).await.unwrap();
            if step == SetupStep::Branding {
                orch.set_input("primary_color", "#2c3e50").await.unwrap();
            }
            assert_eq!(
                orch.complete_step().await.unwrap(),
                StepOutcome::Advanced(expected)
            );
        }

        orch.start_step(SetupStep::Review).await.unwrap();
        assert_eq!(
            orch.complete_step().await.unwrap(),
            StepOutcome::PipelineCompleted
        );

        // Business details landed in project memory
        let project = repo.get_project("proj-1").await.unwrap().unwrap();
        assert_eq!(
            project.record.business_details.get("business_name").unwrap(),
            "North Studio"
        );
        assert!(!project.record.site_goals.is_empty());
    }

    #[tokio::test]
    async fn test_load_from_session_resumes_progress() {
        let repo = Arc::new(InMemoryRepository::new());
        {
            let mut first = PipelineOrchestrator::new("sess-1", "proj-1", repo.clone());
            first.start_step(SetupStep::Discovery).await.unwrap();
            first.set_input("business_type", "bakery").await.unwrap();
            first.go_to_step(SetupStep::BusinessInfo);
            first.set_input("tagline", "Warm from the oven").await.unwrap();
        }

        let mut resumed = PipelineOrchestrator::new("sess-1", "proj-1", repo);
        assert!(resumed.load_from_session().await.unwrap());
        assert_eq!(resumed.state().current_step, SetupStep::BusinessInfo);
        assert_eq!(resumed.state().data.get("business_type").unwrap(), "bakery");
        assert_eq!(
            resumed.state().data.get("tagline").unwrap(),
            "Warm from the oven"
        );
    }
}
