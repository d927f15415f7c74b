use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use super::agents::{Agent, Crew, Task};
use super::models::{ProjectContext, RepoTarget};
use super::planner::PlanResponse;
use super::sandbox::CodeExecTool;
use super::sessions::SessionStore;
use crate::validation::{DEFAULT_SLUG_LEN, MIN_SPEC_LEN, safe_slug};

/// Program stored when the coder returns nothing usable.
pub const PLACEHOLDER_CODE: &str = "# Placeholder Python code - coder produced empty output\n\
def main():\n    print('Hello from MACC placeholder')\n\n\
if __name__ == '__main__':\n    main()\n";

/// Auto-generate a repository name: spec slug plus six hex chars for uniqueness.
pub fn auto_repo_name(spec: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", safe_slug(spec, DEFAULT_SLUG_LEN), &suffix[..6])
}

pub fn readme_for(repo: &str, spec: &str) -> String {
    format!(
        "# {}\n\n{}\n\nGenerated by MACC - Multi-Agent Code Collaborator\n",
        repo, spec
    )
}

/// Runs generation and refinement for sessions in background tasks,
/// reporting progress through the session message queue.
#[derive(Clone)]
pub struct PipelineRunner {
    crew: Arc<Crew>,
    sessions: SessionStore,
    exec_tool: Option<CodeExecTool>,
}

impl PipelineRunner {
    pub fn new(crew: Arc<Crew>, sessions: SessionStore) -> Self {
        Self {
            crew,
            sessions,
            exec_tool: None,
        }
    }

    pub fn with_exec_check(mut self, tool: CodeExecTool) -> Self {
        self.exec_tool = Some(tool);
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Start generation in a background task and return immediately.
    pub fn start_generation(
        &self,
        session_id: String,
        spec: String,
        repo: Option<RepoTarget>,
    ) -> tokio::task::JoinHandle<()> {
        let runner = self.clone();
        let id = session_id.clone();
        self.supervise(
            id,
            tokio::spawn(async move { runner.generate(&session_id, &spec, repo).await }),
        )
    }

    /// Start a refinement in a background task and return immediately.
    pub fn start_refinement(
        &self,
        session_id: String,
        suggestion: String,
        current_code: String,
    ) -> tokio::task::JoinHandle<()> {
        let runner = self.clone();
        let id = session_id.clone();
        self.supervise(
            id,
            tokio::spawn(async move {
                runner
                    .refine(&session_id, &suggestion, &current_code)
                    .await
            }),
        )
    }

    /// Wait on a run and finish its session even if the run panicked.
    fn supervise(
        &self,
        session_id: String,
        run: tokio::task::JoinHandle<()>,
    ) -> tokio::task::JoinHandle<()> {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            if let Err(e) = run.await {
                tracing::error!(session_id = %session_id, error = %e, "Background run aborted");
                sessions.status(&session_id, format!("Unhandled error: {}", e));
                sessions.finish(&session_id);
            }
        })
    }

    /// Plan, code and review one spec. Always finishes the session.
    pub async fn generate(&self, session_id: &str, spec: &str, repo: Option<RepoTarget>) {
        let span = tracing::info_span!("generate", session_id = %session_id);
        let result = self
            .generate_inner(session_id, spec, repo)
            .instrument(span)
            .await;
        if let Err(e) = result {
            tracing::error!(error = %format!("{:#}", e), "Generation failed");
            self.sessions
                .status(session_id, format!("Unhandled error: {:#}", e));
        }
        self.sessions.finish(session_id);
    }

    async fn generate_inner(
        &self,
        id: &str,
        spec: &str,
        repo: Option<RepoTarget>,
    ) -> anyhow::Result<()> {
        let sessions = &self.sessions;
        sessions.status(id, "Starting project generation...");
        let spec = spec.trim();
        if spec.chars().count() < MIN_SPEC_LEN {
            sessions.status(id, "Error: Project spec too short.");
            return Ok(());
        }

        let repo = match repo {
            Some(target) => {
                sessions.status(
                    id,
                    format!("Using provided GitHub repo: {}", target.display_name()),
                );
                target
            }
            None => {
                let target = RepoTarget {
                    owner: None,
                    name: auto_repo_name(spec),
                };
                sessions.status(id, format!("Auto-generated repo name: {}", target.name));
                target
            }
        };

        sessions.status(id, "Planner: breaking down tasks...");
        let tasks = match self.crew.kickoff(&Agent::planner(), &Task::plan(spec)).await {
            Ok(output) => PlanResponse::parse(&output.raw).tasks,
            Err(e) => {
                sessions.status(id, format!("Planner failed: {}", e));
                Vec::new()
            }
        };
        sessions.status(id, "Planner completed.");

        sessions.status(id, "Coder: generating code...");
        let mut generated = match self.crew.kickoff(&Agent::coder(), &Task::code(spec)).await {
            Ok(output) => output.code(),
            Err(e) => {
                sessions.status(id, format!("Coder failed: {}", e));
                String::new()
            }
        };
        if generated.trim().is_empty() {
            generated = PLACEHOLDER_CODE.to_string();
            sessions.status(id, "Coder returned empty output; using placeholder.");
        }
        sessions.code_lines(id, &generated);
        sessions.status(id, "Coder completed generation.");

        sessions.status(id, "Reviewer: reviewing code...");
        let refined = match self
            .crew
            .kickoff(&Agent::reviewer(), &Task::review(&generated))
            .await
        {
            Ok(output) => non_empty_or(output.code(), &generated),
            Err(e) => {
                sessions.status(id, format!("Reviewer failed: {}", e));
                generated.clone()
            }
        };
        sessions.status(id, "Reviewer completed review; streaming refined code...");
        sessions.code_lines(id, &refined);

        self.exec_check(id, &refined).await;

        let repo_display = repo.display_name();
        sessions.set_context(
            id,
            ProjectContext {
                spec: spec.to_string(),
                readme: readme_for(&repo.name, spec),
                repo: Some(repo),
                tasks,
                code: refined,
                repo_url: None,
            },
        )?;
        sessions.status(id, format!("Project ready. Repo to use: {}", repo_display));
        Ok(())
    }

    /// Apply a suggestion to the current code. Always finishes the session.
    pub async fn refine(&self, session_id: &str, suggestion: &str, current_code: &str) {
        let span = tracing::info_span!("refine", session_id = %session_id);
        self.refine_inner(session_id, suggestion, current_code)
            .instrument(span)
            .await;
        self.sessions.finish(session_id);
    }

    async fn refine_inner(&self, session_id: &str, suggestion: &str, current_code: &str) {
        let sessions = &self.sessions;
        sessions.status(session_id, format!("Applying suggestion: {}", suggestion));

        let refined = match self
            .crew
            .kickoff(&Agent::reviewer(), &Task::refine(suggestion, current_code))
            .await
        {
            Ok(output) => non_empty_or(output.code(), current_code),
            Err(e) => {
                sessions.status(session_id, format!("Refinement failed: {}", e));
                current_code.to_string()
            }
        };

        let stored = sessions.with(session_id, |s| s.context.code = refined.clone());
        if stored.is_err() {
            tracing::warn!("Session vanished during refinement");
        }
        sessions.code_lines(session_id, &refined);
        self.exec_check(session_id, &refined).await;
        sessions.status(session_id, "Refinement applied.");
    }

    async fn exec_check(&self, id: &str, code: &str) {
        let Some(tool) = &self.exec_tool else {
            return;
        };
        match tool.run(code).await {
            Ok(outcome) => self.sessions.status(id, outcome.summary()),
            Err(e) => self
                .sessions
                .status(id, format!("Exec check unavailable: {:#}", e)),
        }
    }
}

fn non_empty_or(candidate: String, fallback: &str) -> String {
    if candidate.trim().is_empty() {
        fallback.to_string()
    } else {
        candidate
    }
}
