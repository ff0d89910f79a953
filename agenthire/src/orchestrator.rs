//! Task execution orchestrator.
//!
//! Drives one run through `checking → creating → executing → completed`.
//! Any error ends the run in `failed`, recording the step it failed during.
//! Roles run strictly in pipeline order and a failing role stops the run;
//! roles after it are never allocated.
//!
//! The run is owned by the future executing it. Every state write is
//! followed by a snapshot into the [`ExecutionTracker`], which is what the
//! HTTP API and WebSocket clients read.

use crate::backend::{
    AllocatePayload, CompleteRequestPayload, CompleteTaskPayload, CreateTaskPayload, EscrowBackend,
    RunAgentPayload,
};
use crate::balances::BalanceStore;
use crate::chain::ChainReader;
use crate::error::{AppError, Result};
use crate::models::balance::DEFAULT_SYMBOL;
use crate::models::{AgentExecution, AgentType, ExecutionStatus, OnChainAgent, TaskRun, TaskStep};
use crate::pipeline::{calculate_pipeline_budget, PipelineSelection};
use crate::tracker::ExecutionTracker;
use chrono::Utc;
use ethers::types::Address;
use std::sync::Arc;
use std::time::Duration;

/// Characters of the prompt kept in the task hash
const TASK_HASH_PROMPT_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Pause between allocation and completion of each role
    pub processing_delay: Duration,
    /// Re-read reputation from the registry after completion instead of
    /// showing only the projected value
    pub refetch_reputation: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            processing_delay: Duration::from_millis(2000),
            refetch_reputation: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub client: Address,
    pub prompt: String,
    pub pipeline: PipelineSelection,
}

/// A validated run, published as `checking`, not yet executed
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub run: TaskRun,
    pipeline: PipelineSelection,
}

pub struct TaskOrchestrator {
    chain: Arc<dyn ChainReader>,
    backend: Arc<dyn EscrowBackend>,
    tracker: Arc<ExecutionTracker>,
    balances: Arc<BalanceStore>,
    options: OrchestratorOptions,
}

impl TaskOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        backend: Arc<dyn EscrowBackend>,
        tracker: Arc<ExecutionTracker>,
        balances: Arc<BalanceStore>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            chain,
            backend,
            tracker,
            balances,
            options,
        }
    }

    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    /// Validate a request and publish the initial run record.
    ///
    /// The run gets one pending execution per selected agent, coordinator
    /// first. A pipeline without a coordinator cannot be run.
    pub fn prepare(&self, request: TaskRequest) -> Result<PreparedRun> {
        if request.prompt.trim().is_empty() {
            return Err(AppError::InvalidInput("Prompt must not be empty".to_string()));
        }
        if request.pipeline.coordinator().is_none() {
            return Err(AppError::InvalidInput(
                "No active Coordinator agent is available".to_string(),
            ));
        }

        let budget = calculate_pipeline_budget(&request.pipeline);
        let mut run = TaskRun::new(request.client, request.prompt, budget, DEFAULT_SYMBOL);
        run.executions = request
            .pipeline
            .members()
            .map(|a| AgentExecution::pending(a.agent_type, a.id))
            .collect();

        self.tracker.update(&run);
        Ok(PreparedRun {
            run,
            pipeline: request.pipeline,
        })
    }

    /// Drive a prepared run to a terminal step and return the final record
    pub async fn execute(&self, prepared: PreparedRun) -> TaskRun {
        let PreparedRun { mut run, pipeline } = prepared;
        log::info!(
            "[ORCHESTRATOR] Run {} started: {} agents, budget {}",
            run.id,
            run.executions.len(),
            run.total_budget
        );

        match self.drive(&mut run, &pipeline).await {
            Ok(()) => {
                log::info!("[ORCHESTRATOR] Run {} completed (task {:?})", run.id, run.task_id);
            }
            Err(e) => self.fail(&mut run, e),
        }

        // The escrow moved funds once a task exists, successful or not
        if run.task_id.is_some() {
            self.balances.refresh(run.client).await;
        }

        run
    }

    /// Prepare and execute in one go
    pub async fn run(&self, request: TaskRequest) -> Result<TaskRun> {
        let prepared = self.prepare(request)?;
        Ok(self.execute(prepared).await)
    }

    async fn drive(&self, run: &mut TaskRun, pipeline: &PipelineSelection) -> Result<()> {
        let coordinator = pipeline
            .coordinator()
            .cloned()
            .ok_or_else(|| AppError::InvalidInput("No active Coordinator agent is available".to_string()))?;

        // checking
        let summary = self.balances.refresh(run.client).await;
        run.token_symbol = summary.symbol.clone();
        let available = summary
            .escrow_balance
            .ok_or_else(|| AppError::Chain("Unable to read escrow balance".to_string()))?;
        if available < run.total_budget {
            return Err(AppError::insufficient_escrow(
                run.total_budget,
                available,
                summary.decimals,
                &summary.symbol,
            ));
        }
        self.publish(run);

        // creating
        self.set_step(run, TaskStep::Creating);
        let prompt = run.prompt.clone();
        self.update_execution(run, AgentType::Coordinator, |e| {
            e.status = ExecutionStatus::Processing;
            e.input = Some(prompt.clone());
        });

        let created = self
            .backend
            .create_task(&CreateTaskPayload {
                client: format!("{:?}", run.client),
                coordinator_agent_id: coordinator.id,
                total_budget: run.total_budget.to_string(),
                task_hash: Some(task_hash(&run.prompt)),
            })
            .await?;
        let task_id = created.require_task_id()?;
        log::info!("[ORCHESTRATOR] Run {} created task {}", run.id, task_id);
        run.task_id = Some(task_id.clone());
        run.creation_tx_hash = created.tx_hash;

        // executing
        self.set_step(run, TaskStep::Executing);
        self.update_execution(run, AgentType::Coordinator, |e| {
            e.status = ExecutionStatus::Completed;
            e.output = Some(prompt.clone());
        });

        let mut current = prompt;
        for role in AgentType::SPECIALISTS {
            let Some(agent) = pipeline.get(role) else {
                continue;
            };
            match self.execute_role(run, &task_id, agent, &current).await {
                Ok(output) => current = output,
                Err(e) => {
                    log::warn!("[ORCHESTRATOR] {} agent #{} failed: {}", role, agent.id, e);
                    let message = format!("Error: {}", e);
                    self.update_execution(run, role, |x| {
                        x.status = ExecutionStatus::Failed;
                        x.output = Some(message);
                    });
                    return Err(e);
                }
            }
        }

        // completed
        let settled = self
            .backend
            .complete_task(&CompleteTaskPayload {
                task_id,
                success: true,
            })
            .await?;
        settled.ensure_success()?;

        run.completion_tx_hash = settled.tx_hash.clone();
        run.coordinator_paid = true;
        run.final_output = Some(current);
        self.update_execution(run, AgentType::Coordinator, |e| {
            e.payment_amount = Some(coordinator.price_per_task);
            e.completion_tx_hash = settled.tx_hash.clone();
            e.reputation_before = Some(coordinator.reputation);
            e.reputation_after = Some(coordinator.projected_reputation());
        });

        if self.options.refetch_reputation {
            self.refetch_reputation(run).await;
        }

        self.set_step(run, TaskStep::Completed);
        Ok(())
    }

    /// Allocate, settle and run one specialist; returns its output
    async fn execute_role(
        &self,
        run: &mut TaskRun,
        task_id: &str,
        agent: &OnChainAgent,
        input: &str,
    ) -> Result<String> {
        let role = agent.agent_type;
        self.update_execution(run, role, |e| {
            e.status = ExecutionStatus::Allocating;
            e.input = Some(input.to_string());
        });

        let allocation = self
            .backend
            .allocate(&AllocatePayload {
                task_id: task_id.to_string(),
                to_agent_id: agent.id,
                amount: agent.price_per_task.to_string(),
                input: Some(input.to_string()),
            })
            .await?;
        let request_id = allocation.require_request_id()?;
        self.update_execution(run, role, |e| {
            e.request_id = Some(request_id.clone());
            e.allocation_tx_hash = allocation.tx_hash.clone();
            e.status = ExecutionStatus::Processing;
        });

        if !self.options.processing_delay.is_zero() {
            tokio::time::sleep(self.options.processing_delay).await;
        }

        let completion = self
            .backend
            .complete_request(&CompleteRequestPayload {
                request_id,
                success: true,
                agent_type: Some(role.to_string()),
            })
            .await?;
        completion.ensure_success()?;

        let result = self
            .backend
            .run_agent(&RunAgentPayload {
                agent_type: role,
                input: input.to_string(),
                options: None,
            })
            .await?;
        let output = result.into_output(role)?.unwrap_or_else(|| input.to_string());

        self.update_execution(run, role, |e| {
            e.status = ExecutionStatus::Completed;
            e.output = Some(output.clone());
            e.payment_amount = Some(agent.price_per_task);
            e.completion_tx_hash = completion.tx_hash.clone();
            e.reputation_before = Some(agent.reputation);
            e.reputation_after = Some(agent.projected_reputation());
        });

        log::info!("[ORCHESTRATOR] {} agent #{} completed", role, agent.id);
        Ok(output)
    }

    /// Replace projected reputation with the registry's value where readable
    async fn refetch_reputation(&self, run: &mut TaskRun) {
        for i in 0..run.executions.len() {
            if run.executions[i].status != ExecutionStatus::Completed {
                continue;
            }
            let agent_id = run.executions[i].agent_id;
            match self.chain.get_agent(agent_id).await {
                Ok(agent) => run.executions[i].reputation_after = Some(agent.reputation),
                Err(e) => log::warn!(
                    "[ORCHESTRATOR] Keeping projected reputation for agent #{}: {}",
                    agent_id,
                    e
                ),
            }
        }
        self.publish(run);
    }

    fn update_execution<F>(&self, run: &mut TaskRun, role: AgentType, f: F)
    where
        F: FnOnce(&mut AgentExecution),
    {
        if let Some(execution) = run.execution_mut(role) {
            f(execution);
            execution.timestamp = Some(Utc::now());
        }
        self.publish(run);
    }

    fn set_step(&self, run: &mut TaskRun, step: TaskStep) {
        log::debug!("[ORCHESTRATOR] Run {}: {} -> {}", run.id, run.step, step);
        run.step = step;
        self.publish(run);
    }

    fn fail(&self, run: &mut TaskRun, error: AppError) {
        log::error!("[ORCHESTRATOR] Run {} failed during {}: {}", run.id, run.step, error);
        let message = error.to_string();
        // A terminal run has no agent still working
        for execution in run.executions.iter_mut() {
            if matches!(execution.status, ExecutionStatus::Allocating | ExecutionStatus::Processing) {
                execution.status = ExecutionStatus::Failed;
                execution.output = Some(format!("Error: {}", message));
                execution.timestamp = Some(Utc::now());
            }
        }
        run.failed_during = Some(run.step);
        run.step = TaskStep::Failed;
        run.error = Some(message);
        self.publish(run);
    }

    fn publish(&self, run: &mut TaskRun) {
        run.touch();
        self.tracker.update(run);
    }
}

/// `ipfs://` followed by the first 50 characters of the prompt
pub fn task_hash(prompt: &str) -> String {
    let head: String = prompt.chars().take(TASK_HASH_PROMPT_CHARS).collect();
    format!("ipfs://{}", head)
}
