//! Reconciliation engine.
//!
//! Plans the difference between the desired graph and recorded state, then
//! executes the resulting operations against a [`Provider`] with bounded
//! concurrency. Dependency order comes from the graph: a resource is only
//! created or updated after everything it references, and only deleted after
//! everything that references it.

pub mod differ;
pub mod planner;

use crate::provider::Provider;
use anyhow::{Context, Result};
use planner::{Operation, OperationKind, Plan};
use resgraph::{Graph, ResourceData, ResourceState, State, Urn, dereference};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use taskpool::{CancelToken, Results, Task, TaskError, run_tasks};

pub struct SyncOptions {
    pub concurrency: usize,
    pub continue_on_fail: bool,
}

#[derive(Debug, Default)]
pub struct SyncSummary {
    pub imported: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub errors: Vec<TaskError>,
}

impl SyncSummary {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn changes(&self) -> usize {
        self.imported + self.created + self.updated + self.deleted
    }
}

/// One schedulable operation. Task id is the URN string.
struct OperationTask {
    kind: OperationKind,
    urn: Urn,
    data: ResourceData,
    remote_id: Option<String>,
    dependency_urns: Vec<Urn>,
}

impl Task for OperationTask {
    fn id(&self) -> String {
        self.urn.as_str().to_string()
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependency_urns
            .iter()
            .map(|urn| urn.as_str().to_string())
            .collect()
    }
}

pub struct ProjectSyncer {
    provider: Arc<dyn Provider>,
}

impl ProjectSyncer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Reconcile the remote catalog to match `graph`.
    pub async fn apply(
        &self,
        cancel: &CancelToken,
        graph: &Graph,
        opts: &SyncOptions,
    ) -> Result<SyncSummary> {
        let state = self.provider.load_state().await?;
        let plan = planner::plan(graph, &state)?;
        self.execute(cancel, graph, state, &plan, opts).await
    }

    /// Delete everything recorded in state, dependents first.
    pub async fn destroy(
        &self,
        cancel: &CancelToken,
        opts: &SyncOptions,
    ) -> Result<SyncSummary> {
        let graph = Graph::new();
        let state = self.provider.load_state().await?;
        let plan = planner::plan(&graph, &state)?;
        self.execute(cancel, &graph, state, &plan, opts).await
    }

    async fn execute(
        &self,
        cancel: &CancelToken,
        graph: &Graph,
        state: State,
        plan: &Plan,
        opts: &SyncOptions,
    ) -> Result<SyncSummary> {
        let forward = forward_tasks(graph, plan);
        let deletes = delete_tasks(&state, plan);

        let live = Arc::new(Mutex::new(state));
        let outcomes: Arc<Results<OperationKind>> = Arc::new(Results::new());
        let mut errors = Vec::new();

        if !forward.is_empty() {
            errors.extend(self.run(cancel, forward, opts, &live, &outcomes).await);
        }
        // Deletes run after the forward phase so a rename (create + delete)
        // never leaves a gap, and are skipped once the run is failing.
        if !deletes.is_empty() && (errors.is_empty() || opts.continue_on_fail) {
            errors.extend(self.run(cancel, deletes, opts, &live, &outcomes).await);
        }

        let state = Arc::try_unwrap(live)
            .map_err(|_| anyhow::anyhow!("sync state still shared after the run"))?
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.provider.save_state(&state).await?;

        let mut summary = SyncSummary {
            errors,
            ..Default::default()
        };
        for key in outcomes.keys() {
            match outcomes.get(&key) {
                Some(OperationKind::Import) => summary.imported += 1,
                Some(OperationKind::Create) => summary.created += 1,
                Some(OperationKind::Update) => summary.updated += 1,
                Some(OperationKind::Delete) => summary.deleted += 1,
                None => {}
            }
        }
        Ok(summary)
    }

    async fn run(
        &self,
        cancel: &CancelToken,
        tasks: Vec<Arc<OperationTask>>,
        opts: &SyncOptions,
        live: &Arc<Mutex<State>>,
        outcomes: &Arc<Results<OperationKind>>,
    ) -> Vec<TaskError> {
        let provider = Arc::clone(&self.provider);
        let live = Arc::clone(live);
        let outcomes = Arc::clone(outcomes);

        run_tasks(
            cancel,
            tasks,
            opts.concurrency,
            opts.continue_on_fail,
            move |task: Arc<OperationTask>| {
                let provider = Arc::clone(&provider);
                let live = Arc::clone(&live);
                let outcomes = Arc::clone(&outcomes);
                async move { execute_operation(&provider, &live, &outcomes, &task).await }
            },
        )
        .await
    }
}

async fn execute_operation(
    provider: &Arc<dyn Provider>,
    live: &Arc<Mutex<State>>,
    outcomes: &Results<OperationKind>,
    task: &OperationTask,
) -> Result<()> {
    log::debug!("{} {}", task.kind, task.urn);

    // Snapshot under the lock, never hold it across an await.
    let snapshot = live
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();

    let output = match task.kind {
        OperationKind::Delete => {
            let current = snapshot
                .get_resource(&task.urn)
                .with_context(|| format!("no recorded state for {}", task.urn))?;
            provider.delete(&task.urn, current).await?;
            live.lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove_resource(&task.urn);
            outcomes.store(task.urn.as_str(), task.kind);
            return Ok(());
        }
        OperationKind::Create => {
            let resolved = dereference(&task.data, &snapshot)
                .with_context(|| format!("could not resolve references for {}", task.urn))?;
            provider.create(&task.urn, &resolved).await?
        }
        OperationKind::Update => {
            let resolved = dereference(&task.data, &snapshot)
                .with_context(|| format!("could not resolve references for {}", task.urn))?;
            let current = snapshot
                .get_resource(&task.urn)
                .with_context(|| format!("no recorded state for {}", task.urn))?;
            provider.update(&task.urn, &resolved, current).await?
        }
        OperationKind::Import => {
            let remote_id = task
                .remote_id
                .as_deref()
                .with_context(|| format!("no remote id to import {} from", task.urn))?;
            provider.import_resource(&task.urn, remote_id).await?
        }
    };

    let record = ResourceState {
        id: task.urn.id().to_string(),
        kind: task.urn.kind().to_string(),
        input: task.data.clone(),
        output,
        output_raw: None,
        dependencies: task.dependency_urns.clone(),
    };
    live.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .add_resource(record);
    outcomes.store(task.urn.as_str(), task.kind);
    Ok(())
}

fn forward_tasks(graph: &Graph, plan: &Plan) -> Vec<Arc<OperationTask>> {
    plan.forward().filter_map(|op| task_for(graph, op)).collect()
}

fn task_for(graph: &Graph, op: &Operation) -> Option<Arc<OperationTask>> {
    let resource = graph.get_resource(&op.urn)?;
    Some(Arc::new(OperationTask {
        kind: op.kind,
        urn: op.urn.clone(),
        data: resource.data().clone(),
        remote_id: resource.import_metadata().map(|m| m.remote_id.clone()),
        dependency_urns: graph.get_dependencies(&op.urn).to_vec(),
    }))
}

/// A resource can only be deleted once nothing recorded depends on it, so
/// delete tasks depend on the deletes of their dependents.
fn delete_tasks(state: &State, plan: &Plan) -> Vec<Arc<OperationTask>> {
    let mut dependents: HashMap<Urn, Vec<Urn>> = HashMap::new();
    for recorded in state.resources.values() {
        for dep in &recorded.dependencies {
            dependents.entry(dep.clone()).or_default().push(recorded.urn());
        }
    }

    plan.deletes()
        .map(|op| {
            Arc::new(OperationTask {
                kind: OperationKind::Delete,
                urn: op.urn.clone(),
                data: ResourceData::new(),
                remote_id: None,
                dependency_urns: dependents.get(&op.urn).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use resgraph::{PropertyRef, PropertyValue, Resource};

    struct MockProvider {
        calls: Mutex<Vec<String>>,
        payloads: Mutex<HashMap<String, ResourceData>>,
        state: Mutex<State>,
        fail_create: Option<String>,
    }

    impl Default for MockProvider {
        fn default() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                payloads: Mutex::new(HashMap::new()),
                state: Mutex::new(State::empty()),
                fail_create: None,
            }
        }
    }

    impl MockProvider {
        fn with_state(state: State) -> Self {
            Self {
                state: Mutex::new(state),
                ..Default::default()
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn saved(&self) -> State {
            self.state.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        async fn load_state(&self) -> Result<State> {
            Ok(self.state.lock().unwrap().clone())
        }

        async fn save_state(&self, state: &State) -> Result<()> {
            *self.state.lock().unwrap() = state.clone();
            Ok(())
        }

        async fn create(&self, urn: &Urn, data: &ResourceData) -> Result<ResourceData> {
            if self.fail_create.as_deref() == Some(urn.as_str()) {
                anyhow::bail!("remote rejected {urn}");
            }
            self.record(format!("create {urn}"));
            self.payloads
                .lock()
                .unwrap()
                .insert(urn.as_str().to_string(), data.clone());
            Ok(ResourceData::from([(
                "id".to_string(),
                PropertyValue::from(format!("rm_{}", urn.id()).as_str()),
            )]))
        }

        async fn update(
            &self,
            urn: &Urn,
            data: &ResourceData,
            current: &ResourceState,
        ) -> Result<ResourceData> {
            self.record(format!("update {urn}"));
            self.payloads
                .lock()
                .unwrap()
                .insert(urn.as_str().to_string(), data.clone());
            Ok(current.output.clone())
        }

        async fn delete(&self, urn: &Urn, _current: &ResourceState) -> Result<()> {
            self.record(format!("delete {urn}"));
            Ok(())
        }

        async fn import_resource(&self, urn: &Urn, remote_id: &str) -> Result<ResourceData> {
            self.record(format!("import {urn}"));
            Ok(ResourceData::from([(
                "id".to_string(),
                PropertyValue::from(remote_id),
            )]))
        }
    }

    fn opts() -> SyncOptions {
        SyncOptions {
            concurrency: 4,
            continue_on_fail: false,
        }
    }

    fn plan_resource() -> Resource {
        Resource::new(
            "mobile",
            "tracking-plan",
            ResourceData::from([("name".to_string(), PropertyValue::from("Mobile"))]),
            Vec::new(),
        )
    }

    fn event_resource() -> Resource {
        Resource::new(
            "checkout",
            "event",
            ResourceData::from([
                ("name".to_string(), PropertyValue::from("Checkout")),
                (
                    "plan".to_string(),
                    PropertyValue::Ref(PropertyRef::new(
                        Urn::new("mobile", "tracking-plan"),
                        "id",
                    )),
                ),
            ]),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn apply_creates_in_dependency_order_and_resolves_references() {
        let mut graph = Graph::new();
        graph.add_resource(event_resource());
        graph.add_resource(plan_resource());

        let provider = Arc::new(MockProvider::default());
        let syncer = ProjectSyncer::new(Arc::clone(&provider) as Arc<dyn Provider>);

        let summary = syncer
            .apply(&CancelToken::new(), &graph, &opts())
            .await
            .unwrap();

        assert!(summary.is_success());
        assert_eq!(summary.created, 2);

        let calls = provider.calls();
        assert_eq!(
            calls,
            vec![
                "create tracking-plan:mobile".to_string(),
                "create event:checkout".to_string(),
            ]
        );

        // The event's reference was bound to the plan's remote id.
        let payloads = provider.payloads.lock().unwrap();
        let event_payload = &payloads["event:checkout"];
        assert_eq!(
            event_payload.get("plan"),
            Some(&PropertyValue::from("rm_mobile"))
        );

        let saved = provider.saved();
        assert!(saved.get_resource(&Urn::new("mobile", "tracking-plan")).is_some());
        assert!(saved.get_resource(&Urn::new("checkout", "event")).is_some());
    }

    #[tokio::test]
    async fn apply_updates_changed_resources() {
        let mut graph = Graph::new();
        graph.add_resource(plan_resource());

        let mut state = State::empty();
        state.add_resource(ResourceState {
            id: "mobile".into(),
            kind: "tracking-plan".into(),
            input: ResourceData::from([("name".to_string(), PropertyValue::from("Old"))]),
            output: ResourceData::from([("id".to_string(), PropertyValue::from("rm_mobile"))]),
            output_raw: None,
            dependencies: vec![],
        });

        let provider = Arc::new(MockProvider::with_state(state));
        let syncer = ProjectSyncer::new(Arc::clone(&provider) as Arc<dyn Provider>);

        let summary = syncer
            .apply(&CancelToken::new(), &graph, &opts())
            .await
            .unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(provider.calls(), vec!["update tracking-plan:mobile".to_string()]);

        let saved = provider.saved();
        let record = saved
            .get_resource(&Urn::new("mobile", "tracking-plan"))
            .unwrap();
        assert_eq!(record.input.get("name"), Some(&PropertyValue::from("Mobile")));
        assert_eq!(record.output.get("id"), Some(&PropertyValue::from("rm_mobile")));
    }

    #[tokio::test]
    async fn destroy_deletes_dependents_first() {
        let mut state = State::empty();
        state.add_resource(ResourceState {
            id: "mobile".into(),
            kind: "tracking-plan".into(),
            input: ResourceData::new(),
            output: ResourceData::from([("id".to_string(), PropertyValue::from("rm_mobile"))]),
            output_raw: None,
            dependencies: vec![],
        });
        state.add_resource(ResourceState {
            id: "checkout".into(),
            kind: "event".into(),
            input: ResourceData::new(),
            output: ResourceData::from([("id".to_string(), PropertyValue::from("rm_checkout"))]),
            output_raw: None,
            dependencies: vec![Urn::new("mobile", "tracking-plan")],
        });

        let provider = Arc::new(MockProvider::with_state(state));
        let syncer = ProjectSyncer::new(Arc::clone(&provider) as Arc<dyn Provider>);

        let summary = syncer
            .destroy(
                &CancelToken::new(),
                &SyncOptions {
                    concurrency: 4,
                    continue_on_fail: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(summary.deleted, 2);
        assert_eq!(
            provider.calls(),
            vec![
                "delete event:checkout".to_string(),
                "delete tracking-plan:mobile".to_string(),
            ]
        );
        assert!(provider.saved().resources.is_empty());
    }

    #[tokio::test]
    async fn failed_dependency_skips_its_dependents() {
        let mut graph = Graph::new();
        graph.add_resource(event_resource());
        graph.add_resource(plan_resource());

        let provider = Arc::new(MockProvider {
            fail_create: Some("tracking-plan:mobile".to_string()),
            ..Default::default()
        });
        let syncer = ProjectSyncer::new(Arc::clone(&provider) as Arc<dyn Provider>);

        let summary = syncer
            .apply(&CancelToken::new(), &graph, &opts())
            .await
            .unwrap();

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].task_id(), Some("tracking-plan:mobile"));
        assert_eq!(summary.created, 0);
        assert!(provider.calls().is_empty(), "the dependent event never ran");
        assert!(provider.saved().resources.is_empty());
    }

    #[tokio::test]
    async fn import_adopts_remote_resources() {
        let mut graph = Graph::new();
        graph.add_resource(plan_resource().with_import_metadata("tp_99", "ws_1"));

        let provider = Arc::new(MockProvider::default());
        let syncer = ProjectSyncer::new(Arc::clone(&provider) as Arc<dyn Provider>);

        let summary = syncer
            .apply(&CancelToken::new(), &graph, &opts())
            .await
            .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(provider.calls(), vec!["import tracking-plan:mobile".to_string()]);
        let saved = provider.saved();
        let record = saved
            .get_resource(&Urn::new("mobile", "tracking-plan"))
            .unwrap();
        assert_eq!(record.output.get("id"), Some(&PropertyValue::from("tp_99")));
    }
}
