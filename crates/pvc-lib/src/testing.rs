//! In-memory cluster used by unit tests

use crate::cluster::{ClusterApi, DeletePolicy};
use crate::error::{Error, Result};
use crate::models::{ClaimInfo, PodInfo, PodPhase};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::core::ErrorResponse;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn api_error(code: u16, reason: &str, message: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: reason.to_string(),
        code,
    }))
}

pub fn pod(name: &str, phase: PodPhase, claims: &[&str]) -> PodInfo {
    PodInfo {
        name: name.to_string(),
        namespace: "default".to_string(),
        phase,
        claim_refs: claims.iter().map(|c| c.to_string()).collect(),
        node_name: Some("worker-1".to_string()),
    }
}

/// Outcome of a scripted `create_pod` call
pub enum CreateOutcome {
    Created,
    InsufficientResources,
    Forbidden,
}

/// Mock control plane with scripted responses and call recording
pub struct MockCluster {
    pub pods: Mutex<Vec<PodInfo>>,
    pub claim_capacity: Mutex<Option<u64>>,
    /// Latency of every `get_claim` call
    pub claim_delay: Mutex<Option<Duration>>,
    pub logs: Mutex<Option<String>>,
    /// Phases reported for created pods, one per `get_pod` call; the last
    /// one repeats
    pub created_phases: Mutex<VecDeque<PodPhase>>,
    pub create_outcomes: Mutex<VecDeque<CreateOutcome>>,
    pub fail_delete: Mutex<bool>,
    /// Answer deletes with 404 instead of recording them
    pub delete_not_found: Mutex<bool>,
    /// Number of `get_pod` calls a deleted pre-existing pod stays visible for
    pub linger_after_delete: AtomicUsize,
    pub created: Mutex<Vec<Pod>>,
    pub deleted: Mutex<Vec<(String, DeletePolicy)>>,
    pub create_calls: AtomicUsize,
    pub log_calls: AtomicUsize,
    pub claim_calls: AtomicUsize,
}

impl MockCluster {
    pub fn new(pods: Vec<PodInfo>) -> Self {
        Self {
            pods: Mutex::new(pods),
            claim_capacity: Mutex::new(Some(10 * 1024 * 1024 * 1024)),
            claim_delay: Mutex::new(None),
            logs: Mutex::new(None),
            created_phases: Mutex::new(VecDeque::from([PodPhase::Running])),
            create_outcomes: Mutex::new(VecDeque::new()),
            fail_delete: Mutex::new(false),
            delete_not_found: Mutex::new(false),
            linger_after_delete: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            create_calls: AtomicUsize::new(0),
            log_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_logs(self, logs: &str) -> Self {
        *self.logs.lock().unwrap() = Some(logs.to_string());
        self
    }

    pub fn with_claim_delay(self, delay: Duration) -> Self {
        *self.claim_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_create_outcomes(self, outcomes: Vec<CreateOutcome>) -> Self {
        *self.create_outcomes.lock().unwrap() = outcomes.into();
        self
    }

    pub fn with_created_phases(self, phases: Vec<PodPhase>) -> Self {
        *self.created_phases.lock().unwrap() = phases.into();
        self
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.deleted
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn is_created(&self, name: &str) -> bool {
        self.created
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.metadata.name.as_deref() == Some(name))
    }

    fn next_created_phase(&self) -> PodPhase {
        let mut phases = self.created_phases.lock().unwrap();
        if phases.len() > 1 {
            phases.pop_front().unwrap_or_default()
        } else {
            phases.front().copied().unwrap_or_default()
        }
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn list_pods(&self, _namespace: &str) -> Result<Vec<PodInfo>> {
        Ok(self.pods.lock().unwrap().clone())
    }

    async fn get_pod(&self, _namespace: &str, name: &str) -> Result<Option<PodInfo>> {
        if self.deleted_names().iter().any(|d| d == name) {
            let remaining = self.linger_after_delete.load(Ordering::SeqCst);
            if remaining > 0 {
                self.linger_after_delete.store(remaining - 1, Ordering::SeqCst);
            } else {
                self.pods.lock().unwrap().retain(|p| p.name != name);
            }
        }

        if let Some(found) = self.pods.lock().unwrap().iter().find(|p| p.name == name) {
            return Ok(Some(found.clone()));
        }

        if self.is_created(name) {
            return Ok(Some(PodInfo {
                name: name.to_string(),
                namespace: "default".to_string(),
                phase: self.next_created_phase(),
                claim_refs: Vec::new(),
                node_name: Some("worker-1".to_string()),
            }));
        }

        Ok(None)
    }

    async fn get_claim(&self, namespace: &str, name: &str) -> Result<ClaimInfo> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.claim_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match *self.claim_capacity.lock().unwrap() {
            Some(capacity) => Ok(ClaimInfo {
                namespace: namespace.to_string(),
                name: name.to_string(),
                requested_capacity_bytes: capacity,
                access_modes: vec!["ReadWriteOnce".to_string()],
            }),
            None => Err(Error::ClaimNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            }),
        }
    }

    async fn pod_logs(&self, _namespace: &str, name: &str, _tail_lines: i64) -> Result<String> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.logs
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| api_error(400, "BadRequest", &format!("container in pod {} is waiting", name)))
    }

    async fn create_pod(&self, _namespace: &str, pod: &Pod) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .create_outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(CreateOutcome::Created);

        match outcome {
            CreateOutcome::Created => {
                self.created.lock().unwrap().push(pod.clone());
                Ok(pod.metadata.name.clone().unwrap_or_default())
            }
            CreateOutcome::InsufficientResources => Err(Error::InsufficientResources(
                "0/3 nodes are available: 3 Insufficient cpu".to_string(),
            )),
            CreateOutcome::Forbidden => Err(api_error(403, "Forbidden", "pods is forbidden")),
        }
    }

    async fn delete_pod(&self, _namespace: &str, name: &str, policy: DeletePolicy) -> Result<()> {
        if *self.fail_delete.lock().unwrap() {
            return Err(api_error(500, "InternalError", "etcd timeout"));
        }
        if *self.delete_not_found.lock().unwrap() {
            return Err(api_error(404, "NotFound", &format!("pods \"{}\" not found", name)));
        }

        self.deleted.lock().unwrap().push((name.to_string(), policy));
        Ok(())
    }
}
