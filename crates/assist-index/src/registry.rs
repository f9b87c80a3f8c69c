use std::collections::HashMap;
use std::sync::Arc;

use assist_config::AssistConfig;
use assist_core::ScopeId;
use assist_metadata::MergePolicy;
use assist_scheduler::Scheduler;
use parking_lot::Mutex;

use crate::service::MetadataService;

/// Index of metadata services keyed by scope. Services are created on first
/// use and live until [`ScopeRegistry::dispose`].
#[derive(Clone)]
pub struct ScopeRegistry {
    scheduler: Scheduler,
    policy: MergePolicy,
    services: Arc<Mutex<HashMap<ScopeId, MetadataService>>>,
}

impl ScopeRegistry {
    pub fn new(scheduler: Scheduler, policy: MergePolicy) -> Self {
        Self {
            scheduler,
            policy,
            services: Default::default(),
        }
    }

    /// A registry whose pool and merge policy come from `[index]` and
    /// `[metadata]` of `config`.
    pub fn from_config(config: &AssistConfig) -> Self {
        Self::new(
            Scheduler::new(config.index.scheduler_config()),
            config.metadata.merge_policy,
        )
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn get_or_create(&self, scope: &ScopeId) -> MetadataService {
        self.services
            .lock()
            .entry(scope.clone())
            .or_insert_with(|| {
                tracing::debug!(target = "assist.index", scope = %scope, "creating metadata service");
                MetadataService::new(scope.clone(), self.scheduler.clone(), self.policy)
            })
            .clone()
    }

    pub fn get(&self, scope: &ScopeId) -> Option<MetadataService> {
        self.services.lock().get(scope).cloned()
    }

    /// Remove the service for `scope`, cancelling its in-flight rebuild.
    ///
    /// Handles obtained earlier stay usable but see an empty tree.
    pub fn dispose(&self, scope: &ScopeId) -> bool {
        let Some(service) = self.services.lock().remove(scope) else {
            return false;
        };
        service.dispose();
        tracing::debug!(target = "assist.index", scope = %scope, "disposed metadata service");
        true
    }

    /// Registered scopes, sorted.
    pub fn scopes(&self) -> Vec<ScopeId> {
        let mut scopes: Vec<_> = self.services.lock().keys().cloned().collect();
        scopes.sort();
        scopes
    }
}
