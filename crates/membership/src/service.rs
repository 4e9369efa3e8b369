//! Membership service façade and background reconciliation

use std::fmt::Debug;
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{RwLock, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::listener::ListenerSet;
use crate::local::LocalMemberManager;
use crate::registry::MembershipRegistry;
use crate::{
    Member, MemberId, MemberProvider, MembershipError, MembershipListener, MembershipProperties,
    MessageListener, config,
};

/// Bound on a single provider call; elapsing skips the cycle
const PROVIDER_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on joining the refresh task during shutdown
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Background task state
struct TaskState {
    refresh_task: Option<JoinHandle<()>>,
    shutdown_signal: Option<oneshot::Sender<()>>,
}

/// Tracks the live membership of the peer set.
///
/// Composes the registry, the local-member manager and the listener slots
/// behind a start/stop lifecycle. `start` performs one synchronous
/// reconciliation pass against the provider before spawning the
/// background refresh task, so callers see a populated view immediately.
/// Provider failures never stop the loop; the failed cycle is skipped and
/// retried on the normal schedule.
pub struct MembershipService<P>
where
    P: MemberProvider,
{
    provider: Arc<P>,
    properties: Arc<StdRwLock<MembershipProperties>>,
    registry: Arc<RwLock<Option<MembershipRegistry>>>,
    local: Arc<RwLock<LocalMemberManager>>,
    listeners: Arc<ListenerSet>,
    task_state: Arc<RwLock<TaskState>>,
}

impl<P> MembershipService<P>
where
    P: MemberProvider,
{
    /// Create a service with default properties
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_properties(provider, MembershipProperties::new())
    }

    /// Create a service with the given properties
    pub fn with_properties(provider: Arc<P>, properties: MembershipProperties) -> Self {
        Self {
            provider,
            properties: Arc::new(StdRwLock::new(properties)),
            registry: Arc::new(RwLock::new(None)),
            local: Arc::new(RwLock::new(LocalMemberManager::new())),
            listeners: Arc::new(ListenerSet::new()),
            task_state: Arc::new(RwLock::new(TaskState {
                refresh_task: None,
                shutdown_signal: None,
            })),
        }
    }

    /// Snapshot of the current properties
    pub fn properties(&self) -> MembershipProperties {
        self.properties.read().unwrap().clone()
    }

    /// Replace the properties wholesale
    pub fn set_properties(&self, properties: MembershipProperties) {
        *self.properties.write().unwrap() = properties;
    }

    /// Start the service.
    ///
    /// Builds (or updates) the local member from configuration, creates or
    /// resets the registry, initialises the provider, runs one synchronous
    /// reconciliation pass and spawns the background refresh task.
    /// Starting while already running is a no-op.
    ///
    /// # Errors
    ///
    /// Configuration and local-member construction errors, and provider
    /// `init` failures, propagate to the caller; the service is not
    /// started in that case.
    pub async fn start(&self) -> Result<(), MembershipError> {
        let mut task_state = self.task_state.write().await;
        if task_state.refresh_task.is_some() {
            debug!("membership service already started");
            return Ok(());
        }

        let properties = self.properties();
        let refresh_frequency = properties.refresh_frequency()?;
        let expiration_time = properties.expiration_time()?;

        let local_member = {
            let mut local = self.local.write().await;
            let member = local.create_or_update(&properties)?.clone();
            local.mark_service_start();
            member
        };
        info!(
            "starting membership service as {} (refresh every {:?})",
            local_member, refresh_frequency
        );

        {
            let mut registry = self.registry.write().await;
            match registry.as_mut() {
                Some(existing) => existing.reset(),
                None => *registry = Some(MembershipRegistry::new(local_member.id)),
            }
        }

        self.provider
            .init(&properties)
            .await
            .map_err(|e| MembershipError::Provider(e.to_string()))?;

        // Synchronous first pass so the view is populated before we return
        if let Err(e) =
            reconcile_once(&*self.provider, &self.registry, &self.listeners, expiration_time).await
        {
            warn!("initial reconciliation failed: {e}");
        }

        let provider = self.provider.clone();
        let registry = self.registry.clone();
        let listeners = self.listeners.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(refresh_frequency);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) =
                            reconcile_once(&*provider, &registry, &listeners, expiration_time).await
                        {
                            warn!("reconciliation cycle skipped: {e}");
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("membership refresh task shutting down");
                        break;
                    }
                }
            }
        });

        task_state.refresh_task = Some(task);
        task_state.shutdown_signal = Some(shutdown_tx);

        Ok(())
    }

    /// Stop the service.
    ///
    /// Cooperative: signals the refresh task and waits for it to observe
    /// the signal, bounded by an internal timeout. An in-flight provider
    /// call is not aborted; no further cycle begins once stopped. The
    /// last-reconciled view remains readable. Stopping a stopped service
    /// is a no-op.
    pub async fn stop(&self) -> Result<(), MembershipError> {
        info!("stopping membership service");

        let mut task_state = self.task_state.write().await;

        if let Some(shutdown_signal) = task_state.shutdown_signal.take() {
            let _ = shutdown_signal.send(());
        }

        if let Some(task) = task_state.refresh_task.take() {
            match timeout(SHUTDOWN_TIMEOUT, task).await {
                Ok(Ok(())) => debug!("membership refresh task completed"),
                Ok(Err(e)) => warn!("membership refresh task failed: {e}"),
                Err(_) => warn!(
                    "membership refresh task did not stop within {:?}",
                    SHUTDOWN_TIMEOUT
                ),
            }
        }

        Ok(())
    }

    /// Force an immediate reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns [`MembershipError::InvalidState`] before the first `start`,
    /// and [`MembershipError::Provider`] if the provider call fails or
    /// times out (unlike the background loop, which only logs).
    pub async fn force_refresh(&self) -> Result<(), MembershipError> {
        if self.registry.read().await.is_none() {
            return Err(MembershipError::InvalidState(
                "membership service has not been started".to_string(),
            ));
        }
        let expiration_time = self.properties().expiration_time()?;
        reconcile_once(&*self.provider, &self.registry, &self.listeners, expiration_time).await
    }

    /// Reconfigure the local member's endpoints.
    ///
    /// Updates the properties and the live descriptor; the unique id is
    /// preserved (identity persists across endpoint changes).
    pub async fn set_local_member_properties(
        &self,
        listen_host: &str,
        listen_port: u16,
        secure_port: u16,
        udp_port: u16,
    ) -> Result<(), MembershipError> {
        debug!(
            "set_local_member_properties({listen_host}, {listen_port}, {secure_port}, {udp_port})"
        );

        let properties = {
            let mut properties = self.properties.write().unwrap();
            properties.set(config::TCP_LISTEN_HOST, listen_host);
            properties.set(config::TCP_LISTEN_PORT, listen_port.to_string());
            properties.set(config::TCP_SECURE_PORT, secure_port.to_string());
            properties.set(config::UDP_LISTEN_PORT, udp_port.to_string());
            properties.clone()
        };

        let mut local = self.local.write().await;
        local.create_or_update(&properties)?;
        Ok(())
    }

    /// Snapshot of the local member, if configured. With `refresh`, the
    /// alive-duration is recomputed before returning.
    pub async fn local_member(&self, refresh: bool) -> Option<Member> {
        self.local.write().await.member(refresh)
    }

    /// Set the opaque payload carried by the local member
    pub async fn set_payload(&self, payload: Bytes) {
        self.local.write().await.set_payload(payload);
    }

    /// Set the opaque domain tag carried by the local member
    pub async fn set_domain(&self, domain: Bytes) {
        self.local.write().await.set_domain(domain);
    }

    /// Whether any peers are currently tracked
    pub async fn has_members(&self) -> bool {
        match self.registry.read().await.as_ref() {
            Some(registry) => registry.has_members(),
            None => false,
        }
    }

    /// Snapshot of all tracked peers (excluding the local member)
    pub async fn members(&self) -> Vec<Member> {
        match self.registry.read().await.as_ref() {
            Some(registry) => registry.members(),
            None => Vec::new(),
        }
    }

    /// Look up a member by id; resolves the local member as well as peers
    pub async fn get_member(&self, id: &MemberId) -> Option<Member> {
        if self.local.read().await.id() == Some(*id) {
            return self.local.write().await.member(false);
        }
        match self.registry.read().await.as_ref() {
            Some(registry) => registry.get_member(id),
            None => None,
        }
    }

    /// Names ("host:port") of all tracked peers
    pub async fn members_by_name(&self) -> Vec<String> {
        match self.registry.read().await.as_ref() {
            Some(registry) => registry.members_by_name(),
            None => Vec::new(),
        }
    }

    /// Look up a peer by its "host:port" name
    pub async fn find_member_by_name(&self, name: &str) -> Option<Member> {
        match self.registry.read().await.as_ref() {
            Some(registry) => registry.find_member_by_name(name),
            None => None,
        }
    }

    /// Register the membership observer, replacing any previous one
    pub fn set_membership_listener(&self, listener: Arc<dyn MembershipListener>) {
        self.listeners.set_membership_listener(listener);
    }

    /// Unregister the membership observer
    pub fn remove_membership_listener(&self) {
        self.listeners.remove_membership_listener();
    }

    /// Register the message observer, replacing any previous one
    pub fn set_message_listener(&self, listener: Arc<dyn MessageListener>) {
        self.listeners.set_message_listener(listener);
    }

    /// Unregister the message observer
    pub fn remove_message_listener(&self) {
        self.listeners.remove_message_listener();
    }

    /// Hand an inbound message from the transport layer to the current
    /// message observer (pass-through; gated by its accept predicate)
    pub fn message_received(&self, message: Bytes) {
        self.listeners.message_received(message);
    }

    /// Get provider reference
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }
}

/// One reconciliation cycle: fetch candidates, mark them alive, expire
/// the stale, then notify. All registry mutation happens under a single
/// write-lock acquisition, so a candidate reported in the same cycle it
/// would otherwise expire survives, and readers never see a half-applied
/// cycle. A provider failure leaves the registry untouched.
async fn reconcile_once<P>(
    provider: &P,
    registry: &RwLock<Option<MembershipRegistry>>,
    listeners: &ListenerSet,
    expiration_time: Duration,
) -> Result<(), MembershipError>
where
    P: MemberProvider,
{
    let candidates = match timeout(PROVIDER_CALL_TIMEOUT, provider.get_members()).await {
        Ok(Ok(candidates)) => candidates,
        Ok(Err(e)) => return Err(MembershipError::Provider(e.to_string())),
        Err(_) => {
            return Err(MembershipError::Provider(format!(
                "member provider did not answer within {PROVIDER_CALL_TIMEOUT:?}"
            )));
        }
    };
    debug!("provider returned {} candidate members", candidates.len());

    let (added, expired) = {
        let mut guard = registry.write().await;
        let registry = guard.as_mut().ok_or_else(|| {
            MembershipError::InvalidState("membership registry has not been created".to_string())
        })?;

        let mut added = Vec::new();
        for candidate in candidates {
            let id = candidate.id;
            if registry.mark_alive(candidate) {
                if let Some(member) = registry.get_member(&id) {
                    added.push(member);
                }
            }
        }

        (added, registry.expire(expiration_time))
    };

    for member in &added {
        info!("new member: {member}");
        listeners.member_added(member);
    }
    for member in &expired {
        info!("member disappeared: {member}");
        listeners.member_disappeared(member);
    }

    Ok(())
}

impl<P> Clone for MembershipService<P>
where
    P: MemberProvider,
{
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            properties: Arc::clone(&self.properties),
            registry: Arc::clone(&self.registry),
            local: Arc::clone(&self.local),
            listeners: Arc::clone(&self.listeners),
            task_state: Arc::clone(&self.task_state),
        }
    }
}

impl<P> Debug for MembershipService<P>
where
    P: MemberProvider,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipService").finish_non_exhaustive()
    }
}
