use std::sync::Arc;

use tracing::info;

use crate::activation::{Activator, ExtensionContext, HandoffOutcome, HostActivator};
use crate::attachment::AttachmentCollector;
use crate::barrier::LoadBarrier;
use crate::config::ExtensionSettings;
use crate::error::Result;
use crate::handoff::{
    AssetNaming, FileDefaults, HandoffRecord, HandoffStore, KeyValueStore, SharedContainer,
};
use crate::request::ShareRequest;
use crate::state::HandoffPhase;

/// One run of the share extension: collects the attachments of a single
/// request, persists them for the host app, then wakes the host and tears down.
pub struct ShareExtension {
    collector: AttachmentCollector,
    store: Arc<HandoffStore>,
    activator: Arc<Activator>,
}

impl ShareExtension {
    pub fn new(
        settings: &ExtensionSettings,
        defaults: Arc<dyn KeyValueStore>,
        host: Arc<dyn HostActivator>,
        context: Arc<dyn ExtensionContext>,
    ) -> Result<Self> {
        settings.validate()?;
        let container = resolve_container(settings)?;
        Self::assemble(settings, container, defaults, host, context)
    }

    /// Build an extension whose record lives in the group defaults file inside
    /// the shared container, where the host app reads it.
    pub fn with_file_defaults(
        settings: &ExtensionSettings,
        host: Arc<dyn HostActivator>,
        context: Arc<dyn ExtensionContext>,
    ) -> Result<Self> {
        settings.validate()?;
        let container = resolve_container(settings)?;
        let defaults = Arc::new(FileDefaults::for_group(
            container.dir(),
            &settings.group_identifier,
        ));
        Self::assemble(settings, container, defaults, host, context)
    }

    fn assemble(
        settings: &ExtensionSettings,
        container: SharedContainer,
        defaults: Arc<dyn KeyValueStore>,
        host: Arc<dyn HostActivator>,
        context: Arc<dyn ExtensionContext>,
    ) -> Result<Self> {
        let record = HandoffRecord::new(defaults, settings.record_key.clone());
        let activator = Activator::new(settings.activation_address()?, host, context);

        Ok(Self {
            collector: AttachmentCollector::new(settings.supported_type()),
            store: Arc::new(HandoffStore::new(container, record)),
            activator: Arc::new(activator),
        })
    }

    pub fn phase(&self) -> HandoffPhase {
        self.activator.phase()
    }

    /// Start loading every supported attachment and return without waiting.
    ///
    /// Must be called from within a tokio runtime. Only one request is handled
    /// per extension; later calls fail with an invalid transition.
    pub fn handle_share_request(&self, request: ShareRequest) -> Result<PendingHandoff> {
        self.activator.begin_collecting()?;
        info!("Handling share request: {:?}", request);

        let barrier = LoadBarrier::new();
        let issued = self.collector.collect(&request, &self.store, &barrier);

        Ok(PendingHandoff {
            issued,
            barrier,
            store: Arc::clone(&self.store),
            activator: Arc::clone(&self.activator),
        })
    }

    /// Handle `request` and wait for the hand-off to finish.
    pub async fn run(&self, request: ShareRequest) -> Result<HandoffOutcome> {
        self.handle_share_request(request)?.finish().await
    }
}

/// Loads in flight for a handled request.
///
/// [`finish`](Self::finish) runs on the caller's task, so the record flush,
/// activation and teardown are serialized with whatever else that task owns.
#[must_use = "the host app is only activated once the pending handoff is finished"]
pub struct PendingHandoff {
    issued: usize,
    barrier: Arc<LoadBarrier>,
    store: Arc<HandoffStore>,
    activator: Arc<Activator>,
}

impl PendingHandoff {
    pub fn issued(&self) -> usize {
        self.issued
    }

    /// Wait for every issued load to resolve, then flush, activate and tear down.
    pub async fn finish(self) -> Result<HandoffOutcome> {
        self.barrier.wait_idle().await;
        self.activator.finalize(&self.store, self.issued).await
    }
}

fn resolve_container(settings: &ExtensionSettings) -> Result<SharedContainer> {
    SharedContainer::resolve(
        &settings.container_root,
        &settings.group_identifier,
        AssetNaming::new(settings.asset_prefix.clone(), settings.asset_extension.clone()),
    )
}

/// The hand-off record as the host app sees it, backed by the group defaults file.
pub fn shared_record(settings: &ExtensionSettings) -> Result<HandoffRecord> {
    settings.validate()?;
    let container = resolve_container(settings)?;
    let defaults = FileDefaults::for_group(container.dir(), &settings.group_identifier);
    Ok(HandoffRecord::new(
        Arc::new(defaults),
        settings.record_key.clone(),
    ))
}
