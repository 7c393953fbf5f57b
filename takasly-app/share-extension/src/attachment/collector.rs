use std::sync::Arc;

use tracing::{debug, info};

use super::{LoadedItem, TypeIdentifier};
use crate::barrier::LoadBarrier;
use crate::handoff::HandoffStore;
use crate::request::{Attachment, ShareRequest};

/// Walks a share request and starts one background load per supported attachment.
pub struct AttachmentCollector {
    supported_type: TypeIdentifier,
}

impl AttachmentCollector {
    pub fn new(supported_type: TypeIdentifier) -> Self {
        Self { supported_type }
    }

    /// Issue the loads and return how many were started, without waiting for any.
    ///
    /// Every load holds a barrier guard until its result has been handed to the
    /// store (or dropped). An extra guard is held while enumerating so the barrier
    /// cannot drain before the last load is issued.
    pub fn collect(
        &self,
        request: &ShareRequest,
        store: &Arc<HandoffStore>,
        barrier: &Arc<LoadBarrier>,
    ) -> usize {
        let _enumerating = barrier.enter();
        let mut issued = 0;

        for (item_index, item) in request.items.iter().enumerate() {
            for attachment in &item.attachments {
                if !attachment.has_item_conforming_to(&self.supported_type) {
                    debug!(
                        "Skipping attachment in item {} ({:?}): not {}",
                        item_index,
                        attachment.registered_type_identifiers(),
                        self.supported_type
                    );
                    continue;
                }

                let guard = barrier.enter();
                let attachment = Arc::clone(attachment);
                let store = Arc::clone(store);
                let type_identifier = self.supported_type.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    load_and_persist(attachment, type_identifier, store).await;
                });
                issued += 1;
            }
        }

        info!(
            "Issued {} attachment loads for {} items",
            issued,
            request.items.len()
        );
        issued
    }
}

async fn load_and_persist(
    attachment: Attachment,
    type_identifier: TypeIdentifier,
    store: Arc<HandoffStore>,
) {
    match attachment.load_item(&type_identifier).await {
        Ok(LoadedItem::File(path)) => {
            store.persist(&path).await;
        }
        Ok(LoadedItem::Other { description }) => {
            debug!("Attachment is not a local file ({}), skipping", description);
        }
        Err(e) => {
            debug!("Attachment load failed, skipping: {}", e);
        }
    }
}
