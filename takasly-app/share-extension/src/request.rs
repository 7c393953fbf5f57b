use std::sync::Arc;

use crate::attachment::ItemProvider;

pub type Attachment = Arc<dyn ItemProvider>;

/// One item handed to the extension by the share sheet.
#[derive(Clone, Default)]
pub struct InputItem {
    pub attachments: Vec<Attachment>,
}

impl InputItem {
    pub fn new(attachments: Vec<Attachment>) -> Self {
        Self { attachments }
    }

    pub fn with_attachment(mut self, attachment: impl ItemProvider + 'static) -> Self {
        self.attachments.push(Arc::new(attachment));
        self
    }
}

/// The unit of work for one extension run. Items keep the order the share sheet gave them.
#[derive(Clone, Default)]
pub struct ShareRequest {
    pub items: Vec<InputItem>,
}

impl ShareRequest {
    pub fn new(items: Vec<InputItem>) -> Self {
        Self { items }
    }

    pub fn with_item(mut self, item: InputItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn attachment_count(&self) -> usize {
        self.items.iter().map(|item| item.attachments.len()).sum()
    }
}

impl std::fmt::Debug for ShareRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareRequest")
            .field("items", &self.items.len())
            .field("attachments", &self.attachment_count())
            .finish()
    }
}
