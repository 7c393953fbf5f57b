use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use takasly_share_lib::{
    shared_record, ActivationAddress, CompletionSignal, ExtensionSettings, FileItemProvider,
    HandoffPhase, HandoffRecord, HostActivator, InputItem, ItemProvider, KeyValueStore,
    LoadedItem, MemoryDefaults, Result, ShareError, ShareExtension, ShareRequest, TypeIdentifier,
    UnavailableActivator,
};

/// Host double that snapshots the record at the moment it is activated.
struct RecordingHost {
    record: HandoffRecord,
    activations: Mutex<Vec<Vec<String>>>,
}

impl RecordingHost {
    fn new(record: HandoffRecord) -> Arc<Self> {
        Arc::new(Self {
            record,
            activations: Mutex::new(Vec::new()),
        })
    }

    fn activations(&self) -> Vec<Vec<String>> {
        self.activations.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostActivator for RecordingHost {
    async fn open(&self, address: &ActivationAddress) -> Result<()> {
        assert_eq!(address.to_string(), "takasly://share");
        let snapshot = self.record.load()?;
        self.activations.lock().unwrap().push(snapshot);
        Ok(())
    }
}

/// Image attachment whose load blocks until the gate opens.
struct GatedImage {
    source: Option<PathBuf>,
    gate: watch::Receiver<bool>,
}

#[async_trait]
impl ItemProvider for GatedImage {
    fn registered_type_identifiers(&self) -> Vec<TypeIdentifier> {
        vec![TypeIdentifier::new("public.jpeg")]
    }

    async fn load_item(&self, _type_identifier: &TypeIdentifier) -> Result<LoadedItem> {
        let mut gate = self.gate.clone();
        gate.wait_for(|open| *open)
            .await
            .map_err(|_| ShareError::Load("gate dropped".into()))?;
        match &self.source {
            Some(path) => Ok(LoadedItem::File(path.clone())),
            None => Err(ShareError::Load("simulated provider failure".into())),
        }
    }
}

/// Image attachment that resolves to something other than a local file.
struct InlineImage;

#[async_trait]
impl ItemProvider for InlineImage {
    fn registered_type_identifiers(&self) -> Vec<TypeIdentifier> {
        vec![TypeIdentifier::new("public.png")]
    }

    async fn load_item(&self, _type_identifier: &TypeIdentifier) -> Result<LoadedItem> {
        Ok(LoadedItem::Other {
            description: "in-memory image object".into(),
        })
    }
}

struct Harness {
    _root: tempfile::TempDir,
    settings: ExtensionSettings,
    defaults: Arc<MemoryDefaults>,
    sources: PathBuf,
}

impl Harness {
    fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let settings = ExtensionSettings {
            container_root: root.path().join("containers"),
            ..ExtensionSettings::default()
        };
        let sources = root.path().join("sources");
        std::fs::create_dir_all(&sources).unwrap();

        Self {
            settings,
            defaults: Arc::new(MemoryDefaults::new()),
            sources,
            _root: root,
        }
    }

    fn source(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.sources.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn record(&self) -> HandoffRecord {
        HandoffRecord::new(self.defaults.clone(), self.settings.record_key.clone())
    }

    fn extension(&self, host: Arc<dyn HostActivator>, context: Arc<CompletionSignal>) -> ShareExtension {
        ShareExtension::new(&self.settings, self.defaults.clone(), host, context).unwrap()
    }

    fn container_dir(&self) -> PathBuf {
        self.settings
            .container_root
            .join(&self.settings.group_identifier)
    }
}

fn assert_persisted_copy(path: &str, container: &Path, expected: &[u8]) {
    let path = Path::new(path);
    assert!(path.starts_with(container), "{} outside container", path.display());
    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("shared_") && name.ends_with(".jpg"), "{name}");
    assert_eq!(std::fs::read(path).unwrap(), expected);
}

#[tokio::test]
async fn test_all_attachments_persisted_byte_identical() {
    let harness = Harness::new();
    let host = RecordingHost::new(harness.record());
    let context = Arc::new(CompletionSignal::new());

    let contents: [&[u8]; 3] = [b"first image", b"second image", b"third image"];
    let mut item = InputItem::default();
    for (i, bytes) in contents.iter().enumerate() {
        item = item.with_attachment(FileItemProvider::new(
            harness.source(&format!("img{i}.jpg"), bytes),
        ));
    }

    let outcome = harness
        .extension(host.clone(), context.clone())
        .run(ShareRequest::default().with_item(item))
        .await
        .unwrap();

    assert_eq!(outcome.issued, 3);
    assert_eq!(outcome.persisted.len(), 3);
    assert!(outcome.activated);

    let record = harness.record().load().unwrap();
    assert_eq!(record, outcome.persisted);

    let persisted: HashSet<Vec<u8>> = record
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();
    let expected: HashSet<Vec<u8>> = contents.iter().map(|c| c.to_vec()).collect();
    assert_eq!(persisted, expected);
    for path in &record {
        assert!(Path::new(path).starts_with(harness.container_dir()));
    }

    assert_eq!(host.activations(), vec![record]);
    assert_eq!(context.completion_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_failure_of_three_activates_once_after_all_resolve() {
    let harness = Harness::new();
    let host = RecordingHost::new(harness.record());
    let context = Arc::new(CompletionSignal::new());
    let (open_gate, gate) = watch::channel(false);

    let a = harness.source("a.jpg", b"aaaa");
    let b = harness.source("b.jpg", b"bbbb");
    let request = ShareRequest::default()
        .with_item(InputItem::default().with_attachment(GatedImage {
            source: Some(a),
            gate: gate.clone(),
        }))
        .with_item(
            InputItem::default()
                .with_attachment(GatedImage {
                    source: None,
                    gate: gate.clone(),
                })
                .with_attachment(GatedImage {
                    source: Some(b),
                    gate: gate.clone(),
                }),
        );

    let extension = harness.extension(host.clone(), context.clone());
    let pending = extension.handle_share_request(request).unwrap();
    assert_eq!(pending.issued(), 3);

    let finishing = tokio::spawn(pending.finish());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(host.activations().is_empty(), "activated while loads outstanding");
    assert!(!context.is_complete());
    assert_eq!(extension.phase(), HandoffPhase::Collecting);

    open_gate.send(true).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), finishing)
        .await
        .expect("handoff should finish")
        .unwrap()
        .unwrap();

    assert_eq!(outcome.issued, 3);
    assert_eq!(outcome.persisted.len(), 2);
    let activations = host.activations();
    assert_eq!(activations.len(), 1);
    assert_eq!(activations[0].len(), 2);
    assert_eq!(harness.record().load().unwrap(), outcome.persisted);
    assert_eq!(context.completion_count(), 1);
    assert_eq!(extension.phase(), HandoffPhase::Terminated);
}

#[tokio::test]
async fn test_no_matching_attachments_still_activates_with_empty_record() {
    let harness = Harness::new();
    harness
        .defaults
        .set_string_array(&harness.settings.record_key, &["/old/shared_X.jpg".to_string()])
        .unwrap();
    let host = RecordingHost::new(harness.record());
    let context = Arc::new(CompletionSignal::new());

    let request = ShareRequest::default()
        .with_item(InputItem::default())
        .with_item(
            InputItem::default().with_attachment(FileItemProvider::new(
                harness.source("notes.txt", b"not an image"),
            )),
        );

    let outcome = harness
        .extension(host.clone(), context.clone())
        .run(request)
        .await
        .unwrap();

    assert_eq!(outcome.issued, 0);
    assert!(outcome.persisted.is_empty());
    assert_eq!(host.activations(), vec![Vec::<String>::new()]);
    assert_eq!(context.completion_count(), 1);
    assert_eq!(harness.record().load().unwrap(), Vec::<String>::new());
}

#[tokio::test]
async fn test_empty_request_activates_and_tears_down_once() {
    let harness = Harness::new();
    let host = RecordingHost::new(harness.record());
    let context = Arc::new(CompletionSignal::new());

    harness
        .extension(host.clone(), context.clone())
        .run(ShareRequest::default())
        .await
        .unwrap();

    assert_eq!(host.activations().len(), 1);
    assert_eq!(context.completion_count(), 1);
}

#[tokio::test]
async fn test_repeated_shares_overwrite_record() {
    let harness = Harness::new();
    let first = ShareRequest::default().with_item(
        InputItem::default()
            .with_attachment(FileItemProvider::new(harness.source("1.jpg", b"one")))
            .with_attachment(FileItemProvider::new(harness.source("2.jpg", b"two"))),
    );
    let second = ShareRequest::default().with_item(
        InputItem::default()
            .with_attachment(FileItemProvider::new(harness.source("3.jpg", b"three"))),
    );

    let extension = ShareExtension::with_file_defaults(
        &harness.settings,
        Arc::new(UnavailableActivator),
        Arc::new(CompletionSignal::new()),
    )
    .unwrap();
    extension.run(first).await.unwrap();
    assert_eq!(shared_record(&harness.settings).unwrap().load().unwrap().len(), 2);

    // A later share is a fresh extension process against the same group.
    let extension = ShareExtension::with_file_defaults(
        &harness.settings,
        Arc::new(UnavailableActivator),
        Arc::new(CompletionSignal::new()),
    )
    .unwrap();
    extension.run(second).await.unwrap();

    let record = shared_record(&harness.settings).unwrap().load().unwrap();
    assert_eq!(record.len(), 1);
    assert_persisted_copy(&record[0], &harness.container_dir(), b"three");
}

#[tokio::test]
async fn test_truncated_defaults_file_is_replaced_by_next_share() {
    let harness = Harness::new();
    std::fs::create_dir_all(harness.container_dir()).unwrap();
    let defaults_path = harness
        .container_dir()
        .join(format!("{}.defaults.json", harness.settings.group_identifier));
    std::fs::write(&defaults_path, r#"{"share_images": ["/old.jpg""#).unwrap();

    let request = ShareRequest::default().with_item(
        InputItem::default()
            .with_attachment(FileItemProvider::new(harness.source("fresh.jpg", b"fresh"))),
    );
    let extension = ShareExtension::with_file_defaults(
        &harness.settings,
        Arc::new(UnavailableActivator),
        Arc::new(CompletionSignal::new()),
    )
    .unwrap();
    let outcome = extension.run(request).await.unwrap();

    assert!(outcome.recorded);
    assert_eq!(outcome.persisted.len(), 1);
    let record = shared_record(&harness.settings).unwrap().load().unwrap();
    assert_eq!(record, outcome.persisted);
    assert_persisted_copy(&record[0], &harness.container_dir(), b"fresh");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_completions_get_distinct_names() {
    let harness = Harness::new();
    let host = RecordingHost::new(harness.record());
    let context = Arc::new(CompletionSignal::new());
    let source = harness.source("same.jpg", b"identical bytes");

    let mut item = InputItem::default();
    for _ in 0..32 {
        item = item.with_attachment(FileItemProvider::new(&source));
    }

    let outcome = harness
        .extension(host, context)
        .run(ShareRequest::default().with_item(item))
        .await
        .unwrap();

    let unique: HashSet<&String> = outcome.persisted.iter().collect();
    assert_eq!(outcome.persisted.len(), 32);
    assert_eq!(unique.len(), 32);
    for path in &outcome.persisted {
        assert_persisted_copy(path, &harness.container_dir(), b"identical bytes");
    }
}

#[tokio::test]
async fn test_unreachable_host_still_records_and_tears_down() {
    let harness = Harness::new();
    let context = Arc::new(CompletionSignal::new());
    let request = ShareRequest::default().with_item(
        InputItem::default().with_attachment(FileItemProvider::new(harness.source("p.jpg", b"p"))),
    );

    let outcome = harness
        .extension(Arc::new(UnavailableActivator), context.clone())
        .run(request)
        .await
        .unwrap();

    assert!(!outcome.activated);
    assert_eq!(harness.record().load().unwrap().len(), 1);
    assert_eq!(context.completion_count(), 1);
}

#[tokio::test]
async fn test_missing_and_non_file_items_are_dropped() {
    let harness = Harness::new();
    let host = RecordingHost::new(harness.record());
    let context = Arc::new(CompletionSignal::new());

    let request = ShareRequest::default().with_item(
        InputItem::default()
            .with_attachment(InlineImage)
            .with_attachment(FileItemProvider::new(harness.sources.join("deleted.jpg")))
            .with_attachment(FileItemProvider::new(harness.source("kept.png", b"kept"))),
    );

    let outcome = harness
        .extension(host.clone(), context)
        .run(request)
        .await
        .unwrap();

    assert_eq!(outcome.issued, 3);
    assert_eq!(outcome.persisted.len(), 1);
    assert_persisted_copy(&outcome.persisted[0], &harness.container_dir(), b"kept");
    assert_eq!(host.activations().len(), 1);
}
