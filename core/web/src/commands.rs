//! Host commands: list a Drive path, transfer a file between Drive accounts.
//!
//! Every call configures its own [`ConfigStore`], so concurrent calls never
//! see each other's credentials even though they reuse the remote names
//! `source` and `destination`.

use std::rc::Rc;
use tracing::{info, warn};

use cloudferry_common::Result;
use cloudferry_storage::config::TYPE_KEY;
use cloudferry_storage::gdrive::{DriveToken, BACKEND_NAME};
use cloudferry_storage::{
    create_default_registry, operations, ConfigStore, Fs, HttpTransport, ProviderRegistry,
};

use crate::error::BridgeResult;
use crate::types::{ListOutcome, TransferOutcome, TransferStage};

/// Remote name the transfer source is configured under.
pub const SOURCE_REMOTE: &str = "source";
/// Remote name the transfer destination is configured under.
pub const DESTINATION_REMOTE: &str = "destination";

/// Configure `remote` as a Drive remote authorized by `access_token`.
pub fn configure_drive(store: &mut ConfigStore, remote: &str, access_token: &str) -> Result<()> {
    let token = DriveToken::from_access_token(access_token).to_json()?;
    store.set(remote, TYPE_KEY, BACKEND_NAME);
    store.set(remote, "token", token);
    Ok(())
}

/// Shared state behind the host commands.
pub struct BridgeContext {
    registry: ProviderRegistry,
}

impl BridgeContext {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Context with the built-in backends, sending HTTP through `transport`.
    pub fn with_transport(transport: Rc<dyn HttpTransport>) -> BridgeResult<Self> {
        Ok(Self::new(create_default_registry(transport)?))
    }

    /// List the names of the entries at `path` in the Drive reachable with
    /// `access_token`. Failures are reported in the outcome.
    pub async fn list_files(&self, remote: &str, access_token: &str, path: &str) -> ListOutcome {
        let mut store = ConfigStore::new();
        let opened = match configure_drive(&mut store, remote, access_token) {
            Ok(()) => Fs::open(&self.registry, &store, &format!("{}:{}", remote, path)).await,
            Err(e) => Err(e),
        };

        let fs = match opened {
            Ok(fs) => fs,
            Err(e) => {
                warn!(remote, path, "Error creating filesystem: {}", e);
                return ListOutcome::Error(format!("Error creating filesystem: {}", e));
            }
        };

        match operations::list(&fs).await {
            Ok(entries) => {
                ListOutcome::Files(entries.into_iter().map(|entry| entry.remote).collect())
            }
            Err(e) => {
                warn!(remote, path, "Error listing: {}", e);
                ListOutcome::Error(format!("Error listing: {}", e))
            }
        }
    }

    /// Copy the file at `source_path` in one Drive to `destination_path` in
    /// another. Failures are reported in the outcome with the stage they
    /// happened at.
    pub async fn start_transfer(
        &self,
        source_token: &str,
        destination_token: &str,
        source_path: &str,
        destination_path: &str,
    ) -> TransferOutcome {
        let mut store = ConfigStore::new();

        let src = match self
            .open_drive(&mut store, SOURCE_REMOTE, source_token, source_path)
            .await
        {
            Ok(fs) => fs,
            Err(e) => return Self::fail(TransferStage::Source, e),
        };

        let dst = match self
            .open_drive(&mut store, DESTINATION_REMOTE, destination_token, destination_path)
            .await
        {
            Ok(fs) => fs,
            Err(e) => return Self::fail(TransferStage::Destination, e),
        };

        match operations::copy_single(&dst, &src).await {
            Ok(_) => {
                info!(source_path, destination_path, "Transfer complete");
                TransferOutcome::complete()
            }
            Err(e) => Self::fail(TransferStage::Transfer, e),
        }
    }

    async fn open_drive(
        &self,
        store: &mut ConfigStore,
        remote: &str,
        access_token: &str,
        path: &str,
    ) -> Result<Fs> {
        configure_drive(store, remote, access_token)?;
        Fs::open(&self.registry, store, &format!("{}:{}", remote, path)).await
    }

    fn fail(stage: TransferStage, error: cloudferry_common::Error) -> TransferOutcome {
        let outcome = TransferOutcome::failed(stage, error);
        warn!("{}", outcome.message());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cloudferry_common::{Error, RemotePath};
    use cloudferry_storage::{
        FetchTransport, HostFetch, HttpRequest, HttpResponse, MemoryProvider, StorageProvider,
    };
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    /// Host fetch that either rejects every call or answers from a script.
    #[derive(Default)]
    struct SimulatedHost {
        rejection: Option<String>,
        responses: RefCell<VecDeque<HttpResponse>>,
        requests: Rc<RefCell<Vec<HttpRequest>>>,
    }

    impl SimulatedHost {
        fn rejecting(message: &str) -> Self {
            Self {
                rejection: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn answering(bodies: Vec<serde_json::Value>) -> Self {
            let responses = bodies
                .into_iter()
                .map(|body| HttpResponse::new(200, body.to_string().into_bytes()))
                .collect();
            Self {
                responses: RefCell::new(responses),
                ..Self::default()
            }
        }
    }

    #[async_trait(?Send)]
    impl HostFetch for SimulatedHost {
        async fn fetch(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, String> {
            self.requests.borrow_mut().push(request.clone());
            if let Some(message) = &self.rejection {
                return Err(message.clone());
            }
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| "no scripted response".to_string())
        }
    }

    fn fetch_context(host: SimulatedHost) -> BridgeContext {
        BridgeContext::with_transport(Rc::new(FetchTransport::new(host))).unwrap()
    }

    /// Drive accounts keyed by access token, backed by memory providers.
    #[derive(Clone, Default)]
    struct Accounts(Rc<RefCell<HashMap<String, MemoryProvider>>>);

    impl Accounts {
        fn add(&self, access_token: &str) -> MemoryProvider {
            let provider = MemoryProvider::new();
            self.0
                .borrow_mut()
                .insert(access_token.to_string(), provider.clone());
            provider
        }
    }

    fn context(accounts: &Accounts) -> BridgeContext {
        let accounts = accounts.clone();
        let mut registry = ProviderRegistry::new();
        registry
            .register(
                BACKEND_NAME,
                Box::new(move |options: serde_json::Value| -> Result<Rc<dyn StorageProvider>> {
                    let token = options
                        .get("token")
                        .and_then(|v| v.as_str())
                        .ok_or_else(|| Error::Config("missing token".to_string()))?;
                    let token: serde_json::Value = serde_json::from_str(token)?;
                    let access_token = token["access_token"].as_str().unwrap_or_default();
                    let accounts = accounts.0.borrow();
                    let provider = accounts.get(access_token).ok_or_else(|| {
                        Error::Authentication("invalid credentials".to_string())
                    })?;
                    Ok(Rc::new(provider.clone()))
                }),
            )
            .unwrap();
        BridgeContext::new(registry)
    }

    #[test]
    fn test_configure_drive_last_write_wins() {
        let mut store = ConfigStore::new();
        configure_drive(&mut store, "drive", "token-a").unwrap();
        configure_drive(&mut store, "drive", "token-b").unwrap();

        let section = store.get("drive").unwrap();
        assert_eq!(section.backend(), Some("drive"));
        assert_eq!(section.get("token"), Some(r#"{"access_token":"token-b"}"#));
    }

    #[tokio::test]
    async fn test_list_files() {
        let accounts = Accounts::default();
        let drive = accounts.add("tok");
        drive.upload(&RemotePath::parse("a.txt"), vec![1]).await.unwrap();
        drive.create_dir(&RemotePath::parse("photos")).await.unwrap();
        let ctx = context(&accounts);

        let outcome = ctx.list_files("drive", "tok", "").await;
        assert_eq!(
            outcome,
            ListOutcome::Files(vec!["a.txt".to_string(), "photos".to_string()])
        );
    }

    #[tokio::test]
    async fn test_list_files_bad_token() {
        let ctx = context(&Accounts::default());

        let outcome = ctx.list_files("drive", "nobody", "").await;
        let error = outcome.error().unwrap();
        assert!(error.starts_with("Error creating filesystem: "));
        assert!(outcome.files().is_none());
    }

    #[tokio::test]
    async fn test_list_files_invalid_remote() {
        let accounts = Accounts::default();
        accounts.add("tok");
        let ctx = context(&accounts);

        // The colon makes the address name a remote that was never configured.
        let outcome = ctx.list_files("bad:name", "tok", "").await;
        assert!(outcome.error().is_some());
        assert!(outcome.files().is_none());
    }

    #[tokio::test]
    async fn test_list_files_missing_directory() {
        let accounts = Accounts::default();
        accounts.add("tok");
        let ctx = context(&accounts);

        let outcome = ctx.list_files("drive", "tok", "nowhere").await;
        assert!(outcome.error().unwrap().starts_with("Error listing: "));
    }

    #[tokio::test]
    async fn test_list_files_per_call_credentials() {
        let accounts = Accounts::default();
        accounts
            .add("tok-a")
            .upload(&RemotePath::parse("a"), vec![])
            .await
            .unwrap();
        accounts
            .add("tok-b")
            .upload(&RemotePath::parse("b"), vec![])
            .await
            .unwrap();
        let ctx = context(&accounts);

        assert_eq!(ctx.list_files("drive", "tok-a", "").await.files().unwrap(), ["a"]);
        assert_eq!(ctx.list_files("drive", "tok-b", "").await.files().unwrap(), ["b"]);
    }

    #[tokio::test]
    async fn test_start_transfer() {
        let accounts = Accounts::default();
        let src = accounts.add("src");
        let dst = accounts.add("dst");
        src.upload(&RemotePath::parse("report.pdf"), b"%PDF".to_vec())
            .await
            .unwrap();
        let ctx = context(&accounts);

        let outcome = ctx.start_transfer("src", "dst", "report.pdf", "").await;
        assert_eq!(outcome, TransferOutcome::complete());
        assert_eq!(
            dst.download(&RemotePath::parse("report.pdf")).await.unwrap(),
            b"%PDF".to_vec()
        );
    }

    #[tokio::test]
    async fn test_start_transfer_missing_source() {
        let accounts = Accounts::default();
        accounts.add("src");
        accounts.add("dst");
        let ctx = context(&accounts);

        let outcome = ctx.start_transfer("src", "dst", "ghost.txt", "").await;
        let message = outcome.message();
        assert!(message.contains("Source error") || message.contains("Transfer error"));
        assert!(!outcome.is_complete());
    }

    #[tokio::test]
    async fn test_start_transfer_bad_tokens() {
        let accounts = Accounts::default();
        accounts.add("src");
        let ctx = context(&accounts);

        let outcome = ctx.start_transfer("bogus", "src", "a", "b").await;
        assert!(matches!(
            outcome,
            TransferOutcome::Failed { stage: TransferStage::Source, .. }
        ));

        let outcome = ctx.start_transfer("src", "bogus", "a", "b").await;
        assert!(matches!(
            outcome,
            TransferOutcome::Failed { stage: TransferStage::Destination, .. }
        ));
        assert!(outcome.message().starts_with("Destination error: "));
    }

    #[tokio::test]
    async fn test_concurrent_transfers_keep_credentials_apart() {
        let accounts = Accounts::default();
        let src_a = accounts.add("src-a");
        let dst_a = accounts.add("dst-a");
        let src_b = accounts.add("src-b");
        let dst_b = accounts.add("dst-b");
        src_a.upload(&RemotePath::parse("f"), b"A".to_vec()).await.unwrap();
        src_b.upload(&RemotePath::parse("f"), b"B".to_vec()).await.unwrap();
        let ctx = context(&accounts);

        let (a, b) = futures::join!(
            ctx.start_transfer("src-a", "dst-a", "f", "f"),
            ctx.start_transfer("src-b", "dst-b", "f", "f"),
        );

        assert!(a.is_complete());
        assert!(b.is_complete());
        assert_eq!(dst_a.download(&RemotePath::parse("f")).await.unwrap(), b"A".to_vec());
        assert_eq!(dst_b.download(&RemotePath::parse("f")).await.unwrap(), b"B".to_vec());
    }

    #[tokio::test]
    async fn test_transfer_onto_same_file_keeps_it() {
        let accounts = Accounts::default();
        let drive = accounts.add("tok");
        drive.upload(&RemotePath::parse("f.txt"), b"keep".to_vec()).await.unwrap();
        let ctx = context(&accounts);

        let outcome = ctx.start_transfer("tok", "tok", "f.txt", "").await;
        assert!(outcome.is_complete());
        assert_eq!(
            drive.download(&RemotePath::parse("f.txt")).await.unwrap(),
            b"keep".to_vec()
        );
    }

    #[tokio::test]
    async fn test_transfer_onto_directory_rejected() {
        let accounts = Accounts::default();
        let drive = accounts.add("tok");
        drive.create_dir(&RemotePath::parse("docs")).await.unwrap();
        drive.create_dir(&RemotePath::parse("x")).await.unwrap();
        drive.upload(&RemotePath::parse("x/keep"), vec![1]).await.unwrap();
        drive.upload(&RemotePath::parse("docs/x"), vec![2]).await.unwrap();
        let ctx = context(&accounts);

        let outcome = ctx.start_transfer("tok", "tok", "docs/x", "").await;
        assert!(matches!(
            outcome,
            TransferOutcome::Failed { stage: TransferStage::Transfer, .. }
        ));
        assert!(drive.exists(&RemotePath::parse("x/keep")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_files_host_rejection() {
        let ctx = fetch_context(SimulatedHost::rejecting("network down"));

        let outcome = ctx.list_files("drive", "tok", "").await;
        assert!(outcome.error().unwrap().contains("network down"));
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("error").is_some());
        assert!(value.get("files").is_none());
    }

    #[tokio::test]
    async fn test_list_files_through_host_fetch() {
        let host = SimulatedHost::answering(vec![json!({
            "files": [
                {"id": "1", "name": "a.txt", "mimeType": "text/plain"},
                {"id": "2", "name": "photos", "mimeType": "application/vnd.google-apps.folder"}
            ]
        })]);
        let requests = host.requests.clone();
        let ctx = fetch_context(host);

        let outcome = ctx.list_files("drive", "tok", "").await;
        assert_eq!(
            outcome,
            ListOutcome::Files(vec!["a.txt".to_string(), "photos".to_string()])
        );

        let requests = requests.borrow();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .headers
            .iter()
            .any(|(name, value)| name == "Authorization" && value == "Bearer tok"));
    }

    #[tokio::test]
    async fn test_start_transfer_host_rejection() {
        let ctx = fetch_context(SimulatedHost::rejecting("network down"));

        let outcome = ctx.start_transfer("src", "dst", "f.txt", "").await;
        assert!(matches!(
            outcome,
            TransferOutcome::Failed { stage: TransferStage::Source, .. }
        ));
        assert!(outcome.message().contains("network down"));
    }
}
