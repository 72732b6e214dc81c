#![allow(dead_code)]

use reqwest::blocking::Client;
use sota_admin_cli::api::ApiClient;
use sota_admin_cli::model::UploadFile;
use sota_admin_cli::session::SessionManager;
use sota_admin_cli::storage::{CredentialStore, FileStore, MemoryStore, IDENTITY_KEY, TOKEN_KEY};
use std::sync::Arc;
use tempfile::TempDir;

pub const TOKEN: &str = "tok123";
pub const EMAIL: &str = "a@b.com";

/// A mock backend plus a client wired to it through an in-memory store.
pub struct TestEnv {
    pub server: mockito::ServerGuard,
    pub storage: Arc<MemoryStore>,
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
}

impl TestEnv {
    pub fn signed_out() -> Self {
        Self::with_storage(Arc::new(MemoryStore::new()))
    }

    pub fn signed_in() -> Self {
        let storage = Arc::new(MemoryStore::new());
        storage.set(TOKEN_KEY, TOKEN).expect("seed token");
        storage.set(IDENTITY_KEY, EMAIL).expect("seed identity");
        Self::with_storage(storage)
    }

    fn with_storage(storage: Arc<MemoryStore>) -> Self {
        let server = mockito::Server::new();
        let client = Client::new();
        let session = Arc::new(SessionManager::new(storage.clone(), client.clone(), &server.url()));
        session.initialize();
        let api = ApiClient::new(client, &server.url(), session.clone());
        TestEnv {
            server,
            storage,
            session,
            api,
        }
    }
}

/// Same wiring but persisted to a session file in a temp dir.
pub struct FileEnv {
    _tmp: TempDir,
    pub server: mockito::ServerGuard,
    pub store: Arc<FileStore>,
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
}

impl FileEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let store = Arc::new(FileStore::new(tmp.path().join("session.json")));
        let server = mockito::Server::new();
        let client = Client::new();
        let session = Arc::new(SessionManager::new(store.clone(), client.clone(), &server.url()));
        session.initialize();
        let api = ApiClient::new(client, &server.url(), session.clone());
        FileEnv {
            _tmp: tmp,
            server,
            store,
            session,
            api,
        }
    }

    /// A second manager over the same file, as after a restart.
    pub fn reopen(&self) -> SessionManager {
        let session = SessionManager::new(self.store.clone(), Client::new(), &self.server.url());
        session.initialize();
        session
    }
}

pub fn csv_file() -> UploadFile {
    UploadFile::new("parks.csv", "reference,name\nJA-0001,Shiretoko\n")
}

/// Base URL nothing listens on.
pub fn dead_url() -> String {
    "http://127.0.0.1:1".to_string()
}
