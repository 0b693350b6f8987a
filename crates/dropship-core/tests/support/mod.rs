//! In-memory collaborators for driving the orchestrator without a network.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dropship_core::archive::Archive;
use dropship_core::error::RemoteFailure;
use dropship_core::platform::{CredentialBroker, DeploymentTrigger, ObjectStore, ProjectProvisioner};
use dropship_core::types::{
    Deployment, Project, ProjectKind, ProjectOrigin, UploadCredential, UploadRequest,
    UploadedArtifact,
};

pub fn write_build_output(dir: &Path) {
    std::fs::create_dir_all(dir).expect("Failed to create build dir");
    std::fs::write(dir.join("index.html"), "<html><body>hi</body></html>")
        .expect("Failed to write index.html");
    std::fs::write(dir.join("bundle.js"), "console.log('hi')").expect("Failed to write bundle.js");
}

pub struct FakeProvisioner {
    pub created: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
    pub fail_with: Option<RemoteFailure>,
    pub fail_delete: bool,
}

impl FakeProvisioner {
    pub fn ok() -> Self {
        Self {
            created: AtomicUsize::new(0),
            deleted: Mutex::new(Vec::new()),
            fail_with: None,
            fail_delete: false,
        }
    }

    pub fn failing(failure: RemoteFailure) -> Self {
        Self {
            fail_with: Some(failure),
            ..Self::ok()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProjectProvisioner for FakeProvisioner {
    async fn create_project(
        &self,
        name: &str,
        kind: &ProjectKind,
    ) -> Result<Project, RemoteFailure> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = &self.fail_with {
            return Err(failure.clone());
        }
        Ok(Project {
            id: "p1".to_string(),
            api_key: "k1".to_string(),
            name: name.to_string(),
            kind: kind.clone(),
            origin: ProjectOrigin::Created,
        })
    }

    async fn delete_project(&self, project: &Project) -> Result<(), RemoteFailure> {
        if self.fail_delete {
            return Err(RemoteFailure::from_status(500, "cannot delete"));
        }
        self.deleted.lock().unwrap().push(project.id.clone());
        Ok(())
    }
}

/// Issues `u<n>`/`d<n>`/`f<n>` credentials; fails the first `failures` calls.
pub struct FakeBroker {
    pub calls: AtomicUsize,
    pub failures: Vec<RemoteFailure>,
    pub tokens: Mutex<Vec<String>>,
}

impl FakeBroker {
    pub fn ok() -> Self {
        Self::failing_first(Vec::new())
    }

    pub fn failing_first(failures: Vec<RemoteFailure>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures,
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialBroker for FakeBroker {
    async fn request_upload(
        &self,
        project: &Project,
        request: &UploadRequest,
    ) -> Result<UploadCredential, RemoteFailure> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(project.api_key.clone());
        if let Some(failure) = self.failures.get(n) {
            return Err(failure.clone());
        }
        assert_eq!(request.filename, "bundle.zip");
        let n = n + 1;
        Ok(UploadCredential::new(
            format!("https://store.example/u{n}"),
            format!("https://store.example/d{n}"),
            format!("f{n}"),
            900,
        ))
    }
}

/// Records every write URL it receives; fails the first `failures` puts.
pub struct FakeStore {
    pub puts: Mutex<Vec<String>>,
    pub sizes: Mutex<Vec<usize>>,
    pub failures: Vec<RemoteFailure>,
}

impl FakeStore {
    pub fn ok() -> Self {
        Self::failing_first(Vec::new())
    }

    pub fn failing_first(failures: Vec<RemoteFailure>) -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
            sizes: Mutex::new(Vec::new()),
            failures,
        }
    }

    pub fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put_archive(
        &self,
        credential: &UploadCredential,
        archive: &Archive,
    ) -> Result<(), RemoteFailure> {
        let mut puts = self.puts.lock().unwrap();
        let n = puts.len();
        puts.push(credential.write_url().to_string());
        self.sizes.lock().unwrap().push(archive.size());
        match self.failures.get(n) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

pub struct FakeTrigger {
    pub calls: AtomicUsize,
    pub projects: Mutex<Vec<String>>,
    pub read_urls: Mutex<Vec<String>>,
    pub fail_with: Option<RemoteFailure>,
}

impl FakeTrigger {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            projects: Mutex::new(Vec::new()),
            read_urls: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    pub fn failing(failure: RemoteFailure) -> Self {
        Self {
            fail_with: Some(failure),
            ..Self::ok()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeploymentTrigger for FakeTrigger {
    async fn trigger(
        &self,
        project: &Project,
        artifact: &UploadedArtifact,
    ) -> Result<Deployment, RemoteFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.projects.lock().unwrap().push(project.id.clone());
        self.read_urls
            .lock()
            .unwrap()
            .push(artifact.read_url().to_string());
        if let Some(failure) = &self.fail_with {
            return Err(failure.clone());
        }
        Ok(Deployment {
            id: "dep1".to_string(),
            public_url: "https://app.example/dep1".to_string(),
        })
    }
}
