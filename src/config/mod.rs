use std::collections::BTreeMap;
use std::fmt::Display;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DEPLOYMENT_DOMAIN;

pub mod packs;

pub use packs::DeploymentPack;

#[derive(Debug)]
pub enum ConfigError {
    UnknownPack(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::UnknownPack(name) => write!(f, "unknown deployment pack: {:?}", name),
        }
    }
}

impl std::error::Error for ConfigError {}

pub const DEFAULT_DOCKERFILE_TEMPLATE: &str = "fastapi-agent";
pub const DEFAULT_BRANCH: &str = "main";

/// Full configuration of one deployment, immutable after construction.
/// `tag` and `hostname` are derived exactly once, at build time, and only
/// when not supplied; a serialized config carries them pre-computed so a
/// reload never rederives them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub namespace: String,
    pub project_id: String,
    pub dockerfile_template: String,
    pub branch: String,
    pub replicas: u32,
    pub create_ingress: bool,
    pub force_recreate: bool,
    pub repository_url: Option<String>,
    pub github_access_token: Option<String>,
    pub entrypoint: Option<String>,
    pub watch_path: Option<String>,
    pub callback_url: Option<String>,
    pub ports: Vec<u16>,
    pub secret_names: Vec<String>,
    pub build_files: BTreeMap<String, String>,
    pub tag: String,
    pub hostname: String,
}

impl DeploymentConfig {
    pub fn builder(namespace: impl ToString, project_id: impl ToString) -> ConfigBuilder {
        ConfigBuilder::new(namespace, project_id)
    }

    /// Starts a builder seeded from a named pack. `None` selects the
    /// default pack; an unrecognized name (the empty string included)
    /// is an error.
    pub fn from_pack(
        pack: Option<&str>,
        namespace: impl ToString,
        project_id: impl ToString,
    ) -> Result<ConfigBuilder, ConfigError> {
        let pack = packs::lookup(pack)?;
        let mut builder = ConfigBuilder::new(namespace, project_id);
        builder.pack = Some(pack);
        Ok(builder)
    }

    pub fn serialize(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_serialized(record: &Value) -> Result<Self> {
        Ok(serde_json::from_value(record.clone())?)
    }
}

/// Collects explicit fields, then fills the gaps at `build` time:
/// explicit values win over pack defaults, pack defaults win over the
/// global defaults, and `tag`/`hostname` are derived only when absent.
#[derive(Debug)]
pub struct ConfigBuilder {
    namespace: String,
    project_id: String,
    pack: Option<&'static DeploymentPack>,
    dockerfile_template: Option<String>,
    branch: Option<String>,
    replicas: Option<u32>,
    create_ingress: Option<bool>,
    force_recreate: Option<bool>,
    repository_url: Option<String>,
    github_access_token: Option<String>,
    entrypoint: Option<String>,
    watch_path: Option<String>,
    callback_url: Option<String>,
    ports: Option<Vec<u16>>,
    secret_names: Option<Vec<String>>,
    build_files: Option<BTreeMap<String, String>>,
    tag: Option<String>,
    hostname: Option<String>,
}

impl ConfigBuilder {
    pub fn new(namespace: impl ToString, project_id: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            project_id: project_id.to_string(),
            pack: None,
            dockerfile_template: None,
            branch: None,
            replicas: None,
            create_ingress: None,
            force_recreate: None,
            repository_url: None,
            github_access_token: None,
            entrypoint: None,
            watch_path: None,
            callback_url: None,
            ports: None,
            secret_names: None,
            build_files: None,
            tag: None,
            hostname: None,
        }
    }

    pub fn with_dockerfile_template(mut self, template: impl Into<String>) -> Self {
        self.dockerfile_template = Some(template.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_replicas(mut self, replicas: u32) -> Self {
        self.replicas = Some(replicas);
        self
    }

    pub fn with_create_ingress(mut self, create_ingress: bool) -> Self {
        self.create_ingress = Some(create_ingress);
        self
    }

    pub fn with_force_recreate(mut self, force_recreate: bool) -> Self {
        self.force_recreate = Some(force_recreate);
        self
    }

    pub fn with_repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = Some(url.into());
        self
    }

    pub fn with_github_access_token(mut self, token: impl Into<String>) -> Self {
        self.github_access_token = Some(token.into());
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn with_watch_path(mut self, path: impl Into<String>) -> Self {
        self.watch_path = Some(path.into());
        self
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_ports(mut self, ports: Vec<u16>) -> Self {
        self.ports = Some(ports);
        self
    }

    pub fn with_secret_names(mut self, names: Vec<String>) -> Self {
        self.secret_names = Some(names);
        self
    }

    pub fn with_build_files(mut self, files: BTreeMap<String, String>) -> Self {
        self.build_files = Some(files);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn build(self) -> DeploymentConfig {
        let pack = self.pack;
        let tag = self.tag.unwrap_or_else(|| self.project_id.clone());
        let hostname = self
            .hostname
            .unwrap_or_else(|| format!("{}.{}", self.project_id, *DEPLOYMENT_DOMAIN));
        DeploymentConfig {
            dockerfile_template: self
                .dockerfile_template
                .or_else(|| pack.map(|p| p.dockerfile_template.to_string()))
                .unwrap_or_else(|| DEFAULT_DOCKERFILE_TEMPLATE.to_string()),
            branch: self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            replicas: self.replicas.unwrap_or(1),
            create_ingress: self.create_ingress.unwrap_or(true),
            force_recreate: self.force_recreate.unwrap_or(false),
            repository_url: self.repository_url,
            github_access_token: self.github_access_token,
            entrypoint: self.entrypoint,
            watch_path: self.watch_path,
            callback_url: self.callback_url,
            ports: self
                .ports
                .or_else(|| pack.map(|p| p.ports.to_vec()))
                .unwrap_or_default(),
            secret_names: self.secret_names.unwrap_or_default(),
            build_files: self
                .build_files
                .or_else(|| pack.map(DeploymentPack::build_files))
                .unwrap_or_default(),
            tag,
            hostname,
            namespace: self.namespace,
            project_id: self.project_id,
        }
    }
}
