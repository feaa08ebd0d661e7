use std::collections::BTreeMap;

use super::ConfigError;

/// Named preset of config defaults for a common deployment shape. Packs
/// only participate at construction time; explicit fields always win.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPack {
    pub name: &'static str,
    pub dockerfile_template: &'static str,
    pub ports: &'static [u16],
    pub build_files: &'static [(&'static str, &'static str)],
}

impl DeploymentPack {
    pub fn build_files(&self) -> BTreeMap<String, String> {
        self.build_files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_string()))
            .collect()
    }
}

pub static FASTAPI: DeploymentPack = DeploymentPack {
    name: "fastapi",
    dockerfile_template: "fastapi-agent",
    ports: &[8000],
    build_files: &[],
};

pub static CREWAI: DeploymentPack = DeploymentPack {
    name: "crewai",
    dockerfile_template: "crewai-agent",
    ports: &[8000],
    build_files: &[("requirements.txt", "crewai\ncrewai-tools\n")],
};

pub static CREWAI_JOB: DeploymentPack = DeploymentPack {
    name: "crewai-job",
    dockerfile_template: "crewai-job",
    ports: &[],
    build_files: &[("requirements.txt", "crewai\ncrewai-tools\n")],
};

static PACKS: &[&DeploymentPack] = &[&FASTAPI, &CREWAI, &CREWAI_JOB];

/// Resolves a pack name. `None` falls back to the default pack; any name
/// not in the registry, the empty string included, is an error.
pub fn lookup(name: Option<&str>) -> Result<&'static DeploymentPack, ConfigError> {
    match name {
        None => Ok(&FASTAPI),
        Some(name) => PACKS
            .iter()
            .find(|pack| pack.name == name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownPack(name.to_string())),
    }
}
