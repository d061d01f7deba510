//! Workload view of the admission object
//!
//! Only the fields the hostPath policy reads are modelled:
//!
//! - `spec.volumes[].{name, hostPath.path}`
//! - `spec.template.spec.containers[].volumeMounts[].{name, readOnly}`
//! - `spec.template.spec.initContainers[].volumeMounts[].{name, readOnly}`
//!
//! Every level is optional except the names, which the API server always sets.
//! All other fields of the object are ignored.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkloadObject {
    spec: Option<ObjectSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectSpec {
    volumes: Option<Vec<Volume>>,
    template: Option<PodTemplate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodTemplate {
    spec: Option<PodTemplateSpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodTemplateSpec {
    containers: Option<Vec<Container>>,
    init_containers: Option<Vec<Container>>,
}

/// A pod volume, possibly backed by a node path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,
    pub host_path: Option<HostPath>,
}

impl Volume {
    /// The node path, when this is a hostPath volume with a non-empty path
    pub fn host_path(&self) -> Option<&str> {
        self.host_path
            .as_ref()
            .and_then(|hp| hp.path.as_deref())
            .filter(|path| !path.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPath {
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    pub volume_mounts: Option<Vec<VolumeMount>>,
}

impl Container {
    pub fn mounts(&self) -> &[VolumeMount] {
        self.volume_mounts.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub name: String,
    pub read_only: Option<bool>,
}

impl VolumeMount {
    /// Only an explicit `readOnly: true` counts; absent means writable
    pub fn is_read_only(&self) -> bool {
        self.read_only == Some(true)
    }
}

/// Which container list a mount was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Container,
    InitContainer,
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::Container => write!(f, "container"),
            ContainerKind::InitContainer => write!(f, "initContainer"),
        }
    }
}

/// The volumes and container lists of one admission request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub volumes: Vec<Volume>,
    pub containers: Vec<Container>,
    pub init_containers: Vec<Container>,
}

impl WorkloadSpec {
    /// Extract the workload view from a raw `request.object`.
    ///
    /// Fails only when a present field has the wrong shape, for example a
    /// volume without a name or a non-boolean `readOnly`.
    pub fn from_object(object: serde_json::Value) -> Result<Self, serde_json::Error> {
        let object: WorkloadObject = serde_json::from_value(object)?;
        let spec = object.spec.unwrap_or_default();
        let pod = spec
            .template
            .and_then(|template| template.spec)
            .unwrap_or_default();

        Ok(Self {
            volumes: spec.volumes.unwrap_or_default(),
            containers: pod.containers.unwrap_or_default(),
            init_containers: pod.init_containers.unwrap_or_default(),
        })
    }

    /// Volumes that carry a non-empty hostPath, with that path
    pub fn host_path_volumes(&self) -> impl Iterator<Item = (&Volume, &str)> {
        self.volumes
            .iter()
            .filter_map(|volume| volume.host_path().map(|path| (volume, path)))
    }

    /// Every mount of `volume_name`, containers first, then init containers
    pub fn mounts_of<'a>(
        &'a self,
        volume_name: &'a str,
    ) -> impl Iterator<Item = (ContainerKind, &'a Container, &'a VolumeMount)> + 'a {
        let containers = self
            .containers
            .iter()
            .map(|c| (ContainerKind::Container, c));
        let init_containers = self
            .init_containers
            .iter()
            .map(|c| (ContainerKind::InitContainer, c));

        containers
            .chain(init_containers)
            .flat_map(|(kind, container)| {
                container
                    .mounts()
                    .iter()
                    .map(move |mount| (kind, container, mount))
            })
            .filter(move |(_, _, mount)| mount.name == volume_name)
    }
}
