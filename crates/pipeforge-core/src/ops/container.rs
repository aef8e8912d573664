//! Container steps

use super::k8s::{EnvVar, ResourceRequirements, UserContainer, Volume, VolumeMount};
use super::{dedup_refs, scan, OpAttributes, OpAttrs};
use crate::error::{CoreError, Result};
use crate::graph::TaskHandle;
use crate::param::{extract_refs, ParamRef, Parameter};
use crate::types::TypeSpec;

/// A file inside the container whose content becomes an output parameter
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutput {
    pub key: String,
    pub path: String,
    pub param_type: Option<TypeSpec>,
}

/// Argument passed to a typed component input
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    Param(Parameter),
    Literal(String),
}

impl BindingValue {
    /// Text substituted into the command line
    pub fn as_text(&self) -> String {
        match self {
            BindingValue::Param(param) => param.to_string(),
            BindingValue::Literal(value) => value.clone(),
        }
    }
}

impl From<&Parameter> for BindingValue {
    fn from(param: &Parameter) -> Self {
        BindingValue::Param(param.clone())
    }
}

impl From<Parameter> for BindingValue {
    fn from(param: Parameter) -> Self {
        BindingValue::Param(param)
    }
}

impl From<&str> for BindingValue {
    fn from(value: &str) -> Self {
        BindingValue::Literal(value.to_string())
    }
}

impl From<String> for BindingValue {
    fn from(value: String) -> Self {
        BindingValue::Literal(value)
    }
}

/// Argument bound to a component input, checked by the type checker
#[derive(Debug, Clone, PartialEq)]
pub struct InputBinding {
    pub input: String,
    pub expected: Option<TypeSpec>,
    pub value: BindingValue,
}

/// A step running one container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerOp {
    pub attrs: OpAttrs,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub file_outputs: Vec<FileOutput>,
    pub env: Vec<EnvVar>,
    pub volume_mounts: Vec<VolumeMount>,
    pub volumes: Vec<Volume>,
    pub resources: ResourceRequirements,
    pub sidecars: Vec<UserContainer>,
    pub init_containers: Vec<UserContainer>,
    pub bindings: Vec<InputBinding>,
}

impl ContainerOp {
    pub fn new(name: &str, image: impl Into<String>) -> Self {
        Self {
            attrs: OpAttrs::new(name),
            image: image.into(),
            command: Vec::new(),
            args: Vec::new(),
            file_outputs: Vec::new(),
            env: Vec::new(),
            volume_mounts: Vec::new(),
            volumes: Vec::new(),
            resources: ResourceRequirements::default(),
            sidecars: Vec::new(),
            init_containers: Vec::new(),
            bindings: Vec::new(),
        }
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn file_output(self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.push_file_output(key.into(), path.into(), None)
    }

    pub fn typed_file_output(self, key: impl Into<String>, path: impl Into<String>, param_type: TypeSpec) -> Self {
        self.push_file_output(key.into(), path.into(), Some(param_type))
    }

    fn push_file_output(mut self, key: String, path: String, param_type: Option<TypeSpec>) -> Self {
        match self.file_outputs.iter_mut().find(|o| o.key == key) {
            Some(existing) => {
                existing.path = path;
                existing.param_type = param_type;
            }
            None => self.file_outputs.push(FileOutput { key, path, param_type }),
        }
        self
    }

    pub fn add_env_variable(mut self, env: EnvVar) -> Self {
        self.env.push(env);
        self
    }

    pub fn add_volume_mount(mut self, mount: VolumeMount) -> Self {
        self.volume_mounts.push(mount);
        self
    }

    pub fn add_volume(mut self, volume: Volume) -> Self {
        self.volumes.push(volume);
        self
    }

    /// Mount the claim created by a volume step at `mount_path`.
    ///
    /// The claim name refers to the volume step's `name` output, which makes
    /// this operation depend on it.
    pub fn add_pvolume(self, mount_path: impl Into<String>, volume_task: &TaskHandle) -> Result<Self> {
        let claim = volume_task.output_named("name")?;
        let volume = Volume::pvc(volume_task.name.clone(), claim.to_string());
        Ok(self
            .add_volume(volume)
            .add_volume_mount(VolumeMount::new(volume_task.name.clone(), mount_path)))
    }

    pub fn set_cpu_request(mut self, cpu: impl Into<String>) -> Self {
        self.resources.requests.insert("cpu".to_string(), cpu.into());
        self
    }

    pub fn set_cpu_limit(mut self, cpu: impl Into<String>) -> Self {
        self.resources.limits.insert("cpu".to_string(), cpu.into());
        self
    }

    pub fn set_memory_request(mut self, memory: impl Into<String>) -> Self {
        self.resources.requests.insert("memory".to_string(), memory.into());
        self
    }

    pub fn set_memory_limit(mut self, memory: impl Into<String>) -> Self {
        self.resources.limits.insert("memory".to_string(), memory.into());
        self
    }

    pub fn set_gpu_limit(mut self, gpu: impl Into<String>, vendor: &str) -> Self {
        self.resources.limits.insert(format!("{}.com/gpu", vendor), gpu.into());
        self
    }

    pub fn add_sidecar(mut self, sidecar: UserContainer) -> Self {
        self.sidecars.push(sidecar);
        self
    }

    pub fn add_init_container(mut self, container: UserContainer) -> Self {
        self.init_containers.push(container);
        self
    }

    /// Record the argument given to a typed input
    pub fn bind_input(mut self, input: impl Into<String>, expected: Option<TypeSpec>, value: impl Into<BindingValue>) -> Self {
        self.bindings.push(InputBinding {
            input: input.into(),
            expected,
            value: value.into(),
        });
        self
    }

    /// Output parameters, one per file output
    pub fn outputs(&self) -> Vec<Parameter> {
        self.file_outputs
            .iter()
            .map(|o| {
                let param = Parameter::output(self.attrs.name.clone(), o.key.clone());
                match &o.param_type {
                    Some(t) => param.with_type(t.clone()),
                    None => param,
                }
            })
            .collect()
    }

    /// Sidecars with mirrored volume mounts filled in
    pub fn resolved_sidecars(&self) -> Vec<UserContainer> {
        self.sidecars
            .iter()
            .map(|sidecar| {
                let mut sidecar = sidecar.clone();
                if sidecar.mirror_volume_mounts {
                    for mount in &self.volume_mounts {
                        if !sidecar.volume_mounts.contains(mount) {
                            sidecar.volume_mounts.push(mount.clone());
                        }
                    }
                }
                sidecar
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.image.trim().is_empty() {
            return Err(CoreError::InvalidValue(format!(
                "container step '{}' has no image",
                self.attrs.human_name
            )));
        }
        Ok(())
    }

    pub fn referenced_params(&self) -> Vec<ParamRef> {
        let mut refs = extract_refs(&self.image);
        for item in self.command.iter().chain(self.args.iter()) {
            refs.extend(extract_refs(item));
        }
        scan(&self.env, &mut refs);
        scan(&self.volume_mounts, &mut refs);
        scan(&self.volumes, &mut refs);
        scan(&self.resources, &mut refs);
        scan(&self.sidecars, &mut refs);
        scan(&self.init_containers, &mut refs);
        for output in &self.file_outputs {
            refs.extend(extract_refs(&output.path));
        }
        self.attrs.collect_refs(&mut refs);
        dedup_refs(refs)
    }
}

impl OpAttributes for ContainerOp {
    fn attrs(&self) -> &OpAttrs {
        &self.attrs
    }

    fn attrs_mut(&mut self) -> &mut OpAttrs {
        &mut self.attrs
    }
}
