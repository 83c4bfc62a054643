//! Distribution-method registry.
//!
//! A distribution method turns one source file and one target into the
//! action sequence that delivers it — `cp` for same-host copies, `scp`
//! for a single-stream SFTP put, `parallel_scp` for the chunked engine.
//! Callers register methods by name and build actions from (source,
//! target, method name) triples.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::action::ActionSpec;
use crate::error::TransferError;
use crate::target::TargetDescriptor;

/// The file being distributed, as the registry's method functions see it.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub local_path: String,
    pub filename: String,
    pub sha1sum: String,
    pub size: u64,
}

pub type MethodFn = Arc<dyn Fn(&SourceFile, &TargetDescriptor) -> Vec<ActionSpec> + Send + Sync>;

#[derive(Clone)]
pub struct DistributionMethod {
    pub name: String,
    method: MethodFn,
}

/// A registry of distribution methods, pre-populated with the built-in
/// `cp`, `scp`, and `parallel_scp` methods.
pub struct DistributionRegistry {
    methods: RwLock<HashMap<String, DistributionMethod>>,
}

impl Default for DistributionRegistry {
    fn default() -> Self {
        let registry = Self {
            methods: RwLock::new(HashMap::new()),
        };
        register_method(&registry, "cp", Arc::new(copy_method));
        // `scp`/`parallel_scp` are aliases of the single-stream/chunked
        // SFTP methods; true scp protocol support is not implemented.
        register_method(&registry, "sftp", Arc::new(sftp_method));
        register_method(&registry, "scp", Arc::new(sftp_method));
        register_method(&registry, "parallel_sftp", Arc::new(parallel_sftp_method));
        register_method(&registry, "parallel_scp", Arc::new(parallel_sftp_method));
        registry
    }
}

impl DistributionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full action sequence for delivering `source` to `target`
    /// via `method_name`: a start marker, the method's own actions, an end
    /// marker — matching `Targets.create_distribution_actions`.
    pub fn create_distribution_actions(
        &self,
        method_name: &str,
        source: &SourceFile,
        target: &TargetDescriptor,
    ) -> Result<Vec<ActionSpec>, TransferError> {
        let method = self
            .methods
            .read()
            .unwrap()
            .get(method_name)
            .cloned()
            .ok_or_else(|| TransferError::UnknownMethod(method_name.to_string()))?;

        let mut actions = vec![ActionSpec::LogMarker {
            message: format!("Started distribution of {} to {}", source.filename, target.name),
        }];
        actions.extend((method.method)(source, target));
        actions.push(ActionSpec::LogMarker {
            message: format!("Completed distribution of {} to {}", source.filename, target.name),
        });
        Ok(actions)
    }
}

pub fn register_method(registry: &DistributionRegistry, name: &str, method: MethodFn) {
    registry.methods.write().unwrap().insert(
        name.to_string(),
        DistributionMethod {
            name: name.to_string(),
            method,
        },
    );
}

/// Convenience wrapper kept alongside the registry for call sites that
/// don't hold a `DistributionRegistry` handle directly.
pub fn create_distribution_actions(
    registry: &DistributionRegistry,
    method_name: &str,
    source: &SourceFile,
    target: &TargetDescriptor,
) -> Result<Vec<ActionSpec>, TransferError> {
    registry.create_distribution_actions(method_name, source, target)
}

fn copy_method(source: &SourceFile, target: &TargetDescriptor) -> Vec<ActionSpec> {
    vec![ActionSpec::CopyFile {
        source: source.local_path.clone(),
        target: format!("{}/{}", target.directory, source.filename),
    }]
}

fn sftp_method(source: &SourceFile, target: &TargetDescriptor) -> Vec<ActionSpec> {
    vec![
        ActionSpec::ProbeUpToDate {
            target: target.clone(),
            remote_path: source.filename.clone(),
            expected_sha1: source.sha1sum.clone(),
        },
        ActionSpec::SftpPut {
            source: source.local_path.clone(),
            target: target.clone(),
            remote_path: source.filename.clone(),
            sha1sum: source.sha1sum.clone(),
            size: source.size,
        },
    ]
}

fn parallel_sftp_method(source: &SourceFile, target: &TargetDescriptor) -> Vec<ActionSpec> {
    vec![
        ActionSpec::ProbeUpToDate {
            target: target.clone(),
            remote_path: source.filename.clone(),
            expected_sha1: source.sha1sum.clone(),
        },
        ActionSpec::ParallelSftpPut {
            source: source.local_path.clone(),
            target: target.clone(),
            remote_path: source.filename.clone(),
            sha1sum: source.sha1sum.clone(),
            size: source.size,
        },
    ]
}
