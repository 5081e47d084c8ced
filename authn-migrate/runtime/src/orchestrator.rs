use crate::{
    core::{Converter, GeneratedResource, ResolveSelector},
    index,
    k8s::{DynamicObject, ResourceExt},
};
use anyhow::{Context, Result};
use std::{collections::BTreeMap, fmt};
use tracing::{error, info, warn};


/// Drives the conversion of every legacy policy discovered in a run.
#[derive(Debug)]
pub struct Orchestrator<S> {
    converter: Converter,
    selectors: S,

    /// When set, a policy that cannot be decoded aborts the run.
    strict_decode: bool,
}

/// Accumulates the results of a run.
#[derive(Debug, Default)]
pub struct Run {
    resources: Vec<GeneratedResource>,

    /// The policy that produced each accepted resource, by kind, namespace and name.
    owners: BTreeMap<(&'static str, String, String), ObjectRef>,
    converted: Vec<ObjectRef>,
    failed: Vec<Failure>,
    legacy_rbac: Vec<ObjectRef>,
}

/// A policy that could not be converted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub policy: ObjectRef,
    pub errors: Vec<String>,
}

/// Identifies a listed object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectRef {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

/// The final outcome of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Resources to emit, if any output is to be produced at all.
    pub resources: Option<Vec<GeneratedResource>>,

    /// Set if any policy failed to convert or any legacy RBAC resource was found.
    pub failed: bool,
}

// === impl Orchestrator ===

impl<S: ResolveSelector> Orchestrator<S> {
    pub fn new(converter: Converter, selectors: S, strict_decode: bool) -> Self {
        Self {
            converter,
            selectors,
            strict_decode,
        }
    }

    /// Converts each policy independently and records every legacy RBAC resource.
    ///
    /// Only fails if `strict_decode` is set and a policy could not be decoded.
    pub fn run(
        &self,
        policies: impl IntoIterator<Item = DynamicObject>,
        legacy_rbac: impl IntoIterator<Item = DynamicObject>,
    ) -> Result<Run> {
        let mut run = Run::default();
        for obj in policies {
            self.convert(&mut run, &obj)?;
        }
        for obj in legacy_rbac {
            run.report_legacy_rbac(&obj);
        }
        Ok(run)
    }

    fn convert(&self, run: &mut Run, obj: &DynamicObject) -> Result<()> {
        let id = ObjectRef::from(obj);

        let policy = match index::decode(obj) {
            Ok(policy) => policy,
            Err(error) if self.strict_decode => {
                return Err(error).with_context(|| format!("failed to decode {id}"));
            }
            Err(error) => {
                error!(policy = %id, %error, "Failed to decode policy");
                run.failed.push(Failure {
                    policy: id,
                    errors: vec![error.to_string()],
                });
                return Ok(());
            }
        };

        let conversion = self.converter.convert(&policy, &self.selectors);
        for warning in &conversion.summary.warnings {
            warn!(policy = %id, %warning, "Converted policy may not behave identically");
        }

        let errors = if conversion.is_ok() {
            run.collisions(&conversion.resources)
        } else {
            conversion
                .summary
                .errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        };

        if errors.is_empty() {
            info!(policy = %id, resources = conversion.resources.len(), "Converted policy");
            run.accept(&id, conversion.resources);
            run.converted.push(id);
        } else {
            error!(
                policy = %id,
                errors = errors.len(),
                "Failed to convert policy:\n\t* {}",
                errors.join("\n\t* ")
            );
            run.failed.push(Failure { policy: id, errors });
        }

        Ok(())
    }
}

// === impl Run ===

impl Run {
    /// Describes each resource that has the same kind, namespace and name as a resource that was
    /// already accepted.
    fn collisions(&self, resources: &[GeneratedResource]) -> Vec<String> {
        resources
            .iter()
            .filter_map(|r| {
                let owner = self.owners.get(&resource_key(r))?;
                Some(format!(
                    "{} {}/{} is also generated from {}",
                    r.kind.kind(),
                    r.namespace,
                    r.name,
                    owner
                ))
            })
            .collect()
    }

    fn accept(&mut self, id: &ObjectRef, resources: Vec<GeneratedResource>) {
        for r in &resources {
            self.owners.insert(resource_key(r), id.clone());
        }
        self.resources.extend(resources);
    }

    fn report_legacy_rbac(&mut self, obj: &DynamicObject) {
        let id = ObjectRef::from(obj);
        warn!(resource = %id, "Legacy RBAC resource requires manual migration");
        self.legacy_rbac.push(id);
    }

    pub fn converted(&self) -> &[ObjectRef] {
        &self.converted
    }

    pub fn failed(&self) -> &[Failure] {
        &self.failed
    }

    pub fn legacy_rbac(&self) -> &[ObjectRef] {
        &self.legacy_rbac
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty() && self.legacy_rbac.is_empty()
    }

    /// Determines what output the run produces.
    ///
    /// A run with any failure produces no output at all, unless `ignore_errors` is set, in which
    /// case the resources of every successfully converted policy are released.
    pub fn finish(self, ignore_errors: bool) -> Report {
        if !self.legacy_rbac.is_empty() {
            error!(
                count = self.legacy_rbac.len(),
                "Found legacy RBAC resources, which are not converted by this tool; see \
                 https://istio.io/latest/blog/2019/v1beta1-authorization-policy/#migration-from-the-v1alpha1-policy \
                 to migrate them manually"
            );
        }

        if self.is_ok() {
            info!(
                policies = self.converted.len(),
                resources = self.resources.len(),
                "Conversion succeeded"
            );
            return Report {
                resources: Some(self.resources),
                failed: false,
            };
        }

        if ignore_errors {
            warn!(
                failed = self.failed.len(),
                "Ignoring errors; the converted policies may not work as expected"
            );
            return Report {
                resources: Some(self.resources),
                failed: true,
            };
        }

        error!(
            failed = self.failed.len(),
            "Conversion failed; no resources are emitted until all errors are fixed"
        );
        Report {
            resources: None,
            failed: true,
        }
    }
}

fn resource_key(r: &GeneratedResource) -> (&'static str, String, String) {
    (r.kind.kind(), r.namespace.clone(), r.name.clone())
}

// === impl ObjectRef ===

impl From<&DynamicObject> for ObjectRef {
    fn from(obj: &DynamicObject) -> Self {
        Self {
            kind: obj
                .types
                .as_ref()
                .map(|t| t.kind.clone())
                .unwrap_or_default(),
            namespace: obj.namespace().filter(|ns| !ns.is_empty()),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Some(ref ns) => write!(f, "{}: {}/{}", self.kind, ns, self.name),
            None => write!(f, "{}: {}", self.kind, self.name),
        }
    }
}
