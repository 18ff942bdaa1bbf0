//! Mapping store and reload protocol.
//!
//! # Responsibilities
//! - Publish the current generation of version tables
//! - Resolve (version, method, path) against one snapshot per call
//! - Rebuild everything on reload and swap atomically on full success
//!
//! # Design Decisions
//! - `ArcSwap<Snapshot>`: readers never lock, never see a half-built generation
//! - One reload at a time: `reload` rejects a concurrent call, `reload_queued` waits its turn
//! - Any descriptor failure abandons the whole batch; the old snapshot stays
//! - Descriptors sharing a version: the last one in source order wins

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::http::{Method, Request, StatusCode};

use crate::error::{ConfigError, ReloadError, ResolveError, RouteMiss};
use crate::mapping::{parse, Backend, DescriptorSource, EndpointSpec, MappingDescriptor, ParseOptions};
use crate::plugins::{
    BuiltinRegistry, Implementation, ImplementationKind, ImplementationResolver, PluginArchive,
};
use crate::routing::table::VersionTable;

/// Reload behaviour.
#[derive(Debug, Clone, Default)]
pub struct StoreSettings {
    /// Pluggable implementation archive, reopened on every reload.
    pub plugin_path: Option<PathBuf>,
    /// Abort the reload when any action/filter id cannot be resolved.
    pub eager_resolution: bool,
    /// Reject repeated action/filter/error names inside one descriptor.
    pub strict_duplicates: bool,
}

/// One published generation.
#[derive(Debug)]
pub struct Snapshot {
    generation: u64,
    versions: HashMap<String, Arc<VersionTable>>,
    resolver: Arc<ImplementationResolver>,
}

impl Snapshot {
    fn empty(builtins: Arc<BuiltinRegistry>) -> Self {
        Self {
            generation: 0,
            versions: HashMap::new(),
            resolver: Arc::new(ImplementationResolver::new(None, builtins)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn table(&self, version: &str) -> Option<&Arc<VersionTable>> {
        self.versions.get(version)
    }

    pub fn versions(&self) -> BTreeSet<String> {
        self.versions.keys().cloned().collect()
    }

    pub fn resolver(&self) -> &Arc<ImplementationResolver> {
        &self.resolver
    }

    /// Resolve against this snapshot only.
    pub fn resolve(&self, version: &str, method: &Method, path: &str) -> Result<ResolvedRoute, RouteMiss> {
        let table = self
            .versions
            .get(version)
            .ok_or_else(|| RouteMiss::UnknownVersion(version.to_string()))?;
        let hit = table
            .lookup(method, path)
            .ok_or_else(|| RouteMiss::NotFound {
                version: version.to_string(),
                method: method.clone(),
                path: path.to_string(),
            })?;

        let endpoint = Arc::clone(&hit.entry.endpoint);
        let actions = endpoint
            .action_names
            .iter()
            .filter_map(|name| Binding::new(name, table.action_id(name)))
            .collect();
        let filter = endpoint
            .filter_name
            .as_deref()
            .and_then(|name| Binding::new(name, table.filter_id(name)));

        Ok(ResolvedRoute {
            generation: self.generation,
            backend: endpoint.backend.clone(),
            backend_path: endpoint.backend_path(hit.captured.as_deref()),
            captured: hit.captured,
            actions,
            filter,
            endpoint,
            table: Arc::clone(table),
            resolver: Arc::clone(&self.resolver),
        })
    }
}

/// A declared action or filter name and the implementation it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub implementation_id: String,
}

impl Binding {
    fn new(name: &str, id: Option<&str>) -> Option<Self> {
        id.map(|id| Self {
            name: name.to_string(),
            implementation_id: id.to_string(),
        })
    }
}

/// Everything the proxy layer needs to dispatch one request.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// Generation the route was resolved from.
    pub generation: u64,
    pub endpoint: Arc<EndpointSpec>,
    /// Actions in declaration order.
    pub actions: Vec<Binding>,
    pub filter: Option<Binding>,
    pub backend: Backend,
    /// Internal endpoint with the captured value substituted.
    pub backend_path: String,
    pub captured: Option<String>,
    table: Arc<VersionTable>,
    resolver: Arc<ImplementationResolver>,
}

impl ResolvedRoute {
    /// Resolve a bound action or filter on first use.
    pub fn implementation(&self, name: &str) -> Result<Arc<dyn Implementation>, ResolveError> {
        let (binding, kind) = self
            .actions
            .iter()
            .map(|b| (b, ImplementationKind::Action))
            .chain(self.filter.iter().map(|b| (b, ImplementationKind::Filter)))
            .find(|(b, _)| b.name == name)
            .ok_or_else(|| ResolveError::UnboundName {
                name: name.to_string(),
            })?;
        self.resolver.resolve(&binding.implementation_id, kind)
    }

    /// Custom message for `status` in this route's version.
    pub fn error_message(&self, status: u16) -> Option<&str> {
        self.table.error_message(status)
    }
}

/// Observable state of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    Empty,
    Loaded { generation: u64, versions: usize },
    Reloading { serving_generation: u64 },
}

/// All version tables, swapped as a whole on reload.
pub struct MappingStore {
    source: Box<dyn DescriptorSource>,
    builtins: Arc<BuiltinRegistry>,
    settings: StoreSettings,
    current: ArcSwap<Snapshot>,
    reload_gate: Mutex<()>,
    reloading: AtomicBool,
}

impl MappingStore {
    /// Create an empty store. Nothing is loaded until `reload` is called.
    pub fn new(
        source: impl DescriptorSource + 'static,
        builtins: Arc<BuiltinRegistry>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            source: Box::new(source),
            current: ArcSwap::from_pointee(Snapshot::empty(Arc::clone(&builtins))),
            builtins,
            settings,
            reload_gate: Mutex::new(()),
            reloading: AtomicBool::new(false),
        }
    }

    /// Current snapshot; hold it to resolve several requests consistently.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn resolve(&self, version: &str, method: &Method, path: &str) -> Result<ResolvedRoute, RouteMiss> {
        self.current.load().resolve(version, method, path)
    }

    /// Resolve using the method and path of an incoming request.
    pub fn resolve_request<B>(&self, version: &str, request: &Request<B>) -> Result<ResolvedRoute, RouteMiss> {
        self.resolve(version, request.method(), request.uri().path())
    }

    pub fn list_versions(&self) -> BTreeSet<String> {
        self.current.load().versions()
    }

    /// Message for `status`: the version's custom one, else the standard reason phrase.
    pub fn error_message(&self, version: &str, status: u16) -> String {
        let snapshot = self.current.load();
        snapshot
            .table(version)
            .and_then(|t| t.error_message(status))
            .map(str::to_string)
            .or_else(|| {
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("Error {status}"))
    }

    pub fn status(&self) -> StoreStatus {
        let snapshot = self.current.load();
        if self.reloading.load(Ordering::Acquire) {
            return StoreStatus::Reloading {
                serving_generation: snapshot.generation,
            };
        }
        match snapshot.generation {
            0 => StoreStatus::Empty,
            generation => StoreStatus::Loaded {
                generation,
                versions: snapshot.versions.len(),
            },
        }
    }

    pub fn builtins(&self) -> &Arc<BuiltinRegistry> {
        &self.builtins
    }

    /// Rebuild every table from the source and publish the result.
    ///
    /// Returns the new generation. On error the serving snapshot is untouched.
    /// Fails with `ReloadError::InProgress` if another reload holds the gate.
    pub fn reload(&self) -> Result<u64, ReloadError> {
        let _gate = match self.reload_gate.try_lock() {
            Ok(gate) => gate,
            Err(TryLockError::WouldBlock) => return Err(ReloadError::InProgress),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        self.reload_gated()
    }

    /// Like `reload`, but waits for a running reload to finish and then
    /// rescans, so a change made during that reload is never lost.
    pub fn reload_queued(&self) -> Result<u64, ReloadError> {
        let _gate = self
            .reload_gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.reload_gated()
    }

    fn reload_gated(&self) -> Result<u64, ReloadError> {
        let _flag = ReloadingFlag::raise(&self.reloading);

        let started = Instant::now();
        let generation = self.current.load().generation + 1;
        tracing::info!(generation, source = %self.source.describe(), "Reloading mappings");

        match self.build_snapshot(generation) {
            Ok(next) => {
                let versions = next.versions.len();
                // The previous generation is torn down once its last reader lets go.
                self.current.store(Arc::new(next));
                tracing::info!(
                    generation,
                    versions,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Mappings published"
                );
                Ok(generation)
            }
            Err(e) => {
                tracing::error!(
                    generation,
                    error = %e,
                    "Reload failed, keeping current mappings"
                );
                Err(e)
            }
        }
    }

    fn build_snapshot(&self, generation: u64) -> Result<Snapshot, ReloadError> {
        let archive = self
            .settings
            .plugin_path
            .as_deref()
            .map(PluginArchive::open)
            .transpose()?;
        let resolver = ImplementationResolver::new(archive, Arc::clone(&self.builtins));

        let options = ParseOptions {
            strict_duplicates: self.settings.strict_duplicates,
        };
        let mut failures = Vec::new();
        let mut tables = Vec::new();
        for unit in self.source.units()? {
            // Descriptor-level failures are collected so the operator sees all of them.
            let descriptor = match parse(&unit, options) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::debug!(unit = %unit.id, error = %e, "Descriptor rejected");
                    failures.push(e);
                    continue;
                }
            };
            self.bind_implementations(&resolver, &descriptor)?;
            match VersionTable::build(descriptor) {
                Ok(table) => tables.push(table),
                Err(e) => failures.push(e),
            }
        }
        if !failures.is_empty() {
            return Err(batch(failures).into());
        }

        let mut versions = HashMap::with_capacity(tables.len());
        for table in tables {
            let version = table.version().to_string();
            let unit = table.unit().to_string();
            if let Some(replaced) = versions.insert(version.clone(), Arc::new(table)) {
                tracing::warn!(
                    version = %version,
                    replaced = %replaced.unit(),
                    by = %unit,
                    "Version declared by more than one descriptor, last one wins"
                );
            }
        }

        Ok(Snapshot {
            generation,
            versions,
            resolver: Arc::new(resolver),
        })
    }

    fn bind_implementations(
        &self,
        resolver: &ImplementationResolver,
        descriptor: &MappingDescriptor,
    ) -> Result<(), ResolveError> {
        for (id, kind) in descriptor.implementation_ids() {
            if let Err(e) = resolver.resolve(id, kind) {
                if self.settings.eager_resolution {
                    return Err(e);
                }
                tracing::warn!(
                    unit = %descriptor.unit,
                    id,
                    %kind,
                    error = %e,
                    "Implementation unavailable, will retry on first use"
                );
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingStore")
            .field("source", &self.source.describe())
            .field("settings", &self.settings)
            .field("status", &self.status())
            .finish()
    }
}

fn batch(mut failures: Vec<ConfigError>) -> ConfigError {
    if failures.len() == 1 {
        failures.remove(0)
    } else {
        ConfigError::Batch(failures)
    }
}

/// Marks the store as reloading for the lifetime of the guard.
struct ReloadingFlag<'a>(&'a AtomicBool);

impl<'a> ReloadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for ReloadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
