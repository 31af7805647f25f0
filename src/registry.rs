//! Builds the map of enabled services from the static registration table and
//! the `SERVICES` allow-list.

use crate::{
    config::ServiceSelector,
    service::{
        AliasConfig, Cloudflare, GitHub, MultiInstance, Service, ServiceContext, SimpleRequest,
        SingleInstance,
    },
};
use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Live services keyed by id.
pub type ServiceMap = BTreeMap<String, Arc<dyn Service>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Found multiple services with the id \"{0}\"")]
    DuplicateId(String),
    #[error("Found multiple services with the name \"{0}\"")]
    DuplicateName(String),
}

#[derive(Clone, Copy)]
pub enum ServiceKind {
    SingleInstance(fn(&ServiceContext) -> Arc<dyn Service>),
    MultiInstance(fn(String, &ServiceContext) -> Arc<dyn Service>),
}

/// One entry of the registration table.
#[derive(Clone, Copy)]
pub struct ServiceDescriptor {
    pub type_name: &'static str,
    pub kind: ServiceKind,
}

impl ServiceDescriptor {
    pub fn single<T: SingleInstance>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            kind: ServiceKind::SingleInstance(|ctx: &ServiceContext| -> Arc<dyn Service> {
                Arc::new(T::new(ctx))
            }),
        }
    }

    pub fn multi<T: MultiInstance>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            kind: ServiceKind::MultiInstance(
                |alias: String, ctx: &ServiceContext| -> Arc<dyn Service> {
                    let config = AliasConfig::new(T::PREFIX, alias, ctx.config.clone());
                    Arc::new(T::new(config, ctx))
                },
            ),
        }
    }
}

impl std::fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ServiceKind::SingleInstance(_) => "SingleInstance",
            ServiceKind::MultiInstance(_) => "MultiInstance",
        };
        f.debug_struct("ServiceDescriptor")
            .field("type_name", &self.type_name)
            .field("kind", &kind)
            .finish()
    }
}

/// Every service type shipped with the crate.
pub fn builtin_services() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::single::<GitHub>(),
        ServiceDescriptor::single::<Cloudflare>(),
        ServiceDescriptor::multi::<SimpleRequest>(),
    ]
}

/// Instantiates the enabled services.
///
/// With no allow-list every configured single-instance service is enabled and
/// no multi-instance service is. Multi-instance services are created once per
/// `TypeName:Alias` selector and keyed by alias.
pub fn load_services(
    descriptors: &[ServiceDescriptor],
    selectors: Option<&[ServiceSelector]>,
    ctx: &ServiceContext,
) -> Result<ServiceMap, RegistryError> {
    warn_unmatched(descriptors, selectors);

    let mut services = ServiceMap::new();
    let mut names = HashSet::new();

    for descriptor in descriptors {
        match descriptor.kind {
            ServiceKind::MultiInstance(build) => {
                let aliases = selectors
                    .unwrap_or_default()
                    .iter()
                    .filter(|selector| selector.type_name == descriptor.type_name)
                    .filter_map(|selector| selector.alias.clone());
                for alias in aliases {
                    if services.contains_key(&alias) {
                        return Err(RegistryError::DuplicateId(alias));
                    }
                    debug!("Loading {} as \"{}\"", descriptor.type_name, alias);
                    let service = build(alias.clone(), ctx);
                    if let Some(name) = service.name() {
                        if !names.insert(name.clone()) {
                            warn!(
                                "\"{}\" shares the name \"{}\" with another service",
                                alias, name
                            );
                        }
                    }
                    services.insert(alias, service);
                }
            }
            ServiceKind::SingleInstance(build) => {
                let allowed = selectors.map_or(true, |selectors| {
                    selectors.iter().any(|selector| {
                        selector.alias.is_none() && selector.type_name == descriptor.type_name
                    })
                });
                if !allowed {
                    continue;
                }
                let service = build(ctx);
                let Some(name) = service.name() else {
                    debug!("Skipping {}: not configured", descriptor.type_name);
                    continue;
                };
                if !names.insert(name.clone()) {
                    return Err(RegistryError::DuplicateName(name));
                }
                if services.contains_key(descriptor.type_name) {
                    return Err(RegistryError::DuplicateId(descriptor.type_name.to_string()));
                }
                debug!("Loading {}", descriptor.type_name);
                services.insert(descriptor.type_name.to_string(), service);
            }
        }
    }

    info!("Loaded {} services", services.len());
    Ok(services)
}

fn warn_unmatched(descriptors: &[ServiceDescriptor], selectors: Option<&[ServiceSelector]>) {
    for selector in selectors.unwrap_or_default() {
        let descriptor = descriptors
            .iter()
            .find(|descriptor| descriptor.type_name == selector.type_name);
        match (descriptor.map(|d| d.kind), &selector.alias) {
            (None, _) => warn!("Unknown service \"{}\" in allow-list", selector.type_name),
            (Some(ServiceKind::MultiInstance(_)), None) => warn!(
                "Service \"{}\" needs an alias, e.g. {}:MyAlias",
                selector.type_name, selector.type_name
            ),
            (Some(ServiceKind::SingleInstance(_)), Some(alias)) => warn!(
                "Service \"{}\" takes no alias, ignoring \"{}:{}\"",
                selector.type_name, selector.type_name, alias
            ),
            _ => {}
        }
    }
}
