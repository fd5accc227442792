//! Compiles raw service configuration into immutable service descriptors

use crate::config::{CiConfig, RepoConfig, ServiceConfig};
use crate::errors::{MonitorError, Result};
use crate::models::{CiBackend, CiDescriptor, RepoBackend, RepoDescriptor, ServiceDescriptor};
use std::collections::HashSet;

const ICON_PREFIX: &str = "/static/custom/";

/// Compile every service, rejecting the whole set on the first error
pub fn compile(services: &[ServiceConfig]) -> Result<Vec<ServiceDescriptor>> {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    let mut compiled = Vec::with_capacity(services.len());

    for raw in services {
        let service = compile_service(raw)?;
        if !names.insert(service.name.clone()) {
            return Err(MonitorError::Config(format!(
                "duplicate service name '{}'",
                service.name
            )));
        }
        if !ids.insert(service.id.clone()) {
            return Err(MonitorError::Config(format!(
                "service {}: duplicate id '{}'",
                service.name, service.id
            )));
        }
        compiled.push(service);
    }

    Ok(compiled)
}

pub fn compile_service(raw: &ServiceConfig) -> Result<ServiceDescriptor> {
    let name = raw.name.trim();
    if name.is_empty() {
        return Err(MonitorError::Config("each service needs a 'name' field".to_string()));
    }

    let repo = raw
        .repo
        .as_ref()
        .map(|repo| compile_repo(name, repo))
        .transpose()?;

    let ci = match (&raw.ci, &repo) {
        (Some(ci), Some(repo)) => Some(compile_ci(name, ci, repo)?),
        (Some(_), None) => {
            return Err(MonitorError::Config(format!(
                "service {}: a 'ci' block requires a 'repo' block",
                name
            )));
        }
        (None, _) => None,
    };

    let url = non_empty(raw.url.as_deref());
    let short_url = url.as_deref().map(|url| short_url(url).to_string());

    Ok(ServiceDescriptor {
        id: non_empty(raw.id.as_deref()).unwrap_or_else(|| name.to_string()),
        name: name.to_string(),
        url,
        short_url,
        host: non_empty(raw.host.as_deref()),
        icon: non_empty(raw.icon.as_deref()).map(|icon| format!("{}{}", ICON_PREFIX, icon)),
        own: raw.own,
        repo,
        ci,
    })
}

fn compile_repo(service: &str, raw: &RepoConfig) -> Result<RepoDescriptor> {
    let backend = match non_empty(raw.kind.as_deref()) {
        None => RepoBackend::Github,
        Some(kind) => match RepoBackend::parse(&kind) {
            Some(backend) => backend,
            None => {
                return Err(MonitorError::UnsupportedBackend {
                    service: service.to_string(),
                    kind: "repo",
                    backend: kind,
                });
            }
        },
    };

    let path = raw.path.trim().trim_matches('/');
    if path.is_empty() {
        return Err(MonitorError::Config(format!(
            "service {}: missing 'repo.path' field",
            service
        )));
    }

    let host = non_empty(raw.host.as_deref()).unwrap_or_else(|| backend.default_host().to_string());

    Ok(RepoDescriptor {
        backend,
        path: path.to_string(),
        url: format!("{}/{}", host.trim_end_matches('/'), path),
    })
}

fn compile_ci(service: &str, raw: &CiConfig, repo: &RepoDescriptor) -> Result<CiDescriptor> {
    let backend = CiBackend::parse(&raw.kind).ok_or_else(|| MonitorError::UnsupportedBackend {
        service: service.to_string(),
        kind: "ci",
        backend: raw.kind.clone(),
    })?;

    let host = non_empty(raw.host.as_deref()).ok_or_else(|| {
        MonitorError::Config(format!("service {}: missing 'ci.host' field", service))
    })?;
    let host = host.trim_end_matches('/');

    let (api, url) = match backend {
        CiBackend::Drone => (
            format!("{}/api/repos/{}/builds", host, repo.path),
            format!("{}/{}", host, repo.path),
        ),
    };

    Ok(CiDescriptor { backend, api, url })
}

/// Strip one leading http:// or https:// scheme
pub fn short_url(url: &str) -> &str {
    url.strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
