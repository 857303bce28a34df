use anyhow::{bail, Context, Result};
use crs_gateway::RemoteCache;
use crs_resolve::PackageUniverse;
use crs_types::{Dependency, PackageId};

use crate::cli::PkgAction;

async fn cache_with_remotes(use_repo: &[String]) -> Result<RemoteCache> {
    let cache = RemoteCache::open_default().context("opening the local package cache")?;
    for url in use_repo {
        cache.sync_remote(url).await?;
        cache.enable_remote(url)?;
    }
    Ok(cache)
}

pub async fn run(action: PkgAction, use_repo: &[String]) -> Result<()> {
    match action {
        PkgAction::Get { spec } => get(&spec, use_repo).await,
        PkgAction::Prefetch { name, version, revision } => prefetch(&name, &version, revision, use_repo).await,
        PkgAction::Solve { specs } => solve(&specs, use_repo).await,
    }
}

async fn get(spec: &str, use_repo: &[String]) -> Result<()> {
    let cache = cache_with_remotes(use_repo).await?;
    let dep = Dependency::parse_shorthand(spec)?;
    let universe = PackageUniverse::new(cache.all_enabled_packages()?);
    let resolved = crs_resolve::resolve(&universe, std::slice::from_ref(&dep))?;
    let Some(id) = resolved.into_iter().find(|id| id.name == dep.name) else {
        bail!("resolver did not select a revision for '{}'", dep.name);
    };
    let path = cache.prefetch(&id).await?;
    println!("{id} -> {}", path.display());
    Ok(())
}

async fn prefetch(name: &str, version: &str, revision: u64, use_repo: &[String]) -> Result<()> {
    let cache = cache_with_remotes(use_repo).await?;
    let id = PackageId::new(crs_types::Name::parse(name)?, crs_types::Version::parse(version)?, revision);
    let path = cache.prefetch(&id).await?;
    println!("{id} -> {}", path.display());
    Ok(())
}

async fn solve(specs: &[String], use_repo: &[String]) -> Result<()> {
    let cache = cache_with_remotes(use_repo).await?;
    let roots: Vec<Dependency> = specs
        .iter()
        .map(|s| Dependency::parse_shorthand(s))
        .collect::<Result<Vec<_>, crs_types::MetaError>>()?;
    let universe = PackageUniverse::new(cache.all_enabled_packages()?);
    let resolved = crs_resolve::resolve(&universe, &roots)?;
    for id in resolved {
        println!("{id}");
    }
    Ok(())
}
