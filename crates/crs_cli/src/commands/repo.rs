use std::path::Path;

use anyhow::{Context, Result};
use crs_repo::{RepoError, Repository};
use crs_types::{PackageId, Version};

use crate::cli::{IfExists, RepoAction};

pub fn run(action: RepoAction, if_exists: IfExists) -> Result<()> {
    match action {
        RepoAction::Init { path, name } => init(&path, &name, if_exists),
        RepoAction::Import { path, source } => import(&path, &source, if_exists),
        RepoAction::Ls { path } => ls(&path),
        RepoAction::Remove {
            path,
            name,
            version,
            revision,
        } => remove(&path, &name, &version, revision),
    }
}

fn init(path: &Path, name: &str, if_exists: IfExists) -> Result<()> {
    match Repository::create(path, name) {
        Ok(_) => {
            println!("initialized repository '{name}' at {}", path.display());
            Ok(())
        }
        Err(RepoError::AlreadyInitialized(_)) if if_exists == IfExists::Ignore => {
            println!("repository already initialized at {}", path.display());
            Ok(())
        }
        Err(RepoError::AlreadyInitialized(_)) if if_exists == IfExists::Replace => {
            std::fs::remove_dir_all(path).with_context(|| format!("removing existing repository at {}", path.display()))?;
            Repository::create(path, name)?;
            println!("reinitialized repository '{name}' at {}", path.display());
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn import(path: &Path, source: &Path, if_exists: IfExists) -> Result<()> {
    let mut repo = Repository::open_existing(path)?;
    let result = if source.is_dir() {
        repo.import_dir(source)
    } else {
        repo.import_targz(source)
    };
    match result {
        Ok(pkg) => {
            println!("imported {}", pkg.id());
            Ok(())
        }
        Err(RepoError::PkgAlreadyPresent(_)) if if_exists == IfExists::Ignore => {
            println!("already present, skipping: {}", source.display());
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn ls(path: &Path) -> Result<()> {
    let repo = Repository::open_existing(path)?;
    for pkg in repo.all_packages()? {
        println!("{}", pkg.id());
    }
    Ok(())
}

fn remove(path: &Path, name: &str, version: &str, revision: u64) -> Result<()> {
    let mut repo = Repository::open_existing(path)?;
    let version: Version = Version::parse(version).context("parsing --version as semver")?;
    let id = PackageId::new(crs_types::Name::parse(name)?, version, revision);
    repo.remove_pkg(&id)?;
    println!("removed {id}");
    Ok(())
}
