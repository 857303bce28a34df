use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("dependency cycle detected involving library '{0}'")]
    DependencyCycle(String),

    #[error("no such library in this plan: '{0}'")]
    UnknownDependency(String),
}
