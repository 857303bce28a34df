use crs_types::{Dependency, MetaError, PackageInfo};

/// Every dependency that feeds the version solver for `pkg`: its
/// package-level `depends` plus every library's additive `dependencies`,
/// unioned. A consumer's `uses` selector only affects which libraries are
/// later validated as present (see [`crate::solve::resolve`]); it does not
/// narrow which dependency edges are version-solved, so this is a
/// conservative superset of what any one consumer actually needs.
pub fn all_dependencies(pkg: &PackageInfo) -> Result<Vec<Dependency>, MetaError> {
    let mut out = Vec::with_capacity(pkg.depends().len());
    for raw in pkg.depends() {
        out.push(raw.parse()?);
    }
    for library in pkg.libraries() {
        for raw in &library.dependencies {
            out.push(raw.parse()?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(json: &str) -> PackageInfo {
        PackageInfo::parse(json).unwrap()
    }

    #[test]
    fn collects_package_and_library_level_dependencies() {
        let info = pkg(
            r#"{
                "name": "app", "version": "1.0.0", "pkg-version": 1, "namespace": "app",
                "depends": ["base^1.0.0"],
                "libraries": [
                    { "name": "app", "path": ".", "dependencies": ["extra^2.0.0"] }
                ]
            }"#,
        );
        let deps = all_dependencies(&info).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name.as_str(), "base");
        assert_eq!(deps[1].name.as_str(), "extra");
    }

    #[test]
    fn a_malformed_shorthand_is_an_error() {
        let info = pkg(
            r#"{
                "name": "app", "version": "1.0.0", "pkg-version": 1, "namespace": "app",
                "depends": ["not-a-valid-shorthand"]
            }"#,
        );
        assert!(all_dependencies(&info).is_err());
    }
}
