//! Parsing the two shapes of compiler-emitted header dependency info.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;

/// Which convention the configured compiler uses to report the headers it
/// read while compiling a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsMode {
    /// The compile command writes a Makefile-fragment deps file (`-MMD -MF`
    /// and similar), read back after a successful compile.
    Gnu,
    /// The compiler echoes one "including file" line per header to
    /// stderr/stdout, prefixed with a configurable string.
    Msvc,
}

/// The Makefile-fragment deps file path convention for an object file: the
/// object path with `.d` appended. The toolchain's compile template is
/// responsible for actually requesting this file from the compiler (e.g.
/// `-MF <OUT>.d`); this crate only knows where to look for it afterward.
pub fn gnu_depfile_path(object_path: &Path) -> PathBuf {
    let mut s = object_path.as_os_str().to_owned();
    s.push(".d");
    PathBuf::from(s)
}

/// Parses a Makefile-fragment deps file (`target: dep1 dep2 \` continuation
/// lines) into the list of dependency paths on its right-hand side.
pub fn parse_makefile_deps(path: &Path) -> Result<Vec<PathBuf>, BuildError> {
    if !path.is_file() {
        return Err(BuildError::MissingDepsFile(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let joined = text.replace("\\\r\n", " ").replace("\\\n", " ");

    let mut inputs = Vec::new();
    for line in joined.lines() {
        let Some((_target, rhs)) = line.split_once(':') else {
            continue;
        };
        for tok in rhs.split_whitespace() {
            inputs.push(PathBuf::from(tok));
        }
    }
    Ok(inputs)
}

/// Parses MSVC-style "including file" lines out of a compiler's captured
/// output. Returns the matched input paths and the output with those lines
/// stripped.
pub fn parse_msvc_deps(output: &str, prefix: &str) -> (Vec<PathBuf>, String) {
    let mut inputs = Vec::new();
    let mut cleaned = String::with_capacity(output.len());
    for line in output.lines() {
        if let Some(rest) = line.strip_prefix(prefix) {
            inputs.push(PathBuf::from(rest.trim()));
        } else {
            cleaned.push_str(line);
            cleaned.push('\n');
        }
    }
    (inputs, cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gnu_depfile_path_appends_dot_d() {
        assert_eq!(gnu_depfile_path(Path::new("obj/a.o")), PathBuf::from("obj/a.o.d"));
    }

    #[test]
    fn parse_makefile_deps_handles_line_continuations() {
        let dir = tempfile::tempdir().unwrap();
        let depfile = dir.path().join("a.o.d");
        fs::write(&depfile, "obj/a.o: src/a.cpp \\\n  include/a.h \\\n  include/b.h\n").unwrap();
        let inputs = parse_makefile_deps(&depfile).unwrap();
        assert_eq!(
            inputs,
            vec![
                PathBuf::from("src/a.cpp"),
                PathBuf::from("include/a.h"),
                PathBuf::from("include/b.h"),
            ]
        );
    }

    #[test]
    fn parse_makefile_deps_missing_file_is_an_error() {
        let err = parse_makefile_deps(Path::new("/no/such/a.o.d")).unwrap_err();
        assert!(matches!(err, BuildError::MissingDepsFile(_)));
    }

    #[test]
    fn parse_msvc_deps_strips_prefix_lines_and_collects_inputs() {
        let output = "a.cpp\nNote: including file: C:\\inc\\a.h\nsome warning\nNote: including file:  C:\\inc\\b.h\n";
        let (inputs, cleaned) = parse_msvc_deps(output, "Note: including file:");
        assert_eq!(inputs, vec![PathBuf::from("C:\\inc\\a.h"), PathBuf::from("C:\\inc\\b.h")]);
        assert_eq!(cleaned, "a.cpp\nsome warning\n");
    }
}
