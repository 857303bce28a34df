use std::fs;
use std::path::Path;

use crate::error::ToolchainError;
use crate::parser::parse_kv_lines;
use crate::shell::split_shell_string;

const KEY_INCLUDE_TEMPLATE: &str = "Include-Template";
const KEY_DEFINE_TEMPLATE: &str = "Define-Template";
const KEY_COMPILE_C_TEMPLATE: &str = "Compile-C-Template";
const KEY_COMPILE_CXX_TEMPLATE: &str = "Compile-C++-Template";
const KEY_CREATE_ARCHIVE_TEMPLATE: &str = "Create-Archive-Template";
const KEY_ARCHIVE_SUFFIX: &str = "Archive-Suffix";
const KEY_WARNING_FLAGS: &str = "Warning-Flags";

const REQUIRED_KEYS: &[&str] = &[
    KEY_INCLUDE_TEMPLATE,
    KEY_DEFINE_TEMPLATE,
    KEY_COMPILE_C_TEMPLATE,
    KEY_COMPILE_CXX_TEMPLATE,
    KEY_CREATE_ARCHIVE_TEMPLATE,
    KEY_ARCHIVE_SUFFIX,
];
const OPTIONAL_KEYS: &[&str] = &[KEY_WARNING_FLAGS];

/// The source language of a translation unit, which selects between the
/// toolchain's C and C++ compile templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    C,
    Cxx,
}

/// Everything needed to render a single translation unit's compile
/// command.
#[derive(Debug, Clone)]
pub struct CompileSpec {
    pub lang: Lang,
    pub source_path: String,
    pub out_path: String,
    pub include_dirs: Vec<String>,
    pub definitions: Vec<String>,
    pub enable_warnings: bool,
}

/// Everything needed to render a single library's archive command.
#[derive(Debug, Clone)]
pub struct ArchiveSpec {
    pub input_files: Vec<String>,
    pub out_path: String,
}

/// A parameterised compiler toolchain: argument templates for include
/// paths, preprocessor definitions, compilation, and archiving, each a
/// shell-split sequence of argv tokens with placeholders substituted at
/// render time.
#[derive(Debug, Clone)]
pub struct Toolchain {
    include_template: Vec<String>,
    define_template: Vec<String>,
    compile_c_template: Vec<String>,
    compile_cxx_template: Vec<String>,
    archive_template: Vec<String>,
    archive_suffix: String,
    warning_flags: Vec<String>,
}

impl Toolchain {
    pub fn load_from_file(path: &Path) -> Result<Self, ToolchainError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Parses a toolchain file's contents directly (no filesystem access),
    /// primarily for tests and embedded toolchain definitions.
    pub fn parse(text: &str) -> Result<Self, ToolchainError> {
        let kvs = parse_kv_lines(text)?;

        for key in kvs.keys() {
            if !REQUIRED_KEYS.contains(&key.as_str()) && !OPTIONAL_KEYS.contains(&key.as_str()) {
                return Err(ToolchainError::UnknownKey(key.clone()));
            }
        }
        let require = |key: &'static str| -> Result<&str, ToolchainError> {
            kvs.get(key).map(String::as_str).ok_or(ToolchainError::MissingKey(key))
        };

        Ok(Self {
            include_template: split_shell_string(require(KEY_INCLUDE_TEMPLATE)?),
            define_template: split_shell_string(require(KEY_DEFINE_TEMPLATE)?),
            compile_c_template: split_shell_string(require(KEY_COMPILE_C_TEMPLATE)?),
            compile_cxx_template: split_shell_string(require(KEY_COMPILE_CXX_TEMPLATE)?),
            archive_template: split_shell_string(require(KEY_CREATE_ARCHIVE_TEMPLATE)?),
            archive_suffix: require(KEY_ARCHIVE_SUFFIX)?.to_string(),
            warning_flags: split_shell_string(kvs.get(KEY_WARNING_FLAGS).map(String::as_str).unwrap_or("")),
        })
    }

    pub fn archive_suffix(&self) -> &str {
        &self.archive_suffix
    }

    /// The C++ compiler binary (the first token of the C++ compile
    /// template), used as the link driver. No separate link template
    /// exists: the compiler invoked with object/archive inputs and `-o`
    /// is the linker on every toolchain this crate targets.
    pub fn cxx_compiler_binary(&self) -> &str {
        self.compile_cxx_template.first().map(String::as_str).unwrap_or("c++")
    }

    fn include_args(&self, path: &str) -> Vec<String> {
        self.include_template.iter().map(|arg| arg.replace("<PATH>", path)).collect()
    }

    fn definition_args(&self, def: &str) -> Vec<String> {
        self.define_template.iter().map(|arg| arg.replace("<DEF>", def)).collect()
    }

    /// Renders the full compiler invocation for `spec`, selecting the C or
    /// C++ template by `spec.lang`.
    pub fn create_compile_command(&self, spec: &CompileSpec) -> Vec<String> {
        let mut flags = Vec::new();
        for dir in &spec.include_dirs {
            flags.extend(self.include_args(dir));
        }
        for def in &spec.definitions {
            flags.extend(self.definition_args(def));
        }
        if spec.enable_warnings {
            flags.extend(self.warning_flags.iter().cloned());
        }

        let template = match spec.lang {
            Lang::C => &self.compile_c_template,
            Lang::Cxx => &self.compile_cxx_template,
        };
        let mut command = Vec::with_capacity(template.len());
        for arg in template {
            if arg == "<FLAGS>" {
                command.extend(flags.iter().cloned());
            } else {
                command.push(arg.replace("<FILE>", &spec.source_path).replace("<OUT>", &spec.out_path));
            }
        }
        command
    }

    /// Renders the full archiver invocation for `spec`.
    pub fn create_archive_command(&self, spec: &ArchiveSpec) -> Vec<String> {
        let mut command = Vec::with_capacity(self.archive_template.len());
        for arg in &self.archive_template {
            if arg == "<OBJECTS>" {
                command.extend(spec.input_files.iter().cloned());
            } else {
                command.push(arg.replace("<ARCHIVE>", &spec.out_path));
            }
        }
        command
    }
}
