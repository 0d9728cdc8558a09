// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Metadata references.
//!
//! A reference is a set of declaration-only C# sources whose types are
//! visible to the compilation but never analyzed or rewritten. The core
//! library reference ships with the crate.

use std::path::Path;

use crate::error::ParseError;
use crate::parser::parse;
use crate::syntax::SyntaxTree;

const CORE_LIBRARY: &str = include_str!("../stubs/corlib.cs");

#[derive(Debug, Clone)]
pub struct MetadataReference {
    name: String,
    trees: Vec<SyntaxTree>,
}

impl MetadataReference {
    /// Build a reference from `(path, text)` pairs.
    pub fn from_source(name: impl Into<String>, files: &[(&str, &str)]) -> Result<Self, ParseError> {
        let trees = files
            .iter()
            .map(|(path, text)| parse(path, text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MetadataReference {
            name: name.into(),
            trees,
        })
    }

    /// Build a reference from declaration files on disk.
    pub fn from_files(name: impl Into<String>, paths: &[&Path]) -> Result<Self, ReferenceError> {
        let mut trees = Vec::with_capacity(paths.len());
        for path in paths {
            let display = path.display().to_string();
            let text = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
                path: display.clone(),
                source,
            })?;
            trees.push(parse(&display, &text)?);
        }
        Ok(MetadataReference {
            name: name.into(),
            trees,
        })
    }

    /// The bundled core library: `System`, `System.Threading` and a few
    /// collection types.
    pub fn core_library() -> Result<Self, ParseError> {
        Self::from_source("corlib", &[("corlib.cs", CORE_LIBRARY)])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trees(&self) -> &[SyntaxTree] {
        &self.trees
    }
}

/// Failure loading a reference from disk.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("cannot read reference {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_library_parses() {
        let core = MetadataReference::core_library();
        assert!(core.is_ok(), "{:?}", core.err().map(|e| e.render(false)));
        if let Ok(core) = core {
            assert_eq!(core.name(), "corlib");
            assert_eq!(core.trees().len(), 1);
        }
    }

    #[test]
    fn from_source_reports_parse_errors() {
        let err = MetadataReference::from_source("bad", &[("bad.cs", "class {")]);
        assert!(matches!(err, Err(ParseError { ref path, .. }) if path == "bad.cs"));
    }

    #[test]
    fn from_files_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.cs");
        std::fs::write(&path, "namespace Lib { public class Widget { } }").unwrap();
        let reference = MetadataReference::from_files("lib", &[path.as_path()]).unwrap();
        assert_eq!(reference.trees().len(), 1);

        let missing = dir.path().join("missing.cs");
        let err = MetadataReference::from_files("lib", &[missing.as_path()]);
        assert!(matches!(err, Err(ReferenceError::Io { .. })));
    }
}
