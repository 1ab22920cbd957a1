// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns files and directories into parsed CRD objects.
//!
//! When the same CRD name appears more than once across the inputs, the
//! definition loaded last wins. It keeps the position of the first
//! occurrence so that one object is reconciled per name.

use crate::constants::manifests::{CRD_API_GROUP, CRD_KIND, EXTENSIONS};
use crate::error::{CrdError, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One CustomResourceDefinition read from disk
#[derive(Clone, Debug, PartialEq)]
pub struct CrdObject {
    /// `metadata.name`, e.g. `foos.example.com`
    pub name: String,
    pub source: PathBuf,
    /// 1-based position of the document within its file
    pub document: usize,
    pub crd: CustomResourceDefinition,
}

impl CrdObject {
    pub fn group(&self) -> &str {
        &self.crd.spec.group
    }

    pub fn kind(&self) -> &str {
        &self.crd.spec.names.kind
    }

    pub fn versions(&self) -> Vec<&str> {
        self.crd
            .spec
            .versions
            .iter()
            .map(|v| v.name.as_str())
            .collect()
    }
}

/// Loads CRD manifests from a list of files and directories
#[derive(Debug, Default, Clone)]
pub struct ManifestLoader {
    strict: bool,
}

impl ManifestLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject documents of any other kind instead of skipping them
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Load every CRD found under `paths`, in path order.
    pub fn load<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<CrdObject>> {
        let mut objects: Vec<CrdObject> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for file in expand_paths(paths)? {
            for object in self.load_file(&file)? {
                match seen.get(&object.name) {
                    Some(&idx) => {
                        warn!(
                            "CRD {} from {} overrides the definition from {}",
                            object.name,
                            object.source.display(),
                            objects[idx].source.display()
                        );
                        objects[idx] = object;
                    }
                    None => {
                        seen.insert(object.name.clone(), objects.len());
                        objects.push(object);
                    }
                }
            }
        }

        info!("Loaded {} CRD(s)", objects.len());
        Ok(objects)
    }

    fn load_file(&self, path: &Path) -> Result<Vec<CrdObject>> {
        let content = fs::read_to_string(path).map_err(|source| CrdError::DiscoveryError {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse_documents(path, &content)
    }

    /// Split a (possibly multi-document) manifest and keep its CRDs
    pub fn parse_documents(&self, path: &Path, content: &str) -> Result<Vec<CrdObject>> {
        let mut objects = Vec::new();

        for (idx, de) in serde_yaml::Deserializer::from_str(content).enumerate() {
            let document = idx + 1;
            let value = serde_yaml::Value::deserialize(de)
                .map_err(|e| CrdError::parse(path, document, e.to_string()))?;

            if value.is_null() {
                continue;
            }
            if !value.is_mapping() {
                return Err(CrdError::parse(path, document, "document is not a mapping"));
            }

            if !is_crd_document(&value) {
                let kind = value.get("kind").and_then(|k| k.as_str()).unwrap_or("<none>");
                if self.strict {
                    return Err(CrdError::parse(
                        path,
                        document,
                        format!("expected {CRD_KIND}, found kind {kind}"),
                    ));
                }
                debug!(
                    "Skipping {} document {} of kind {}",
                    path.display(),
                    document,
                    kind
                );
                continue;
            }

            let crd: CustomResourceDefinition = serde_yaml::from_value(value)
                .map_err(|e| CrdError::parse(path, document, e.to_string()))?;
            let Some(name) = crd.metadata.name.clone() else {
                return Err(CrdError::parse(path, document, "missing metadata.name"));
            };

            debug!("Found CRD {} in {} document {}", name, path.display(), document);
            objects.push(CrdObject {
                name,
                source: path.to_path_buf(),
                document,
                crd,
            });
        }

        Ok(objects)
    }
}

fn is_crd_document(value: &serde_yaml::Value) -> bool {
    let kind = value.get("kind").and_then(|k| k.as_str());
    let group = value
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .and_then(|v| v.split_once('/'))
        .map(|(group, _)| group);

    kind == Some(CRD_KIND) && group == Some(CRD_API_GROUP)
}

/// Resolve the input paths into a sorted, de-duplicated list of files.
///
/// Explicit files are always kept; inside directories only files with a
/// manifest extension are.
fn expand_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|source| CrdError::DiscoveryError {
            path: path.to_path_buf(),
            source,
        })?;

        if !metadata.is_dir() {
            files.push(path.to_path_buf());
            continue;
        }

        for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let failed = e.path().unwrap_or(path).to_path_buf();
                CrdError::DiscoveryError {
                    path: failed,
                    source: e.into(),
                }
            })?;
            if entry.file_type().is_file() && has_manifest_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    let mut seen = HashSet::with_capacity(files.len());
    files.retain(|file| seen.insert(fs::canonicalize(file).unwrap_or_else(|_| file.clone())));
    Ok(files)
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
}
