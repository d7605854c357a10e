//! Spec file discovery and parsing.
//!
//! Specs are YAML documents (`version`, `kind`, `metadata.name`, `spec`)
//! describing one catalog resource each. `$ref` entries inside a spec body
//! point at a property of another resource and stay unresolved until apply.

use anyhow::{Context, Result, bail};
use regex::Regex;
use resgraph::{Graph, PropertyRef, PropertyValue, Resource, ResourceData, Urn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use walkdir::WalkDir;

pub const SPEC_VERSION: &str = "catalog/v1";

/// Resource kinds the catalog understands.
pub const KNOWN_KINDS: &[&str] = &[
    "tracking-plan",
    "event",
    "property",
    "data-graph",
    "source",
];

#[derive(Debug, Deserialize)]
struct SpecFile {
    version: String,
    kind: String,
    metadata: Metadata,
    #[serde(default)]
    spec: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

/// Load every spec file under `dir` (recursively, `.yaml`/`.yml`).
pub fn load_dir(dir: &Path) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Could not walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {}
            _ => continue,
        }
        let resource = load_file(path)
            .with_context(|| format!("Invalid spec file {}", path.display()))?;
        log::debug!("loaded {} from {}", resource.urn(), path.display());
        resources.push(resource);
    }
    Ok(resources)
}

/// Parse one spec file into a resource.
pub fn load_file(path: &Path) -> Result<Resource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let spec: SpecFile = serde_yaml::from_str(&content)?;

    if spec.version != SPEC_VERSION {
        bail!(
            "unsupported spec version '{}' (expected '{SPEC_VERSION}')",
            spec.version
        );
    }
    if !KNOWN_KINDS.contains(&spec.kind.as_str()) {
        bail!("unknown resource kind '{}'", spec.kind);
    }
    if !id_pattern().is_match(&spec.metadata.name) {
        bail!(
            "invalid metadata.name '{}' (letters, digits, '.', '_' and '-' only)",
            spec.metadata.name
        );
    }

    let data = match convert_value(&spec.spec)? {
        PropertyValue::Map(entries) => entries,
        PropertyValue::Null => ResourceData::new(),
        _ => bail!("spec body must be a mapping"),
    };

    Ok(
        Resource::new(&spec.metadata.name, &spec.kind, data, Vec::new())
            .with_source_file(path.to_path_buf()),
    )
}

/// Build the desired-state graph from loaded resources. Reference edges are
/// discovered from the resource data.
pub fn build_graph(resources: Vec<Resource>) -> Graph {
    let mut graph = Graph::new();
    for resource in resources {
        graph.add_resource(resource);
    }
    graph
}

fn convert_value(value: &serde_yaml::Value) -> Result<PropertyValue> {
    match value {
        serde_yaml::Value::Null => Ok(PropertyValue::Null),
        serde_yaml::Value::Bool(b) => Ok(PropertyValue::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(PropertyValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(PropertyValue::Float(f))
            } else {
                bail!("unrepresentable number {n}")
            }
        }
        serde_yaml::Value::String(s) => Ok(PropertyValue::String(s.clone())),
        serde_yaml::Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(convert_value(item)?);
            }
            Ok(PropertyValue::List(out))
        }
        serde_yaml::Value::Mapping(entries) => {
            if let Some(reference) = as_reference(entries)? {
                return Ok(PropertyValue::Ref(reference));
            }
            let mut out = BTreeMap::new();
            for (key, inner) in entries {
                let Some(key) = key.as_str() else {
                    bail!("mapping keys must be strings");
                };
                out.insert(key.to_string(), convert_value(inner)?);
            }
            Ok(PropertyValue::Map(out))
        }
        serde_yaml::Value::Tagged(tagged) => convert_value(&tagged.value),
    }
}

/// A single-key `{$ref: "type:id#property"}` mapping is a reference.
fn as_reference(entries: &serde_yaml::Mapping) -> Result<Option<PropertyRef>> {
    if entries.len() != 1 {
        return Ok(None);
    }
    let Some(raw) = entries.get("$ref") else {
        return Ok(None);
    };
    let Some(raw) = raw.as_str() else {
        bail!("$ref must be a string");
    };
    let Some(reference) = parse_ref(raw) else {
        bail!("malformed $ref '{raw}' (expected 'type:id#property')");
    };
    Ok(Some(reference))
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("pattern is valid")
    })
}

pub fn parse_ref(raw: &str) -> Option<PropertyRef> {
    let (target, property) = raw.split_once('#')?;
    if property.is_empty() {
        return None;
    }
    let urn = Urn::parse(target)?;
    Some(PropertyRef::new(urn, property))
}
