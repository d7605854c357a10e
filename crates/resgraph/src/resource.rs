//! Identity-bearing resource values.

use crate::reference::PropertyRef;
use crate::urn::Urn;
use crate::value::ResourceData;
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A strongly-typed resource payload.
///
/// Payload types describe their own embedded references, so the graph never
/// has to introspect unknown shapes; a payload that forgets to surface a
/// reference is a bug in that payload type, visible at its definition site.
pub trait TypedData: Any + Send + Sync {
    /// Every reference embedded in this payload.
    fn references(&self) -> Vec<PropertyRef>;

    fn as_any(&self) -> &dyn Any;
}

/// Where a resource was declared, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
}

/// Link to a pre-existing remote resource to be imported rather than created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMetadata {
    pub remote_id: String,
    pub workspace_id: String,
}

/// An identity-bearing, data-carrying unit: a tracking plan, an event, a
/// model. Immutable once added to a [`crate::Graph`]; changing one means
/// replacing the entry.
#[derive(Clone)]
pub struct Resource {
    id: String,
    kind: String,
    data: ResourceData,
    raw_data: Option<Arc<dyn TypedData>>,
    dependencies: Vec<Urn>,
    import: Option<ImportMetadata>,
    source: Option<SourceFile>,
}

impl Resource {
    pub fn new(id: &str, kind: &str, data: ResourceData, dependencies: Vec<Urn>) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            data,
            raw_data: None,
            dependencies,
            import: None,
            source: None,
        }
    }

    /// Attach a strongly-typed payload whose references are discovered
    /// through [`TypedData::references`].
    pub fn with_raw_data(mut self, raw: Arc<dyn TypedData>) -> Self {
        self.raw_data = Some(raw);
        self
    }

    /// Mark this resource for import from an existing remote counterpart.
    pub fn with_import_metadata(mut self, remote_id: &str, workspace_id: &str) -> Self {
        self.import = Some(ImportMetadata {
            remote_id: remote_id.to_string(),
            workspace_id: workspace_id.to_string(),
        });
        self
    }

    /// Record the spec file this resource was declared in.
    pub fn with_source_file(mut self, path: PathBuf) -> Self {
        self.source = Some(SourceFile { path });
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn urn(&self) -> Urn {
        Urn::new(&self.id, &self.kind)
    }

    pub fn data(&self) -> &ResourceData {
        &self.data
    }

    pub fn raw_data(&self) -> Option<&Arc<dyn TypedData>> {
        self.raw_data.as_ref()
    }

    /// Dependencies declared explicitly, not discovered through references.
    pub fn dependencies(&self) -> &[Urn] {
        &self.dependencies
    }

    pub fn import_metadata(&self) -> Option<&ImportMetadata> {
        self.import.as_ref()
    }

    pub fn source_file(&self) -> Option<&SourceFile> {
        self.source.as_ref()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("urn", &self.urn())
            .field("data", &self.data)
            .field("dependencies", &self.dependencies)
            .field("import", &self.import)
            .finish_non_exhaustive()
    }
}
