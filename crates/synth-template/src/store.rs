//! The template and collection store.
//!
//! Sources are loaded lazily on first use and kept until [`TemplateStore::clear`].
//! Per-provider [`TemplateData`] is built on demand and shared behind an `Arc`.

use crate::collection::{
    Collection, Collections, CSV_COLLECTION_SUFFIX, JSON_COLLECTION_SUFFIX,
};
use crate::error::TemplateError;
use crate::state::TokenState;
use crate::template::{RenderScope, TemplateData};
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// File names containing this marker are templates.
pub const TEMPLATE_PATTERN: &str = ".template.";

/// Deepest chain of `Nested` tokens a render may follow.
pub const MAX_NESTING_DEPTH: usize = 16;

pub const TEMPLATES_DIR: &str = "Templates";
pub const COLLECTIONS_DIR: &str = "Collections";

/// Where templates and collections are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub templates_dir: PathBuf,
    pub collections_dir: PathBuf,
    /// Seed for the one-time CSV row shuffle. Random when unset.
    pub shuffle_seed: Option<u64>,
}

impl StoreConfig {
    pub fn new(templates_dir: impl Into<PathBuf>, collections_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            collections_dir: collections_dir.into(),
            shuffle_seed: None,
        }
    }

    /// `<root>/Templates` and `<root>/Templates/Collections`.
    pub fn from_root(root: impl AsRef<Path>) -> Self {
        let templates_dir = root.as_ref().join(TEMPLATES_DIR);
        let collections_dir = templates_dir.join(COLLECTIONS_DIR);
        Self::new(templates_dir, collections_dir)
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

/// Raw template bodies and parsed collections.
#[derive(Debug, Default)]
struct Sources {
    templates: HashMap<String, String>,
    collections: Arc<Collections>,
}

#[derive(Debug)]
enum Origin {
    Disk(StoreConfig),
    Memory(Arc<Sources>),
}

#[derive(Debug)]
pub struct TemplateStore {
    origin: Origin,
    sources: RwLock<Option<Arc<Sources>>>,
    template_data: DashMap<String, Arc<TemplateData>>,
    state: TokenState,
}

impl TemplateStore {
    /// Store reading from disk on first use.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            origin: Origin::Disk(config),
            sources: RwLock::new(None),
            template_data: DashMap::new(),
            state: TokenState::new(),
        }
    }

    /// Store over in-memory templates and collections, keyed by file name.
    pub fn from_sources(
        templates: impl IntoIterator<Item = (String, String)>,
        collections: impl IntoIterator<Item = (String, Collection)>,
    ) -> Self {
        let sources = Arc::new(Sources {
            templates: templates.into_iter().collect(),
            collections: Arc::new(collections.into_iter().collect()),
        });
        Self {
            origin: Origin::Memory(sources),
            sources: RwLock::new(None),
            template_data: DashMap::new(),
            state: TokenState::new(),
        }
    }

    pub fn state(&self) -> &TokenState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.sources.read().is_some()
    }

    /// Load sources once. Concurrent callers wait for the first load.
    fn sources(&self) -> Result<Arc<Sources>, TemplateError> {
        if let Some(sources) = self.sources.read().as_ref() {
            return Ok(Arc::clone(sources));
        }

        let mut guard = self.sources.write();
        if let Some(sources) = guard.as_ref() {
            return Ok(Arc::clone(sources));
        }

        let sources = match &self.origin {
            Origin::Disk(config) => Arc::new(load_sources(config)?),
            Origin::Memory(sources) => Arc::clone(sources),
        };
        info!(
            "Loaded {} templates and {} collections",
            sources.templates.len(),
            sources.collections.len()
        );
        *guard = Some(Arc::clone(&sources));
        Ok(sources)
    }

    /// Prepare `TemplateData` for every template under `provider`. Returns how many
    /// templates the provider can render.
    pub fn build_segments(&self, provider: &str) -> Result<usize, TemplateError> {
        let sources = self.sources()?;
        for (name, raw) in &sources.templates {
            self.template_data
                .entry(data_key(provider, name))
                .or_insert_with(|| {
                    Arc::new(TemplateData::parse(
                        name.as_str(),
                        provider,
                        raw,
                        Arc::clone(&sources.collections),
                    ))
                });
        }
        debug!(
            "Built segments for {} templates for provider '{}'",
            sources.templates.len(),
            provider
        );
        Ok(sources.templates.len())
    }

    /// Prepared template for `provider`, building segments first when needed.
    pub fn template_data(
        &self,
        provider: &str,
        template: &str,
    ) -> Result<Arc<TemplateData>, TemplateError> {
        let key = data_key(provider, template);
        if let Some(data) = self.template_data.get(&key) {
            return Ok(Arc::clone(&data));
        }

        self.build_segments(provider)?;
        self.template_data
            .get(&key)
            .map(|data| Arc::clone(&data))
            .ok_or_else(|| TemplateError::TemplateNotFound {
                provider: provider.to_string(),
                template: template.to_string(),
            })
    }

    /// Render a template once for `provider` on behalf of `worker`.
    pub fn render(
        &self,
        provider: &str,
        template: &str,
        worker: usize,
    ) -> Result<String, TemplateError> {
        let data = self.template_data(provider, template)?;
        data.render(&RenderScope::new(self, worker))
    }

    /// Template file names, sorted.
    pub fn template_names(&self) -> Result<Vec<String>, TemplateError> {
        let mut names: Vec<String> = self.sources()?.templates.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Collection file names, sorted.
    pub fn collection_names(&self) -> Result<Vec<String>, TemplateError> {
        let mut names: Vec<String> = self.sources()?.collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Drop loaded sources, prepared templates and tracked values. The next use
    /// reloads from the origin.
    pub fn clear(&self) {
        *self.sources.write() = None;
        self.template_data.clear();
        self.state.reset();
        info!("Template store cleared");
    }
}

fn data_key(provider: &str, template: &str) -> String {
    format!("{provider}-{template}")
}

/// Read every template and collection, collecting all failures.
fn load_sources(config: &StoreConfig) -> Result<Sources, TemplateError> {
    let mut errors = Vec::new();

    let mut templates = HashMap::new();
    for path in matching_files(&config.templates_dir, &[TEMPLATE_PATTERN])? {
        match fs::read_to_string(&path) {
            Ok(body) => {
                templates.insert(file_name(&path), body);
            }
            Err(source) => errors.push(io_error(&path, source)),
        }
    }

    let mut rng = match config.shuffle_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut collections = Collections::new();
    let collection_files = if config.collections_dir.is_dir() {
        matching_files(
            &config.collections_dir,
            &[JSON_COLLECTION_SUFFIX, CSV_COLLECTION_SUFFIX],
        )?
    } else {
        debug!(
            "Collections directory '{}' does not exist, no collections loaded",
            config.collections_dir.display()
        );
        Vec::new()
    };
    for path in collection_files {
        let name = file_name(&path);
        match load_collection(&path, &name, &mut rng) {
            Ok(collection) => {
                collections.insert(name, collection);
            }
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(TemplateError::Load(errors));
    }

    Ok(Sources {
        templates,
        collections: Arc::new(collections),
    })
}

fn load_collection(path: &Path, name: &str, rng: &mut StdRng) -> Result<Collection, TemplateError> {
    let load_error = |message: String| TemplateError::CollectionLoad {
        file: name.to_string(),
        message,
    };
    if name.to_ascii_lowercase().ends_with(CSV_COLLECTION_SUFFIX) {
        let file = fs::File::open(path).map_err(|e| io_error(path, e))?;
        Collection::from_csv_reader(file, rng).map_err(|e| load_error(e.to_string()))
    } else {
        let contents = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        Collection::from_json_str(&contents).map_err(|e| load_error(e.to_string()))
    }
}

/// Files in `dir` whose lowercase name contains any of `patterns`, sorted by path.
fn matching_files(dir: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>, TemplateError> {
    let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let name = file_name(&path).to_ascii_lowercase();
        if patterns.iter().any(|pattern| name.contains(pattern)) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn io_error(path: &Path, source: std::io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn layout() -> (TempDir, StoreConfig) {
        let root = TempDir::new().unwrap();
        let config = StoreConfig::from_root(root.path()).with_shuffle_seed(42);
        fs::create_dir_all(&config.collections_dir).unwrap();
        (root, config)
    }

    #[test]
    fn test_loads_templates_and_collections_from_disk() {
        let (_root, config) = layout();
        write(&config.templates_dir, "people.template.csv", "::Header=Name\n{{CsvCollection:Collection:names:Name}}\n");
        write(&config.templates_dir, "notes.txt", "ignored");
        write(&config.collections_dir, "names.collections.csv", "Name\nann\nbob\n");
        write(&config.collections_dir, "geo.collections.json", r#"{"collections": {"c": [1]}}"#);

        let store = TemplateStore::new(config);
        assert!(!store.is_loaded());
        assert_eq!(store.template_names().unwrap(), vec!["people.template.csv"]);
        assert_eq!(
            store.collection_names().unwrap(),
            vec!["geo.collections.json", "names.collections.csv"]
        );
        assert!(store.is_loaded());

        let data = store.template_data("people", "people.template.csv").unwrap();
        assert_eq!(data.metadata().get("Header").map(String::as_str), Some("Name"));
        let row = store.render("people", "people.template.csv", 0).unwrap();
        assert!(row == "ann\n" || row == "bob\n");
    }

    #[test]
    fn test_collection_errors_are_aggregated() {
        let (_root, config) = layout();
        write(&config.templates_dir, "a.template.json", "{}");
        write(&config.collections_dir, "one.collections.json", "{not json");
        write(&config.collections_dir, "two.collections.json", "[");

        let store = TemplateStore::new(config);
        match store.build_segments("p") {
            Err(TemplateError::Load(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("Expected aggregated load error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_templates_dir_is_an_error() {
        let root = TempDir::new().unwrap();
        let store = TemplateStore::new(StoreConfig::from_root(root.path()));
        assert!(matches!(
            store.build_segments("p"),
            Err(TemplateError::Io { .. })
        ));
    }

    #[test]
    fn test_missing_collections_dir_loads_no_collections() {
        let root = TempDir::new().unwrap();
        let config = StoreConfig::from_root(root.path());
        fs::create_dir_all(&config.templates_dir).unwrap();
        write(&config.templates_dir, "a.template.txt", "x");
        let store = TemplateStore::new(config);
        assert_eq!(store.build_segments("p").unwrap(), 1);
        assert!(store.collection_names().unwrap().is_empty());
    }

    #[test]
    fn test_template_data_is_shared_per_provider() {
        let store = TemplateStore::from_sources(
            [("a.template.txt".to_string(), "x".to_string())],
            [],
        );
        let first = store.template_data("p", "a.template.txt").unwrap();
        let second = store.template_data("p", "a.template.txt").unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = store.template_data("q", "a.template.txt").unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(other.provider_name(), "q");
    }

    #[test]
    fn test_unknown_template_is_not_found() {
        let store = TemplateStore::from_sources([], []);
        assert!(matches!(
            store.template_data("p", "missing.template.txt"),
            Err(TemplateError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_clear_resets_state_and_reloads_from_disk() {
        let (_root, config) = layout();
        write(&config.templates_dir, "a.template.txt", "{{Guid:Tracked:id}}");
        let templates_dir = config.templates_dir.clone();
        let store = TemplateStore::new(config);

        store.render("p", "a.template.txt", 0).unwrap();
        assert_eq!(store.state().tracked_count(), 1);

        write(&templates_dir, "a.template.txt", "changed");
        store.clear();
        assert!(!store.is_loaded());
        assert_eq!(store.state().tracked_count(), 0);
        assert_eq!(store.render("p", "a.template.txt", 0).unwrap(), "changed");
    }
}
