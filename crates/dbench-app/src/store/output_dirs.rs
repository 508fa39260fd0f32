//! Output directory resolution
//!
//! Views that produce files (APK exports, partition backups, screenshots,
//! recordings, ...) ask this store for their destination directory. The
//! root is resolved from the backend once per process; the fixed category
//! subdirectories are created lazily and best-effort.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::OnceCell;

use dbench_core::prelude::*;
use dbench_core::ConsoleLog;
use dbench_rpc::Backend;

/// Used when the backend cannot tell us where its data directory is
pub const FALLBACK_OUTPUT_DIR: &str = "./data";

/// Fixed set of output categories, one subdirectory each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputCategory {
    /// APKs pulled off a device
    Apk,
    /// Partition backups
    Backup,
    Screenshot,
    Recording,
    /// Partition images extracted from ROM packages
    Rom,
    /// Recovery/root module extraction
    Module,
    Log,
}

impl OutputCategory {
    pub const ALL: [OutputCategory; 7] = [
        OutputCategory::Apk,
        OutputCategory::Backup,
        OutputCategory::Screenshot,
        OutputCategory::Recording,
        OutputCategory::Rom,
        OutputCategory::Module,
        OutputCategory::Log,
    ];

    /// Folder name under the output root
    pub fn dir_name(self) -> &'static str {
        match self {
            OutputCategory::Apk => "apk-exports",
            OutputCategory::Backup => "partition-backups",
            OutputCategory::Screenshot => "screenshots",
            OutputCategory::Recording => "recordings",
            OutputCategory::Rom => "rom-exports",
            OutputCategory::Module => "module-exports",
            OutputCategory::Log => "logs",
        }
    }
}

/// Resolves and lazily creates the output directory tree.
pub struct OutputDirs<B> {
    backend: Arc<B>,
    console: Arc<ConsoleLog>,
    root: OnceCell<PathBuf>,
}

impl<B: Backend + Sync> OutputDirs<B> {
    pub fn new(backend: Arc<B>, console: Arc<ConsoleLog>) -> Self {
        Self {
            backend,
            console,
            root: OnceCell::new(),
        }
    }

    /// Resolve the output root and make sure the tree exists.
    ///
    /// Idempotent: the resolution runs once per process; later callers
    /// get the cached root. Directory creation is best-effort per
    /// category, so one unwritable folder does not take down the rest.
    pub async fn init(&self) -> &Path {
        self.root
            .get_or_init(|| async {
                let root = match self.backend.get_data_dir().await {
                    Ok(dir) => PathBuf::from(dir),
                    Err(e) => {
                        debug!("Output root resolution failed: {e}");
                        self.console
                            .error(format!("Failed to resolve output directory: {e}"));
                        PathBuf::from(FALLBACK_OUTPUT_DIR)
                    }
                };

                self.ensure(&root).await;
                for category in OutputCategory::ALL {
                    self.ensure(&root.join(category.dir_name())).await;
                }

                root
            })
            .await
    }

    /// Destination directory for the given category
    pub async fn sub_dir(&self, category: OutputCategory) -> PathBuf {
        self.init().await.join(category.dir_name())
    }

    async fn ensure(&self, path: &Path) {
        if let Err(e) = self.backend.ensure_dir(&path.to_string_lossy()).await {
            debug!("ensure_dir {} failed: {e}", path.display());
            self.console
                .error(format!("Failed to create {}: {e}", path.display()));
        }
    }
}

/// Filesystem-safe filename carrying a sortable UTC timestamp:
/// `<prefix>_<YYYY-MM-DDTHH-MM-SS>.<ext>`
pub fn timestamped_name(prefix: &str, ext: &str) -> String {
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S");
    format!("{prefix}_{stamp}.{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbench_rpc::test_utils::FakeBackend;

    fn dirs_with(fake: &Arc<FakeBackend>) -> OutputDirs<FakeBackend> {
        OutputDirs::new(Arc::clone(fake), Arc::new(ConsoleLog::new()))
    }

    #[tokio::test]
    async fn test_init_creates_root_and_all_categories() {
        let fake = Arc::new(FakeBackend::new());
        fake.set_data_dir("/opt/dbench/data");
        let dirs = dirs_with(&fake);

        let root = dirs.init().await;

        assert_eq!(root, Path::new("/opt/dbench/data"));
        let ensured = fake.ensured_dirs();
        assert_eq!(ensured.len(), 1 + OutputCategory::ALL.len());
        assert_eq!(ensured[0], "/opt/dbench/data");
        assert!(ensured.contains(&"/opt/dbench/data/screenshots".to_string()));
        assert!(ensured.contains(&"/opt/dbench/data/partition-backups".to_string()));
        assert!(ensured.contains(&"/opt/dbench/data/logs".to_string()));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let fake = Arc::new(FakeBackend::new());
        let dirs = dirs_with(&fake);

        let first = dirs.sub_dir(OutputCategory::Apk).await;
        let second = dirs.sub_dir(OutputCategory::Backup).await;

        assert_eq!(first, Path::new("/fake/data/apk-exports"));
        assert_eq!(second, Path::new("/fake/data/partition-backups"));
        // Root resolved once, tree created once
        assert_eq!(fake.calls("get_data_dir"), 1);
        assert_eq!(fake.calls("ensure_dir"), 1 + OutputCategory::ALL.len());
    }

    #[tokio::test]
    async fn test_falls_back_when_root_resolution_fails() {
        let fake = Arc::new(FakeBackend::new());
        fake.fail_data_dir();
        let console = Arc::new(ConsoleLog::new());
        let dirs = OutputDirs::new(Arc::clone(&fake), Arc::clone(&console));

        let root = dirs.init().await;

        assert_eq!(root, Path::new(FALLBACK_OUTPUT_DIR));
        assert!(console
            .entries()
            .iter()
            .any(|e| e.message.contains("Failed to resolve output directory")));
        // The fallback tree is still created
        assert_eq!(fake.calls("ensure_dir"), 1 + OutputCategory::ALL.len());
    }

    #[tokio::test]
    async fn test_one_failing_directory_does_not_abort_the_rest() {
        let fake = Arc::new(FakeBackend::new());
        fake.set_data_dir("/data");
        fake.fail_dir("/data/screenshots");
        let console = Arc::new(ConsoleLog::new());
        let dirs = OutputDirs::new(Arc::clone(&fake), Arc::clone(&console));

        dirs.init().await;

        // Every creation was still attempted
        assert_eq!(fake.calls("ensure_dir"), 1 + OutputCategory::ALL.len());
        assert!(console
            .entries()
            .iter()
            .any(|e| e.message.contains("/data/screenshots")));
    }

    #[test]
    fn test_category_folders_are_distinct() {
        let mut names: Vec<_> = OutputCategory::ALL.iter().map(|c| c.dir_name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), OutputCategory::ALL.len());
    }

    #[test]
    fn test_timestamped_name_format() {
        let name = timestamped_name("backup", "tar");

        let pattern =
            regex::Regex::new(r"^backup_\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}\.tar$").unwrap();
        assert!(pattern.is_match(&name), "unexpected name: {name}");
    }

    #[test]
    fn test_timestamped_name_is_sortable_safe() {
        let name = timestamped_name("screenshot", "png");
        assert!(!name.contains(':'));
        assert!(!name.contains(' '));
        assert!(name.ends_with(".png"));
    }
}
