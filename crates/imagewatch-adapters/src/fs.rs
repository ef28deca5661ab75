//! Filesystem-backed document.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use imagewatch_core::{Document, NodeId, NodeKind, Readiness};
use tracing::{debug, trace, warn};

/// Raster extensions decoded by the `image` crate.
pub const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];
/// RAW camera extensions.
pub const RAW_EXTENSIONS: &[&str] = &["cr2", "cr3", "nef", "arw", "raf", "dng", "orf", "rw2"];

struct FsNode {
    kind: NodeKind,
    path: PathBuf,
    children: Vec<NodeId>,
}

/// Document whose nodes are files and directories.
///
/// Directories are elements, supported image files are images whose `src`
/// is their path, and everything else is an inert node. The tree is built
/// once by [`FsDocument::scan`] and never changes.
pub struct FsDocument {
    nodes: Vec<FsNode>,
    recursive: bool,
}

impl FsDocument {
    /// Builds a document from `paths` and returns the node of each path
    /// that exists, in input order.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to descend into subdirectories
    #[must_use]
    pub fn scan(paths: &[PathBuf], recursive: bool) -> (Self, Vec<NodeId>) {
        let mut document = Self {
            nodes: vec![FsNode {
                kind: NodeKind::Document,
                path: PathBuf::new(),
                children: Vec::new(),
            }],
            recursive,
        };

        let mut visited = HashSet::new();
        let mut roots = Vec::with_capacity(paths.len());
        for path in paths {
            if path.is_file() {
                if !is_supported_image(path) {
                    warn!("Unsupported file type: {}", path.display());
                }
                roots.push(document.add_file(Self::root(), path.clone()));
            } else if path.is_dir() {
                roots.push(document.add_dir(Self::root(), path.clone(), &mut visited));
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }

        debug!(
            nodes = document.nodes.len(),
            images = document.descendant_images(Self::root()).len(),
            "scanned filesystem"
        );
        (document, roots)
    }

    /// The document root.
    #[must_use]
    pub const fn root() -> NodeId {
        NodeId::new(0)
    }

    /// Filesystem path of `node`.
    #[must_use]
    pub fn path(&self, node: NodeId) -> Option<&Path> {
        self.node(node).map(|n| n.path.as_path())
    }

    /// Number of nodes, the root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds only its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn node(&self, node: NodeId) -> Option<&FsNode> {
        usize::try_from(node.get())
            .ok()
            .and_then(|index| self.nodes.get(index))
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind, path: PathBuf) -> NodeId {
        let id = NodeId::new(u64::try_from(self.nodes.len()).unwrap_or(u64::MAX));
        self.nodes.push(FsNode {
            kind,
            path,
            children: Vec::new(),
        });
        if let Some(parent) = usize::try_from(parent.get())
            .ok()
            .and_then(|index| self.nodes.get_mut(index))
        {
            parent.children.push(id);
        }
        id
    }

    fn add_file(&mut self, parent: NodeId, path: PathBuf) -> NodeId {
        let kind = if is_supported_image(&path) {
            NodeKind::Image
        } else {
            NodeKind::Other
        };
        self.push(parent, kind, path)
    }

    /// Adds `dir` and its entries. A directory already walked in this scan,
    /// whether reached again through a symlink or listed twice, is added
    /// without children.
    fn add_dir(&mut self, parent: NodeId, dir: PathBuf, visited: &mut HashSet<PathBuf>) -> NodeId {
        let canonical = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        if !visited.insert(canonical) {
            debug!("Skipping already scanned directory: {}", dir.display());
            return self.push(parent, NodeKind::Element, dir);
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return self.push(parent, NodeKind::Element, dir);
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let element = self.push(parent, NodeKind::Element, dir);
        for path in paths {
            if path.is_file() {
                if !is_supported_image(&path) {
                    trace!("Non-image file: {}", path.display());
                }
                self.add_file(element, path);
            } else if path.is_dir() && self.recursive {
                self.add_dir(element, path, visited);
            }
        }
        element
    }

    fn collect(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(entry) = self.node(node) else {
            return;
        };
        for &child in &entry.children {
            if self.node(child).is_some_and(|c| c.kind == NodeKind::Image) {
                out.push(child);
            }
            self.collect(child, out);
        }
    }
}

impl Document for FsDocument {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|n| n.kind)
    }

    fn descendant_images(&self, node: NodeId) -> Vec<NodeId> {
        let mut images = Vec::new();
        self.collect(node, &mut images);
        images
    }

    fn src(&self, image: NodeId) -> String {
        self.node(image)
            .map(|n| n.path.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn readiness(&self, _image: NodeId) -> Readiness {
        Readiness::Unsupported
    }
}

/// Lowercased extension of `path`.
pub(crate) fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
}

/// Checks if a path has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    extension(path).is_some_and(|e| {
        RASTER_EXTENSIONS.contains(&e.as_str()) || RAW_EXTENSIONS.contains(&e.as_str())
    })
}

/// Checks if a path has a RAW camera extension.
#[must_use]
pub fn is_raw_image(path: &Path) -> bool {
    extension(path).is_some_and(|e| RAW_EXTENSIONS.contains(&e.as_str()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("test.jpg")));
        assert!(is_supported_image(Path::new("test.JPEG")));
        assert!(is_supported_image(Path::new("test.png")));
        assert!(is_supported_image(Path::new("test.cr2")));
        assert!(is_supported_image(Path::new("test.NEF")));
        assert!(!is_supported_image(Path::new("test.txt")));
        assert!(!is_supported_image(Path::new("test")));
    }

    #[test]
    fn test_is_raw_image() {
        assert!(is_raw_image(Path::new("shot.DNG")));
        assert!(!is_raw_image(Path::new("shot.png")));
    }

    #[test]
    fn test_directory_children_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let b = touch(dir.path(), "b.png");
        let a = touch(dir.path(), "a.jpg");
        touch(dir.path(), "notes.txt");

        let (doc, roots) = FsDocument::scan(&[dir.path().to_path_buf()], false);
        assert_eq!(roots.len(), 1);
        assert_eq!(doc.kind(roots[0]), Some(NodeKind::Element));

        let srcs: Vec<String> = doc
            .descendant_images(roots[0])
            .into_iter()
            .map(|image| doc.src(image))
            .collect();
        assert_eq!(
            srcs,
            vec![
                a.to_string_lossy().into_owned(),
                b.to_string_lossy().into_owned()
            ]
        );
    }

    #[test]
    fn test_subdirectories_need_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        touch(&sub, "deep.png");
        touch(dir.path(), "top.png");

        let paths = [dir.path().to_path_buf()];
        let (flat, roots) = FsDocument::scan(&paths, false);
        assert_eq!(flat.descendant_images(roots[0]).len(), 1);

        let (deep, roots) = FsDocument::scan(&paths, true);
        assert_eq!(deep.descendant_images(roots[0]).len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_scanned_once() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        touch(dir.path(), "a.png");
        touch(&sub, "b.png");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path(), sub.join("up")).unwrap();

        let (doc, roots) = FsDocument::scan(&[dir.path().to_path_buf()], true);
        let srcs: Vec<String> = doc
            .descendant_images(roots[0])
            .into_iter()
            .map(|image| doc.src(image))
            .collect();

        assert_eq!(
            srcs,
            vec![
                dir.path().join("a.png").to_string_lossy().into_owned(),
                sub.join("b.png").to_string_lossy().into_owned()
            ]
        );
    }

    #[test]
    fn test_directory_listed_twice_scanned_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.png");

        let paths = [dir.path().to_path_buf(), dir.path().to_path_buf()];
        let (doc, roots) = FsDocument::scan(&paths, false);

        assert_eq!(roots.len(), 2);
        assert_eq!(doc.descendant_images(FsDocument::root()).len(), 1);
    }

    #[test]
    fn test_files_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let img = touch(dir.path(), "a.png");
        let txt = touch(dir.path(), "a.txt");
        let missing = dir.path().join("gone.png");

        let (doc, roots) = FsDocument::scan(&[img.clone(), txt, missing], false);
        assert_eq!(roots.len(), 2);
        assert_eq!(doc.kind(roots[0]), Some(NodeKind::Image));
        assert_eq!(doc.kind(roots[1]), Some(NodeKind::Other));
        assert_eq!(doc.path(roots[0]), Some(img.as_path()));
        assert_eq!(doc.readiness(roots[0]), Readiness::Unsupported);
    }

    #[test]
    fn test_unknown_node() {
        let (doc, roots) = FsDocument::scan(&[], false);
        assert!(roots.is_empty());
        assert!(doc.is_empty());
        assert_eq!(doc.kind(NodeId::new(7)), None);
        assert_eq!(doc.src(NodeId::new(7)), "");
    }
}
