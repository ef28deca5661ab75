//! Synthetic page and file fixture builders for testing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imagewatch_core::NodeId;

use crate::MockDocument;

/// A container and the images placed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    /// Element holding the images.
    pub container: NodeId,
    /// Images in document order.
    pub images: Vec<NodeId>,
}

/// Builder for common document shapes.
pub struct PageBuilder;

impl PageBuilder {
    /// Adds an element under the root holding one image per `src`.
    pub fn gallery(document: &MockDocument, srcs: &[&str]) -> Gallery {
        let container = document.element(document.root());
        let images = srcs.iter().map(|src| document.image(container, src)).collect();
        Gallery { container, images }
    }

    /// Adds a gallery whose images sit `depth` elements below the container,
    /// with a text node before each image.
    pub fn nested_gallery(document: &MockDocument, depth: usize, srcs: &[&str]) -> Gallery {
        let container = document.element(document.root());
        let mut parent = container;
        for _ in 0..depth {
            parent = document.element(parent);
        }
        let images = srcs
            .iter()
            .map(|src| {
                document.text(parent);
                document.image(parent, src)
            })
            .collect();
        Gallery { container, images }
    }
}

/// Writers for on-disk image fixtures.
pub struct FixtureFiles;

impl FixtureFiles {
    /// Writes a decodable PNG with a gradient fill.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn png(dir: &Path, name: &str, width: u32, height: u32) -> Result<PathBuf> {
        let path = dir.join(name);
        let img = RgbImage::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x + y) % 256) as u8;
            Rgb([v, v, v])
        });
        img.save(&path)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }

    /// Writes a file with an image extension but undecodable contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn corrupt(dir: &Path, name: &str) -> Result<PathBuf> {
        Self::bytes(dir, name, b"\x89PNG\r\n\x1a\nthis is not really a png")
    }

    /// Writes arbitrary bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn bytes(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }
}
