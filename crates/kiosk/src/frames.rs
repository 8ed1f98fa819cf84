use anyhow::{Context, bail};
use async_trait::async_trait;
use client::FrameSource;
use schema::ImageData;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Replays the images of a directory as camera frames, in file name order,
/// starting over after the last one.
#[derive(Debug)]
pub struct DirectoryFrames {
    paths: Vec<PathBuf>,
    next: usize,
}

impl DirectoryFrames {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("failed to read frame directory {}", dir.display()))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            bail!("no jpg or png images in {}", dir.display());
        }

        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn advance(&mut self) -> &Path {
        let path = &self.paths[self.next];
        self.next = (self.next + 1) % self.paths.len();
        path
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[async_trait]
impl FrameSource for DirectoryFrames {
    async fn capture(&mut self) -> Option<ImageData> {
        let path = self.advance().to_path_buf();
        match tokio::fs::read(&path).await {
            Ok(bytes) => Some(ImageData::Raw(bytes)),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to read frame");
                None
            }
        }
    }
}
