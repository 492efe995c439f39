use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::error::{DataError, Result};

use super::sample::{LabeledDataset, RgbDepthSample, Sample};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Sorted image files directly inside `dir`
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Sorted names of the class sub-directories of `root`
fn find_classes(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(DataError::Config(format!(
            "Dataset directory does not exist: {:?}",
            root
        )));
    }

    let mut classes = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            classes.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    classes.sort();
    Ok(classes)
}

/// Decode an image from disk as 8-bit RGB
fn load_rgb(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path)?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Images organised as `root/<class>/<image>`, one directory per class.
///
/// Class directories are sorted by name and labelled in that order, so a
/// `fail/` + `success/` layout yields labels 0 and 1. Samples are ordered by
/// class, then by file name. Images are decoded lazily on `get`.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    classes: Vec<String>,
    samples: Vec<PathBuf>,
    targets: Vec<usize>,
}

impl ImageFolder {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        info!("Reading image folder: {:?}", root);

        let classes = find_classes(&root)?;
        let mut samples = Vec::new();
        let mut targets = Vec::new();

        for (label, class_name) in classes.iter().enumerate() {
            let files = list_images(&root.join(class_name))?;
            debug!("Class '{}' (label {}): {} images", class_name, label, files.len());
            targets.extend(std::iter::repeat(label).take(files.len()));
            samples.extend(files);
        }

        info!("Found {} images in {} classes", samples.len(), classes.len());

        Ok(Self {
            root,
            classes,
            samples,
            targets,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.samples.get(index).map(PathBuf::as_path)
    }
}

impl LabeledDataset for ImageFolder {
    type Item = Sample<DynamicImage>;

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn labels(&self) -> &[usize] {
        &self.targets
    }

    fn get(&self, index: usize) -> Result<Sample<DynamicImage>> {
        let path = self.samples.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.samples.len(),
        })?;
        Ok(Sample::new(load_rgb(path)?, self.targets[index]))
    }
}

/// Paired RGB and depth images organised as
/// `root/<class>/rgb/<name>` and `root/<class>/depth/<name>`.
///
/// Depth images are loaded through the same RGB path as the colour images so
/// one transform can be applied to both.
#[derive(Debug, Clone)]
pub struct RgbDepthFolder {
    root: PathBuf,
    classes: Vec<String>,
    pairs: Vec<(PathBuf, PathBuf)>,
    targets: Vec<usize>,
}

impl RgbDepthFolder {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        info!("Reading RGB + depth folder: {:?}", root);

        let classes = find_classes(&root)?;
        let mut pairs = Vec::new();
        let mut targets = Vec::new();

        for (label, class_name) in classes.iter().enumerate() {
            let class_dir = root.join(class_name);
            let rgb_dir = class_dir.join("rgb");
            let depth_dir = class_dir.join("depth");
            if !rgb_dir.is_dir() {
                warn!("Skipping class '{}': no rgb directory", class_name);
                continue;
            }

            for rgb_path in list_images(&rgb_dir)? {
                let depth_path = match rgb_path.file_name() {
                    Some(name) => depth_dir.join(name),
                    None => continue,
                };
                if !depth_path.is_file() {
                    return Err(DataError::MissingDepth(rgb_path));
                }
                pairs.push((rgb_path, depth_path));
                targets.push(label);
            }
        }

        info!("Found {} RGB + depth pairs in {} classes", pairs.len(), classes.len());

        Ok(Self {
            root,
            classes,
            pairs,
            targets,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

impl LabeledDataset for RgbDepthFolder {
    type Item = RgbDepthSample<DynamicImage>;

    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn labels(&self) -> &[usize] {
        &self.targets
    }

    fn get(&self, index: usize) -> Result<RgbDepthSample<DynamicImage>> {
        let (rgb_path, depth_path) = self.pairs.get(index).ok_or(DataError::IndexOutOfRange {
            index,
            len: self.pairs.len(),
        })?;
        Ok(RgbDepthSample {
            rgb: load_rgb(rgb_path)?,
            depth: load_rgb(depth_path)?,
            label: self.targets[index],
            files: vec![rgb_path.clone(), depth_path.clone()],
        })
    }
}
