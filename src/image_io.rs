use std::path::{Path, PathBuf};
use std::fs;
use image::{ImageFormat, RgbImage};

use crate::cache::content_hash;
use crate::errors::{Result, ScalpError};

/// Extensions accepted when scanning an input directory
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    pub filename: String,
    /// SHA-256 of the raw file bytes, used as the external-result cache key
    pub content_hash: String,
}

/// Get all supported image files from a directory (recursively)
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(ScalpError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(ScalpError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut image_files = Vec::new();
    find_image_files_recursive(dir_path, &mut image_files)?;
    image_files.sort();

    Ok(image_files)
}

fn find_image_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_image_files_recursive(&path, result)?;
        } else if path.is_file() && is_supported_image(&path) {
            result.push(path);
        }
    }

    Ok(())
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Load an image from disk as 8-bit RGB. Grayscale and RGBA sources are
/// converted to three channels.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ScalpError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let bytes = fs::read(path)?;
    let hash = content_hash(&bytes);
    let image = image::load_from_memory(&bytes)?.to_rgb8();

    if image.width() == 0 || image.height() == 0 {
        return Err(ScalpError::EmptyImage(path.to_path_buf()));
    }

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
        content_hash: hash,
    })
}

/// Save an RGB image as PNG
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_image_extensions_case_insensitively() {
        assert!(is_supported_image(Path::new("scan.PNG")));
        assert!(is_supported_image(Path::new("a/b/scan.jpeg")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }

    #[test]
    fn missing_directory_is_an_invalid_path() {
        let result = get_image_files_in_dir("./no/such/scan/dir");
        assert!(matches!(result, Err(ScalpError::InvalidPath(_))));
    }
}
