use std::path::Path;
use std::sync::LazyLock;

use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use regex::Regex;

use crate::config::Layout;
use crate::error::Result;
use crate::models::{StepReport, Task};

use super::{collect_files, read_file, relative_to, require_dir, write_file};

const PNG_PRESET: u8 = 2;
const JPEG_QUALITY: u8 = 85;

static SVG_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static SVG_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));

/// Optimize every image into `img/`, skipping the sprite directory.
pub fn optimize(layout: &Layout) -> Result<StepReport> {
    let source = layout.images_dir();
    require_dir(&source)?;

    let sprites = layout.sprite_dir();
    let output = layout.output_dir();
    let destination = layout.images_output_dir();
    let mut report = StepReport::new(Task::Img);

    for file in collect_files(&source, "**/*")? {
        if file.starts_with(&sprites) {
            continue;
        }
        let data = read_file(&file)?;
        let optimized = optimize_bytes(&file, &data);

        let target = destination.join(relative_to(&file, &source));
        write_file(&target, optimized.as_deref().unwrap_or(&data))?;
        report.written.push(relative_to(&target, &output));
    }

    Ok(report)
}

/// Smaller encoding of `data` chosen by file extension, or `None` when the
/// format is not handled or nothing was gained.
pub fn optimize_bytes(path: &Path, data: &[u8]) -> Option<Vec<u8>> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    let optimized = match ext.as_str() {
        "png" => optimize_png(data),
        "jpg" | "jpeg" => reencode_jpeg(data),
        "svg" => minify_svg(data),
        _ => None,
    }?;

    (optimized.len() < data.len()).then_some(optimized)
}

fn optimize_png(data: &[u8]) -> Option<Vec<u8>> {
    oxipng::optimize_from_memory(data, &oxipng::Options::from_preset(PNG_PRESET))
        .map_err(|e| tracing::debug!("PNG left as is: {}", e))
        .ok()
}

fn reencode_jpeg(data: &[u8]) -> Option<Vec<u8>> {
    let image = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| tracing::debug!("JPEG left as is: {}", e))
        .ok()?;

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&image.to_rgb8())
        .ok()?;
    Some(out)
}

/// Drop comments and whitespace between tags. `viewBox` and ids are untouched.
fn minify_svg(data: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(data).ok()?;
    let text = SVG_COMMENT.replace_all(text, "");
    let text = SVG_GAP.replace_all(&text, "><");
    Some(text.trim().as_bytes().to_vec())
}
