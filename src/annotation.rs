// src/annotation.rs - Overlay detected regions onto a copy of the photo

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::font::{draw_text, text_height, text_width};
use crate::symptoms::MicroSymptoms;

pub const RED_DOT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const FLAKE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const FOLLICLE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

const LABEL_SCALE: u32 = 2;
const MAX_FOLLICLES: usize = 15;
const LEGEND_WIDTH: i32 = 170;

/// One region to mark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub center: (u32, u32),
    pub area: f64,
    /// Appended to the label in parentheses
    pub tag: Option<char>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationLayers {
    pub red_dots: Vec<Marker>,
    pub flakes: Vec<Marker>,
    /// Follicle centres, supplied by the caller
    pub follicles: Vec<(u32, u32)>,
}

impl AnnotationLayers {
    pub fn is_empty(&self) -> bool {
        self.red_dots.is_empty() && self.flakes.is_empty() && self.follicles.is_empty()
    }
}

impl From<&MicroSymptoms> for AnnotationLayers {
    fn from(symptoms: &MicroSymptoms) -> Self {
        Self {
            red_dots: symptoms
                .red_dots
                .iter()
                .map(|d| Marker { center: d.center, area: d.area, tag: None })
                .collect(),
            flakes: symptoms
                .white_flakes
                .iter()
                .map(|f| Marker { center: f.center, area: f.area, tag: Some(f.size.initial()) })
                .collect(),
            follicles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationOptions {
    pub show_labels: bool,
    pub show_legend: bool,
    /// Labels drawn per category
    pub label_limit: usize,
}

impl Default for AnnotationOptions {
    fn default() -> Self {
        Self { show_labels: true, show_legend: true, label_limit: 15 }
    }
}

/// Draw every layer on a copy of `image`. The input is left untouched and
/// with nothing to draw the copy is pixel-identical to it.
pub fn annotate(image: &RgbImage, layers: &AnnotationLayers, options: &AnnotationOptions) -> RgbImage {
    let mut canvas = image.clone();

    if !layers.red_dots.is_empty() {
        draw_red_dots(&mut canvas, &layers.red_dots, options);
    }
    if !layers.flakes.is_empty() {
        draw_flakes(&mut canvas, &layers.flakes, options);
    }
    for &(x, y) in layers.follicles.iter().take(MAX_FOLLICLES) {
        let center = (x as i32, y as i32);
        draw_hollow_circle_mut(&mut canvas, center, 8, FOLLICLE_COLOR);
        draw_filled_circle_mut(&mut canvas, center, 2, FOLLICLE_COLOR);
    }

    if options.show_legend && !layers.is_empty() {
        draw_legend(&mut canvas, layers);
    }

    canvas
}

/// Annotate straight from the detailed detector output
pub fn annotate_micro_symptoms(
    image: &RgbImage,
    symptoms: &MicroSymptoms,
    options: &AnnotationOptions,
) -> RgbImage {
    annotate(image, &AnnotationLayers::from(symptoms), options)
}

fn draw_red_dots(canvas: &mut RgbImage, markers: &[Marker], options: &AnnotationOptions) {
    let mut overlay = canvas.clone();

    for (i, marker) in markers.iter().enumerate() {
        let (x, y) = (marker.center.0 as i32, marker.center.1 as i32);
        let radius = ((marker.area / std::f64::consts::PI).sqrt() as i32 + 10).max(20);

        draw_filled_circle_mut(&mut overlay, (x, y), radius, RED_DOT_COLOR);
        draw_ring(canvas, (x, y), radius, 4, RED_DOT_COLOR);
        draw_ring(canvas, (x, y), radius - 3, 2, RED_DOT_COLOR);
        draw_filled_circle_mut(canvas, (x, y), 5, WHITE);
        draw_filled_circle_mut(canvas, (x, y), 4, RED_DOT_COLOR);

        if options.show_labels && i < options.label_limit {
            draw_label(canvas, &format!("R{}", i + 1), (x, y - radius - 10), RED_DOT_COLOR);
        }
    }

    blend(canvas, &overlay, 0.3);
}

fn draw_flakes(canvas: &mut RgbImage, markers: &[Marker], options: &AnnotationOptions) {
    let mut overlay = canvas.clone();

    for (i, marker) in markers.iter().enumerate() {
        let (x, y) = (marker.center.0 as i32, marker.center.1 as i32);
        let size = (marker.area.sqrt() as i32 + 8).max(18);

        fill_box(&mut overlay, (x - size, y - size), (x + size, y + size), FLAKE_COLOR);
        draw_box(canvas, (x - size, y - size), (x + size, y + size), 4, FLAKE_COLOR);
        draw_box(canvas, (x - size + 3, y - size + 3), (x + size - 3, y + size - 3), 2, FLAKE_COLOR);

        // Centre cross, 3 px strokes
        fill_box(canvas, (x - 8, y - 1), (x + 8, y + 1), FLAKE_COLOR);
        fill_box(canvas, (x - 1, y - 8), (x + 1, y + 8), FLAKE_COLOR);

        if options.show_labels && i < options.label_limit {
            let label = match marker.tag {
                Some(tag) => format!("F{}({})", i + 1, tag),
                None => format!("F{}", i + 1),
            };
            draw_label(canvas, &label, (x, y - size - 10), FLAKE_COLOR);
        }
    }

    blend(canvas, &overlay, 0.25);
}

/// Legend box in the top-right corner, one row per non-empty category
fn draw_legend(canvas: &mut RgbImage, layers: &AnnotationLayers) {
    let lx = canvas.width() as i32 - 180;
    let ly = 20;
    let rows = [!layers.red_dots.is_empty(), !layers.flakes.is_empty(), !layers.follicles.is_empty()]
        .iter()
        .filter(|present| **present)
        .count() as i32;
    let legend_height = 30 + rows * 35 + 15;

    let mut overlay = canvas.clone();
    fill_box(&mut overlay, (lx - 15, ly - 15), (lx + LEGEND_WIDTH + 5, ly + legend_height), WHITE);
    fill_box(&mut overlay, (lx - 12, ly - 12), (lx + LEGEND_WIDTH + 2, ly + legend_height - 3), BLACK);
    blend(canvas, &overlay, 0.8);

    let text_top = |baseline: i32| baseline - text_height(LABEL_SCALE) as i32;
    let mut y = ly;

    if !layers.red_dots.is_empty() {
        draw_filled_circle_mut(canvas, (lx, y + 8), 8, RED_DOT_COLOR);
        let text = format!("Red Dots: {}", layers.red_dots.len());
        draw_text(canvas, &text, lx + 20, text_top(y + 15), LABEL_SCALE, WHITE);
        y += 35;
    }

    if !layers.flakes.is_empty() {
        draw_box(canvas, (lx - 8, y), (lx + 8, y + 16), 3, FLAKE_COLOR);
        let text = format!("Flakes: {}", layers.flakes.len());
        draw_text(canvas, &text, lx + 20, text_top(y + 15), LABEL_SCALE, WHITE);
        y += 25;
    }

    if !layers.follicles.is_empty() {
        draw_hollow_circle_mut(canvas, (lx, y + 5), 5, FOLLICLE_COLOR);
        let text = format!("Follicles: {}", layers.follicles.len());
        draw_text(canvas, &text, lx + 15, text_top(y + 10), LABEL_SCALE, WHITE);
    }
}

/// Text on a black box with a white border. `anchor` is the left end of
/// the text baseline.
fn draw_label(canvas: &mut RgbImage, text: &str, anchor: (i32, i32), color: Rgb<u8>) {
    let (x, y) = anchor;
    let width = text_width(text, LABEL_SCALE) as i32;
    let height = text_height(LABEL_SCALE) as i32;
    let baseline = LABEL_SCALE as i32 * 2;
    let padding = 4;

    fill_box(
        canvas,
        (x - padding - 2, y - height - padding - 2),
        (x + width + padding + 2, y + baseline + padding + 2),
        WHITE,
    );
    fill_box(canvas, (x - padding, y - height - padding), (x + width + padding, y + baseline + padding), BLACK);
    draw_text(canvas, text, x, y - height, LABEL_SCALE, color);
}

/// Filled rectangle between two inclusive corners, clipped to the canvas
fn fill_box(canvas: &mut RgbImage, top_left: (i32, i32), bottom_right: (i32, i32), color: Rgb<u8>) {
    let width = bottom_right.0 - top_left.0 + 1;
    let height = bottom_right.1 - top_left.1 + 1;
    if width <= 0 || height <= 0 {
        return;
    }
    let rect = Rect::at(top_left.0, top_left.1).of_size(width as u32, height as u32);
    draw_filled_rect_mut(canvas, rect, color);
}

/// Rectangle outline whose strokes are centred on the given corners
fn draw_box(
    canvas: &mut RgbImage,
    top_left: (i32, i32),
    bottom_right: (i32, i32),
    thickness: i32,
    color: Rgb<u8>,
) {
    let inner = thickness / 2;
    let outer = thickness - 1 - inner;
    let (x0, y0) = top_left;
    let (x1, y1) = bottom_right;

    fill_box(canvas, (x0 - outer, y0 - outer), (x1 + outer, y0 + inner), color);
    fill_box(canvas, (x0 - outer, y1 - inner), (x1 + outer, y1 + outer), color);
    fill_box(canvas, (x0 - outer, y0 - outer), (x0 + inner, y1 + outer), color);
    fill_box(canvas, (x1 - inner, y0 - outer), (x1 + outer, y1 + outer), color);
}

/// Circle outline `thickness` pixels wide, centred on `radius`
fn draw_ring(canvas: &mut RgbImage, center: (i32, i32), radius: i32, thickness: i32, color: Rgb<u8>) {
    if radius <= 0 {
        return;
    }
    let (width, height) = (canvas.width() as i32, canvas.height() as i32);
    let half = thickness as f64 / 2.0;
    let (inner, outer) = ((radius as f64 - half).max(0.0), radius as f64 + half);
    let reach = outer.ceil() as i32;

    for y in (center.1 - reach).max(0)..=(center.1 + reach).min(height - 1) {
        for x in (center.0 - reach).max(0)..=(center.0 + reach).min(width - 1) {
            let dx = (x - center.0) as f64;
            let dy = (y - center.1) as f64;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance >= inner && distance < outer {
                canvas.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// canvas = overlay * alpha + canvas * (1 - alpha)
fn blend(canvas: &mut RgbImage, overlay: &RgbImage, alpha: f64) {
    for (base, top) in canvas.pixels_mut().zip(overlay.pixels()) {
        for c in 0..3 {
            let mixed = top[c] as f64 * alpha + base[c] as f64 * (1.0 - alpha);
            base[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Side of the square each thumbnail on a comparison sheet is fitted into
pub const COMPARISON_CELL: u32 = 400;
const COMPARISON_MARGIN: u32 = 20;
const COMPARISON_CAPTION: u32 = 60;

/// Shrink to fit a `COMPARISON_CELL` square, keeping the aspect ratio.
/// Images that already fit are left at their size.
fn fit_to_cell(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let scale = (COMPARISON_CELL as f64 / width as f64)
        .min(COMPARISON_CELL as f64 / height as f64)
        .min(1.0);
    if scale >= 1.0 {
        return image.clone();
    }
    let new_width = ((width as f64 * scale).round() as u32).max(1);
    let new_height = ((height as f64 * scale).round() as u32).max(1);
    image::imageops::thumbnail(image, new_width, new_height)
}

fn place_cell(canvas: &mut RgbImage, image: &RgbImage, caption: &str, x: u32, y: u32) {
    if image.width() > 0 && image.height() > 0 {
        image::imageops::overlay(canvas, &fit_to_cell(image), x as i64, (y + 40) as i64);
    }
    draw_text(canvas, caption, x as i32, (y + 10) as i32, LABEL_SCALE, BLACK);
}

/// Lay out labelled photos on a white grid sheet. With annotated copies,
/// each row holds one original and its annotation side by side and `cols`
/// is ignored. Returns `None` when there is nothing to show.
pub fn compose_comparison(
    images: &[(RgbImage, String)],
    annotated: Option<&[RgbImage]>,
    cols: u32,
) -> Option<RgbImage> {
    if images.is_empty() {
        return None;
    }

    let annotated = annotated.filter(|a| !a.is_empty());
    let (cells, cols) = match annotated {
        Some(_) => (images.len() as u32 * 2, 2),
        None => (images.len() as u32, cols.max(1)),
    };
    let rows = (cells + cols - 1) / cols;

    let width = COMPARISON_CELL * cols + COMPARISON_MARGIN * (cols + 1);
    let height = (COMPARISON_CELL + COMPARISON_CAPTION) * rows + COMPARISON_MARGIN;
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);

    let column_x = |col: u32| COMPARISON_MARGIN + col * (COMPARISON_CELL + COMPARISON_MARGIN);
    let row_y = |row: u32| COMPARISON_MARGIN + row * (COMPARISON_CELL + COMPARISON_CAPTION);

    for (index, (image, label)) in images.iter().enumerate() {
        let index = index as u32;
        match annotated {
            Some(annotated) => {
                let y = row_y(index);
                place_cell(&mut canvas, image, &format!("{} - Original", label), column_x(0), y);
                if let Some(marked) = annotated.get(index as usize) {
                    place_cell(&mut canvas, marked, &format!("{} - Annotated", label), column_x(1), y);
                }
            }
            None => {
                let (x, y) = (column_x(index % cols), row_y(index / cols));
                place_cell(&mut canvas, image, label, x, y);
            }
        }
    }

    Some(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn background() -> RgbImage {
        RgbImage::from_pixel(300, 200, Rgb([120, 100, 90]))
    }

    fn marker(x: u32, y: u32, area: f64) -> Marker {
        Marker { center: (x, y), area, tag: None }
    }

    #[test]
    fn nothing_to_draw_is_identity() {
        let image = background();
        let out = annotate(&image, &AnnotationLayers::default(), &AnnotationOptions::default());
        assert_eq!(out, image);
    }

    #[test]
    fn red_dot_marks_centre_and_outline() {
        let image = background();
        let layers = AnnotationLayers { red_dots: vec![marker(60, 100, 50.0)], ..Default::default() };
        let options = AnnotationOptions { show_labels: false, show_legend: false, label_limit: 15 };
        let out = annotate(&image, &layers, &options);

        // Centre dot is red, pulled towards the fill by the blend
        let centre = out.get_pixel(60, 100);
        assert_eq!(centre[0], 255);
        assert!(centre[1] < 10);

        // Radius 20 outline, inside the filled disc
        let edge = out.get_pixel(78, 100);
        assert_eq!(*edge, RED_DOT_COLOR);

        // Inside the disc the fill tints the background
        let inside = out.get_pixel(60, 112);
        assert!(inside[0] > 120 && inside[1] < 100);

        // Far away is untouched
        assert_eq!(out.get_pixel(200, 20), image.get_pixel(200, 20));
    }

    #[test]
    fn flake_square_and_cross() {
        let image = background();
        let layers = AnnotationLayers { flakes: vec![marker(100, 100, 16.0)], ..Default::default() };
        let options = AnnotationOptions { show_labels: false, show_legend: false, label_limit: 15 };
        let out = annotate(&image, &layers, &options);

        // size = max(18, 4 + 8) = 18
        let corner = out.get_pixel(82, 82);
        assert!(corner[0] > 200 && corner[1] > 200 && corner[2] < 50);
        let cross = out.get_pixel(105, 100);
        assert!(cross[0] > 200 && cross[1] > 200 && cross[2] < 50);
        assert_eq!(out.get_pixel(60, 100), image.get_pixel(60, 100));
    }

    #[test]
    fn legend_appears_top_right() {
        let image = background();
        let layers = AnnotationLayers { follicles: vec![(50, 150)], ..Default::default() };
        let out = annotate(&image, &layers, &AnnotationOptions::default());

        // Black legend body blended at 0.8
        let inside = out.get_pixel(300 - 180 + 100, 60);
        assert!(inside[0] < 40);
        // Left of the legend nothing changed
        assert_eq!(out.get_pixel(60, 20), image.get_pixel(60, 20));
        // Follicle ring
        assert_eq!(*out.get_pixel(58, 150), FOLLICLE_COLOR);
    }

    #[test]
    fn labels_respect_limit() {
        let image = background();
        let layers = AnnotationLayers { red_dots: vec![marker(60, 100, 10.0)], ..Default::default() };
        let unlabeled = annotate(
            &image,
            &layers,
            &AnnotationOptions { show_labels: true, show_legend: false, label_limit: 0 },
        );
        let labeled = annotate(
            &image,
            &layers,
            &AnnotationOptions { show_labels: true, show_legend: false, label_limit: 1 },
        );
        // Label box sits above the circle: y - 20 - 10
        assert_eq!(unlabeled.get_pixel(60, 62), image.get_pixel(60, 62));
        assert_ne!(labeled.get_pixel(60, 62), image.get_pixel(60, 62));
    }

    #[test]
    fn markers_near_edges_do_not_panic() {
        let image = RgbImage::from_pixel(30, 30, Rgb([10, 10, 10]));
        let layers = AnnotationLayers {
            red_dots: vec![marker(0, 0, 5000.0)],
            flakes: vec![marker(29, 29, 900.0)],
            follicles: vec![(29, 0)],
        };
        let out = annotate(&image, &layers, &AnnotationOptions::default());
        assert_eq!(out.dimensions(), image.dimensions());
    }

    #[test]
    fn comparison_of_nothing_is_none() {
        assert!(compose_comparison(&[], None, 2).is_none());
        assert!(compose_comparison(&[], Some(&[][..]), 2).is_none());
    }

    #[test]
    fn comparison_grid_dimensions() {
        let photo = RgbImage::from_pixel(800, 400, Rgb([120, 90, 80]));
        let images: Vec<(RgbImage, String)> =
            (0..3).map(|i| (photo.clone(), format!("scan{}", i))).collect();

        // Three photos on two columns: two rows
        let sheet = compose_comparison(&images, None, 2).unwrap();
        assert_eq!(sheet.dimensions(), (2 * 400 + 3 * 20, 2 * 460 + 20));
        // Wide photo shrunk to 400x200 in the first cell
        assert_eq!(*sheet.get_pixel(20, 60), Rgb([120, 90, 80]));
        assert_eq!(*sheet.get_pixel(20, 60 + 200), WHITE);
        assert_eq!(*sheet.get_pixel(10, 10), WHITE);

        // Side by side with annotations: one row per photo
        let marked = vec![RgbImage::from_pixel(100, 100, Rgb([0, 0, 255])); 3];
        let sheet = compose_comparison(&images, Some(marked.as_slice()), 5).unwrap();
        assert_eq!(sheet.dimensions(), (2 * 400 + 3 * 20, 3 * 460 + 20));
        assert_eq!(*sheet.get_pixel(440 + 50, 60 + 50), Rgb([0, 0, 255]));
    }

    #[test]
    fn comparison_captions_are_drawn() {
        let images = vec![(RgbImage::from_pixel(10, 10, WHITE), "A".to_string())];
        let sheet = compose_comparison(&images, None, 1).unwrap();
        let caption_ink = (20..40)
            .flat_map(|x| (30..44).map(move |y| (x, y)))
            .any(|(x, y)| *sheet.get_pixel(x, y) == BLACK);
        assert!(caption_ink);
    }
}
