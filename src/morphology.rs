// src/morphology.rs - Binary morphology and boundary tracing on 8-bit masks

use image::{GrayImage, Luma};
use std::cmp::{max, min};

use crate::image_utils::in_bounds;

/// Structuring element anchored at (width / 2, height / 2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: u32,
    height: u32,
    cells: Vec<bool>,
    rectangular: bool,
}

impl StructuringElement {
    /// Full rectangle
    pub fn rect(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            cells: vec![true; (width * height) as usize],
            rectangular: true,
        }
    }

    /// Ellipse inscribed in the box, rasterised row by row the way OpenCV
    /// does it (a 3x3 ellipse is a cross)
    pub fn ellipse(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let r = (height / 2) as i64;
        let c = (width / 2) as i64;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut cells = vec![false; (width * height) as usize];
        for row in 0..height as i64 {
            let dy = row - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i64;
            let start = max(c - dx, 0);
            let end = min(c + dx + 1, width as i64);
            for col in start..end {
                cells[(row * width as i64 + col) as usize] = true;
            }
        }

        let rectangular = cells.iter().all(|&cell| cell);
        Self { width, height, cells, rectangular }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn anchor(&self) -> (i64, i64) {
        ((self.width / 2) as i64, (self.height / 2) as i64)
    }

    #[inline]
    fn contains(&self, kx: u32, ky: u32) -> bool {
        self.cells[(ky * self.width + kx) as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MorphOp {
    Erode,
    Dilate,
}

impl MorphOp {
    #[inline]
    fn identity(self) -> u8 {
        match self {
            MorphOp::Erode => u8::MAX,
            MorphOp::Dilate => u8::MIN,
        }
    }

    #[inline]
    fn combine(self, a: u8, b: u8) -> u8 {
        match self {
            MorphOp::Erode => min(a, b),
            MorphOp::Dilate => max(a, b),
        }
    }
}

/// Samples outside the image are ignored, so borders neither erode nor dilate.
fn apply(mask: &GrayImage, kernel: &StructuringElement, op: MorphOp) -> GrayImage {
    if kernel.rectangular {
        return apply_separable(mask, kernel, op);
    }

    let (width, height) = mask.dimensions();
    let (k_width, k_height) = kernel.dimensions();
    let (ax, ay) = kernel.anchor();
    let mut result = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let mut acc = op.identity();
            for ky in 0..k_height {
                for kx in 0..k_width {
                    if !kernel.contains(kx, ky) {
                        continue;
                    }
                    let img_x = x as i64 + kx as i64 - ax;
                    let img_y = y as i64 + ky as i64 - ay;
                    if in_bounds(img_x as i32, img_y as i32, width, height) {
                        acc = op.combine(acc, mask.get_pixel(img_x as u32, img_y as u32)[0]);
                    }
                }
            }
            result.put_pixel(x, y, Luma([acc]));
        }
    }

    result
}

/// Rectangles decompose into a row pass followed by a column pass
fn apply_separable(mask: &GrayImage, kernel: &StructuringElement, op: MorphOp) -> GrayImage {
    let (width, height) = mask.dimensions();
    let (k_width, k_height) = kernel.dimensions();
    let (ax, ay) = kernel.anchor();

    let mut rows = GrayImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let start = max(x as i64 - ax, 0);
            let end = min(x as i64 - ax + k_width as i64, width as i64);
            let mut acc = op.identity();
            for sx in start..end {
                acc = op.combine(acc, mask.get_pixel(sx as u32, y)[0]);
            }
            rows.put_pixel(x, y, Luma([acc]));
        }
    }

    let mut result = GrayImage::new(width, height);
    for y in 0..height {
        let start = max(y as i64 - ay, 0);
        let end = min(y as i64 - ay + k_height as i64, height as i64);
        for x in 0..width {
            let mut acc = op.identity();
            for sy in start..end {
                acc = op.combine(acc, rows.get_pixel(x, sy as u32)[0]);
            }
            result.put_pixel(x, y, Luma([acc]));
        }
    }

    result
}

pub fn erode(mask: &GrayImage, kernel: &StructuringElement) -> GrayImage {
    apply(mask, kernel, MorphOp::Erode)
}

pub fn dilate(mask: &GrayImage, kernel: &StructuringElement) -> GrayImage {
    apply(mask, kernel, MorphOp::Dilate)
}

/// Morphological opening (erosion followed by dilation), removes specks
pub fn open(mask: &GrayImage, kernel: &StructuringElement) -> GrayImage {
    dilate(&erode(mask, kernel), kernel)
}

/// Morphological closing (dilation followed by erosion), fills small gaps
pub fn close(mask: &GrayImage, kernel: &StructuringElement) -> GrayImage {
    erode(&dilate(mask, kernel), kernel)
}

/// Dilation minus erosion, leaving only the outlines of shapes
pub fn gradient(mask: &GrayImage, kernel: &StructuringElement) -> GrayImage {
    let dilated = dilate(mask, kernel);
    let eroded = erode(mask, kernel);
    let (width, height) = mask.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        Luma([dilated.get_pixel(x, y)[0].saturating_sub(eroded.get_pixel(x, y)[0])])
    })
}

/// Direction vectors for Moore-Neighbor contour tracing (clockwise, y down)
static MOORE_NEIGHBORHOOD: [(i32, i32); 8] = [
    (1, 0),   // right
    (1, 1),   // down-right
    (0, 1),   // down
    (-1, 1),  // down-left
    (-1, 0),  // left
    (-1, -1), // up-left
    (0, -1),  // up
    (1, -1),  // up-right
];

fn direction_index(dx: i32, dy: i32) -> usize {
    MOORE_NEIGHBORHOOD
        .iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(4)
}

/// Trace the outer boundary of the region containing `start`.
///
/// `start` must be the first region pixel in raster order so that its left
/// neighbour is outside the region. `inside` answers membership for any
/// in-bounds coordinate. Returns the boundary pixels in clockwise order,
/// without repeating the start point.
pub fn trace_boundary<F>(start: (u32, u32), width: u32, height: u32, inside: F) -> Vec<(u32, u32)>
where
    F: Fn(u32, u32) -> bool,
{
    let is_member = |x: i32, y: i32| in_bounds(x, y, width, height) && inside(x as u32, y as u32);

    let mut contour = vec![start];
    let start_i = (start.0 as i32, start.1 as i32);
    let mut current = start_i;
    // Entered from the left, which is known to be outside
    let mut backtrack = 4usize;
    let mut first_step: Option<(i32, i32)> = None;

    // Each boundary pixel is visited at most four times
    let max_steps = 4 * (width as usize * height as usize) + 8;

    for _ in 0..max_steps {
        let mut next = None;
        for i in 1..=8 {
            let dir = (backtrack + i) % 8;
            let (dx, dy) = MOORE_NEIGHBORHOOD[dir];
            let candidate = (current.0 + dx, current.1 + dy);
            if is_member(candidate.0, candidate.1) {
                let (bx, by) = MOORE_NEIGHBORHOOD[(dir + 7) % 8];
                let back_pixel = (current.0 + bx, current.1 + by);
                next = Some((candidate, back_pixel));
                break;
            }
        }

        let Some((next_pixel, back_pixel)) = next else {
            // Isolated pixel
            break;
        };

        if current == start_i {
            match first_step {
                None => first_step = Some(next_pixel),
                Some(step) if step == next_pixel => break,
                Some(_) => {}
            }
        }

        backtrack = direction_index(back_pixel.0 - next_pixel.0, back_pixel.1 - next_pixel.1);
        current = next_pixel;

        if current != start_i {
            contour.push((current.0 as u32, current.1 as u32));
        }
    }

    contour
}

/// Length of a traced contour; diagonal steps count sqrt(2)
pub fn contour_length(contour: &[(u32, u32)], closed: bool) -> f64 {
    if contour.len() < 2 {
        return 0.0;
    }

    let step = |a: (u32, u32), b: (u32, u32)| {
        let dx = a.0 as f64 - b.0 as f64;
        let dy = a.1 as f64 - b.1 as f64;
        (dx * dx + dy * dy).sqrt()
    };

    let open_length: f64 = contour.windows(2).map(|w| step(w[0], w[1])).sum();
    if closed {
        open_length + step(contour[contour.len() - 1], contour[0])
    } else {
        open_length
    }
}
