// src/regions.rs - Connected regions of binary masks

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::f64::consts::PI;

use crate::morphology::{contour_length, trace_boundary};

/// One connected region of set mask pixels
#[derive(Debug, Clone)]
pub struct Component {
    /// Pixel count
    pub area: u32,
    /// Integer centroid from first moments
    pub centroid: (u32, u32),
    /// Member pixels in raster order
    pub pixels: Vec<(u32, u32)>,
    /// Outer boundary, clockwise from the top-left member pixel
    pub boundary: Vec<(u32, u32)>,
    /// (min_x, min_y, max_x, max_y), inclusive
    pub bbox: (u32, u32, u32, u32),
}

impl Component {
    /// Closed boundary length
    pub fn perimeter(&self) -> f64 {
        contour_length(&self.boundary, true)
    }

    /// Boundary length without the closing step
    pub fn arc_length(&self) -> f64 {
        contour_length(&self.boundary, false)
    }

    /// 4πA/P², 1.0 for a disc and 0 when the perimeter vanishes
    pub fn circularity(&self) -> f64 {
        let perimeter = self.perimeter();
        if perimeter > 0.0 {
            4.0 * PI * self.area as f64 / (perimeter * perimeter)
        } else {
            0.0
        }
    }
}

/// Area bounds applied before classification; both are exclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFilter {
    pub min_area: f64,
    pub max_area: Option<f64>,
}

impl RegionFilter {
    pub fn above(min_area: f64) -> Self {
        Self { min_area, max_area: None }
    }

    pub fn between(min_area: f64, max_area: f64) -> Self {
        Self { min_area, max_area: Some(max_area) }
    }

    pub fn accepts(&self, area: f64) -> bool {
        area > self.min_area && self.max_area.map_or(true, |max| area < max)
    }
}

/// Label a mask and summarise every component
pub fn label_components(mask: &GrayImage, connectivity: Connectivity) -> Vec<Component> {
    let (width, height) = mask.dimensions();
    let labels = connected_components(mask, connectivity, Luma([0u8]));

    let mut components: Vec<Component> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }
        let index = (label - 1) as usize;
        if index >= components.len() {
            components.resize_with(index + 1, || Component {
                area: 0,
                centroid: (0, 0),
                pixels: Vec::new(),
                boundary: Vec::new(),
                bbox: (u32::MAX, u32::MAX, 0, 0),
            });
        }
        let component = &mut components[index];
        component.area += 1;
        component.pixels.push((x, y));
        component.bbox.0 = component.bbox.0.min(x);
        component.bbox.1 = component.bbox.1.min(y);
        component.bbox.2 = component.bbox.2.max(x);
        component.bbox.3 = component.bbox.3.max(y);
    }

    components.retain(|c| c.area > 0);

    for component in &mut components {
        let m00 = component.area as f64;
        let m10: f64 = component.pixels.iter().map(|&(x, _)| x as f64).sum();
        let m01: f64 = component.pixels.iter().map(|&(_, y)| y as f64).sum();
        component.centroid = ((m10 / m00) as u32, (m01 / m00) as u32);

        let start = component.pixels[0];
        let label = labels.get_pixel(start.0, start.1)[0];
        component.boundary = trace_boundary(start, width, height, |x, y| {
            labels.get_pixel(x, y)[0] == label
        });
    }

    components
}

/// Number of connected components in a mask
pub fn count_components(mask: &GrayImage, connectivity: Connectivity) -> u32 {
    let labels = connected_components(mask, connectivity, Luma([0u8]));
    labels.pixels().map(|p| p[0]).max().unwrap_or(0)
}

/// Generic region detector: label 8-connected components, keep those whose
/// area passes `filter`, and let `classify` turn each into a finding.
/// `classify` may still reject a component by returning `None`.
pub fn detect_regions<T, F>(mask: &GrayImage, filter: RegionFilter, mut classify: F) -> Vec<T>
where
    F: FnMut(&Component) -> Option<T>,
{
    label_components(mask, Connectivity::Eight)
        .iter()
        .filter(|component| filter.accepts(component.area as f64))
        .filter_map(|component| classify(component))
        .collect()
}
