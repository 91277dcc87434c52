// src/layers.rs - Four-layer structural assessment of the scalp

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::image_utils::{channel_mean, laplacian, mean_std, to_grayscale, HsvImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thickness {
    Normal,
    Thin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Keratinization {
    Normal,
    Excessive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Barrier {
    Good,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Circulation {
    Normal,
    Hyperemic,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inflammation {
    None,
    Mild,
    Moderate,
    Severe,
}

impl Inflammation {
    fn score(self) -> u32 {
        match self {
            Inflammation::None => 0,
            Inflammation::Mild => 1,
            Inflammation::Moderate => 2,
            Inflammation::Severe => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlandActivity {
    Normal,
    Hyperactive,
    Hypoactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Secretion {
    Insufficient,
    Moderate,
    Excessive,
}

/// Reading for the structural properties no image signal feeds; always at
/// its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    None,
    Normal,
    Good,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epidermis {
    pub thickness: Thickness,
    pub keratinization: Keratinization,
    pub barrier_function: Barrier,
    pub cell_turnover: Baseline,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dermis {
    pub collagen_density: Baseline,
    pub elasticity: Baseline,
    pub blood_circulation: Circulation,
    pub inflammation: Inflammation,
    pub issues: Vec<String>,
}

/// No image signal feeds this layer yet; it is reported with its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follicles {
    pub density: u32,
    pub health: Baseline,
    pub blockage: Baseline,
    pub inflammation: Inflammation,
    pub miniaturization: Baseline,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SebaceousGlands {
    pub activity: GlandActivity,
    pub secretion_level: Secretion,
    pub blockage: Baseline,
    pub inflammation: Inflammation,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerAssessment {
    pub epidermis: Epidermis,
    pub dermis: Dermis,
    pub follicles: Follicles,
    pub sebaceous_glands: SebaceousGlands,
}

impl Default for LayerAssessment {
    fn default() -> Self {
        Self {
            epidermis: Epidermis {
                thickness: Thickness::Normal,
                keratinization: Keratinization::Normal,
                barrier_function: Barrier::Good,
                cell_turnover: Baseline::Normal,
                issues: Vec::new(),
            },
            dermis: Dermis {
                collagen_density: Baseline::Normal,
                elasticity: Baseline::Good,
                blood_circulation: Circulation::Normal,
                inflammation: Inflammation::None,
                issues: Vec::new(),
            },
            follicles: Follicles {
                density: 0,
                health: Baseline::Normal,
                blockage: Baseline::None,
                inflammation: Inflammation::None,
                miniaturization: Baseline::None,
                issues: Vec::new(),
            },
            sebaceous_glands: SebaceousGlands {
                activity: GlandActivity::Normal,
                secretion_level: Secretion::Moderate,
                blockage: Baseline::None,
                inflammation: Inflammation::None,
                issues: Vec::new(),
            },
        }
    }
}

impl LayerAssessment {
    /// Every layer issue, epidermis first
    pub fn issues(&self) -> impl Iterator<Item = &String> {
        self.epidermis
            .issues
            .iter()
            .chain(&self.dermis.issues)
            .chain(&self.follicles.issues)
            .chain(&self.sebaceous_glands.issues)
    }

    pub fn dermal_inflammation_score(&self) -> u32 {
        self.dermis.inflammation.score()
    }
}

/// Judge each layer from global texture, red level and shine
pub fn assess_layers(image: &RgbImage, hsv: &HsvImage) -> LayerAssessment {
    let mut layers = LayerAssessment::default();
    if image.width() == 0 || image.height() == 0 {
        return layers;
    }

    // Epidermis: spread of the Laplacian
    let (_, texture_std) = mean_std(laplacian(&to_grayscale(image)));
    if texture_std > 40.0 {
        layers.epidermis.keratinization = Keratinization::Excessive;
        layers.epidermis.issues.push("Thickened stratum corneum".to_string());
    } else if texture_std < 15.0 {
        layers.epidermis.thickness = Thickness::Thin;
        layers.epidermis.barrier_function = Barrier::Weak;
        layers.epidermis.issues.push("Weak epidermal layer".to_string());
    }

    // Dermis: mean red channel
    let red_mean = channel_mean(image, 0);
    if red_mean > 150.0 {
        layers.dermis.blood_circulation = Circulation::Hyperemic;
        layers.dermis.inflammation = Inflammation::Mild;
        layers.dermis.issues.push("Hyperaemia".to_string());
    } else if red_mean < 100.0 {
        layers.dermis.blood_circulation = Circulation::Poor;
        layers.dermis.issues.push("Poor blood circulation".to_string());
    }

    // Sebaceous glands: share of very bright pixels
    let total = (hsv.width() * hsv.height()) as f64;
    let shiny = hsv.pixels().filter(|p| p[2] > 200).count() as f64 / total;
    if shiny > 0.3 {
        layers.sebaceous_glands.activity = GlandActivity::Hyperactive;
        layers.sebaceous_glands.secretion_level = Secretion::Excessive;
        layers.sebaceous_glands.issues.push("Excessive sebum secretion".to_string());
    } else if shiny < 0.05 {
        layers.sebaceous_glands.activity = GlandActivity::Hypoactive;
        layers.sebaceous_glands.secretion_level = Secretion::Insufficient;
        layers.sebaceous_glands.issues.push("Insufficient sebum secretion".to_string());
    }

    layers
}
