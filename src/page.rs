//! Page geometry handed to the PDF engines, derived from a style config at
//! export time and never stored.

use serde::{Deserialize, Serialize};

use crate::config::{PageSize, StyleConfig};
use crate::units::cm_to_points;

/// Page margins in whole points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointMargins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

/// Physical page size plus margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayoutConfig {
    pub page_size: PageSize,
    /// Page width in PDF points.
    pub width_pt: f32,
    /// Page height in PDF points.
    pub height_pt: f32,
    pub margins_pt: PointMargins,
}

impl PageLayoutConfig {
    pub fn new(page_size: PageSize, margins_pt: PointMargins) -> Self {
        let (width_pt, height_pt) = page_size.dimensions_pt();
        Self {
            page_size,
            width_pt,
            height_pt,
            margins_pt,
        }
    }

    pub fn from_style(config: &StyleConfig) -> Self {
        let m = &config.margins_cm;
        Self::new(
            config.page_size,
            PointMargins {
                top: cm_to_points(m.top),
                right: cm_to_points(m.right),
                bottom: cm_to_points(m.bottom),
                left: cm_to_points(m.left),
            },
        )
    }

    pub fn margin_top(&self) -> f32 {
        self.margins_pt.top as f32
    }

    pub fn margin_left(&self) -> f32 {
        self.margins_pt.left as f32
    }

    /// Width available for content, at least one point.
    pub fn content_width(&self) -> f32 {
        let margins = self.margins_pt.left as f32 + self.margins_pt.right as f32;
        (self.width_pt - margins).max(1.0)
    }

    /// Height available for content on each page, at least one point.
    pub fn content_height(&self) -> f32 {
        let margins = self.margins_pt.top as f32 + self.margins_pt.bottom as f32;
        (self.height_pt - margins).max(1.0)
    }
}

impl Default for PageLayoutConfig {
    fn default() -> Self {
        Self::from_style(&StyleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Margins;

    #[test]
    fn one_inch_margins_on_a4() {
        let layout = PageLayoutConfig::from_style(&StyleConfig::default());
        assert_eq!(layout.page_size, PageSize::A4);
        assert_eq!(
            layout.margins_pt,
            PointMargins {
                top: 72,
                right: 72,
                bottom: 72,
                left: 72
            }
        );
        assert!((layout.width_pt - 595.28).abs() < 0.01);
        assert!((layout.content_width() - (595.28 - 144.0)).abs() < 0.01);
    }

    #[test]
    fn letter_with_asymmetric_margins() {
        let config = StyleConfig {
            page_size: PageSize::Letter,
            margins_cm: Margins {
                top: 0.0,
                right: 1.0,
                bottom: 2.0,
                left: 5.08,
            },
            ..Default::default()
        };
        let layout = PageLayoutConfig::from_style(&config);
        assert_eq!(layout.width_pt, 612.0);
        assert_eq!(layout.margins_pt.top, 0);
        assert_eq!(layout.margins_pt.right, 28);
        assert_eq!(layout.margins_pt.bottom, 57);
        assert_eq!(layout.margins_pt.left, 144);
        assert_eq!(layout.content_height(), 792.0 - 57.0);
    }

    #[test]
    fn oversized_margins_clamp_content_area() {
        let config = StyleConfig {
            margins_cm: Margins::uniform(20.0),
            ..Default::default()
        };
        let layout = PageLayoutConfig::from_style(&config);
        assert_eq!(layout.content_width(), 1.0);
    }

    #[test]
    fn saturated_margins_do_not_overflow() {
        let config = StyleConfig {
            margins_cm: Margins::uniform(5.0e7),
            ..Default::default()
        };
        let layout = PageLayoutConfig::from_style(&config);
        assert!(layout.margins_pt.left > i32::MAX / 2);
        assert_eq!(layout.content_width(), 1.0);
        assert_eq!(layout.content_height(), 1.0);
    }
}
