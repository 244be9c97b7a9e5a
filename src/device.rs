use serde::{Deserialize, Serialize};

pub const TABLET_MIN_WIDTH: f64 = 768.0;
pub const DESKTOP_MIN_WIDTH: f64 = 1024.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }

    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }
}

/// Viewport size in CSS pixels, read by the host at each calculation point.
pub type Viewport = Size;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceProfile {
    pub card_size: Size,
    pub max_cards: usize,
    pub columns_per_row: usize,
    pub spacing_px: f64,
    pub min_available: Size,
}

const MOBILE: DeviceProfile = DeviceProfile {
    card_size: Size::new(80.0, 112.0),
    max_cards: 12,
    columns_per_row: 3,
    spacing_px: 12.0,
    min_available: Size::new(200.0, 240.0),
};

const TABLET: DeviceProfile = DeviceProfile {
    card_size: Size::new(100.0, 140.0),
    max_cards: 16,
    columns_per_row: 4,
    spacing_px: 16.0,
    min_available: Size::new(400.0, 300.0),
};

const DESKTOP: DeviceProfile = DeviceProfile {
    card_size: Size::new(120.0, 168.0),
    max_cards: 20,
    columns_per_row: 5,
    spacing_px: 20.0,
    min_available: Size::new(600.0, 400.0),
};

impl DeviceClass {
    pub fn profile(self) -> &'static DeviceProfile {
        match self {
            DeviceClass::Mobile => &MOBILE,
            DeviceClass::Tablet => &TABLET,
            DeviceClass::Desktop => &DESKTOP,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Desktop => "desktop",
        }
    }
}

/// Buckets a viewport width into a device class.
///
/// A missing or non-finite width (no hosting window yet) is treated as desktop.
pub fn classify(width: Option<f64>) -> DeviceClass {
    match width {
        Some(w) if w.is_finite() => {
            if w < TABLET_MIN_WIDTH {
                DeviceClass::Mobile
            } else if w < DESKTOP_MIN_WIDTH {
                DeviceClass::Tablet
            } else {
                DeviceClass::Desktop
            }
        }
        _ => DeviceClass::Desktop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoints() {
        assert_eq!(classify(Some(320.0)), DeviceClass::Mobile);
        assert_eq!(classify(Some(767.9)), DeviceClass::Mobile);
        assert_eq!(classify(Some(768.0)), DeviceClass::Tablet);
        assert_eq!(classify(Some(1023.0)), DeviceClass::Tablet);
        assert_eq!(classify(Some(1024.0)), DeviceClass::Desktop);
        assert_eq!(classify(Some(2560.0)), DeviceClass::Desktop);
    }

    #[test]
    fn missing_width_defaults_to_desktop() {
        assert_eq!(classify(None), DeviceClass::Desktop);
        assert_eq!(classify(Some(f64::NAN)), DeviceClass::Desktop);
        assert_eq!(classify(Some(f64::INFINITY)), DeviceClass::Desktop);
    }

    #[test]
    fn profiles_grow_with_class() {
        let m = DeviceClass::Mobile.profile();
        let t = DeviceClass::Tablet.profile();
        let d = DeviceClass::Desktop.profile();
        assert!(m.max_cards < t.max_cards && t.max_cards < d.max_cards);
        assert!(m.card_size.width < d.card_size.width);
        assert!(m.columns_per_row <= t.columns_per_row && t.columns_per_row <= d.columns_per_row);
    }
}
