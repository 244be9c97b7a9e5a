use serde::{Deserialize, Serialize};

use crate::device::DeviceClass;

/// Optional UI regions that currently take space above or below the cards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromeFlags {
    pub has_info_panel: bool,
    pub has_warnings: bool,
    pub has_start_button: bool,
    pub has_result_panel: bool,
}

impl ChromeFlags {
    pub fn signature(self) -> u8 {
        (self.has_info_panel as u8)
            | (self.has_warnings as u8) << 1
            | (self.has_start_button as u8) << 2
            | (self.has_result_panel as u8) << 3
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SafeMargins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl SafeMargins {
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

// (top, bottom, left, right)
fn base_margins(device: DeviceClass) -> (f64, f64, f64, f64) {
    match device {
        DeviceClass::Mobile => (16.0, 16.0, 12.0, 12.0),
        DeviceClass::Tablet => (24.0, 24.0, 20.0, 20.0),
        DeviceClass::Desktop => (40.0, 40.0, 40.0, 40.0),
    }
}

// Height plus gap of (info panel, warnings, start button, result panel).
fn chrome_allowances(device: DeviceClass) -> (f64, f64, f64, f64) {
    match device {
        DeviceClass::Mobile => (56.0, 40.0, 56.0, 80.0),
        DeviceClass::Tablet => (64.0, 44.0, 60.0, 96.0),
        DeviceClass::Desktop => (72.0, 48.0, 64.0, 120.0),
    }
}

pub fn margins(device: DeviceClass, chrome: ChromeFlags) -> SafeMargins {
    let (top, bottom, left, right) = base_margins(device);
    let (info, warnings, start, result) = chrome_allowances(device);

    let mut m = SafeMargins {
        top,
        bottom,
        left,
        right,
    };
    // Info and warnings stack above the cards, start and result below.
    if chrome.has_info_panel {
        m.top += info;
    }
    if chrome.has_warnings {
        m.top += warnings;
    }
    if chrome.has_start_button {
        m.bottom += start;
    }
    if chrome.has_result_panel {
        m.bottom += result;
    }
    m
}
