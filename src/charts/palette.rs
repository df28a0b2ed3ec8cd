//! Chart colors.

use plotters::style::RGBColor;

pub const TEAL: RGBColor = RGBColor(0, 128, 128);
pub const PINK: RGBColor = RGBColor(255, 192, 203);
pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
pub const LIGHT_CORAL: RGBColor = RGBColor(240, 128, 128);
pub const TREND_GREEN: RGBColor = RGBColor(0, 128, 0);
pub const AREA_YELLOW: RGBColor = RGBColor(255, 255, 0);
pub const AREA_RED: RGBColor = RGBColor(255, 0, 0);
pub const SALES_BLUE: RGBColor = RGBColor(0, 0, 255);
pub const COST_RED: RGBColor = RGBColor(255, 0, 0);

/// Series colors for multi-series charts.
pub const SERIES: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const SET3: [RGBColor; 12] = [
    RGBColor(141, 211, 199),
    RGBColor(255, 255, 179),
    RGBColor(190, 186, 218),
    RGBColor(251, 128, 114),
    RGBColor(128, 177, 211),
    RGBColor(253, 180, 98),
    RGBColor(179, 222, 105),
    RGBColor(252, 205, 229),
    RGBColor(217, 217, 217),
    RGBColor(188, 128, 189),
    RGBColor(204, 235, 197),
    RGBColor(255, 237, 111),
];

const PASTEL1: [RGBColor; 9] = [
    RGBColor(251, 180, 174),
    RGBColor(179, 205, 227),
    RGBColor(204, 235, 197),
    RGBColor(222, 203, 228),
    RGBColor(254, 217, 166),
    RGBColor(255, 255, 204),
    RGBColor(229, 216, 189),
    RGBColor(253, 218, 236),
    RGBColor(242, 242, 242),
];

/// Qualitative palettes for pie slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Set3,
    Pastel1,
    Series,
}

impl Palette {
    pub fn colors(self) -> &'static [RGBColor] {
        match self {
            Palette::Set3 => &SET3,
            Palette::Pastel1 => &PASTEL1,
            Palette::Series => &SERIES,
        }
    }

    /// Color for the i-th item, cycling through the palette.
    pub fn color(self, index: usize) -> RGBColor {
        let colors = self.colors();
        colors[index % colors.len()]
    }
}

/// Diverging blue-white-red scale for values in [-1, 1].
pub fn coolwarm(value: f64) -> RGBColor {
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if value.is_nan() {
        return RGBColor(255, 255, 255);
    }
    let v = value.clamp(-1.0, 1.0);
    let (from, to, t) = if v < 0.0 {
        (MID, COLD, -v)
    } else {
        (MID, WARM, v)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coolwarm_endpoints() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
        assert_eq!(coolwarm(5.0), coolwarm(1.0));
    }

    #[test]
    fn test_palette_cycles() {
        assert_eq!(Palette::Pastel1.color(0), Palette::Pastel1.color(9));
        assert_eq!(Palette::Set3.colors().len(), 12);
    }
}
