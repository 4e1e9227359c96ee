use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 95, g: 215, b: 135 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 200, b: 90 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const IPV4_ADDR: Color = Color::TrueColor { r: 110, g: 190, b: 255 };
pub const IPV4_PREFIX: Color = Color::TrueColor { r: 70, g: 130, b: 200 };
pub const IPV6_ADDR: Color = Color::TrueColor { r: 190, g: 150, b: 255 };
pub const IPV6_PREFIX: Color = Color::TrueColor { r: 140, g: 100, b: 210 };
pub const MAC_ADDR: Color = Color::TrueColor { r: 200, g: 200, b: 200 };

pub const GENERATION_TWO: Color = Color::Cyan;
pub const GENERATION_THREE: Color = Color::Green;
pub const UNKNOWN_DEVICE: Color = Color::Yellow;
pub const MISSING: Color = Color::BrightBlack;
