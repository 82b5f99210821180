use num_derive::FromPrimitive;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum Register {
    /// 0 = automatic, otherwise 5..=100 in steps of 5
    LedBrightness = 0x00,

    /// Index into [`AutoPowerOff`]
    AutoPowerOff = 0x01,

    /// Index into [`StartupColor`]
    StartupColor = 0x02,

    /// 0 = off, 1 = on
    ChargeRainbow = 0x03,
}

impl Register {
    pub const ALL: [Register; 4] = [
        Register::LedBrightness,
        Register::AutoPowerOff,
        Register::StartupColor,
        Register::ChargeRainbow,
    ];
}

impl From<Register> for u8 {
    fn from(reg: Register) -> Self {
        reg as u8
    }
}

pub mod brightness {
    pub const AUTO: u8 = 0;
    pub const STEP: u8 = 5;
    pub const MAX: u8 = 100;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum AutoPowerOff {
    Off = 0,
    Sec15 = 1,
    Sec30 = 2,
    Min1 = 3,
    Min5 = 4,
    Min10 = 5,
    Min30 = 6,
    Min60 = 7,
}

impl AutoPowerOff {
    pub const COUNT: usize = 8;

    pub fn name(self) -> &'static str {
        use AutoPowerOff::*;

        match self {
            Off => "Off",
            Sec15 => "15s",
            Sec30 => "30s",
            Min1 => "1m",
            Min5 => "5m",
            Min10 => "10m",
            Min30 => "30m",
            Min60 => "60m",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum StartupColor {
    Purple = 0,
    Off = 1,
    Red = 2,
    Green = 3,
    Blue = 4,
    Yellow = 5,
    Cyan = 6,
    Magenta = 7,
    White = 8,
}

impl StartupColor {
    pub const COUNT: usize = 9;

    pub fn name(self) -> &'static str {
        use StartupColor::*;

        match self {
            Purple => "Purple",
            Off => "Off",
            Red => "Red",
            Green => "Green",
            Blue => "Blue",
            Yellow => "Yellow",
            Cyan => "Cyan",
            Magenta => "Magenta",
            White => "White",
        }
    }
}
