//! Static catalog of remote-control commands.
//!
//! Each [`SimpleCommand`] has three names:
//!
//! | name            | example (`Aspect1_85`) | used for                         |
//! |-----------------|------------------------|----------------------------------|
//! | enumerated name | `ASPECT_1_85`          | logs, lookup by canonical name   |
//! | token           | `source_aspect_1_85`   | the executor operation to invoke |
//! | display name    | `1.85`                 | remote button labels             |
//!
//! Display names follow a small set of rules: numeric keys drop the `NUM_`
//! prefix, the two `_X_` aspect ratios become `4x3` / `16x9`, the remaining
//! aspect ratios drop `ASPECT_` and use `.` as the separator, and everything
//! else displays as its enumerated name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a command needs before it can be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Applicability {
    /// Can always be sent as-is.
    Always,
    /// Needs a parameter, supplied by the caller or synthesized from session state.
    RequiresParameter,
}

/// One remote-control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SimpleCommand {
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    Num10,
    Aspect1_85,
    Aspect1_90,
    Aspect16x9,
    Aspect2_00,
    Aspect2_10,
    Aspect2_20,
    Aspect2_35,
    Aspect2_40,
    Aspect2_55,
    Aspect2_76,
    Aspect4x3,
    AutoAspectDisable,
    AutoAspectEnable,
    Alt,
    Clear,
    Down,
    Exit,
    Hdr,
    Help,
    Input,
    Letterbox,
    Left,
    MemoryA,
    MemoryB,
    MemoryC,
    MemoryD,
    Menu,
    MessageOff,
    MessageOn,
    Nls,
    PowerOff,
    Enter,
    PowerOn,
    Pattern,
    Prev,
    Right,
    Save,
    Standby,
    Toggle,
    Up,
    Zone,
}

use SimpleCommand::*;

impl SimpleCommand {
    /// Every command, in catalog order.
    pub const ALL: [SimpleCommand; 52] = [
        Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9, Num10,
        Aspect1_85, Aspect1_90, Aspect16x9, Aspect2_00, Aspect2_10, Aspect2_20,
        Aspect2_35, Aspect2_40, Aspect2_55, Aspect2_76, Aspect4x3,
        AutoAspectDisable, AutoAspectEnable, Alt, Clear, Down, Exit, Hdr, Help,
        Input, Letterbox, Left, MemoryA, MemoryB, MemoryC, MemoryD, Menu,
        MessageOff, MessageOn, Nls, PowerOff, Enter, PowerOn, Pattern, Prev,
        Right, Save, Standby, Toggle, Up, Zone,
    ];

    /// Canonical enumerated name.
    pub fn name(self) -> &'static str {
        match self {
            Num0 => "NUM_0",
            Num1 => "NUM_1",
            Num2 => "NUM_2",
            Num3 => "NUM_3",
            Num4 => "NUM_4",
            Num5 => "NUM_5",
            Num6 => "NUM_6",
            Num7 => "NUM_7",
            Num8 => "NUM_8",
            Num9 => "NUM_9",
            Num10 => "NUM_10",
            Aspect1_85 => "ASPECT_1_85",
            Aspect1_90 => "ASPECT_1_90",
            Aspect16x9 => "ASPECT_16_X_9",
            Aspect2_00 => "ASPECT_2_00",
            Aspect2_10 => "ASPECT_2_10",
            Aspect2_20 => "ASPECT_2_20",
            Aspect2_35 => "ASPECT_2_35",
            Aspect2_40 => "ASPECT_2_40",
            Aspect2_55 => "ASPECT_2_55",
            Aspect2_76 => "ASPECT_2_76",
            Aspect4x3 => "ASPECT_4_X_3",
            AutoAspectDisable => "AAD",
            AutoAspectEnable => "AAE",
            Alt => "ALT",
            Clear => "CLEAR",
            Down => "DOWN",
            Exit => "EXIT",
            Hdr => "HDR",
            Help => "HELP",
            Input => "INPUT",
            Letterbox => "LBOX",
            Left => "LEFT",
            MemoryA => "MEMA",
            MemoryB => "MEMB",
            MemoryC => "MEMC",
            MemoryD => "MEMD",
            Menu => "MENU",
            MessageOff => "MSG_OFF",
            MessageOn => "MSG_ON",
            Nls => "NLS",
            PowerOff => "OFF",
            Enter => "OK",
            PowerOn => "ON",
            Pattern => "PATTERN",
            Prev => "PREV",
            Right => "RIGHT",
            Save => "SAVE",
            Standby => "STBY",
            Toggle => "TOGGLE",
            Up => "UP",
            Zone => "ZONE",
        }
    }

    /// Canonical protocol token.
    pub fn token(self) -> &'static str {
        match self {
            Num0 => "0",
            Num1 => "1",
            Num2 => "2",
            Num3 => "3",
            Num4 => "4",
            Num5 => "5",
            Num6 => "6",
            Num7 => "7",
            Num8 => "8",
            Num9 => "9",
            Num10 => "10",
            Aspect1_85 => "source_aspect_1_85",
            Aspect1_90 => "source_aspect_1_90",
            Aspect16x9 => "source_aspect_16x9",
            Aspect2_00 => "source_aspect_2_00",
            Aspect2_10 => "source_aspect_2_10",
            Aspect2_20 => "source_aspect_2_20",
            Aspect2_35 => "source_aspect_2_35",
            Aspect2_40 => "source_aspect_2_40",
            Aspect2_55 => "source_aspect_2_55",
            Aspect2_76 => "source_aspect_2_76",
            Aspect4x3 => "source_aspect_4x3",
            AutoAspectDisable => "auto_aspect_disable",
            AutoAspectEnable => "auto_aspect_enable",
            Alt => "alt",
            Clear => "clear",
            Down => "down",
            Exit => "exit",
            Hdr => "hdr",
            Help => "help",
            Input => "input",
            Letterbox => "source_aspect_lbox",
            Left => "left",
            MemoryA => "mema",
            MemoryB => "memb",
            MemoryC => "memc",
            MemoryD => "memd",
            Menu => "menu",
            MessageOff => "clear_message",
            MessageOn => "display_message",
            Nls => "nls",
            PowerOff => "power_off",
            Enter => "ok",
            PowerOn => "power_on",
            Pattern => "pattern",
            Prev => "prev",
            Right => "right",
            Save => "save",
            Standby => "standby",
            Toggle => "toggle",
            Up => "up",
            Zone => "zone",
        }
    }

    /// Key number for the numeric keypad commands.
    pub fn numeric_index(self) -> Option<u8> {
        self.name().strip_prefix("NUM_").and_then(|n| n.parse().ok())
    }

    /// Label shown on the remote.
    pub fn display_name(self) -> String {
        let name = self.name();
        if let Some(digits) = name.strip_prefix("NUM_") {
            return digits.to_string();
        }
        match self {
            Aspect4x3 => return "4x3".to_string(),
            Aspect16x9 => return "16x9".to_string(),
            _ => {}
        }
        if let Some(ratio) = name.strip_prefix("ASPECT_") {
            return ratio.replace('_', ".");
        }
        name.to_string()
    }

    pub fn applicability(self) -> Applicability {
        match self {
            MessageOn => Applicability::RequiresParameter,
            _ => Applicability::Always,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn from_display_name(display: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.display_name() == display)
    }

    /// Immutable descriptor for this command.
    pub fn descriptor(self) -> CommandDescriptor {
        CommandDescriptor {
            command: self,
            display_name: self.display_name(),
            token: self.token(),
            numeric_index: self.numeric_index(),
            applicability: self.applicability(),
        }
    }
}

impl fmt::Display for SimpleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static definition of one abstract command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    pub command: SimpleCommand,
    pub display_name: String,
    pub token: &'static str,
    pub numeric_index: Option<u8>,
    pub applicability: Applicability,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
