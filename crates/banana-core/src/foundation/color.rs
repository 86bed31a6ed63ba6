//! Badge colors accepted by the host permission store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::value::{ConfigType, TypeTag};

macro_rules! role_colors {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// A badge color. Published to the permission store as its lowercase name.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum RoleColor {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )*
            /// `white`, the default badge color.
            #[default]
            White,
        }

        impl RoleColor {
            /// Every color name, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$($name,)* "white"];

            /// Lowercase name as stored by the host.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                    Self::White => "white",
                }
            }
        }

        impl FromStr for RoleColor {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok(Self::$variant),)*
                    "white" => Ok(Self::White),
                    other => Err(format!("unknown role color '{other}'")),
                }
            }
        }
    };
}

role_colors! {
    Pink => "pink",
    Red => "red",
    Brown => "brown",
    Silver => "silver",
    LightGreen => "light_green",
    Crimson => "crimson",
    Cyan => "cyan",
    Aqua => "aqua",
    DeepPink => "deep_pink",
    Tomato => "tomato",
    Yellow => "yellow",
    Magenta => "magenta",
    BlueGreen => "blue_green",
    Orange => "orange",
    Lime => "lime",
    Green => "green",
    Emerald => "emerald",
    Carmine => "carmine",
    Nickel => "nickel",
    Mint => "mint",
    ArmyGreen => "army_green",
    Pumpkin => "pumpkin",
    Black => "black",
}

impl fmt::Display for RoleColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigType for RoleColor {
    fn type_tag() -> TypeTag {
        TypeTag::Enum {
            name: "RoleColor",
            variants: Self::NAMES,
        }
    }
}
