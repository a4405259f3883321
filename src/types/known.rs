//! String enums that tolerate values this crate does not know about yet.
//!
//! Every wire-level enum is declared with [`wire_enum!`] and carried as
//! [`KnownOrRaw<T>`], so a new server-side value decodes to `Raw` instead of
//! failing the whole response.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A closed set of string values with a fixed wire spelling.
pub trait WireEnum: Sized + Copy + 'static {
    fn from_wire(value: &str) -> Option<Self>;
    fn as_wire(&self) -> &'static str;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KnownOrRaw<T> {
    Known(T),
    Raw(String),
}

/// Decode a wire string into a known variant, or keep the raw tag.
#[must_use]
pub fn decode_known_or_raw<T: WireEnum>(value: &str) -> KnownOrRaw<T> {
    match T::from_wire(value) {
        Some(known) => KnownOrRaw::Known(known),
        None => KnownOrRaw::Raw(value.to_string()),
    }
}

impl<T: WireEnum> KnownOrRaw<T> {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(k) => k.as_wire(),
            Self::Raw(s) => s,
        }
    }

    #[must_use]
    pub fn known(&self) -> Option<T> {
        match self {
            Self::Known(k) => Some(*k),
            Self::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

impl<T: WireEnum> From<T> for KnownOrRaw<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T: WireEnum> fmt::Display for KnownOrRaw<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T: WireEnum> Serialize for KnownOrRaw<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, T: WireEnum> Deserialize<'de> for KnownOrRaw<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(decode_known_or_raw(&raw))
    }
}

/// Declare a [`WireEnum`] with its wire spellings.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name { $($variant),+ }

        impl $crate::types::known::WireEnum for $name {
            fn from_wire(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn as_wire(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }
    };
}
