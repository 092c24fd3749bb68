use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction argument; numbers may be written bare or quoted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Number(f64),
    Word(String),
}

impl Argument {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n).filter(|n| n.is_finite()),
            Self::Word(w) => w.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            Self::Word(w) if w.trim().parse::<f64>().is_err() => Some(w.trim()),
            _ => None,
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Word(w) => write!(f, "{}", w),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstructionSpec {
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
}

impl InstructionSpec {
    pub fn new(name: impl Into<String>, arguments: &[&str]) -> Self {
        Self {
            name: name.into(),
            arguments: arguments
                .iter()
                .map(|a| Argument::Word((*a).to_string()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimationSpec {
    pub selector: String,
    pub instructions: Vec<InstructionSpec>,
}

/// Per-sprite animation description, authored as TOML:
///
/// ```toml
/// flips = "#arrow"
///
/// [[animations]]
/// selector = "#spinner"
/// instructions = [
///   { name = "animate", arguments = [1000] },
///   { name = "rotate", arguments = [360] },
/// ]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpriteDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flips: Option<String>,
    #[serde(default)]
    pub animations: Vec<AnimationSpec>,
}

impl SpriteDescription {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut description: Self = toml::from_str(text)?;
        if description.flips.as_deref().is_some_and(|f| f.trim().is_empty()) {
            description.flips = None;
        }
        Ok(description)
    }
}
