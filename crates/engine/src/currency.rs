use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-like currency code attached to every stored amount.
///
/// The marketplace settles in a single currency (`KES`), but the data model
/// keeps the code explicit so the column never has to be retrofitted.
/// Amounts themselves are stored as raw `i64` minor units (see
/// `MoneyCents`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Kes,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Kes => "KES",
        }
    }

}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "KES" => Ok(Currency::Kes),
            other => Err(EngineError::Validation(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}
