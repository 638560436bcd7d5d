//! Canonical company model.
//!
//! Produced by the mapper from a [`RawCompanyRecord`](crate::RawCompanyRecord)
//! and never mutated afterwards. Serialises camelCase, omitting absent fields.

use serde::{Deserialize, Serialize};

use crate::Cnpj;

/// A classification code with its textual description (CNAE, legal nature).
///
/// `description` is `None` when the code could not be resolved; it is never
/// guessed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDescription {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CodeDescription {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: Some(description.into()),
        }
    }

    /// Description when known, otherwise the code.
    pub fn label(&self) -> &str {
        match &self.description {
            Some(d) if !d.is_empty() => d,
            _ => &self.code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Two-letter state code (UF).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocode: Option<GeoPoint>,
}

impl Address {
    /// One-line rendering: `street, number - complement, neighborhood, city/UF, CEP`.
    pub fn one_line(&self) -> String {
        let mut first = [self.street.as_deref(), self.number.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        if let Some(c) = &self.complement {
            if first.is_empty() {
                first = c.clone();
            } else {
                first = format!("{first} - {c}");
            }
        }
        let city = match (&self.city, &self.state) {
            (Some(c), Some(s)) => Some(format!("{c}/{s}")),
            (Some(c), None) => Some(c.clone()),
            (None, Some(s)) => Some(s.clone()),
            (None, None) => None,
        };
        [
            Some(first).filter(|s| !s.is_empty()),
            self.neighborhood.clone(),
            city,
            self.postal_code.clone(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phone {
    pub area_code: String,
    pub number: String,
    #[serde(default)]
    pub is_fax: bool,
}

impl Phone {
    /// `(area) number`, with the number split `NNNN-NNNN` / `NNNNN-NNNN` when
    /// it has 8 or 9 digits.
    pub fn display(&self) -> String {
        let digits = crate::cnpj::clean(&self.number);
        let number = match digits.len() {
            8 => format!("{}-{}", &digits[..4], &digits[4..]),
            9 => format!("{}-{}", &digits[..5], &digits[5..]),
            _ => self.number.clone(),
        };
        format!("({}) {}", self.area_code, number)
    }
}

/// One entry of the QSA (partner / shareholder roster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub name: String,
    /// CPF or CNPJ, usually partially masked by the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<String>,
    /// Partner type as published (legal entity, natural person, foreigner).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub cnpj: Cnpj,
    pub registered_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_date: Option<String>,
    /// Head office / branch flag as published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_office_or_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_activity: Option<CodeDescription>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_activities: Vec<CodeDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_nature: Option<CodeDescription>,
    #[serde(default)]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<Phone>,
    /// Decimal string as published, e.g. `"100000.00"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_capital: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partners: Vec<Partner>,
}

impl Company {
    /// A company with only the identifier and registered name set.
    pub fn new(cnpj: Cnpj, registered_name: impl Into<String>) -> Self {
        Self {
            cnpj,
            registered_name: registered_name.into(),
            trade_name: None,
            status: None,
            status_date: None,
            head_office_or_branch: None,
            founded_on: None,
            primary_activity: None,
            secondary_activities: Vec::new(),
            legal_nature: None,
            address: Address::default(),
            email: None,
            phones: Vec::new(),
            share_capital: None,
            size: None,
            partners: Vec::new(),
        }
    }

    /// Trade name when present, otherwise the registered name.
    pub fn display_name(&self) -> &str {
        self.trade_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.registered_name)
    }
}
