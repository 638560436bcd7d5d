//! Export formats for companies: CSV and JSON.
//!
//! Exporters read the canonical [`Company`](crate::Company) model and never
//! modify it. They return the rendered text; writing it somewhere is the
//! caller's business.

pub mod csv;
pub mod json;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

use crate::Cnpj;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(char),
}

/// Label set used for column headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    PtBr,
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pt-br" | "pt_br" | "pt" => Ok(Self::PtBr),
            "en" | "en-us" | "en_us" => Ok(Self::En),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PtBr => f.write_str("pt-BR"),
            Self::En => f.write_str("en"),
        }
    }
}

/// What an export file holds; only affects its default name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    Company(Cnpj),
    Comparison,
    History,
    Partners(String),
}

/// Default file name for an export, e.g. `empresa-11222333000181-2026-10-19.csv`.
pub fn default_filename(kind: &ExportKind, date: NaiveDate, extension: &str) -> String {
    let date = date.format("%Y-%m-%d");
    match kind {
        ExportKind::Company(cnpj) => format!("empresa-{}-{date}.{extension}", cnpj.as_str()),
        ExportKind::Comparison => format!("comparacao-empresas-{date}.{extension}"),
        ExportKind::History => format!("historico-cnpjfy-{date}.{extension}"),
        ExportKind::Partners(company_name) => {
            let slug: String = company_name
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect();
            format!("socios-{slug}-{date}.{extension}")
        }
    }
}
