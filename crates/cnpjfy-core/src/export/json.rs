//! JSON export: `{ metadata?, data }`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::ExportError;
use crate::Company;

pub const EXPORT_SOURCE: &str = "CNPJfy";

#[derive(Debug, Clone)]
pub struct JsonOptions {
    pub include_metadata: bool,
    pub pretty: bool,
    /// Stamp written to `metadata.exportedAt`; `None` means now.
    pub exported_at: Option<DateTime<Utc>>,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            pretty: true,
            exported_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    exported_at: String,
    source: &'static str,
    version: &'static str,
    count: usize,
}

#[derive(Debug, Serialize)]
struct Document<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    data: &'a [Company],
}

pub fn companies_to_json(companies: &[Company], options: &JsonOptions) -> Result<String, ExportError> {
    let metadata = options.include_metadata.then(|| Metadata {
        exported_at: options
            .exported_at
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        source: EXPORT_SOURCE,
        version: env!("CARGO_PKG_VERSION"),
        count: companies.len(),
    });
    let doc = Document {
        metadata,
        data: companies,
    };
    let text = if options.pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cnpj;
    use chrono::TimeZone;
    use serde_json::Value;

    fn companies() -> Vec<Company> {
        vec![
            Company::new(Cnpj::parse("11222333000181").unwrap(), "ACME LTDA"),
            Company::new(Cnpj::parse("00000000000191").unwrap(), "BANCO"),
        ]
    }

    #[test]
    fn metadata_wraps_data() {
        let options = JsonOptions {
            exported_at: Some(Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()),
            ..JsonOptions::default()
        };
        let out = companies_to_json(&companies(), &options).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["metadata"]["exportedAt"], "2026-10-19T12:00:00.000Z");
        assert_eq!(value["metadata"]["source"], "CNPJfy");
        assert_eq!(value["metadata"]["count"], 2);
        assert_eq!(value["data"][1]["cnpj"], "00000000000191");
        assert_eq!(value["data"][0]["registeredName"], "ACME LTDA");
    }

    #[test]
    fn compact_without_metadata() {
        let options = JsonOptions {
            include_metadata: false,
            pretty: false,
            exported_at: None,
        };
        let out = companies_to_json(&companies()[..1], &options).unwrap();
        assert!(!out.contains('\n'));
        let value: Value = serde_json::from_str(&out).unwrap();
        assert!(value.get("metadata").is_none());
        assert_eq!(value["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn exported_companies_parse_back() {
        let original = companies();
        let out = companies_to_json(&original, &JsonOptions::default()).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        let parsed: Vec<Company> = serde_json::from_value(value["data"].clone()).unwrap();
        assert_eq!(parsed, original);
    }
}
