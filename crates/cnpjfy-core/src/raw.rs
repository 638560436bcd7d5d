//! Raw company record as returned by the remote lookup API.
//!
//! Field names follow the API (snake_case, Portuguese). Deserialisation is
//! deliberately lenient: a field with an unexpected JSON type degrades to
//! absent instead of failing the whole record, so any JSON object decodes.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A CNAE or legal-nature field: either `"code - description"` text (or a
/// bare code), or an object with separate code and description.
///
/// Only the mapper looks inside this type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawCoded {
    Text(String),
    Pair {
        #[serde(default, alias = "code", deserialize_with = "opt_string")]
        codigo: Option<String>,
        #[serde(default, alias = "description", deserialize_with = "opt_string")]
        descricao: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPhone {
    #[serde(default, alias = "area_code", deserialize_with = "opt_string")]
    pub ddd: Option<String>,
    #[serde(default, alias = "number", deserialize_with = "opt_string")]
    pub numero: Option<String>,
    #[serde(default, deserialize_with = "opt_bool")]
    pub is_fax: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPartner {
    #[serde(default, alias = "name", deserialize_with = "opt_string")]
    pub nome_socio: Option<String>,
    #[serde(default, alias = "document", deserialize_with = "opt_string")]
    pub cnpj_cpf_socio: Option<String>,
    #[serde(default, alias = "role", deserialize_with = "opt_string")]
    pub qualificacao_socio: Option<String>,
    #[serde(default, alias = "entry_date", deserialize_with = "opt_string")]
    pub data_entrada_sociedade: Option<String>,
    #[serde(default, alias = "type", deserialize_with = "opt_string")]
    pub identificador_socio: Option<String>,
    #[serde(default, alias = "age_range", deserialize_with = "opt_string")]
    pub faixa_etaria: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawCompanyRecord {
    #[serde(default, deserialize_with = "opt_string")]
    pub cnpj: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub razao_social: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub nome_fantasia: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub situacao_cadastral: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub data_situacao_cadastral: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub matriz_filial: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub data_inicio_atividade: Option<String>,
    #[serde(default, deserialize_with = "opt_coded")]
    pub cnae_principal: Option<RawCoded>,
    #[serde(default, deserialize_with = "coded_list")]
    pub cnaes_secundarios: Vec<RawCoded>,
    #[serde(default, deserialize_with = "opt_coded")]
    pub natureza_juridica: Option<RawCoded>,
    #[serde(default, deserialize_with = "opt_string")]
    pub logradouro: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub numero: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub complemento: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub bairro: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub cep: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub uf: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub municipio: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "list_of")]
    pub telefones: Vec<RawPhone>,
    #[serde(default, deserialize_with = "opt_string")]
    pub capital_social: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub porte_empresa: Option<String>,
    #[serde(default, rename = "QSA", alias = "qsa", deserialize_with = "list_of")]
    pub qsa: Vec<RawPartner>,
}

impl RawCompanyRecord {
    /// Decode a raw record from JSON text. Fails only when the text is not a
    /// JSON object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Decode a raw record from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

// ── Lenient field decoders ──

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_string))
}

fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => n.as_i64().map(|n| n != 0),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "s" | "sim" | "y" | "yes" => Some(true),
            "false" | "0" | "n" | "nao" | "não" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn opt_coded<'de, D>(deserializer: D) -> Result<Option<RawCoded>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(coded_from_value))
}

fn coded_from_value(value: Value) -> Option<RawCoded> {
    match value {
        Value::String(s) => Some(RawCoded::Text(s)),
        Value::Number(n) => Some(RawCoded::Text(n.to_string())),
        obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
        _ => None,
    }
}

fn coded_list<'de, D>(deserializer: D) -> Result<Vec<RawCoded>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.into_iter().filter_map(coded_from_value).collect(),
        _ => Vec::new(),
    })
}

fn list_of<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_string_and_object_composites() {
        let raw = RawCompanyRecord::from_value(json!({
            "cnpj": "11222333000181",
            "razao_social": "ACME LTDA",
            "cnae_principal": "6201500 - Desenvolvimento de programas de computador sob encomenda",
            "natureza_juridica": { "codigo": "2062", "descricao": "Sociedade Empresária Limitada" }
        }))
        .unwrap();
        assert!(matches!(raw.cnae_principal, Some(RawCoded::Text(_))));
        assert_eq!(
            raw.natureza_juridica,
            Some(RawCoded::Pair {
                codigo: Some("2062".into()),
                descricao: Some("Sociedade Empresária Limitada".into()),
            })
        );
    }

    #[test]
    fn english_aliases_are_accepted() {
        let raw = RawCompanyRecord::from_value(json!({
            "cnae_principal": { "code": "6201500", "description": "Software" },
            "telefones": [{ "area_code": "11", "number": "33334444" }],
            "QSA": [{ "name": "MARIA", "role": "Sócio-Administrador" }]
        }))
        .unwrap();
        assert_eq!(
            raw.cnae_principal,
            Some(RawCoded::Pair {
                codigo: Some("6201500".into()),
                descricao: Some("Software".into()),
            })
        );
        assert_eq!(raw.telefones[0].ddd.as_deref(), Some("11"));
        assert_eq!(raw.qsa[0].nome_socio.as_deref(), Some("MARIA"));
    }

    #[test]
    fn wrong_types_degrade_instead_of_failing() {
        let raw = RawCompanyRecord::from_value(json!({
            "cnpj": 11222333000181u64,
            "razao_social": ["not", "a", "string"],
            "capital_social": 150000.5,
            "cnaes_secundarios": "not a list",
            "natureza_juridica": [1, 2],
            "telefones": [{ "ddd": "11", "numero": "33334444", "is_fax": "S" }, 42],
            "QSA": null
        }))
        .unwrap();
        assert_eq!(raw.cnpj.as_deref(), Some("11222333000181"));
        assert!(raw.razao_social.is_none());
        assert_eq!(raw.capital_social.as_deref(), Some("150000.5"));
        assert!(raw.cnaes_secundarios.is_empty());
        assert!(raw.natureza_juridica.is_none());
        assert_eq!(raw.telefones.len(), 1);
        assert_eq!(raw.telefones[0].is_fax, Some(true));
        assert!(raw.qsa.is_empty());
    }

    #[test]
    fn empty_object_decodes() {
        let raw = RawCompanyRecord::from_json("{}").unwrap();
        assert_eq!(raw, RawCompanyRecord::default());
        assert!(RawCompanyRecord::from_json("[]").is_err());
    }
}
