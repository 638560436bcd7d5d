//! Remote record → canonical [`Company`] mapping.
//!
//! The mapper is the only place where the API's string-or-object composite
//! fields are looked at. Past this boundary every CNAE and legal nature is a
//! [`CodeDescription`]. Mapping is pure and total.

use std::sync::OnceLock;

use tracing::debug;

use crate::raw::{RawCoded, RawCompanyRecord, RawPartner, RawPhone};
use crate::reference::{CodeTable, ReferenceTable};
use crate::{Address, Cnpj, CodeDescription, Company, Partner, Phone};

fn builtin_table() -> &'static ReferenceTable {
    static TABLE: OnceLock<ReferenceTable> = OnceLock::new();
    TABLE.get_or_init(ReferenceTable::builtin)
}

/// Map a raw record using the built-in reference table.
pub fn map_company(raw: RawCompanyRecord) -> Company {
    map_company_with(raw, builtin_table())
}

/// Map a raw record, describing bare codes with `table`.
pub fn map_company_with(raw: RawCompanyRecord, table: &dyn CodeTable) -> Company {
    let cnae = |code: &str| table.cnae(code).map(str::to_string);
    let nature = |code: &str| table.legal_nature(code).map(str::to_string);

    Company {
        cnpj: Cnpj::from_digits_padded(raw.cnpj.as_deref().unwrap_or_default()),
        registered_name: raw.razao_social.map(|s| s.trim().to_string()).unwrap_or_default(),
        trade_name: present(raw.nome_fantasia),
        status: present(raw.situacao_cadastral),
        status_date: present(raw.data_situacao_cadastral),
        head_office_or_branch: present(raw.matriz_filial),
        founded_on: present(raw.data_inicio_atividade),
        primary_activity: raw.cnae_principal.and_then(|c| resolve_coded(c, &cnae)),
        secondary_activities: raw
            .cnaes_secundarios
            .into_iter()
            .filter_map(|c| resolve_coded(c, &cnae))
            .collect(),
        legal_nature: raw.natureza_juridica.and_then(|c| resolve_coded(c, &nature)),
        address: Address {
            street: present(raw.logradouro),
            number: present(raw.numero),
            complement: present(raw.complemento),
            neighborhood: present(raw.bairro),
            city: present(raw.municipio),
            state: present(raw.uf),
            postal_code: present(raw.cep),
            geocode: None,
        },
        email: present(raw.email),
        phones: raw.telefones.into_iter().map(map_phone).collect(),
        share_capital: present(raw.capital_social),
        size: present(raw.porte_empresa),
        partners: raw.qsa.into_iter().map(map_partner).collect(),
    }
}

/// Resolve a composite field into `{code, description}`.
///
/// * object → passed through unchanged,
/// * `"<code> - <description>"` with a code of digits and hyphens → split,
/// * anything else → bare code, described by `describe` or left without a
///   description.
///
/// Returns `None` when neither a code nor a description is present.
pub fn resolve_coded(
    field: RawCoded,
    describe: &dyn Fn(&str) -> Option<String>,
) -> Option<CodeDescription> {
    match field {
        RawCoded::Pair { codigo, descricao } => {
            if codigo.is_none() && descricao.is_none() {
                return None;
            }
            Some(CodeDescription {
                code: codigo.unwrap_or_default(),
                description: descricao,
            })
        }
        RawCoded::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if let Some((code, description)) = split_code_description(text) {
                return Some(CodeDescription::new(code, description));
            }
            let description = describe(text);
            if description.is_none() {
                debug!(code = text, "no reference entry for code");
            }
            Some(CodeDescription {
                code: text.to_string(),
                description,
            })
        }
    }
}

/// Split `"6201500 - Desenvolvimento ..."` at the first `" - "` whose prefix is
/// a non-empty run of digits and hyphens.
fn split_code_description(text: &str) -> Option<(&str, &str)> {
    let (code, description) = text.split_once(" - ")?;
    let code = code.trim();
    let description = description.trim();
    let code_ok = !code.is_empty()
        && code.chars().all(|c| c.is_ascii_digit() || c == '-')
        && code.chars().any(|c| c.is_ascii_digit());
    if !code_ok || description.is_empty() {
        return None;
    }
    Some((code, description))
}

fn map_phone(raw: RawPhone) -> Phone {
    Phone {
        area_code: raw.ddd.map(|s| s.trim().to_string()).unwrap_or_default(),
        number: raw.numero.map(|s| s.trim().to_string()).unwrap_or_default(),
        is_fax: raw.is_fax.unwrap_or(false),
    }
}

fn map_partner(raw: RawPartner) -> Partner {
    Partner {
        name: raw.nome_socio.map(|s| s.trim().to_string()).unwrap_or_default(),
        document: present(raw.cnpj_cpf_socio),
        role: present(raw.qualificacao_socio),
        entry_date: present(raw.data_entrada_sociedade),
        kind: present(raw.identificador_socio),
        age_range: present(raw.faixa_etaria),
    }
}

/// Trimmed value, or `None` for absent or blank input.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
