//! CSV export with a fixed column order.

use csv::{QuoteStyle, WriterBuilder};

use super::{ExportError, Locale};
use crate::{Company, Partner};

const HEADERS_PT_BR: [&str; 22] = [
    "CNPJ",
    "Razão Social",
    "Nome Fantasia",
    "Situação",
    "Data da Situação",
    "Matriz/Filial",
    "Data de Abertura",
    "CNAE Principal",
    "CNAEs Secundários",
    "Natureza Jurídica",
    "Logradouro",
    "Número",
    "Complemento",
    "Bairro",
    "Município",
    "UF",
    "CEP",
    "E-mail",
    "Telefones",
    "Capital Social",
    "Porte da Empresa",
    "Sócios",
];

const HEADERS_EN: [&str; 22] = [
    "CNPJ",
    "Company Name",
    "Trade Name",
    "Status",
    "Status Date",
    "Head Office/Branch",
    "Opening Date",
    "Main CNAE",
    "Secondary CNAEs",
    "Legal Nature",
    "Street",
    "Number",
    "Complement",
    "Neighborhood",
    "City",
    "State",
    "ZIP Code",
    "Email",
    "Phones",
    "Share Capital",
    "Company Size",
    "Partners",
];

const PARTNER_HEADERS_PT_BR: [&str; 6] = [
    "Nome do Sócio",
    "CPF/CNPJ",
    "Qualificação",
    "Data de Entrada",
    "Tipo",
    "Faixa Etária",
];

const PARTNER_HEADERS_EN: [&str; 6] = [
    "Partner Name",
    "CPF/CNPJ",
    "Role",
    "Entry Date",
    "Type",
    "Age Range",
];

/// Separator for multi-valued cells.
const LIST_SEPARATOR: &str = "; ";

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: char,
    pub include_headers: bool,
    pub locale: Locale,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_headers: true,
            locale: Locale::PtBr,
        }
    }
}

/// Render companies as CSV, one row per company.
///
/// An empty slice renders as an empty string (no header line).
pub fn companies_to_csv(companies: &[Company], options: &CsvOptions) -> Result<String, ExportError> {
    if companies.is_empty() {
        return Ok(String::new());
    }
    let headers = match options.locale {
        Locale::PtBr => HEADERS_PT_BR,
        Locale::En => HEADERS_EN,
    };
    let rows = companies.iter().map(company_row);
    write_csv(options, &headers, rows)
}

/// Render the partner roster of one company.
pub fn partners_to_csv(partners: &[Partner], options: &CsvOptions) -> Result<String, ExportError> {
    if partners.is_empty() {
        return Ok(String::new());
    }
    let headers = match options.locale {
        Locale::PtBr => PARTNER_HEADERS_PT_BR,
        Locale::En => PARTNER_HEADERS_EN,
    };
    let rows = partners.iter().map(|p| {
        vec![
            p.name.clone(),
            opt(&p.document),
            opt(&p.role),
            opt(&p.entry_date),
            opt(&p.kind),
            opt(&p.age_range),
        ]
    });
    write_csv(options, &headers, rows)
}

/// The 22 cells of a company row, in header order.
pub fn company_row(company: &Company) -> Vec<String> {
    let address = &company.address;
    vec![
        company.cnpj.as_str().to_string(),
        company.registered_name.clone(),
        opt(&company.trade_name),
        opt(&company.status),
        opt(&company.status_date),
        opt(&company.head_office_or_branch),
        opt(&company.founded_on),
        company
            .primary_activity
            .as_ref()
            .map(|a| a.label().to_string())
            .unwrap_or_default(),
        company
            .secondary_activities
            .iter()
            .map(|a| a.label())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        company
            .legal_nature
            .as_ref()
            .map(|n| n.label().to_string())
            .unwrap_or_default(),
        opt(&address.street),
        opt(&address.number),
        opt(&address.complement),
        opt(&address.neighborhood),
        opt(&address.city),
        opt(&address.state),
        opt(&address.postal_code),
        opt(&company.email),
        company
            .phones
            .iter()
            .map(|p| {
                let fax = if p.is_fax { " (Fax)" } else { "" };
                format!("({}) {}{fax}", p.area_code, p.number)
            })
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        opt(&company.share_capital),
        opt(&company.size),
        company
            .partners
            .iter()
            .map(|p| format!("{} ({})", p.name, p.role.as_deref().unwrap_or("N/A")))
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
    ]
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn write_csv<I>(options: &CsvOptions, headers: &[&str], rows: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if !options.delimiter.is_ascii() {
        return Err(ExportError::Delimiter(options.delimiter));
    }
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter as u8)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    if options.include_headers {
        writer.write_record(headers)?;
    }
    for row in rows {
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cnpj, CodeDescription, Phone};

    fn company() -> Company {
        let mut c = Company::new(Cnpj::parse("11222333000181").unwrap(), "ACME LTDA");
        c.trade_name = Some("Acme, Software & \"Cia\"".into());
        c.primary_activity = Some(CodeDescription::new("6201501", "Desenvolvimento sob encomenda"));
        c.secondary_activities = vec![
            CodeDescription::new("6204000", "Consultoria em TI"),
            CodeDescription {
                code: "9999999".into(),
                description: None,
            },
        ];
        c.phones = vec![
            Phone {
                area_code: "11".into(),
                number: "33334444".into(),
                is_fax: false,
            },
            Phone {
                area_code: "11".into(),
                number: "33335555".into(),
                is_fax: true,
            },
        ];
        c.partners = vec![
            Partner {
                name: "MARIA".into(),
                document: None,
                role: Some("Sócia".into()),
                entry_date: None,
                kind: None,
                age_range: None,
            },
            Partner {
                name: "JOAO".into(),
                document: None,
                role: None,
                entry_date: None,
                kind: None,
                age_range: None,
            },
        ];
        c
    }

    #[test]
    fn row_has_fixed_column_order() {
        let row = company_row(&company());
        assert_eq!(row.len(), HEADERS_PT_BR.len());
        assert_eq!(row[0], "11222333000181");
        assert_eq!(row[1], "ACME LTDA");
        assert_eq!(row[7], "Desenvolvimento sob encomenda");
        assert_eq!(row[8], "Consultoria em TI; 9999999");
        assert_eq!(row[18], "(11) 33334444; (11) 33335555 (Fax)");
        assert_eq!(row[21], "MARIA (Sócia); JOAO (N/A)");
    }

    #[test]
    fn comma_in_trade_name_is_quoted_and_recoverable() {
        let original = company();
        let out = companies_to_csv(&[original.clone()], &CsvOptions::default()).unwrap();
        assert!(out.contains("\"Acme, Software & \"\"Cia\"\"\""));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(out.as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][2], original.trade_name.as_deref().unwrap());
        assert_eq!(&records[0][1], "ACME LTDA");
    }

    #[test]
    fn headers_follow_locale() {
        let en = CsvOptions {
            locale: Locale::En,
            ..CsvOptions::default()
        };
        let out = companies_to_csv(&[company()], &en).unwrap();
        assert!(out.starts_with("CNPJ,Company Name,Trade Name,"));

        let no_headers = CsvOptions {
            include_headers: false,
            ..CsvOptions::default()
        };
        let out = companies_to_csv(&[company()], &no_headers).unwrap();
        assert!(out.starts_with("11222333000181,ACME LTDA,"));
    }

    #[test]
    fn custom_delimiter() {
        let options = CsvOptions {
            delimiter: ';',
            ..CsvOptions::default()
        };
        let out = companies_to_csv(&[company()], &options).unwrap();
        // Multi-valued cells contain "; " and must be quoted.
        assert!(out.contains("\"Consultoria em TI; 9999999\""));
        assert!(out.contains(";\"Acme, Software"));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(companies_to_csv(&[], &CsvOptions::default()).unwrap(), "");
        assert_eq!(partners_to_csv(&[], &CsvOptions::default()).unwrap(), "");
    }

    #[test]
    fn partners_csv() {
        let c = company();
        let out = partners_to_csv(&c.partners, &CsvOptions::default()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Nome do Sócio,CPF/CNPJ,Qualificação,Data de Entrada,Tipo,Faixa Etária");
        assert_eq!(lines[1], "MARIA,,Sócia,,,");
        assert_eq!(lines.len(), 3);
    }
}
