//! CNAE and legal-nature reference tables.
//!
//! Used by the mapper to describe bare codes. The built-in table carries a
//! subset of CNAE 2.3 subclasses and the legal-nature table; a complete,
//! pre-generated dictionary (e.g. derived from the IBGE CNAE API) can be loaded
//! from JSON and layered on top with [`ReferenceTable::merge`].
//!
//! Codes are normalised to digits for lookup, so `"6201-5/01"` and
//! `"6201501"` hit the same entry.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::CodeDescription;
use crate::cnpj::clean;

/// Code → description lookup for the composite fields of a company record.
pub trait CodeTable: Send + Sync {
    /// Description of a CNAE subclass code.
    fn cnae(&self, code: &str) -> Option<&str>;

    /// Description of a legal-nature code.
    fn legal_nature(&self, code: &str) -> Option<&str>;
}

const BUILTIN_CNAE: &[(&str, &str)] = &[
    ("1091102", "Fabricação de produtos de padaria e confeitaria com predominância de produção própria"),
    ("4120400", "Construção de edifícios"),
    ("4711301", "Comércio varejista de mercadorias em geral, com predominância de produtos alimentícios - hipermercados"),
    ("4711302", "Comércio varejista de mercadorias em geral, com predominância de produtos alimentícios - supermercados"),
    ("4712100", "Comércio varejista de mercadorias em geral, com predominância de produtos alimentícios - minimercados, mercearias e armazéns"),
    ("4722901", "Comércio varejista de carnes - açougues"),
    ("4744099", "Comércio varejista de materiais de construção em geral"),
    ("4751201", "Comércio varejista especializado de equipamentos e suprimentos de informática"),
    ("4771701", "Comércio varejista de produtos farmacêuticos, sem manipulação de fórmulas"),
    ("4781400", "Comércio varejista de artigos do vestuário e acessórios"),
    ("4930202", "Transporte rodoviário de carga, exceto produtos perigosos e mudanças, intermunicipal, interestadual e internacional"),
    ("5611201", "Restaurantes e similares"),
    ("5611203", "Lanchonetes, casas de chá, de sucos e similares"),
    ("6201501", "Desenvolvimento de programas de computador sob encomenda"),
    ("6201502", "Web design"),
    ("6202300", "Desenvolvimento e licenciamento de programas de computador customizáveis"),
    ("6203100", "Desenvolvimento e licenciamento de programas de computador não-customizáveis"),
    ("6204000", "Consultoria em tecnologia da informação"),
    ("6209100", "Suporte técnico, manutenção e outros serviços em tecnologia da informação"),
    ("6311900", "Tratamento de dados, provedores de serviços de aplicação e serviços de hospedagem na internet"),
    ("6319400", "Portais, provedores de conteúdo e outros serviços de informação na internet"),
    ("6422100", "Bancos múltiplos, com carteira comercial"),
    ("6462000", "Holdings de instituições não-financeiras"),
    ("6463800", "Outras sociedades de participação, exceto holdings"),
    ("6810202", "Aluguel de imóveis próprios"),
    ("6911701", "Serviços advocatícios"),
    ("6920601", "Atividades de contabilidade"),
    ("7020400", "Atividades de consultoria em gestão empresarial, exceto consultoria técnica específica"),
    ("7311400", "Agências de publicidade"),
    ("7319002", "Promoção de vendas"),
    ("7319003", "Marketing direto"),
    ("7319004", "Consultoria em publicidade"),
    ("8211300", "Serviços combinados de escritório e apoio administrativo"),
    ("8219999", "Preparação de documentos e serviços especializados de apoio administrativo não especificados anteriormente"),
    ("8411600", "Administração pública em geral"),
    ("8599604", "Treinamento em desenvolvimento profissional e gerencial"),
    ("8599699", "Outras atividades de ensino não especificadas anteriormente"),
    ("8630503", "Atividade médica ambulatorial restrita a consultas"),
    ("9602501", "Cabeleireiros, manicure e pedicure"),
];

const BUILTIN_LEGAL_NATURE: &[(&str, &str)] = &[
    ("1015", "Órgão Público do Poder Executivo Federal"),
    ("1023", "Órgão Público do Poder Executivo Estadual ou do Distrito Federal"),
    ("1031", "Órgão Público do Poder Executivo Municipal"),
    ("1104", "Autarquia Federal"),
    ("1112", "Autarquia Estadual ou do Distrito Federal"),
    ("1120", "Autarquia Municipal"),
    ("1244", "Município"),
    ("2011", "Empresa Pública"),
    ("2038", "Sociedade de Economia Mista"),
    ("2046", "Sociedade Anônima Aberta"),
    ("2054", "Sociedade Anônima Fechada"),
    ("2062", "Sociedade Empresária Limitada"),
    ("2070", "Sociedade Empresária em Nome Coletivo"),
    ("2135", "Empresário (Individual)"),
    ("2143", "Cooperativa"),
    ("2151", "Consórcio de Sociedades"),
    ("2232", "Sociedade Simples Pura"),
    ("2240", "Sociedade Simples Limitada"),
    ("2305", "Empresa Individual de Responsabilidade Limitada (de Natureza Empresária)"),
    ("2313", "Empresa Individual de Responsabilidade Limitada (de Natureza Simples)"),
    ("3069", "Fundação Privada"),
    ("3220", "Organização Religiosa"),
    ("3999", "Associação Privada"),
    ("4014", "Empresa Individual Imobiliária"),
    ("4081", "Contribuinte Individual"),
    ("4120", "Produtor Rural (Pessoa Física)"),
];

/// In-memory reference table keyed by digit-only codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReferenceTable {
    #[serde(default)]
    cnae: BTreeMap<String, String>,
    #[serde(default, alias = "natureza_juridica")]
    legal_nature: BTreeMap<String, String>,
}

impl ReferenceTable {
    /// The table compiled into the crate.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (code, desc) in BUILTIN_CNAE {
            table.insert_cnae(code, desc);
        }
        for (code, desc) in BUILTIN_LEGAL_NATURE {
            table.insert_legal_nature(code, desc);
        }
        table
    }

    /// Load a table from JSON.
    ///
    /// Accepts either `{"cnae": {code: desc}, "legal_nature": {code: desc}}`
    /// or a flat `{code: desc}` object, which is read as CNAE entries.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let sectioned = value.get("cnae").is_some()
            || value.get("legal_nature").is_some()
            || value.get("natureza_juridica").is_some();
        let parsed = if sectioned {
            serde_json::from_value::<Self>(value)?
        } else {
            Self {
                cnae: serde_json::from_value(value)?,
                legal_nature: BTreeMap::new(),
            }
        };

        // Re-key through the normalising inserts.
        let mut table = Self::default();
        for (code, desc) in &parsed.cnae {
            table.insert_cnae(code, desc);
        }
        for (code, desc) in &parsed.legal_nature {
            table.insert_legal_nature(code, desc);
        }
        Ok(table)
    }

    /// Layer `other` over `self`; entries in `other` win.
    pub fn merge(mut self, other: ReferenceTable) -> Self {
        self.cnae.extend(other.cnae);
        self.legal_nature.extend(other.legal_nature);
        self
    }

    pub fn insert_cnae(&mut self, code: &str, description: &str) {
        let key = clean(code);
        if !key.is_empty() {
            self.cnae.insert(key, description.trim().to_string());
        }
    }

    pub fn insert_legal_nature(&mut self, code: &str, description: &str) {
        let key = clean(code);
        if !key.is_empty() {
            self.legal_nature.insert(key, description.trim().to_string());
        }
    }

    pub fn cnae_len(&self) -> usize {
        self.cnae.len()
    }

    pub fn legal_nature_len(&self) -> usize {
        self.legal_nature.len()
    }

    /// Case-insensitive substring search over CNAE descriptions, in code order.
    pub fn search_cnae(&self, term: &str, limit: usize) -> Vec<CodeDescription> {
        let term = term.to_lowercase();
        self.cnae
            .iter()
            .filter(|(_, desc)| desc.to_lowercase().contains(&term))
            .take(limit)
            .map(|(code, desc)| CodeDescription::new(code.clone(), desc.clone()))
            .collect()
    }
}

impl CodeTable for ReferenceTable {
    fn cnae(&self, code: &str) -> Option<&str> {
        self.cnae.get(&clean(code)).map(String::as_str)
    }

    fn legal_nature(&self, code: &str) -> Option<&str> {
        self.legal_nature.get(&clean(code)).map(String::as_str)
    }
}

/// Format a 7-digit CNAE subclass as `NNNN-N/NN`; other inputs are returned
/// unchanged.
pub fn format_cnae(code: &str) -> String {
    let digits = clean(code);
    if digits.len() != 7 {
        return code.to_string();
    }
    format!("{}-{}/{}", &digits[..4], &digits[4..5], &digits[5..])
}
