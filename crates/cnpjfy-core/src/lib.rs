pub mod cnpj;
pub mod company;
pub mod export;
pub mod mapper;
pub mod raw;
pub mod reference;

pub use cnpj::{Cnpj, CnpjError};
pub use company::{Address, CodeDescription, Company, GeoPoint, Partner, Phone};
pub use export::{ExportError, ExportKind, Locale};
pub use mapper::{map_company, map_company_with};
pub use raw::RawCompanyRecord;
pub use reference::{CodeTable, ReferenceTable};
