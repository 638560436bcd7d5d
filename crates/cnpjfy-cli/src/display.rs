//! Terminal rendering for companies and stored collections.
//!
//! Renders into `String`s; the `print_*` wrappers write them to stdout.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use cnpjfy_core::reference::format_cnae;
use cnpjfy_core::{CodeDescription, Company};
use cnpjfy_store::{CachedCompany, ComparisonEntry, Favorite, RecentSearch, SearchLogEntry};

const LABEL_WIDTH: usize = 22;
const MAX_LIST_ITEMS: usize = 10;
const COLUMN_WIDTH: usize = 30;

// ── Company card ──

pub fn print_company_card(company: &Company) {
    print!("{}", render_company_card(company));
}

/// Vertical card grouped by section. Empty sections are left out.
pub fn render_company_card(company: &Company) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", company.registered_name);
    let _ = writeln!(out, "{}", company.cnpj.masked());
    out.push('\n');

    let address = &company.address;
    section(
        &mut out,
        "Identity",
        &[
            ("trade name", company.trade_name.clone()),
            ("status", company.status.clone()),
            ("status date", company.status_date.clone()),
            ("head office/branch", company.head_office_or_branch.clone()),
            ("founded on", company.founded_on.clone()),
            ("legal nature", company.legal_nature.as_ref().map(coded)),
            ("size", company.size.clone()),
            ("share capital", company.share_capital.as_deref().map(money)),
        ],
    );
    section(
        &mut out,
        "Activity",
        &[("primary", company.primary_activity.as_ref().map(activity))],
    );
    list(
        &mut out,
        "secondary",
        company.secondary_activities.iter().map(activity).collect(),
    );
    section(
        &mut out,
        "Address",
        &[
            ("street", address.street.clone()),
            ("number", address.number.clone()),
            ("complement", address.complement.clone()),
            ("neighborhood", address.neighborhood.clone()),
            (
                "city",
                match (&address.city, &address.state) {
                    (Some(c), Some(s)) => Some(format!("{c}/{s}")),
                    (c, s) => c.clone().or_else(|| s.clone()),
                },
            ),
            ("postal code", address.postal_code.as_deref().map(postal_code)),
        ],
    );
    let phones: Vec<String> = company
        .phones
        .iter()
        .map(|p| {
            if p.is_fax {
                format!("{} (fax)", p.display())
            } else {
                p.display()
            }
        })
        .collect();
    section(
        &mut out,
        "Contact",
        &[
            ("email", company.email.clone()),
            ("phones", (!phones.is_empty()).then(|| phones.join(", "))),
        ],
    );

    if !company.partners.is_empty() {
        let _ = writeln!(out, "Partners ({})", company.partners.len());
        for p in company.partners.iter().take(MAX_LIST_ITEMS) {
            let role = p.role.as_deref().unwrap_or("N/A");
            let since = p
                .entry_date
                .as_deref()
                .map(|d| format!(", since {d}"))
                .unwrap_or_default();
            let _ = writeln!(out, "  {} ({role}{since})", p.name);
        }
        more(&mut out, company.partners.len());
        out.push('\n');
    }
    out
}

fn section(out: &mut String, header: &str, rows: &[(&str, Option<String>)]) {
    if rows.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    let _ = writeln!(out, "{header}");
    for (label, value) in rows {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label:<LABEL_WIDTH$} {value}");
        }
    }
    out.push('\n');
}

fn list(out: &mut String, label: &str, items: Vec<String>) {
    if items.is_empty() {
        return;
    }
    // Attach to the section printed just before.
    if out.ends_with("\n\n") {
        out.pop();
    }
    let _ = writeln!(out, "  {label:<LABEL_WIDTH$} {}", items[0]);
    for item in items.iter().skip(1).take(MAX_LIST_ITEMS - 1) {
        let _ = writeln!(out, "  {:<LABEL_WIDTH$} {item}", "");
    }
    more(out, items.len());
    out.push('\n');
}

fn more(out: &mut String, total: usize) {
    if total > MAX_LIST_ITEMS {
        let _ = writeln!(out, "  ... and {} more", total - MAX_LIST_ITEMS);
    }
}

fn coded(c: &CodeDescription) -> String {
    match &c.description {
        Some(d) => format!("{} - {d}", c.code),
        None => c.code.clone(),
    }
}

fn activity(c: &CodeDescription) -> String {
    let code = format_cnae(&c.code);
    match &c.description {
        Some(d) => format!("{code} {d}"),
        None => code,
    }
}

/// `"100000.00"` → `R$ 100.000,00`; anything unparsable is shown as is.
pub fn money(raw: &str) -> String {
    let normalized = raw.trim().replace(',', ".");
    let Ok(value) = normalized.parse::<f64>() else {
        return raw.to_string();
    };
    let scaled = (value * 100.0).round();
    // Outside this range the `as` cast saturates.
    if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
        return raw.to_string();
    }
    let cents = scaled as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let units = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

fn postal_code(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 8 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        raw.to_string()
    }
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

// ── Comparison ──

pub fn print_comparison(entries: &[ComparisonEntry]) {
    if entries.is_empty() {
        println!("Comparison set is empty.");
        return;
    }
    let companies: Vec<&Company> = entries.iter().map(|e| &e.company).collect();
    print!("{}", render_comparison(&companies));
}

/// Side-by-side table, one column per company.
pub fn render_comparison(companies: &[&Company]) -> String {
    type Field = fn(&Company) -> String;
    let rows: [(&str, Field); 9] = [
        ("CNPJ", |c| c.cnpj.masked()),
        ("name", |c| c.display_name().to_string()),
        ("status", |c| c.status.clone().unwrap_or_default()),
        ("founded on", |c| c.founded_on.clone().unwrap_or_default()),
        ("primary activity", |c| {
            c.primary_activity
                .as_ref()
                .map(|a| format_cnae(&a.code))
                .unwrap_or_default()
        }),
        ("size", |c| c.size.clone().unwrap_or_default()),
        ("share capital", |c| {
            c.share_capital.as_deref().map(money).unwrap_or_default()
        }),
        ("city", |c| {
            match (&c.address.city, &c.address.state) {
                (Some(city), Some(uf)) => format!("{city}/{uf}"),
                (city, uf) => city.clone().or_else(|| uf.clone()).unwrap_or_default(),
            }
        }),
        ("partners", |c| c.partners.len().to_string()),
    ];

    let mut out = String::new();
    for (label, field) in rows {
        let _ = write!(out, "{label:<18}");
        for company in companies {
            let _ = write!(out, " {:<COLUMN_WIDTH$}", truncate(&field(company), COLUMN_WIDTH));
        }
        out = out.trim_end().to_string();
        out.push('\n');
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut t: String = s.chars().take(width - 1).collect();
    t.push('…');
    t
}

// ── Collections ──

pub fn print_recent_searches(entries: &[RecentSearch]) {
    if entries.is_empty() {
        println!("No recent searches.");
        return;
    }
    println!("Recent searches");
    for (i, r) in entries.iter().enumerate() {
        println!(
            "  {:>2}. {}  {}  ({})",
            i + 1,
            r.cnpj.masked(),
            r.registered_name,
            local_time(&r.timestamp)
        );
    }
}

pub fn print_cached_companies(title: &str, entries: &[CachedCompany]) {
    if entries.is_empty() {
        println!("{title}: nothing cached yet.");
        return;
    }
    println!("{title}");
    for (i, c) in entries.iter().enumerate() {
        println!(
            "  {:>2}. {}  {}  [{}x, last {}]",
            i + 1,
            c.company.cnpj.masked(),
            c.company.display_name(),
            c.search_count,
            local_time(&c.searched_at)
        );
    }
}

pub fn print_favorites(entries: &[Favorite]) {
    if entries.is_empty() {
        println!("No favorites.");
        return;
    }
    println!("Favorites");
    for f in entries {
        println!(
            "  {}  {}  (added {})",
            f.cnpj.masked(),
            f.registered_name,
            local_time(&f.added_at)
        );
    }
}

pub fn print_search_log(entries: &[SearchLogEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("Search log");
    for e in entries {
        let outcome = if e.success {
            "ok".to_string()
        } else {
            format!("failed: {}", e.error.as_deref().unwrap_or("unknown error"))
        };
        println!("  {}  {:<20} {outcome}", local_time(&e.timestamp), e.query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnpjfy_core::{Cnpj, Partner, Phone};

    fn company() -> Company {
        let mut c = Company::new(Cnpj::parse("11222333000181").unwrap(), "ACME SOFTWARE LTDA");
        c.trade_name = Some("ACME".into());
        c.primary_activity = Some(CodeDescription::new(
            "6201501",
            "Desenvolvimento de programas de computador sob encomenda",
        ));
        c.secondary_activities = vec![
            CodeDescription::new("6204000", "Consultoria em tecnologia da informação"),
            CodeDescription {
                code: "6209100".into(),
                description: None,
            },
        ];
        c.share_capital = Some("1500000.5".into());
        c.address.city = Some("SAO PAULO".into());
        c.address.state = Some("SP".into());
        c.address.postal_code = Some("01310100".into());
        c.phones.push(Phone {
            area_code: "11".into(),
            number: "33334444".into(),
            is_fax: true,
        });
        c.partners.push(Partner {
            name: "MARIA SILVA".into(),
            document: None,
            role: Some("Sócio-Administrador".into()),
            entry_date: Some("2015-03-01".into()),
            kind: None,
            age_range: None,
        });
        c
    }

    #[test]
    fn card_groups_sections_and_skips_empty_ones() {
        let card = render_company_card(&company());
        assert!(card.starts_with("=== ACME SOFTWARE LTDA ===\n11.222.333/0001-81\n"));
        assert!(card.contains("Identity\n"));
        assert!(card.contains("R$ 1.500.000,50"));
        assert!(card.contains("6201-5/01 Desenvolvimento de programas"));
        assert!(card.contains("6209-1/00\n"));
        assert!(card.contains("SAO PAULO/SP"));
        assert!(card.contains("01310-100"));
        assert!(card.contains("(11) 3333-4444 (fax)"));
        assert!(card.contains("MARIA SILVA (Sócio-Administrador, since 2015-03-01)"));
        assert!(!card.contains("email"));
    }

    #[test]
    fn minimal_company_card() {
        let c = Company::new(Cnpj::from_digits_padded("191"), "BANCO");
        let card = render_company_card(&c);
        assert_eq!(card, "=== BANCO ===\n00.000.000/0001-91\n\n");
    }

    #[test]
    fn money_formatting() {
        assert_eq!(money("100000.00"), "R$ 100.000,00");
        assert_eq!(money("999"), "R$ 999,00");
        assert_eq!(money("1234,5"), "R$ 1.234,50");
        assert_eq!(money("n/a"), "n/a");
        assert_eq!(money("-1500.5"), "-R$ 1.500,50");
        assert_eq!(money("-1e30"), "-1e30");
        assert_eq!(money("1e300"), "1e300");
        assert_eq!(money("NaN"), "NaN");
        assert_eq!(money("inf"), "inf");
    }

    #[test]
    fn comparison_has_one_column_per_company() {
        let a = company();
        let b = Company::new(Cnpj::from_digits_padded("191"), "BANCO DO BRASIL SA");
        let table = render_comparison(&[&a, &b]);
        let first = table.lines().next().unwrap();
        assert!(first.starts_with("CNPJ"));
        assert!(first.contains("11.222.333/0001-81"));
        assert!(first.contains("00.000.000/0001-91"));
        assert_eq!(table.lines().count(), 9);
        let partners = table.lines().last().unwrap();
        assert!(partners.starts_with("partners"));
        assert!(partners.ends_with('0'));
    }

    #[test]
    fn long_values_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
