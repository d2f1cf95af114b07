//! Free-text catalog filter.
//!
//! A deliberately permissive OR over every displayed field: any match
//! surfaces the product. Numeric terms compare against the production
//! date's year, month and day simultaneously, so "5" finds day 5, May and
//! year 5 alike. That breadth is inherited behavior and is kept as is.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

use super::repo_types::CatalogProduct;

const MONTH_NAMES: [(&str, u8); 12] = [
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

// Abbreviations resolve to the full name first, then the name resolves to a
// number through MONTH_NAMES. The indirection mirrors the legacy lookup
// tables and keeps the two lists independently editable.
const MONTH_ABBREVIATIONS: [(&str, &str); 12] = [
    ("jan", "january"),
    ("feb", "february"),
    ("mar", "march"),
    ("apr", "april"),
    ("may", "may"),
    ("jun", "june"),
    ("jul", "july"),
    ("aug", "august"),
    ("sep", "september"),
    ("oct", "october"),
    ("nov", "november"),
    ("dec", "december"),
];

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const SLASH_DATE: &[FormatItem<'static>] = format_description!("[month]/[day]/[year]");

fn month_number(name: &str) -> Option<u8> {
    MONTH_NAMES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, num)| num)
}

fn month_from_abbreviation(abbr: &str) -> Option<&'static str> {
    MONTH_ABBREVIATIONS
        .iter()
        .find(|(a, _)| *a == abbr)
        .map(|&(_, full)| full)
}

fn parse_full_date(term: &str) -> Option<Date> {
    Date::parse(term, ISO_DATE)
        .or_else(|_| Date::parse(term, SLASH_DATE))
        .ok()
}

/// Filters the catalog against a free-text term and orders it newest
/// production date first (stable: equal dates keep their incoming order).
/// An empty or absent term returns the whole catalog, same ordering.
pub fn filter_products(
    mut products: Vec<CatalogProduct>,
    term: Option<&str>,
) -> Vec<CatalogProduct> {
    products.sort_by(|a, b| b.production_date.cmp(&a.production_date));

    let term = match term {
        Some(t) if !t.is_empty() => t,
        _ => return products,
    };

    let lowered = term.to_lowercase();
    let numeric: Option<i32> = lowered.parse().ok();
    let full_date = parse_full_date(term);
    let month_from_abbrev = month_from_abbreviation(&lowered).and_then(month_number);
    let month_by_name = month_number(&lowered);

    products.retain(|p| {
        matches_term(
            p,
            &lowered,
            numeric,
            month_from_abbrev,
            month_by_name,
            full_date,
        )
    });
    products
}

fn matches_term(
    p: &CatalogProduct,
    lowered: &str,
    numeric: Option<i32>,
    month_from_abbrev: Option<u8>,
    month_by_name: Option<u8>,
    full_date: Option<Date>,
) -> bool {
    let full_name = format!("{} {}", p.farmer_first_name, p.farmer_last_name).to_lowercase();
    let month = u8::from(p.production_date.month());

    p.name.to_lowercase().contains(lowered)
        || p.description.to_lowercase().contains(lowered)
        || full_name.contains(lowered)
        || p.farmer_first_name.to_lowercase().contains(lowered)
        || p.farmer_last_name.to_lowercase().contains(lowered)
        || p.price.to_string().contains(lowered)
        || numeric.map_or(false, |n| {
            p.production_date.year() == n || i32::from(month) == n
                || i32::from(p.production_date.day()) == n
        })
        || month_from_abbrev.map_or(false, |m| month == m)
        || month_by_name.map_or(false, |m| month == m)
        || full_date.map_or(false, |d| p.production_date == d)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use time::macros::date;
    use uuid::Uuid;

    use super::*;

    fn product(id: i64, name: &str, produced: Date) -> CatalogProduct {
        CatalogProduct {
            id,
            owner_id: Uuid::new_v4(),
            name: name.into(),
            description: format!("{name} fresh from the farm"),
            price: Decimal::new(2550, 2), // 25.50
            category: "Vegetable".into(),
            production_date: produced,
            image_key: None,
            farmer_first_name: "John".into(),
            farmer_last_name: "Doe".into(),
        }
    }

    fn catalog() -> Vec<CatalogProduct> {
        vec![
            product(1, "Carrots", date!(2024 - 03 - 10)),
            product(2, "Tomatoes", date!(2024 - 04 - 02)),
            product(3, "Potatoes", date!(2023 - 11 - 20)),
        ]
    }

    fn ids(products: &[CatalogProduct]) -> Vec<i64> {
        products.iter().map(|p| p.id).collect()
    }

    #[test]
    fn empty_term_returns_all_newest_first() {
        assert_eq!(ids(&filter_products(catalog(), None)), vec![2, 1, 3]);
        assert_eq!(ids(&filter_products(catalog(), Some(""))), vec![2, 1, 3]);
    }

    #[test]
    fn equal_dates_keep_incoming_order() {
        let same_day = vec![
            product(10, "Beets", date!(2024 - 01 - 05)),
            product(11, "Chard", date!(2024 - 01 - 05)),
            product(12, "Kale", date!(2024 - 01 - 05)),
        ];
        assert_eq!(ids(&filter_products(same_day, None)), vec![10, 11, 12]);
    }

    #[test]
    fn name_substring_matches_case_insensitively() {
        assert_eq!(ids(&filter_products(catalog(), Some("ToMaT"))), vec![2]);
        assert_eq!(ids(&filter_products(catalog(), Some("rro"))), vec![1]);
    }

    #[test]
    fn description_substring_matches() {
        // Every fixture description contains "fresh".
        assert_eq!(ids(&filter_products(catalog(), Some("fresh"))), vec![2, 1, 3]);
    }

    #[test]
    fn farmer_name_matches_first_last_and_full() {
        assert_eq!(ids(&filter_products(catalog(), Some("john"))), vec![2, 1, 3]);
        assert_eq!(ids(&filter_products(catalog(), Some("doe"))), vec![2, 1, 3]);
        assert_eq!(
            ids(&filter_products(catalog(), Some("john doe"))),
            vec![2, 1, 3]
        );
        assert!(filter_products(catalog(), Some("jane")).is_empty());
    }

    #[test]
    fn price_string_matches() {
        assert_eq!(ids(&filter_products(catalog(), Some("25.5"))), vec![2, 1, 3]);
        assert!(filter_products(catalog(), Some("99.99")).is_empty());
    }

    #[test]
    fn numeric_term_matches_year_month_and_day() {
        // 11 is both a month (November) and a day; only product 3 was
        // produced in November and none on day 11.
        assert_eq!(ids(&filter_products(catalog(), Some("11"))), vec![3]);
        assert_eq!(ids(&filter_products(catalog(), Some("2023"))), vec![3]);
        assert_eq!(ids(&filter_products(catalog(), Some("10"))), vec![1]);
    }

    #[test]
    fn numeric_ambiguity_is_preserved() {
        // Produced 2005-05-15: "5" matches through day-of-month ambiguity
        // with month; both clauses hold at once and that is intended.
        let items = vec![product(7, "Heritage Wheat", date!(2005 - 05 - 15))];
        assert_eq!(ids(&filter_products(items, Some("5"))), vec![7]);
    }

    #[test]
    fn month_abbreviation_and_full_name_are_equivalent() {
        assert_eq!(ids(&filter_products(catalog(), Some("apr"))), vec![2]);
        assert_eq!(ids(&filter_products(catalog(), Some("april"))), vec![2]);
        assert_eq!(ids(&filter_products(catalog(), Some("APRIL"))), vec![2]);
        assert_eq!(ids(&filter_products(catalog(), Some("nov"))), vec![3]);
        assert_eq!(ids(&filter_products(catalog(), Some("november"))), vec![3]);
    }

    #[test]
    fn full_date_matches_exactly() {
        assert_eq!(
            ids(&filter_products(catalog(), Some("2024-03-10"))),
            vec![1]
        );
        assert_eq!(
            ids(&filter_products(catalog(), Some("03/10/2024"))),
            vec![1]
        );
        // Wrong day: the date clause misses and nothing else picks it up.
        assert!(filter_products(catalog(), Some("2024-03-11")).is_empty());
    }

    #[test]
    fn unmatched_term_returns_nothing() {
        assert!(filter_products(catalog(), Some("tractor")).is_empty());
    }
}
