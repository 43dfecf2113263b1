//! Localized month names.
//!
//! Sources publish in Slovak, English and occasionally neighbouring
//! languages, in nominative, genitive and abbreviated forms. All of them
//! resolve through one table keyed by the normalized lower-case token.

use std::collections::HashMap;
use std::sync::LazyLock;

/// (token, month) pairs. Tokens are lower-case without trailing dots.
#[rustfmt::skip]
const MONTH_TOKENS: &[(&str, u32)] = &[
    // English
    ("january", 1), ("jan", 1),
    ("february", 2), ("feb", 2),
    ("march", 3), ("mar", 3),
    ("april", 4), ("apr", 4),
    ("may", 5),
    ("june", 6), ("jun", 6),
    ("july", 7), ("jul", 7),
    ("august", 8), ("aug", 8),
    ("september", 9), ("sep", 9), ("sept", 9),
    ("october", 10), ("oct", 10),
    ("november", 11), ("nov", 11),
    ("december", 12), ("dec", 12),
    // Slovak
    ("január", 1), ("januára", 1),
    ("február", 2), ("februára", 2),
    ("marec", 3), ("marca", 3),
    ("apríl", 4), ("apríla", 4),
    ("máj", 5), ("mája", 5), ("maj", 5),
    ("jún", 6), ("júna", 6),
    ("júl", 7), ("júla", 7),
    ("augusta", 8),
    ("septembra", 9),
    ("október", 10), ("októbra", 10), ("okt", 10),
    ("novembra", 11),
    ("decembra", 12),
    // Czech
    ("leden", 1), ("ledna", 1), ("led", 1),
    ("únor", 2), ("února", 2), ("úno", 2),
    ("březen", 3), ("března", 3), ("bře", 3),
    ("duben", 4), ("dubna", 4), ("dub", 4),
    ("květen", 5), ("května", 5), ("kvě", 5),
    ("červen", 6), ("června", 6), ("čvn", 6),
    ("červenec", 7), ("července", 7), ("čvc", 7),
    ("srpen", 8), ("srpna", 8), ("srp", 8),
    ("září", 9), ("zář", 9),
    ("říjen", 10), ("října", 10), ("říj", 10),
    ("listopad", 11), ("listopadu", 11), ("lis", 11),
    ("prosinec", 12), ("prosince", 12), ("pro", 12),
    // German
    ("januar", 1), ("jänner", 1),
    ("februar", 2),
    ("märz", 3), ("mär", 3),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("oktober", 10), ("okt", 10),
    ("dezember", 12), ("dez", 12),
    // Hungarian
    ("február", 2), ("március", 3), ("márc", 3),
    ("április", 4), ("ápr", 4),
    ("május", 5),
    ("június", 6), ("jún", 6),
    ("július", 7), ("júl", 7),
    ("augusztus", 8), ("szeptember", 9), ("szept", 9),
    // Ukrainian
    ("січень", 1), ("січня", 1), ("січ", 1),
    ("лютий", 2), ("лютого", 2), ("лют", 2),
    ("березень", 3), ("березня", 3), ("бер", 3),
    ("квітень", 4), ("квітня", 4), ("квіт", 4),
    ("травень", 5), ("травня", 5), ("трав", 5),
    ("червень", 6), ("червня", 6), ("черв", 6),
    ("липень", 7), ("липня", 7), ("лип", 7),
    ("серпень", 8), ("серпня", 8), ("серп", 8),
    ("вересень", 9), ("вересня", 9), ("вер", 9),
    ("жовтень", 10), ("жовтня", 10), ("жовт", 10),
    ("листопад", 11), ("листопада", 11), ("лист", 11),
    ("грудень", 12), ("грудня", 12), ("груд", 12),
];

static MONTHS: LazyLock<HashMap<&'static str, u32>> =
    LazyLock::new(|| MONTH_TOKENS.iter().copied().collect());

/// Normalizes a month token: trims whitespace and trailing dots, lower-cases.
pub fn normalize_token(token: &str) -> String {
    token.trim().trim_end_matches('.').trim().to_lowercase()
}

/// Looks up a month number (1-12) for a localized month token.
pub fn month_number(token: &str) -> Option<u32> {
    let key = normalize_token(token);
    if key.is_empty() {
        return None;
    }
    MONTHS.get(key.as_str()).copied()
}
