//! Common utilities for document generation.
//!
//! Shared helpers for date handling, French number formatting and text escaping.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub fn format_french_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Parse a stored date: plain `YYYY-MM-DD`, RFC 3339, or a naive timestamp.
pub fn parse_instant(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

/// Render a stored date as `dd/mm/yyyy`, or pass the raw value through when unparseable.
pub fn display_date(value: Option<&str>) -> String {
    match value {
        Some(raw) => parse_instant(raw)
            .map(|dt| format_french_date(dt.date()))
            .unwrap_or_else(|| raw.trim().to_string()),
        None => String::new(),
    }
}

/// French money format: narrow thousands separator, decimal comma (e.g., "1 200,00 €").
pub fn format_money(v: f64) -> String {
    let s = format!("{:.2}", v.abs());
    let (int_part, dec_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let mut out = String::new();
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    let int_with_sep: String = out.chars().rev().collect();
    let sign = if v < 0.0 && v.abs() >= 0.005 { "-" } else { "" };

    format!("{sign}{int_with_sep},{dec_part} €")
}

/// Shortest decimal rendering of a quantity or rate ("8", "7.5", "0.25").
pub fn format_number(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Make a string safe as a file name and inside a quoted `Content-Disposition`
/// value. Path separators, quotes, control and non-ASCII characters become `-`;
/// everything else, `_` and `.` included, is kept.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | '"' => '-',
            c if c.is_ascii_control() || !c.is_ascii() => '-',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c == '-' || c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Characters printable with the builtin fonts, which printpdf encodes as WinAnsi (cp1252).
fn is_win_ansi(ch: char) -> bool {
    matches!(ch, ' '..='~' | '\u{a0}'..='\u{ff}')
        || matches!(
            ch,
            '€' | '‚' | 'ƒ' | '„' | '…' | '†' | '‡' | 'ˆ' | '‰' | 'Š' | '‹' | 'Œ' | 'Ž' | '‘' | '’'
                | '“' | '”' | '•' | '–' | '—' | '˜' | '™' | 'š' | '›' | 'œ' | 'ž' | 'Ÿ'
        )
}

/// Keep WinAnsi text as is; transliterate the rest so the builtin fonts can print it.
pub fn to_pdf_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            c if is_win_ansi(c) => out.push(c),
            '\t' | '\u{202f}' | '\u{2009}' => out.push(' '),
            c if c.is_control() => {}
            'Ł' => out.push('L'),
            'ł' => out.push('l'),
            'Ő' | 'Ō' => out.push('O'),
            'ő' | 'ō' => out.push('o'),
            'Ű' | 'Ū' => out.push('U'),
            'ű' | 'ū' => out.push('u'),
            'Ā' | 'Ă' | 'Ą' => out.push('A'),
            'ā' | 'ă' | 'ą' => out.push('a'),
            'Ć' | 'Č' => out.push('C'),
            'ć' | 'č' => out.push('c'),
            'Ē' | 'Ę' | 'Ě' => out.push('E'),
            'ē' | 'ę' | 'ě' => out.push('e'),
            'Ń' | 'Ň' => out.push('N'),
            'ń' | 'ň' => out.push('n'),
            'Ř' => out.push('R'),
            'ř' => out.push('r'),
            'Ś' | 'Ş' | 'Ș' => out.push('S'),
            'ś' | 'ş' | 'ș' => out.push('s'),
            'Ț' | 'Ţ' | 'Ť' => out.push('T'),
            'ț' | 'ţ' | 'ť' => out.push('t'),
            'Ź' | 'Ż' => out.push('Z'),
            'ź' | 'ż' => out.push('z'),
            'Đ' | 'Ď' => out.push('D'),
            'đ' | 'ď' => out.push('d'),
            'Ğ' => out.push('G'),
            'ğ' => out.push('g'),
            'İ' => out.push('I'),
            'ı' => out.push('i'),
            '‑' | '‐' | '−' => out.push('-'),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap on character count.
pub fn wrap_text_lines(input: &str, max_chars: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in input.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        out.push(current);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(1200.0), "1 200,00 €");
        assert_eq!(format_money(0.0), "0,00 €");
        assert_eq!(format_money(1234567.891), "1 234 567,89 €");
        assert_eq!(format_money(-45.5), "-45,50 €");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(8.0), "8");
        assert_eq!(format_number(7.5), "7.5");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(150.0), "150");
    }

    #[test]
    fn test_parse_instant_formats() {
        assert!(parse_instant("2024-01-15").is_some());
        assert!(parse_instant("2024-01-15T10:30:00Z").is_some());
        assert!(parse_instant("2024-01-15T10:30:00.123").is_some());
        assert!(parse_instant("").is_none());
        assert!(parse_instant("demain").is_none());
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date(Some("2024-01-15")), "15/01/2024");
        assert_eq!(display_date(Some("fin janvier")), "fin janvier");
        assert_eq!(display_date(None), "");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>Dupont & Fils</b>"),
            "&lt;b&gt;Dupont &amp; Fils&lt;/b&gt;"
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("FAC-2024-001", "facture"), "FAC-2024-001");
        assert_eq!(sanitize_filename("FAC/2024\\002", "facture"), "FAC-2024-002");
        assert_eq!(sanitize_filename("F_001", "facture"), "F_001");
        assert_eq!(sanitize_filename("FAC.2024.001", "facture"), "FAC.2024.001");
        assert_eq!(sanitize_filename("FAC \"A\" 1", "facture"), "FAC -A- 1");
        assert_eq!(sanitize_filename("../etc", "facture"), "etc");
        assert_eq!(sanitize_filename("   ", "facture"), "facture");
    }

    #[test]
    fn test_to_pdf_text() {
        assert_eq!(to_pdf_text("Facture N° 12 – 150€"), "Facture N° 12 – 150€");
        assert_eq!(to_pdf_text("Pénalités à régler"), "Pénalités à régler");
        assert_eq!(to_pdf_text("Hélène"), "Hélène");
        assert_eq!(to_pdf_text("Développement « site » œuvre"), "Développement « site » œuvre");
        assert_eq!(to_pdf_text("1 200,00 €"), "1 200,00 €");
    }

    #[test]
    fn test_to_pdf_text_outside_win_ansi() {
        assert_eq!(to_pdf_text("Łukasz Wałęsa"), "Lukasz Walesa");
        assert_eq!(to_pdf_text("a\u{202f}b\tc"), "a b c");
        assert_eq!(to_pdf_text("ligne\u{7}"), "ligne");
        assert_eq!(to_pdf_text("漢"), "?");
    }

    #[test]
    fn test_wrap_text_lines() {
        let lines = wrap_text_lines("une deux trois quatre cinq", 10);
        assert_eq!(lines, vec!["une deux", "trois", "quatre", "cinq"]);
        assert!(wrap_text_lines("   ", 10).is_empty());
    }
}
