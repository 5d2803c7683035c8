//! Text normalization helpers
//!
//! Comparison titles drive the stable sort order for movie listings:
//! entity-decoded, accent-folded, lower-cased, leading article stripped,
//! non-alphanumerics removed. Recomputed on every title write.

/// Derive the comparison form of a title
///
/// `"The Matrix"` → `"matrix"`, `"A Quiet Place"` → `"quietplace"`,
/// `"Amélie"` → `"amelie"`.
pub fn compare_title(title: &str) -> String {
    let decoded = decode_entities(title);
    let folded = fold_accents(&decoded);
    let lowered = folded.to_lowercase();

    let stripped = ["the ", "a ", "an "]
        .iter()
        .find_map(|article| lowered.strip_prefix(article))
        .unwrap_or(&lowered)
        .trim();

    stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Decode the handful of HTML entities that show up in scraped titles
pub fn decode_entities(input: &str) -> String {
    let mut out = input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&ndash;", "–")
        .replace("&mdash;", "—");

    // numeric references, decimal and hex
    while let Some(start) = out.find("&#") {
        let Some(end) = out[start..].find(';').map(|i| start + i) else {
            break;
        };

        let body = &out[start + 2..end];
        let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            body.parse::<u32>().ok()
        };

        let replacement = code
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default();
        out.replace_range(start..=end, &replacement);
    }

    out
}

/// Fold accented Latin characters to their ASCII base form
///
/// Covers Latin-1 Supplement and Latin Extended-A, which is what movie
/// titles and scraped article titles actually contain. Characters outside
/// the table pass through unchanged.
pub fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
            'À'..='Å' | 'Ā' | 'Ă' | 'Ą' => 'A',
            'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
            'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => 'C',
            'ď' | 'đ' => 'd',
            'Ď' | 'Đ' => 'D',
            'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
            'È'..='Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => 'E',
            'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
            'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => 'G',
            'ĥ' | 'ħ' => 'h',
            'Ĥ' | 'Ħ' => 'H',
            'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
            'Ì'..='Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => 'I',
            'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
            'Ñ' | 'Ń' | 'Ņ' | 'Ň' => 'N',
            'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
            'Ò'..='Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => 'O',
            'ŕ' | 'ŗ' | 'ř' => 'r',
            'Ŕ' | 'Ŗ' | 'Ř' => 'R',
            'ś' | 'ŝ' | 'ş' | 'š' => 's',
            'Ś' | 'Ŝ' | 'Ş' | 'Š' => 'S',
            'ţ' | 'ť' | 'ŧ' => 't',
            'Ţ' | 'Ť' | 'Ŧ' => 'T',
            'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
            'Ù'..='Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => 'U',
            'ý' | 'ÿ' => 'y',
            'Ý' | 'Ÿ' => 'Y',
            'ź' | 'ż' | 'ž' => 'z',
            'Ź' | 'Ż' | 'Ž' => 'Z',
            other => other,
        })
        .collect()
}

/// Truncate to a character budget, appending an ellipsis marker when cut
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }

    let cut: String = input.chars().take(max_chars).collect();

    format!("{}…", cut.trim_end())
}

/// Filename-safe slug of a title
pub fn slugify(input: &str) -> String {
    let folded = fold_accents(&decode_entities(input)).to_lowercase();

    let mut slug = String::with_capacity(folded.len());
    let mut last_dash = true;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_articles() {
        assert_eq!(compare_title("The Matrix"), "matrix");
        assert_eq!(compare_title("A Quiet Place"), "quietplace");
        assert_eq!(compare_title("An American Werewolf in London"), "americanwerewolfinlondon");
    }

    #[test]
    fn article_must_be_a_prefix_word() {
        // "Them" is not "The m"
        assert_eq!(compare_title("Them"), "them");
        assert_eq!(compare_title("Airplane!"), "airplane");
    }

    #[test]
    fn folds_accents_and_drops_punctuation() {
        assert_eq!(compare_title("Amélie"), "amelie");
        assert_eq!(compare_title("WALL·E"), "walle");
        assert_eq!(compare_title("Léon: The Professional"), "leontheprofessional");
    }

    #[test]
    fn decodes_entities_before_comparing() {
        assert_eq!(compare_title("Fast &amp; Furious"), "fastfurious");
        assert_eq!(decode_entities("caf&#233;"), "café");
        assert_eq!(decode_entities("&#x27;quoted&#x27;"), "'quoted'");
    }

    #[test]
    fn truncation_appends_marker_only_when_cut() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a very long title", 6), "a very…");
    }

    #[test]
    fn slugs_are_filename_safe() {
        assert_eq!(slugify("The Matrix"), "the-matrix");
        assert_eq!(slugify("Amélie (2001)"), "amelie-2001");
    }
}
