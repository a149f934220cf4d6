//! `!!!` doctype declarations.

use std::borrow::Cow;

use crate::options::Format;
use crate::scan;

const HTML5: &str = "<!DOCTYPE html>\n";

const XHTML_TRANSITIONAL: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">\n";
const XHTML_STRICT: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">\n";
const XHTML_FRAMESET: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Frameset//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd\">\n";
const XHTML_11: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">\n";
const XHTML_BASIC: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML Basic 1.1//EN\" \"http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd\">\n";
const XHTML_MOBILE: &str = "<!DOCTYPE html PUBLIC \"-//WAPFORUM//DTD XHTML Mobile 1.2//EN\" \"http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd\">\n";
const XHTML_RDFA: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML+RDFa 1.0//EN\" \"http://www.w3.org/MarkUp/DTD/xhtml-rdfa-1.dtd\">\n";

const HTML4_TRANSITIONAL: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01 Transitional//EN\" \"http://www.w3.org/TR/html4/loose.dtd\">\n";
const HTML4_STRICT: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">\n";
const HTML4_FRAMESET: &str = "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01 Frameset//EN\" \"http://www.w3.org/TR/html4/frameset.dtd\">\n";

/// Doctype line for a `!!! <token> [encoding]` declaration.
///
/// `token` is matched case-insensitively. `xml` yields a prolog in XHTML
/// and nothing elsewhere.
pub fn doctype(token: &str, encoding: Option<&str>, format: Format) -> Cow<'static, str> {
    let token = token.to_ascii_lowercase();
    if token == "xml" {
        return match format {
            Format::Xhtml => {
                let encoding = encoding.unwrap_or("utf-8");
                Cow::Owned(format!("<?xml version='1.0' encoding='{encoding}' ?>\n"))
            }
            Format::Html4 | Format::Html5 => Cow::Borrowed(""),
        };
    }

    Cow::Borrowed(match format {
        Format::Html5 => HTML5,
        Format::Xhtml => match token.as_str() {
            "strict" => XHTML_STRICT,
            "frameset" => XHTML_FRAMESET,
            "5" => HTML5,
            "1.1" => XHTML_11,
            "basic" => XHTML_BASIC,
            "mobile" => XHTML_MOBILE,
            "rdfa" => XHTML_RDFA,
            _ => XHTML_TRANSITIONAL,
        },
        Format::Html4 => match token.as_str() {
            "strict" => HTML4_STRICT,
            "frameset" => HTML4_FRAMESET,
            _ => HTML4_TRANSITIONAL,
        },
    })
}

/// Doctype for a whole `!!!` line.
pub(crate) fn doctype_line(text: &str, format: Format) -> Cow<'static, str> {
    let bytes = text.as_bytes();
    let (start, end) = scan::word(bytes, 3);
    let (enc_start, enc_end) = scan::word(bytes, end);
    let encoding = (enc_start < enc_end).then(|| text[enc_start..enc_end].to_ascii_lowercase());
    doctype(&text[start..end], encoding.as_deref(), format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html5_always_uses_the_short_form() {
        for token in ["", "strict", "frameset", "5", "1.1", "basic", "mobile", "rdfa", "bogus"] {
            assert_eq!(doctype(token, None, Format::Html5), HTML5, "token `{token}`");
        }
    }

    #[test]
    fn xhtml_table() {
        let cases = [
            ("", XHTML_TRANSITIONAL),
            ("strict", XHTML_STRICT),
            ("FRAMESET", XHTML_FRAMESET),
            ("5", HTML5),
            ("1.1", XHTML_11),
            ("basic", XHTML_BASIC),
            ("mobile", XHTML_MOBILE),
            ("rdfa", XHTML_RDFA),
            ("bogus", XHTML_TRANSITIONAL),
        ];
        for (token, expected) in cases {
            assert_eq!(doctype(token, None, Format::Xhtml), expected, "token `{token}`");
        }
    }

    #[test]
    fn html4_falls_back_to_transitional() {
        let cases = [
            ("", HTML4_TRANSITIONAL),
            ("strict", HTML4_STRICT),
            ("frameset", HTML4_FRAMESET),
            ("5", HTML4_TRANSITIONAL),
            ("1.1", HTML4_TRANSITIONAL),
            ("basic", HTML4_TRANSITIONAL),
            ("mobile", HTML4_TRANSITIONAL),
            ("rdfa", HTML4_TRANSITIONAL),
        ];
        for (token, expected) in cases {
            assert_eq!(doctype(token, None, Format::Html4), expected, "token `{token}`");
        }
    }

    #[test]
    fn xml_prolog_only_in_xhtml() {
        assert_eq!(
            doctype_line("!!! XML iso-8859-1\n", Format::Xhtml),
            "<?xml version='1.0' encoding='iso-8859-1' ?>\n"
        );
        assert_eq!(
            doctype_line("!!! xml\n", Format::Xhtml),
            "<?xml version='1.0' encoding='utf-8' ?>\n"
        );
        assert_eq!(doctype_line("!!! xml\n", Format::Html5), "");
        assert_eq!(doctype_line("!!! xml\n", Format::Html4), "");
    }

    #[test]
    fn bare_declaration_uses_the_default_doctype() {
        assert_eq!(doctype_line("!!!\n", Format::Xhtml), XHTML_TRANSITIONAL);
        assert_eq!(doctype_line("!!! Strict\n", Format::Html4), HTML4_STRICT);
    }
}
