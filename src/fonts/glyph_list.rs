//! Glyph name to Unicode mapping.
//!
//! Covers the Adobe Glyph List names used by the predefined simple-font
//! encodings plus the Greek, ligature and math names common in
//! `/Differences` arrays. Names outside the table are decoded by the AGL
//! naming conventions: `uniXXXX[XXXX...]`, `uXXXX[XX]`, and a `.suffix`
//! or `_`-joined ligature form.

use phf::phf_map;

/// Glyph name to Unicode scalar.
pub static GLYPH_LIST: phf::Map<&'static str, char> = phf_map! {
    // ASCII
    "space" => ' ',
    "exclam" => '!',
    "quotedbl" => '"',
    "numbersign" => '#',
    "dollar" => '$',
    "percent" => '%',
    "ampersand" => '&',
    "quotesingle" => '\'',
    "parenleft" => '(',
    "parenright" => ')',
    "asterisk" => '*',
    "plus" => '+',
    "comma" => ',',
    "hyphen" => '-',
    "period" => '.',
    "slash" => '/',
    "zero" => '0',
    "one" => '1',
    "two" => '2',
    "three" => '3',
    "four" => '4',
    "five" => '5',
    "six" => '6',
    "seven" => '7',
    "eight" => '8',
    "nine" => '9',
    "colon" => ':',
    "semicolon" => ';',
    "less" => '<',
    "equal" => '=',
    "greater" => '>',
    "question" => '?',
    "at" => '@',
    "A" => 'A', "B" => 'B', "C" => 'C', "D" => 'D', "E" => 'E', "F" => 'F',
    "G" => 'G', "H" => 'H', "I" => 'I', "J" => 'J', "K" => 'K', "L" => 'L',
    "M" => 'M', "N" => 'N', "O" => 'O', "P" => 'P', "Q" => 'Q', "R" => 'R',
    "S" => 'S', "T" => 'T', "U" => 'U', "V" => 'V', "W" => 'W', "X" => 'X',
    "Y" => 'Y', "Z" => 'Z',
    "bracketleft" => '[',
    "backslash" => '\\',
    "bracketright" => ']',
    "asciicircum" => '^',
    "underscore" => '_',
    "grave" => '`',
    "a" => 'a', "b" => 'b', "c" => 'c', "d" => 'd', "e" => 'e', "f" => 'f',
    "g" => 'g', "h" => 'h', "i" => 'i', "j" => 'j', "k" => 'k', "l" => 'l',
    "m" => 'm', "n" => 'n', "o" => 'o', "p" => 'p', "q" => 'q', "r" => 'r',
    "s" => 's', "t" => 't', "u" => 'u', "v" => 'v', "w" => 'w', "x" => 'x',
    "y" => 'y', "z" => 'z',
    "braceleft" => '{',
    "bar" => '|',
    "braceright" => '}',
    "asciitilde" => '~',

    // Latin-1 supplement
    "nbspace" => '\u{00A0}',
    "exclamdown" => '¡',
    "cent" => '¢',
    "sterling" => '£',
    "currency" => '¤',
    "yen" => '¥',
    "brokenbar" => '¦',
    "section" => '§',
    "dieresis" => '¨',
    "copyright" => '©',
    "ordfeminine" => 'ª',
    "guillemotleft" => '«',
    "logicalnot" => '¬',
    "sfthyphen" => '\u{00AD}',
    "registered" => '®',
    "macron" => '¯',
    "degree" => '°',
    "plusminus" => '±',
    "twosuperior" => '²',
    "threesuperior" => '³',
    "acute" => '´',
    "mu" => 'µ',
    "paragraph" => '¶',
    "periodcentered" => '·',
    "cedilla" => '¸',
    "onesuperior" => '¹',
    "ordmasculine" => 'º',
    "guillemotright" => '»',
    "onequarter" => '¼',
    "onehalf" => '½',
    "threequarters" => '¾',
    "questiondown" => '¿',
    "Agrave" => 'À', "Aacute" => 'Á', "Acircumflex" => 'Â', "Atilde" => 'Ã',
    "Adieresis" => 'Ä', "Aring" => 'Å', "AE" => 'Æ', "Ccedilla" => 'Ç',
    "Egrave" => 'È', "Eacute" => 'É', "Ecircumflex" => 'Ê', "Edieresis" => 'Ë',
    "Igrave" => 'Ì', "Iacute" => 'Í', "Icircumflex" => 'Î', "Idieresis" => 'Ï',
    "Eth" => 'Ð', "Ntilde" => 'Ñ', "Ograve" => 'Ò', "Oacute" => 'Ó',
    "Ocircumflex" => 'Ô', "Otilde" => 'Õ', "Odieresis" => 'Ö', "multiply" => '×',
    "Oslash" => 'Ø', "Ugrave" => 'Ù', "Uacute" => 'Ú', "Ucircumflex" => 'Û',
    "Udieresis" => 'Ü', "Yacute" => 'Ý', "Thorn" => 'Þ', "germandbls" => 'ß',
    "agrave" => 'à', "aacute" => 'á', "acircumflex" => 'â', "atilde" => 'ã',
    "adieresis" => 'ä', "aring" => 'å', "ae" => 'æ', "ccedilla" => 'ç',
    "egrave" => 'è', "eacute" => 'é', "ecircumflex" => 'ê', "edieresis" => 'ë',
    "igrave" => 'ì', "iacute" => 'í', "icircumflex" => 'î', "idieresis" => 'ï',
    "eth" => 'ð', "ntilde" => 'ñ', "ograve" => 'ò', "oacute" => 'ó',
    "ocircumflex" => 'ô', "otilde" => 'õ', "odieresis" => 'ö', "divide" => '÷',
    "oslash" => 'ø', "ugrave" => 'ù', "uacute" => 'ú', "ucircumflex" => 'û',
    "udieresis" => 'ü', "yacute" => 'ý', "thorn" => 'þ', "ydieresis" => 'ÿ',

    // Latin extended and spacing modifiers
    "dotlessi" => 'ı',
    "Lslash" => 'Ł',
    "lslash" => 'ł',
    "OE" => 'Œ',
    "oe" => 'œ',
    "Scaron" => 'Š',
    "scaron" => 'š',
    "Ydieresis" => 'Ÿ',
    "Zcaron" => 'Ž',
    "zcaron" => 'ž',
    "florin" => 'ƒ',
    "circumflex" => 'ˆ',
    "caron" => 'ˇ',
    "breve" => '˘',
    "dotaccent" => '˙',
    "ring" => '˚',
    "ogonek" => '˛',
    "tilde" => '˜',
    "hungarumlaut" => '˝',

    // Punctuation
    "endash" => '–',
    "emdash" => '—',
    "quoteleft" => '\u{2018}',
    "quoteright" => '\u{2019}',
    "quotesinglbase" => '‚',
    "quotedblleft" => '\u{201C}',
    "quotedblright" => '\u{201D}',
    "quotedblbase" => '„',
    "dagger" => '†',
    "daggerdbl" => '‡',
    "bullet" => '•',
    "ellipsis" => '…',
    "perthousand" => '‰',
    "guilsinglleft" => '‹',
    "guilsinglright" => '›',
    "fraction" => '⁄',
    "Euro" => '€',
    "trademark" => '™',
    "minus" => '−',

    // Ligatures
    "ff" => 'ﬀ',
    "fi" => 'ﬁ',
    "fl" => 'ﬂ',
    "ffi" => 'ﬃ',
    "ffl" => 'ﬄ',

    // Math and symbols
    "notequal" => '≠',
    "infinity" => '∞',
    "lessequal" => '≤',
    "greaterequal" => '≥',
    "partialdiff" => '∂',
    "summation" => '∑',
    "product" => '∏',
    "integral" => '∫',
    "radical" => '√',
    "approxequal" => '≈',
    "Delta" => '∆',
    "Omega" => 'Ω',
    "lozenge" => '◊',
    "apple" => '\u{F8FF}',
    "onethird" => '⅓',
    "twothirds" => '⅔',
    "oneeighth" => '⅛',
    "threeeighths" => '⅜',
    "fiveeighths" => '⅝',
    "seveneighths" => '⅞',
    "colonmonetary" => '₡',
    "rupiah" => '\u{F6DD}',
    "arrowleft" => '←',
    "arrowup" => '↑',
    "arrowright" => '→',
    "arrowdown" => '↓',
    "arrowboth" => '↔',
    "universal" => '∀',
    "existential" => '∃',
    "element" => '∈',
    "suchthat" => '∋',
    "therefore" => '∴',
    "perpendicular" => '⊥',
    "similar" => '∼',
    "congruent" => '≅',
    "equivalence" => '≡',
    "proportional" => '∝',
    "emptyset" => '∅',
    "intersection" => '∩',
    "union" => '∪',
    "propersuperset" => '⊃',
    "reflexsuperset" => '⊇',
    "propersubset" => '⊂',
    "reflexsubset" => '⊆',
    "notsubset" => '⊄',
    "angle" => '∠',
    "gradient" => '∇',
    "logicaland" => '∧',
    "logicalor" => '∨',
    "dotmath" => '⋅',
    "prime" => '′',
    "second" => '″',
    "aleph" => 'ℵ',
    "Ifraktur" => 'ℑ',
    "Rfraktur" => 'ℜ',
    "weierstrass" => '℘',
    "circlemultiply" => '⊗',
    "circleplus" => '⊕',
    "club" => '♣',
    "diamond" => '♦',
    "heart" => '♥',
    "spade" => '♠',

    // Greek
    "Alpha" => 'Α', "Beta" => 'Β', "Gamma" => 'Γ', "Epsilon" => 'Ε',
    "Zeta" => 'Ζ', "Eta" => 'Η', "Theta" => 'Θ', "Iota" => 'Ι', "Kappa" => 'Κ',
    "Lambda" => 'Λ', "Mu" => 'Μ', "Nu" => 'Ν', "Xi" => 'Ξ', "Omicron" => 'Ο',
    "Pi" => 'Π', "Rho" => 'Ρ', "Sigma" => 'Σ', "Tau" => 'Τ', "Upsilon" => 'Υ',
    "Phi" => 'Φ', "Chi" => 'Χ', "Psi" => 'Ψ',
    "alpha" => 'α', "beta" => 'β', "gamma" => 'γ', "delta" => 'δ',
    "epsilon" => 'ε', "zeta" => 'ζ', "eta" => 'η', "theta" => 'θ',
    "iota" => 'ι', "kappa" => 'κ', "lambda" => 'λ', "nu" => 'ν', "xi" => 'ξ',
    "omicron" => 'ο', "pi" => 'π', "rho" => 'ρ', "sigma" => 'σ',
    "sigma1" => 'ς', "tau" => 'τ', "upsilon" => 'υ', "phi" => 'φ',
    "chi" => 'χ', "psi" => 'ψ', "omega" => 'ω', "theta1" => 'ϑ',
    "phi1" => 'ϕ', "omega1" => 'ϖ', "Upsilon1" => 'ϒ',
};

/// Look up a glyph name.
///
/// ```
/// use pdf_ferrite::fonts::glyph_list::glyph_to_unicode;
///
/// assert_eq!(glyph_to_unicode("bullet").as_deref(), Some("•"));
/// assert_eq!(glyph_to_unicode("uni0041").as_deref(), Some("A"));
/// assert_eq!(glyph_to_unicode("f_i").as_deref(), Some("fi"));
/// assert_eq!(glyph_to_unicode("notaglyph"), None);
/// ```
pub fn glyph_to_unicode(name: &str) -> Option<String> {
    // Variant suffixes (`a.sc`, `one.oldstyle`) map like their base glyph
    let base = name.split('.').next().unwrap_or(name);
    if base.is_empty() {
        return None;
    }

    if base.contains('_') {
        let parts: Option<String> = base.split('_').map(single_glyph).collect();
        return parts.filter(|s| !s.is_empty());
    }
    single_glyph(base)
}

fn single_glyph(name: &str) -> Option<String> {
    if let Some(&c) = GLYPH_LIST.get(name) {
        return Some(c.to_string());
    }

    // uniXXXX, possibly several code units: uni00660069
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 && hex.len() % 4 == 0 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            let units: Vec<u16> = (0..hex.len())
                .step_by(4)
                .filter_map(|i| u16::from_str_radix(&hex[i..i + 4], 16).ok())
                .collect();
            return String::from_utf16(&units).ok();
        }
    }

    // uXXXX to uXXXXXX
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string());
        }
    }

    // Expert-set variants: Asmall, zerooldstyle, dollarsuperior
    for suffix in ["small", "oldstyle", "superior", "inferior"] {
        if let Some(stem) = name.strip_suffix(suffix).filter(|s| !s.is_empty()) {
            if let Some(&c) = GLYPH_LIST.get(stem) {
                return Some(c.to_string());
            }
            let lowered = stem.to_ascii_lowercase();
            if let Some(&c) = GLYPH_LIST.get(lowered.as_str()) {
                return Some(c.to_uppercase().to_string());
            }
        }
    }

    log::trace!("Unknown glyph name '{}'", name);
    None
}

/// Reverse lookup: a glyph name for `c`, if the table has one.
pub fn unicode_to_glyph(c: char) -> Option<&'static str> {
    GLYPH_LIST.entries().find(|(_, &v)| v == c).map(|(k, _)| *k)
}
