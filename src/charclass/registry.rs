//! Named classes: POSIX classes, Unicode general categories and blocks.
//!
//! The registry is a plain immutable value. The compiler takes it by
//! reference; [`ClassRegistry::shared`] hands out a process-wide instance
//! built on first use.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;

use super::bitset::{Bitset, CharSet};
use super::unicode_data::LEAF_CATEGORIES;

/// Block table: `first..last:Name;` entries, code points in hex.
const BLOCK_DATA: &str = "\
0000..007F:InBasicLatin;0080..00FF:InLatin-1Supplement;0100..017F:InLatinExtended-A;\
0180..024F:InLatinExtended-B;0250..02AF:InIPAExtensions;02B0..02FF:InSpacingModifierLetters;\
0300..036F:InCombiningDiacriticalMarks;0370..03FF:InGreek;0400..04FF:InCyrillic;0530..058F:InArmenian;\
0590..05FF:InHebrew;0600..06FF:InArabic;0700..074F:InSyriac;0780..07BF:InThaana;0900..097F:InDevanagari;\
0980..09FF:InBengali;0A00..0A7F:InGurmukhi;0A80..0AFF:InGujarati;0B00..0B7F:InOriya;0B80..0BFF:InTamil;\
0C00..0C7F:InTelugu;0C80..0CFF:InKannada;0D00..0D7F:InMalayalam;0D80..0DFF:InSinhala;0E00..0E7F:InThai;\
0E80..0EFF:InLao;0F00..0FFF:InTibetan;1000..109F:InMyanmar;10A0..10FF:InGeorgian;1100..11FF:InHangulJamo;\
1200..137F:InEthiopic;13A0..13FF:InCherokee;1400..167F:InUnifiedCanadianAboriginalSyllabics;\
1680..169F:InOgham;16A0..16FF:InRunic;1780..17FF:InKhmer;1800..18AF:InMongolian;\
1E00..1EFF:InLatinExtendedAdditional;1F00..1FFF:InGreekExtended;2000..206F:InGeneralPunctuation;\
2070..209F:InSuperscriptsAndSubscripts;20A0..20CF:InCurrencySymbols;\
20D0..20FF:InCombiningMarksForSymbols;2100..214F:InLetterLikeSymbols;2150..218F:InNumberForms;\
2190..21FF:InArrows;2200..22FF:InMathematicalOperators;2300..23FF:InMiscellaneousTechnical;\
2400..243F:InControlPictures;2440..245F:InOpticalCharacterRecognition;\
2460..24FF:InEnclosedAlphanumerics;2500..257F:InBoxDrawing;2580..259F:InBlockElements;\
25A0..25FF:InGeometricShapes;2600..26FF:InMiscellaneousSymbols;2700..27BF:InDingbats;\
2800..28FF:InBraillePatterns;2E80..2EFF:InCJKRadicalsSupplement;2F00..2FDF:InKangxiRadicals;\
2FF0..2FFF:InIdeographicDescriptionCharacters;3000..303F:InCJKSymbolsAndPunctuation;\
3040..309F:InHiragana;30A0..30FF:InKatakana;3100..312F:InBopomofo;3130..318F:InHangulCompatibilityJamo;\
3190..319F:InKanbun;31A0..31BF:InBopomofoExtended;3200..32FF:InEnclosedCJKLettersAndMonths;\
3300..33FF:InCJKCompatibility;3400..4DB5:InCJKUnifiedIdeographsExtensionA;\
4E00..9FFF:InCJKUnifiedIdeographs;A000..A48F:InYiSyllables;A490..A4CF:InYiRadicals;\
AC00..D7A3:InHangulSyllables;D800..DB7F:InHighSurrogates;DB80..DBFF:InHighPrivateUseSurrogates;\
DC00..DFFF:InLowSurrogates;E000..F8FF:InPrivateUse;F900..FAFF:InCJKCompatibilityIdeographs;\
FB00..FB4F:InAlphabeticPresentationForms;FB50..FDFF:InArabicPresentationForms-A;\
FE20..FE2F:InCombiningHalfMarks;FE30..FE4F:InCJKCompatibilityForms;FE50..FE6F:InSmallFormVariants;\
FE70..FEFE:InArabicPresentationForms-B;FEFF..FEFF:InSpecials;FF00..FFEF:InHalfWidthAndFullWidthForms;\
FFF0..FFFD:InSpecials";

/// Category unions registered under their one-letter names.
const CATEGORY_GROUPS: &[(&str, &[&str])] = &[
    ("L", &["Lu", "Ll", "Lt", "Lm", "Lo"]),
    ("M", &["Mn", "Mc", "Me"]),
    ("N", &["Nd", "Nl", "No"]),
    ("P", &["Pc", "Pd", "Ps", "Pe", "Pi", "Pf", "Po"]),
    ("Z", &["Zs", "Zl", "Zp"]),
    ("S", &["Sm", "Sc", "Sk", "So"]),
    ("C", &["Cc", "Cf", "Co", "Cs", "Cn"]),
];

/// The ASCII and Unicode flavours of one predefined escape class.
#[derive(Debug, Clone)]
struct Predefined {
    ascii: Bitset,
    unicode: Bitset,
}

impl Predefined {
    fn pick(&self, unicode: bool) -> &Bitset {
        if unicode {
            &self.unicode
        } else {
            &self.ascii
        }
    }
}

/// Immutable table of named character classes.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    classes: FxHashMap<String, Bitset>,
    digit: Predefined,
    space: Predefined,
    word: Predefined,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        ClassRegistry::new()
    }
}

impl ClassRegistry {
    /// Build the full registry.
    pub fn new() -> Self {
        let mut classes = FxHashMap::default();
        register_posix(&mut classes);
        register_categories(&mut classes);
        register_blocks(&mut classes);

        let category = |name: &str| classes.get(name).cloned().unwrap_or_default();

        let digit = Predefined {
            ascii: Bitset::from_ranges(&[(0x30, 0x39)]),
            unicode: category("Nd"),
        };

        let ascii_space = Bitset::from_ranges(&[(0x09, 0x0D), (0x20, 0x20)]);
        let mut unicode_space = category("Z");
        unicode_space.add(&ascii_space);
        unicode_space.add(&Bitset::from_ranges(&[(0x85, 0x85)]));
        let space = Predefined {
            ascii: ascii_space,
            unicode: unicode_space,
        };

        let mut unicode_word = category("L");
        unicode_word.add(&category("Nd"));
        unicode_word.add(&category("Pc"));
        unicode_word.add(&category("Mn"));
        let word = Predefined {
            ascii: Bitset::from_ranges(&[(0x30, 0x39), (0x41, 0x5A), (0x5F, 0x5F), (0x61, 0x7A)]),
            unicode: unicode_word,
        };

        tracing::debug!(classes = classes.len(), "class registry built");
        ClassRegistry {
            classes,
            digit,
            space,
            word,
        }
    }

    /// The process-wide registry.
    pub fn shared() -> &'static ClassRegistry {
        static SHARED: OnceLock<ClassRegistry> = OnceLock::new();
        SHARED.get_or_init(ClassRegistry::new)
    }

    /// Look up a class by exact name (`Lu`, `Alpha`, `InGreek`, ...).
    pub fn get(&self, name: &str) -> Option<&Bitset> {
        self.classes.get(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `\d`, `\s`, `\w` and their upper-case negations.
    pub fn predefined(&self, letter: char, unicode: bool) -> Option<Bitset> {
        let base = match letter.to_ascii_lowercase() {
            'd' => &self.digit,
            's' => &self.space,
            'w' => &self.word,
            _ => return None,
        };
        let set = base.pick(unicode).clone();
        Some(if letter.is_ascii_uppercase() {
            set.negated()
        } else {
            set
        })
    }

    /// Word characters as used by `\b`.
    pub fn word(&self, unicode: bool) -> &Bitset {
        self.word.pick(unicode)
    }
}

fn register_posix(classes: &mut FxHashMap<String, Bitset>) {
    let lower = Bitset::from_ranges(&[(0x61, 0x7A)]);
    let upper = Bitset::from_ranges(&[(0x41, 0x5A)]);
    let digit = Bitset::from_ranges(&[(0x30, 0x39)]);

    let mut alpha = lower.clone();
    alpha.add(&upper);
    let mut alnum = alpha.clone();
    alnum.add(&digit);

    let mut punct = CharSet::new();
    for c in "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".chars() {
        punct.insert(c as u32);
    }
    let punct = Bitset::from_set(punct);
    let mut graph = alnum.clone();
    graph.add(&punct);

    classes.insert("Lower".into(), lower);
    classes.insert("Upper".into(), upper);
    classes.insert("ASCII".into(), Bitset::from_ranges(&[(0, 0x7F)]));
    classes.insert("Alpha".into(), alpha);
    classes.insert("Digit".into(), digit);
    classes.insert("Alnum".into(), alnum);
    classes.insert("Punct".into(), punct);
    classes.insert("Graph".into(), graph.clone());
    classes.insert("Print".into(), graph);
    classes.insert("Blank".into(), Bitset::from_ranges(&[(0x20, 0x20), (0x09, 0x09)]));
    classes.insert("Cntrl".into(), Bitset::from_ranges(&[(0, 0x1F), (0x7F, 0x7F)]));
    classes.insert(
        "XDigit".into(),
        Bitset::from_ranges(&[(0x30, 0x39), (0x41, 0x46), (0x61, 0x66)]),
    );
    classes.insert("Space".into(), Bitset::from_ranges(&[(0x09, 0x0D), (0x20, 0x20)]));
}

fn register_categories(classes: &mut FxHashMap<String, Bitset>) {
    let mut assigned = CharSet::new();
    for (name, ranges) in LEAF_CATEGORIES {
        let set = CharSet::from_ranges(ranges);
        assigned.union_with(&set);
        classes.insert((*name).to_string(), Bitset::from_set(set));
    }
    // Surrogates never occur in a `char` sequence.
    classes.insert("Cs".into(), Bitset::new());

    let unassigned = Bitset::from_set(assigned.clone()).negated();
    classes.insert("Cn".into(), unassigned.clone());
    classes.insert("UNASSIGNED".into(), unassigned);
    classes.insert("ASSIGNED".into(), Bitset::from_set(assigned));

    for (group, members) in CATEGORY_GROUPS {
        let mut union = Bitset::new();
        for member in members.iter() {
            if let Some(set) = classes.get(*member) {
                union.add(set);
            }
        }
        classes.insert((*group).to_string(), union);
    }
}

fn register_blocks(classes: &mut FxHashMap<String, Bitset>) {
    for entry in BLOCK_DATA.split(';') {
        match parse_block(entry) {
            Some((lo, hi, name)) => {
                let bits = classes.entry(name.to_string()).or_default();
                bits.members_mut().insert_range(lo, hi);
            }
            None => tracing::warn!(entry, "skipping malformed block entry"),
        }
    }
    classes.insert("ALL".into(), Bitset::from_ranges(&[(0, 0xFFFF)]));
}

fn parse_block(entry: &str) -> Option<(u32, u32, &str)> {
    let (range, name) = entry.split_once(':')?;
    let (lo, hi) = range.split_once("..")?;
    let lo = u32::from_str_radix(lo, 16).ok()?;
    let hi = u32::from_str_radix(hi, 16).ok()?;
    (lo <= hi).then_some((lo, hi, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_classes() {
        let r = ClassRegistry::shared();
        let alnum = r.get("Alnum").unwrap();
        assert!(alnum.contains('q') && alnum.contains('Q') && alnum.contains('7'));
        assert!(!alnum.contains('_'));
        assert!(r.get("Punct").unwrap().contains('~'));
        assert!(r.get("XDigit").unwrap().contains('F'));
        assert!(!r.get("XDigit").unwrap().contains('g'));
        assert!(r.get("Cntrl").unwrap().contains('\u{7f}'));
    }

    #[test]
    fn test_categories() {
        let r = ClassRegistry::shared();
        assert!(r.get("Lu").unwrap().contains('A'));
        assert!(!r.get("Lu").unwrap().contains('a'));
        assert!(r.get("Ll").unwrap().contains('a'));
        assert!(r.get("L").unwrap().contains('a'));
        assert!(r.get("Nd").unwrap().contains('\u{0660}'));
        assert!(r.get("Zl").unwrap().contains('\u{2028}'));
        assert!(r.get("Z").unwrap().contains(' '));
        assert!(r.get("C").unwrap().contains('\u{0}'));
    }

    #[test]
    fn test_assigned_complements_unassigned() {
        let r = ClassRegistry::shared();
        let assigned = r.get("ASSIGNED").unwrap();
        let unassigned = r.get("UNASSIGNED").unwrap();
        for c in ['a', '\u{378}', '0', '\u{E0080}'] {
            assert_ne!(assigned.contains(c), unassigned.contains(c), "{:?}", c);
        }
        assert!(assigned.contains('a'));
    }

    #[test]
    fn test_blocks() {
        let r = ClassRegistry::shared();
        assert!(r.get("InBasicLatin").unwrap().contains('z'));
        assert!(r.get("InGreek").unwrap().contains('\u{3b1}'));
        assert!(r.get("InHiragana").unwrap().contains('\u{3042}'));
        let specials = r.get("InSpecials").unwrap();
        assert!(specials.contains('\u{FEFF}'));
        assert!(specials.contains('\u{FFFD}'));
        assert!(r.get("ALL").unwrap().contains('\u{FFFF}'));
        assert!(r.get("InKlingon").is_none());
    }

    #[test]
    fn test_predefined() {
        let r = ClassRegistry::shared();
        let d = r.predefined('d', false).unwrap();
        assert!(d.contains('5'));
        assert!(!d.contains('\u{0665}'));
        assert!(r.predefined('d', true).unwrap().contains('\u{0665}'));
        let not_w = r.predefined('W', false).unwrap();
        assert!(not_w.contains('-'));
        assert!(!not_w.contains('_'));
        assert!(r.predefined('s', false).unwrap().contains('\u{b}'));
        assert!(r.predefined('q', false).is_none());
    }

    #[test]
    fn test_names_sorted() {
        let names = ClassRegistry::shared().names();
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
        assert!(names.contains(&"InArrows"));
    }
}
