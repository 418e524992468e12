//! Code point sets.
//!
//! - `CharSet`: a plain set of code points stored as a page table of 256-bit
//!   blocks indexed by `code_point >> 8`. Pages are allocated lazily.
//! - `Bitset`: a `CharSet` plus a sign, so complements stay cheap. Used while
//!   parsing classes and for the registry.
//! - `CharClass`: the frozen form stored in terms. Classes that only touch
//!   code points below 256 keep a single inline block.

use std::fmt;

/// Largest Unicode scalar value.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Number of code points a fully negated empty set accepts.
const UNIVERSE: u32 = MAX_CODE_POINT + 1;

pub(crate) type Block = [u64; 4];

const EMPTY_BLOCK: Block = [0; 4];
const FULL_BLOCK: Block = [u64::MAX; 4];

#[inline]
fn block_has(block: &Block, low: u32) -> bool {
    block[(low >> 6) as usize] & (1u64 << (low & 63)) != 0
}

#[inline]
fn block_set(block: &mut Block, low: u32) {
    block[(low >> 6) as usize] |= 1u64 << (low & 63);
}

#[inline]
fn block_count(block: &Block) -> u32 {
    block.iter().map(|w| w.count_ones()).sum()
}

/// A set of code points.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CharSet {
    pages: Vec<Option<Box<Block>>>,
}

impl CharSet {
    pub fn new() -> Self {
        CharSet { pages: Vec::new() }
    }

    /// Build a set from inclusive `(lo, hi)` ranges.
    pub fn from_ranges(ranges: &[(u32, u32)]) -> Self {
        let mut set = CharSet::new();
        for &(lo, hi) in ranges {
            set.insert_range(lo, hi);
        }
        set
    }

    fn page_mut(&mut self, page: usize) -> &mut Block {
        if self.pages.len() <= page {
            self.pages.resize(page + 1, None);
        }
        self.pages[page].get_or_insert_with(|| Box::new(EMPTY_BLOCK))
    }

    #[inline]
    fn page(&self, page: usize) -> Option<&Block> {
        self.pages.get(page).and_then(|p| p.as_deref())
    }

    pub fn insert(&mut self, c: u32) {
        if c > MAX_CODE_POINT {
            return;
        }
        block_set(self.page_mut((c >> 8) as usize), c & 0xFF);
    }

    /// Insert every code point in `lo..=hi`.
    pub fn insert_range(&mut self, lo: u32, hi: u32) {
        let hi = hi.min(MAX_CODE_POINT);
        let mut c = lo;
        while c <= hi {
            let page = (c >> 8) as usize;
            let page_end = c | 0xFF;
            let stop = hi.min(page_end);
            let block = self.page_mut(page);
            if c & 0xFF == 0 && stop == page_end {
                *block = FULL_BLOCK;
            } else {
                for x in c..=stop {
                    block_set(block, x & 0xFF);
                }
            }
            if stop == MAX_CODE_POINT {
                break;
            }
            c = stop + 1;
        }
    }

    /// Insert `c` together with its simple lower and upper case forms.
    pub fn insert_folded(&mut self, c: char) {
        self.insert(c as u32);
        self.insert(super::simple_lower(c) as u32);
        self.insert(super::simple_upper(c) as u32);
    }

    pub fn insert_range_folded(&mut self, lo: char, hi: char) {
        self.insert_range(lo as u32, hi as u32);
        for c in (lo..=hi).filter(|c| c.is_alphabetic()) {
            self.insert_folded(c);
        }
    }

    #[inline]
    pub fn contains(&self, c: u32) -> bool {
        match self.page((c >> 8) as usize) {
            Some(block) => block_has(block, c & 0xFF),
            None => false,
        }
    }

    pub fn union_with(&mut self, other: &CharSet) {
        for (page, block) in other.blocks() {
            let mine = self.page_mut(page);
            for (a, b) in mine.iter_mut().zip(block.iter()) {
                *a |= *b;
            }
        }
    }

    pub fn intersect_with(&mut self, other: &CharSet) {
        for (page, slot) in self.pages.iter_mut().enumerate() {
            if let Some(mine) = slot {
                match other.page(page) {
                    Some(block) => {
                        for (a, b) in mine.iter_mut().zip(block.iter()) {
                            *a &= *b;
                        }
                    }
                    None => *slot = None,
                }
            }
        }
        self.trim();
    }

    pub fn difference_with(&mut self, other: &CharSet) {
        for (page, block) in other.blocks() {
            if let Some(Some(mine)) = self.pages.get_mut(page) {
                for (a, b) in mine.iter_mut().zip(block.iter()) {
                    *a &= !*b;
                }
            }
        }
        self.trim();
    }

    /// Drop empty pages so "fits in one block" checks stay exact.
    fn trim(&mut self) {
        for slot in self.pages.iter_mut() {
            if matches!(slot, Some(block) if **block == EMPTY_BLOCK) {
                *slot = None;
            }
        }
        while matches!(self.pages.last(), Some(None)) {
            self.pages.pop();
        }
    }

    fn blocks(&self) -> impl Iterator<Item = (usize, &Block)> + '_ {
        self.pages
            .iter()
            .enumerate()
            .filter_map(|(page, slot)| slot.as_deref().map(|block| (page, block)))
    }

    /// Number of code points in the set.
    pub fn len(&self) -> u32 {
        self.blocks().map(|(_, block)| block_count(block)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks().all(|(_, block)| *block == EMPTY_BLOCK)
    }

    /// True when every member is below 256.
    pub fn is_latin1(&self) -> bool {
        self.blocks().all(|(page, _)| page == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.blocks().flat_map(|(page, block)| {
            (0u32..256)
                .filter(move |&low| block_has(block, low))
                .map(move |low| ((page as u32) << 8) | low)
        })
    }

    /// Members as sorted inclusive ranges.
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        let mut out: Vec<(u32, u32)> = Vec::new();
        for c in self.iter() {
            match out.last_mut() {
                Some((_, hi)) if *hi + 1 == c => *hi = c,
                _ => out.push((c, c)),
            }
        }
        out
    }
}

impl fmt::Debug for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges = self.ranges();
        write!(f, "[")?;
        for (n, (lo, hi)) in ranges.iter().take(8).enumerate() {
            if n > 0 {
                write!(f, " ")?;
            }
            if lo == hi {
                write!(f, "{:04X}", lo)?;
            } else {
                write!(f, "{:04X}-{:04X}", lo, hi)?;
            }
        }
        if ranges.len() > 8 {
            write!(f, " ...")?;
        }
        write!(f, "]")
    }
}

/// A code point set with a sign: when `positive` is false the set denotes
/// the complement of `set`.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitset {
    set: CharSet,
    positive: bool,
}

impl Default for Bitset {
    fn default() -> Self {
        Bitset::new()
    }
}

impl Bitset {
    pub fn new() -> Self {
        Bitset {
            set: CharSet::new(),
            positive: true,
        }
    }

    pub fn from_set(set: CharSet) -> Self {
        Bitset {
            set,
            positive: true,
        }
    }

    pub fn from_ranges(ranges: &[(u32, u32)]) -> Self {
        Bitset::from_set(CharSet::from_ranges(ranges))
    }

    pub fn is_positive(&self) -> bool {
        self.positive
    }

    /// Mutable access to the underlying members. Only meaningful on a positive set.
    pub fn members_mut(&mut self) -> &mut CharSet {
        &mut self.set
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.set.contains(c as u32) == self.positive
    }

    pub fn complement(&mut self) {
        self.positive = !self.positive;
    }

    pub fn negated(mut self) -> Bitset {
        self.complement();
        self
    }

    /// `self = self ∪ other`
    pub fn add(&mut self, other: &Bitset) {
        match (self.positive, other.positive) {
            (true, true) => self.set.union_with(&other.set),
            (true, false) => {
                let mut rest = other.set.clone();
                rest.difference_with(&self.set);
                self.set = rest;
                self.positive = false;
            }
            (false, true) => self.set.difference_with(&other.set),
            (false, false) => self.set.intersect_with(&other.set),
        }
    }

    /// `self = self ∩ other`
    pub fn intersect(&mut self, other: &Bitset) {
        match (self.positive, other.positive) {
            (true, true) => self.set.intersect_with(&other.set),
            (true, false) => self.set.difference_with(&other.set),
            (false, true) => {
                let mut rest = other.set.clone();
                rest.difference_with(&self.set);
                self.set = rest;
                self.positive = true;
            }
            (false, false) => self.set.union_with(&other.set),
        }
    }

    /// `self = self \ other`
    pub fn subtract(&mut self, other: &Bitset) {
        let inverse = other.clone().negated();
        self.intersect(&inverse);
    }

    /// Number of code points accepted.
    pub fn weight(&self) -> u32 {
        let n = self.set.len();
        if self.positive {
            n
        } else {
            UNIVERSE.saturating_sub(n)
        }
    }

    /// The only member, if the set accepts exactly one code point.
    pub fn single(&self) -> Option<char> {
        if !self.positive || self.set.len() != 1 {
            return None;
        }
        self.set.iter().next().and_then(char::from_u32)
    }

    /// Freeze into the form stored in terms.
    pub fn into_class(self) -> CharClass {
        let weight = self.weight();
        let inverse = !self.positive;
        let bits = if self.set.is_latin1() {
            ClassBits::Latin1(self.set.page(0).copied().unwrap_or(EMPTY_BLOCK))
        } else {
            ClassBits::Paged(self.set.pages.into_boxed_slice())
        };
        CharClass {
            bits,
            inverse,
            weight,
        }
    }
}

impl fmt::Debug for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.positive {
            write!(f, "^")?;
        }
        write!(f, "{:?}", self.set)
    }
}

#[derive(Clone)]
enum ClassBits {
    Latin1(Block),
    Paged(Box<[Option<Box<Block>>]>),
}

/// A frozen character class: `matches(c) == contains(c) ^ inverse`.
#[derive(Clone)]
pub struct CharClass {
    bits: ClassBits,
    inverse: bool,
    weight: u32,
}

impl CharClass {
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        let c = c as u32;
        let hit = match &self.bits {
            ClassBits::Latin1(block) => c < 256 && block_has(block, c),
            ClassBits::Paged(pages) => match pages.get((c >> 8) as usize) {
                Some(Some(block)) => block_has(block, c & 0xFF),
                _ => false,
            },
        };
        hit != self.inverse
    }

    /// Selectivity hint: how many code points the class accepts.
    #[inline]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn is_inverse(&self) -> bool {
        self.inverse
    }

    pub fn is_latin1(&self) -> bool {
        matches!(self.bits, ClassBits::Latin1(_))
    }
}

impl fmt::Debug for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = CharSet::new();
        match &self.bits {
            ClassBits::Latin1(block) => {
                if *block != EMPTY_BLOCK {
                    *set.page_mut(0) = *block;
                }
            }
            ClassBits::Paged(pages) => set.pages = pages.to_vec(),
        }
        if self.inverse {
            write!(f, "^")?;
        }
        write!(f, "{:?}/{}", set, self.weight)
    }
}
