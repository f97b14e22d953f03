//! Character categories driving unknown-word synthesis.
use rkyv::{Archive, Deserialize, Serialize};

/// Number of categories representable in a `cate_idset` bitmask.
pub const MAX_CATEGORIES: usize = 32;

const CATE_IDSET_BITS: u32 = 32;
const BASE_ID_BITS: u32 = 8;
const INVOKE_BIT: u32 = CATE_IDSET_BITS + BASE_ID_BITS;
const GROUP_BIT: u32 = INVOKE_BIT + 1;
const LENGTH_SHIFT: u32 = GROUP_BIT + 1;

/// Bit-packed per-character classification.
///
/// Layout (low to high bit): `cate_idset` (32 bits, one bit per category the
/// character belongs to), `base_id` (8 bits, the "primary" category used to
/// pick an unknown-word policy), `invoke` (1 bit), `group` (1 bit), `length`
/// (remaining bits, 0 meaning unbounded).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default, Archive, Serialize, Deserialize)]
pub struct CharInfo(u64);

impl CharInfo {
    pub const fn new(cate_idset: u32, base_id: u8, invoke: bool, group: bool, length: u32) -> Self {
        let mut x = cate_idset as u64;
        x |= (base_id as u64) << CATE_IDSET_BITS;
        x |= (invoke as u64) << INVOKE_BIT;
        x |= (group as u64) << GROUP_BIT;
        x |= (length as u64) << LENGTH_SHIFT;
        Self(x)
    }

    #[inline(always)]
    pub const fn cate_idset(&self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    #[inline(always)]
    pub const fn base_id(&self) -> u8 {
        ((self.0 >> CATE_IDSET_BITS) & 0xFF) as u8
    }

    #[inline(always)]
    pub const fn invoke(&self) -> bool {
        ((self.0 >> INVOKE_BIT) & 1) != 0
    }

    #[inline(always)]
    pub const fn group(&self) -> bool {
        ((self.0 >> GROUP_BIT) & 1) != 0
    }

    #[inline(always)]
    pub const fn length(&self) -> u32 {
        (self.0 >> LENGTH_SHIFT) as u32
    }
}

impl ArchivedCharInfo {
    #[inline(always)]
    pub fn to_native(&self) -> CharInfo {
        CharInfo(self.0.to_native())
    }
}

/// Policy attached to a single category (by category id).
#[derive(Debug, Clone, Copy, Default, Archive, Serialize, Deserialize)]
pub struct CategoryPolicy {
    pub invoke: bool,
    pub group: bool,
    pub length: u32,
}

/// One contiguous code-point range mapped to a category.
#[derive(Debug, Clone, Copy, Archive, Serialize, Deserialize)]
pub struct CodeRange {
    pub lo: u32,
    pub hi: u32,
    pub cate_id: u8,
}

/// Table of character categories and their unknown-word policies.
#[derive(Archive, Serialize, Deserialize, Default)]
pub struct CharProperty {
    categories: Vec<String>,
    policies: Vec<CategoryPolicy>,
    ranges: Vec<CodeRange>,
    default_info: CharInfo,
}

impl CharProperty {
    pub fn new(
        categories: Vec<String>,
        policies: Vec<CategoryPolicy>,
        ranges: Vec<CodeRange>,
    ) -> Self {
        let default_cate_id = categories
            .iter()
            .position(|c| c == "DEFAULT")
            .unwrap_or(0) as u8;
        let default_policy = policies.get(default_cate_id as usize).copied().unwrap_or_default();
        let default_info = CharInfo::new(
            1 << default_cate_id,
            default_cate_id,
            default_policy.invoke,
            default_policy.group,
            default_policy.length,
        );
        Self {
            categories,
            policies,
            ranges,
            default_info,
        }
    }

    /// Looks up a category's id by name (used for MeCab's `SPACE` handling).
    pub fn cate_id(&self, name: &str) -> Option<u32> {
        self.categories.iter().position(|c| c == name).map(|i| i as u32)
    }

    /// Classifies a single character, combining every matching range's bit
    /// into `cate_idset` and using the first match as the `base_id` whose
    /// policy (invoke/group/length) governs unknown-word synthesis. Falls
    /// back to the `DEFAULT` category when nothing matches.
    pub fn char_info(&self, c: char) -> CharInfo {
        let cp = c as u32;
        let mut idset: u32 = 0;
        let mut base_id: Option<u8> = None;
        for r in &self.ranges {
            if r.lo <= cp && cp <= r.hi {
                idset |= 1 << r.cate_id;
                if base_id.is_none() {
                    base_id = Some(r.cate_id);
                }
            }
        }
        match base_id {
            Some(id) => {
                let policy = self.policies.get(id as usize).copied().unwrap_or_default();
                CharInfo::new(idset, id, policy.invoke, policy.group, policy.length)
            }
            None => self.default_info,
        }
    }

    pub fn default_info(&self) -> CharInfo {
        self.default_info
    }

    /// Number of distinct categories (the bound for a valid `cate_id`).
    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }
}

impl ArchivedCharProperty {
    pub fn cate_id(&self, name: &str) -> Option<u32> {
        self.categories.iter().position(|c| c.as_str() == name).map(|i| i as u32)
    }

    pub fn char_info(&self, c: char) -> CharInfo {
        let cp = c as u32;
        let mut idset: u32 = 0;
        let mut base_id: Option<u8> = None;
        for r in self.ranges.iter() {
            if r.lo.to_native() <= cp && cp <= r.hi.to_native() {
                let cate_id = r.cate_id;
                idset |= 1 << cate_id;
                if base_id.is_none() {
                    base_id = Some(cate_id);
                }
            }
        }
        match base_id {
            Some(id) => {
                let policy = &self.policies[id as usize];
                CharInfo::new(idset, id, policy.invoke, policy.group, policy.length.to_native())
            }
            None => self.default_info.to_native(),
        }
    }

    pub fn default_info(&self) -> CharInfo {
        self.default_info.to_native()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_with_no_ranges() {
        let prop = CharProperty::new(
            vec!["DEFAULT".to_string()],
            vec![CategoryPolicy { invoke: false, group: true, length: 0 }],
            vec![],
        );
        let info = prop.char_info('#');
        assert_eq!(info.base_id(), 0);
        assert!(!info.invoke());
        assert!(info.group());
    }

    #[test]
    fn range_overrides_default() {
        let prop = CharProperty::new(
            vec!["DEFAULT".to_string(), "KANJI".to_string()],
            vec![
                CategoryPolicy { invoke: false, group: true, length: 0 },
                CategoryPolicy { invoke: true, group: false, length: 2 },
            ],
            vec![CodeRange { lo: 0x4E00, hi: 0x9FFF, cate_id: 1 }],
        );
        let info = prop.char_info('京');
        assert_eq!(info.base_id(), 1);
        assert!(info.invoke());
        assert_eq!(info.length(), 2);

        let info = prop.char_info('a');
        assert_eq!(info.base_id(), 0);
    }

    #[test]
    fn cate_id_lookup() {
        let prop = CharProperty::new(
            vec!["DEFAULT".to_string(), "SPACE".to_string()],
            vec![CategoryPolicy::default(), CategoryPolicy::default()],
            vec![CodeRange { lo: 0x20, hi: 0x20, cate_id: 1 }],
        );
        assert_eq!(prop.cate_id("SPACE"), Some(1));
        assert_eq!(prop.cate_id("MISSING"), None);
    }
}
