use crate::memory::{LocationLattice, LocationSet, LocationSize, MemoryLocation, PointerId};
use rustc_hash::FxHashMap;

/// Maps described variables to base pointers and back.
///
/// A location covering a whole variable prints as its name (`x`). Anything narrower prints
/// with a byte range (`x[0..2]`), and an open-ended range drops its end (`x[4..]`).
#[derive(Debug, Clone, Default)]
pub struct LocationNames {
    by_name: FxHashMap<String, PointerId>,

    // Indexed by base pointer id minus one
    variables: Vec<(String, Option<u64>)>,
}

impl LocationNames {
    pub fn declare(&mut self, name: &str, size: Option<u64>) -> PointerId {
        let base = PointerId(self.variables.len() as u32 + 1);
        self.variables.push((name.to_owned(), size));
        self.by_name.insert(name.to_owned(), base);
        base
    }

    pub fn base_of(&self, name: &str) -> Option<PointerId> {
        self.by_name.get(name).copied()
    }

    fn variable(&self, base: PointerId) -> Option<&(String, Option<u64>)> {
        (base.0 as usize).checked_sub(1).and_then(|index| self.variables.get(index))
    }

    pub fn name_of(&self, base: PointerId) -> Option<&str> {
        self.variable(base).map(|(name, _)| name.as_str())
    }

    pub fn size_of(&self, base: PointerId) -> Option<u64> {
        self.variable(base).and_then(|(_, size)| *size)
    }

    pub fn whole(&self, name: &str) -> Option<MemoryLocation> {
        let base = self.base_of(name)?;
        Some(match self.size_of(base) {
            Some(size) => MemoryLocation::new(base, 0, size),
            None => MemoryLocation::unknown_size(base, 0),
        })
    }

    pub fn name(&self, location: &MemoryLocation) -> String {
        let Some((name, size)) = self.variable(location.base) else {
            return location.to_string();
        };

        let whole = location.offset == 0
            && match (location.size, size) {
                (LocationSize::Precise(accessed), Some(declared)) => accessed == *declared,
                (LocationSize::Unknown, None) => true,
                _ => false,
            };

        if whole {
            return name.clone();
        }

        match location.end() {
            Some(end) => format!("{}[{}..{}]", name, location.offset, end),
            None => format!("{}[{}..]", name, location.offset),
        }
    }

    /// Sorted names of every location in `set`.
    pub fn names(&self, set: &LocationSet) -> Vec<String> {
        let mut names = set.iter().map(|location| self.name(location)).collect::<Vec<_>>();
        names.sort();
        names
    }

    /// `None` stands for every location.
    pub fn lattice_names(&self, lattice: &LocationLattice) -> Option<Vec<String>> {
        lattice.known_locations().map(|set| self.names(set))
    }

    /// Parses `x`, `x[a..b]` or `x[a..]`.
    pub fn parse(&self, text: &str) -> Option<MemoryLocation> {
        let text = text.trim();
        let Some((name, range)) = text.split_once('[') else {
            return self.whole(text);
        };

        let base = self.base_of(name.trim())?;
        let (start, end) = range.strip_suffix(']')?.split_once("..")?;
        let start = start.trim().parse::<i64>().ok()?;

        if end.trim().is_empty() {
            return Some(MemoryLocation::unknown_size(base, start));
        }

        let end = end.trim().parse::<i64>().ok()?;
        if end < start {
            return None;
        }

        Some(MemoryLocation::new(base, start, (end - start) as u64))
    }
}
