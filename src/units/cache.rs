//! Aging of loaded units.
//!
//! Every sweep makes each loaded unit one step older. Units used within
//! the last [`Options::max_cache_age`](crate::Options::max_cache_age)
//! sweeps are kept, together with every unit they depend on, directly or
//! not. The rest are freed. An age limit of 0 frees everything not in use
//! at the next sweep.

use crate::read::Reader;
use crate::units::{DwarfContext, UnitId};

impl<'l, R: Reader> DwarfContext<'l, R> {
    /// Age the loaded units and free the ones not used recently.
    pub fn age_comp_units(&mut self) {
        let max_age = self.options.max_cache_age;
        for state in self.states.values_mut() {
            state.mark = false;
        }
        let mut recent = Vec::new();
        for id in &self.read_in {
            if let Some(state) = self.states.get_mut(id) {
                state.last_used += 1;
                if state.last_used <= max_age {
                    recent.push(*id);
                }
            }
        }
        for id in recent {
            self.mark_unit(id);
        }

        let stale: Vec<UnitId> = self
            .read_in
            .iter()
            .copied()
            .filter(|id| self.states.get(id).map_or(true, |state| !state.mark))
            .collect();
        for id in &stale {
            self.free_unit(*id);
        }
        for state in self.states.values_mut() {
            state.mark = false;
        }
        if !stale.is_empty() {
            tracing::debug!(
                freed = stale.len(),
                kept = self.read_in.len(),
                "aged unit cache"
            );
        }
    }

    /// Mark a unit and everything it depends on.
    fn mark_unit(&mut self, id: UnitId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let state = match self.states.get_mut(&id) {
                Some(state) => state,
                None => continue,
            };
            if state.mark {
                continue;
            }
            state.mark = true;
            stack.extend(state.dependencies.iter().copied());
        }
    }

    /// Free one unit's state. Returns whether it was loaded.
    pub fn free_unit(&mut self, id: UnitId) -> bool {
        let freed = self.states.remove(&id).is_some();
        if freed {
            self.read_in.retain(|&loaded| loaded != id);
            tracing::trace!(unit = id.0, "freed unit");
        }
        freed
    }

    /// Free every unit's state.
    pub fn free_cached_comp_units(&mut self) {
        self.states.clear();
        self.read_in.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::constants;
    use crate::options::Options;
    use crate::units::context::tests::{abbrevs, dwarf, simple_cu};
    use crate::units::{DwarfContext, ReadMode, UnitId};

    #[test]
    fn test_dependencies_keep_units_alive() {
        let abbrev = abbrevs();
        let info = [simple_cu("a.c", "main"), simple_cu("b.c", "f")].concat();
        let options = Options::default().max_cache_age(2);
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), options).unwrap();
        let (a, b) = (UnitId(0), UnitId(1));
        ctx.load_unit(a, ReadMode::Full).unwrap();
        ctx.load_unit(b, ReadMode::Full).unwrap();
        ctx.maybe_queue_comp_unit(Some(a), b, constants::DW_LANG_C99)
            .unwrap();

        // Keep A in use; B ages past the limit but A needs it.
        for _ in 0..5 {
            ctx.touch(a);
            ctx.age_comp_units();
        }
        assert!(ctx.is_loaded(a));
        assert!(ctx.is_loaded(b));
        assert!(ctx.state(b).unwrap().last_used() > 2);

        // Once A ages out, B goes too.
        for _ in 0..3 {
            ctx.age_comp_units();
        }
        assert!(!ctx.is_loaded(a));
        ctx.age_comp_units();
        assert!(!ctx.is_loaded(b));
        assert!(ctx.loaded_units().is_empty());
    }

    #[test]
    fn test_zero_age_disables_caching() {
        let abbrev = abbrevs();
        let info = simple_cu("a.c", "main");
        let options = Options::default().max_cache_age(0);
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), options).unwrap();
        ctx.load_unit(UnitId(0), ReadMode::Full).unwrap();
        ctx.age_comp_units();
        assert!(!ctx.is_loaded(UnitId(0)));
    }

    #[test]
    fn test_recently_used_survive() {
        let abbrev = abbrevs();
        let info = simple_cu("a.c", "main");
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();
        ctx.load_unit(UnitId(0), ReadMode::Full).unwrap();
        for _ in 0..5 {
            ctx.age_comp_units();
        }
        assert!(ctx.is_loaded(UnitId(0)));
        ctx.age_comp_units();
        assert!(!ctx.is_loaded(UnitId(0)));
        assert!(!ctx.free_unit(UnitId(0)));
    }
}
