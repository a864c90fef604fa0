//! The queue of units waiting to be expanded.
//!
//! Expanding a unit can pull in others: the units it imports, and the
//! units its references lead to. Those are queued and expanded in the same
//! pass. If the pass fails, every unit still queued is dequeued and freed,
//! so no half-expanded state survives.

use core::ops::{Deref, DerefMut};

use crate::complaint::complain;
use crate::constants;
use crate::read::{DieReference, Reader, Result};
use crate::units::{DwarfContext, ReadMode, UnitId};

/// A unit waiting to be expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueItem {
    /// The unit.
    pub unit: UnitId,
    /// The language to assume if the unit does not name one.
    pub pretend_language: constants::DwLang,
}

/// Builds whatever the caller keeps for an expanded unit.
pub trait UnitProcessor<R: Reader> {
    /// Expand one unit. The unit is loaded in full, and stays loaded until
    /// this returns. Units queued from here are expanded in the same pass.
    fn process_unit(&mut self, ctx: &mut DwarfContext<'_, R>, item: QueueItem) -> Result<()>;
}

/// A processor that only records which units were expanded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExpandedUnits {
    /// The expanded units, in order.
    pub units: Vec<UnitId>,
}

impl<R: Reader> UnitProcessor<R> for ExpandedUnits {
    fn process_unit(&mut self, _ctx: &mut DwarfContext<'_, R>, item: QueueItem) -> Result<()> {
        self.units.push(item.unit);
        Ok(())
    }
}

/// Empties the queue when dropped, freeing the state of every unit that
/// was still waiting.
struct QueueGuard<'a, 'l, R: Reader> {
    ctx: &'a mut DwarfContext<'l, R>,
}

impl<'a, 'l, R: Reader> Deref for QueueGuard<'a, 'l, R> {
    type Target = DwarfContext<'l, R>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<'a, 'l, R: Reader> DerefMut for QueueGuard<'a, 'l, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl<'a, 'l, R: Reader> Drop for QueueGuard<'a, 'l, R> {
    fn drop(&mut self) {
        if self.ctx.queue.is_empty() {
            return;
        }
        tracing::debug!(
            remaining = self.ctx.queue.len(),
            "discarding unexpanded units"
        );
        while let Some(item) = self.ctx.queue.pop_front() {
            let expanded = match self.ctx.units.get_mut(item.unit.0) {
                Some(unit) => {
                    unit.queued = false;
                    unit.expanded
                }
                None => continue,
            };
            if !expanded {
                self.ctx.free_unit(item.unit);
            }
        }
    }
}

impl<'l, R: Reader> DwarfContext<'l, R> {
    /// Put a unit on the queue.
    pub fn queue_comp_unit(&mut self, id: UnitId, pretend_language: constants::DwLang) {
        if let Some(unit) = self.units.get_mut(id.0) {
            unit.queued = true;
            self.queue.push_back(QueueItem {
                unit: id,
                pretend_language,
            });
        }
    }

    /// Record that `dependent` refers into `id`, and queue `id` unless it
    /// is queued or loaded already.
    ///
    /// Returns true if the unit was queued and must be loaded by the
    /// caller. A unit that is already loaded is only marked as recently
    /// used.
    pub fn maybe_queue_comp_unit(
        &mut self,
        dependent: Option<UnitId>,
        id: UnitId,
        pretend_language: constants::DwLang,
    ) -> Result<bool> {
        self.unit(id)?;
        if let Some(dependent) = dependent.filter(|&dependent| dependent != id) {
            if let Some(state) = self.states.get_mut(&dependent) {
                state.dependencies.insert(id);
            }
        }
        if self.units[id.0].queued {
            return Ok(false);
        }
        if let Some(state) = self.states.get_mut(&id) {
            state.last_used = 0;
            return Ok(false);
        }
        if self.is_dummy_unit(id) {
            return Ok(false);
        }
        self.queue_comp_unit(id, pretend_language);
        Ok(true)
    }

    /// Mark a loaded unit as recently used.
    pub fn touch(&mut self, id: UnitId) {
        if let Some(state) = self.states.get_mut(&id) {
            state.last_used = 0;
        }
    }

    /// Expand every queued unit, then age the cache.
    ///
    /// If expansion fails, the units still queued are dequeued and their
    /// states freed before the error is returned.
    pub fn process_queue(&mut self, processor: &mut dyn UnitProcessor<R>) -> Result<()> {
        {
            let mut guard = QueueGuard { ctx: self };
            guard.run_queue(processor)?;
        }
        self.age_comp_units();
        Ok(())
    }

    /// Expand a unit and everything it pulls in, then age the cache.
    pub fn expand_unit(&mut self, id: UnitId, processor: &mut dyn UnitProcessor<R>) -> Result<()> {
        if self.unit(id)?.expanded {
            return Ok(());
        }
        if self.is_dummy_unit(id) {
            tracing::debug!(unit = id.0, "not expanding unit with no dies");
            return Ok(());
        }
        {
            let mut guard = QueueGuard { ctx: self };
            if !guard.units[id.0].queued {
                guard.queue_comp_unit(id, constants::DwLang(0));
            }
            if guard.load_unit(id, ReadMode::Full)? && guard.stays_in_dwo(id) {
                guard.queue_and_load_dwo_type_units(id)?;
            }
            guard.run_queue(processor)?;
        }
        self.age_comp_units();
        Ok(())
    }

    fn run_queue(&mut self, processor: &mut dyn UnitProcessor<R>) -> Result<()> {
        if !self.queue.is_empty() {
            tracing::debug!(queued = self.queue.len(), "expanding queued units");
        }
        while let Some(item) = self.queue.front().copied() {
            if !self.units[item.unit.0].expanded {
                if self.load_unit(item.unit, ReadMode::Full)? {
                    self.queue_imported_units(item.unit)?;
                    processor.process_unit(self, item)?;
                }
                self.units[item.unit.0].expanded = true;
            }
            self.units[item.unit.0].queued = false;
            self.queue.pop_front();
        }
        Ok(())
    }

    /// Queue and load the units named by the `DW_TAG_imported_unit`
    /// children of a loaded unit's top die.
    fn queue_imported_units(&mut self, id: UnitId) -> Result<()> {
        let (imports, language) = match self.states.get(&id) {
            Some(state) => {
                let mut imports = Vec::new();
                if let Some(dies) = state.dies.as_ref() {
                    if let Some(root) = dies.root() {
                        for (_, die) in dies.children(root) {
                            if die.tag() != constants::DW_TAG_imported_unit {
                                continue;
                            }
                            if let Some(target) = die
                                .attr_value(constants::DW_AT_import)
                                .and_then(DieReference::from_value)
                            {
                                imports.push((die.offset(), target));
                            }
                        }
                    }
                }
                (imports, state.language)
            }
            None => return Ok(()),
        };
        for (from, target) in imports {
            let target = match target {
                DieReference::Section { offset, alt } => self.find_containing_unit(offset, alt).ok(),
                _ => None,
            };
            match target {
                Some(target) => {
                    if self.maybe_queue_comp_unit(Some(id), target, language)? {
                        self.load_unit(target, ReadMode::Full)?;
                    }
                }
                None => complain!(
                    self.complaints,
                    DanglingReference,
                    "DW_TAG_imported_unit at 0x{:x} does not name a unit",
                    from.0
                ),
            }
        }
        Ok(())
    }
}
