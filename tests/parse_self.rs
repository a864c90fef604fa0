//! Read the debug info of this test binary.

use dwarf_dies::loader::{ObjectSections, ObjectSession, SessionArenas};
use dwarf_dies::units::{DwarfContext, ExpandedUnits, ReadMode};
use dwarf_dies::{EndianSlice, Options, RunTimeEndian};
use std::env;

fn open_self<'a>(
    session: &ObjectSession<'a>,
) -> Option<ObjectSections<EndianSlice<'a, RunTimeEndian>>> {
    let path = env::current_exe().unwrap();
    session.open_file(&path).unwrap()
}

#[test]
fn test_parse_self_units() {
    let arenas = SessionArenas::new();
    let session = ObjectSession::new(&arenas);
    let sections = match open_self(&session) {
        Some(sections) => sections,
        None => return,
    };
    let mut ctx = DwarfContext::open(&session, &sections, Options::default()).unwrap();
    let units: Vec<_> = ctx.comp_units().collect();
    for id in units {
        if ctx.load_unit(id, ReadMode::Partial).unwrap() {
            assert!(ctx.state(id).unwrap().partial_dies().is_some());
        }
        ctx.age_comp_units();
    }
}

#[test]
fn test_parse_self_psymtabs() {
    let arenas = SessionArenas::new();
    let session = ObjectSession::new(&arenas);
    let sections = match open_self(&session) {
        Some(sections) => sections,
        None => return,
    };
    let options = Options::default().max_cache_age(0);
    let mut ctx = DwarfContext::open(&session, &sections, options).unwrap();
    ctx.build_all_psymtabs().unwrap();
    assert_eq!(ctx.psymtabs().count(), ctx.unit_count());
    assert!(ctx.loaded_units().is_empty());
}

#[test]
fn test_parse_self_expand_all() {
    let arenas = SessionArenas::new();
    let session = ObjectSession::new(&arenas);
    let sections = match open_self(&session) {
        Some(sections) => sections,
        None => return,
    };
    let mut ctx = DwarfContext::open(&session, &sections, Options::default()).unwrap();
    let units: Vec<_> = ctx.comp_units().collect();
    let mut expanded = ExpandedUnits::default();
    for &id in &units {
        ctx.expand_unit(id, &mut expanded).unwrap();
    }
    assert!(expanded.units.len() <= units.len());
    assert!(units.iter().all(|&id| ctx.unit(id).unwrap().is_expanded()));
}
