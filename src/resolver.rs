//! Table selection.
//!
//! Selection walks a fixed list of rules, highest priority first. The first
//! rule whose selector is active decides the table; later rules are never
//! consulted, even when the decided table is missing from the catalog.

use crate::config::PanelFamily;
use crate::modes::{Accessibility, HbmLevel, Mode, Scenario};
use crate::table::{SequenceStore, TableKey, TuningTable};

use std::sync::Arc;

/// The selectors that drive table selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selectors {
    /// Content scenario.
    pub scenario: Scenario,
    /// Display-quality preset.
    pub mode: Mode,
    /// Accessibility profile.
    pub accessibility: Accessibility,
    /// High-brightness class.
    pub hbm: HbmLevel,
}

/// One selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// An accessibility profile is active.
    Accessibility,
    /// High-brightness mode is active.
    Brightness,
    /// The broadcast tuner scenario is selected.
    Tuner,
    /// A normal scenario is selected.
    Scenario,
}

impl Rule {
    /// All rules, highest priority first.
    pub const PRIORITY: [Rule; 4] = [
        Rule::Accessibility,
        Rule::Brightness,
        Rule::Tuner,
        Rule::Scenario,
    ];

    /// The table this rule selects, or `None` if the rule does not apply.
    pub fn select(self, sel: &Selectors, family: PanelFamily) -> Option<TableKey> {
        match self {
            Rule::Accessibility if sel.accessibility.is_on() => {
                Some(TableKey::Accessibility(sel.accessibility))
            }
            Rule::Brightness if sel.hbm.is_on() => {
                if family.has_text_hbm() && sel.scenario.is_text() {
                    Some(TableKey::Hbm(HbmLevel::OnText))
                } else {
                    Some(TableKey::Hbm(sel.hbm))
                }
            }
            Rule::Tuner if sel.scenario.is_tuner() => Some(TableKey::Tuner(sel.mode)),
            Rule::Scenario if !sel.scenario.is_tuner() => {
                Some(TableKey::Tuning(sel.scenario, sel.mode))
            }
            _ => None,
        }
    }
}

/// A table picked by [`resolve`].
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The rule that decided.
    pub rule: Rule,
    /// Catalog key of the table.
    pub key: TableKey,
    /// The table; stays valid without any lock held.
    pub table: Arc<TuningTable>,
}

/// The key of the table that should be active, if any.
pub fn select(sel: &Selectors, family: PanelFamily) -> Option<(Rule, TableKey)> {
    Rule::PRIORITY
        .iter()
        .find_map(|rule| rule.select(sel, family).map(|key| (*rule, key)))
}

/// Pick exactly one table from `store`, or none.
pub fn resolve(sel: &Selectors, family: PanelFamily, store: &SequenceStore) -> Option<Resolved> {
    let (rule, key) = select(sel, family)?;
    let table = store.get(key)?;
    Some(Resolved { rule, key, table })
}
