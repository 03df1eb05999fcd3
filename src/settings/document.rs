use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Detail sets per style and terms per language array are fixed; anything
/// a proposal or a persisted document supplies is padded or truncated back
/// to these counts.
pub const DETAIL_SET_COUNT: usize = 2;
pub const DETAIL_TERMS_PER_SET: usize = 3;

/// The canonical configuration of the prompt studio. One instance per
/// session; mutated only by whole-document replacement, the structural
/// merger, or a profile load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    pub theme_en: String,
    pub theme_zh: String,
    pub prompt_templates: BTreeMap<String, PromptTemplate>,
    pub ui_texts: BTreeMap<String, UiText>,
    pub categories: BTreeMap<String, Category>,
    pub styles: Vec<Style>,
    pub room_types: Vec<RoomType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub template: String,
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiText {
    pub id: String,
    pub name: String,
    pub description: String,
    pub text_en: String,
    pub text_zh: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name_en: String,
    pub name_zh: String,
    pub is_open_by_default: bool,
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub id: String,
    pub term_en: String,
    pub term_zh: String,
    pub category_id: String,
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub id: String,
    pub name_en: String,
    pub name_zh: String,
    pub description_en: String,
    pub description_zh: String,
    pub base_prompt_en: String,
    pub base_prompt_zh: String,
    pub related_category_ids: Vec<String>,
    pub dynamic_detail_sets: Vec<DetailSet>,
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailSet {
    pub terms_en: Vec<String>,
    pub terms_zh: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomType {
    pub id: String,
    pub term_en: String,
    pub term_zh: String,
    pub is_custom: bool,
}

fn empty_terms() -> Vec<String> {
    vec![String::new(); DETAIL_TERMS_PER_SET]
}

fn normalize_terms(terms: &mut Vec<String>) {
    terms.resize_with(DETAIL_TERMS_PER_SET, String::new);
}

impl DetailSet {
    pub fn empty() -> Self {
        DetailSet {
            terms_en: empty_terms(),
            terms_zh: empty_terms(),
        }
    }

    pub fn normalize(&mut self) {
        normalize_terms(&mut self.terms_en);
        normalize_terms(&mut self.terms_zh);
    }
}

/// The placeholder detail structure a style carries until the model fills
/// it in: two sets, three empty terms per language.
pub fn empty_detail_sets() -> Vec<DetailSet> {
    vec![DetailSet::empty(); DETAIL_SET_COUNT]
}

impl SettingsDocument {
    /// Re-asserts the detail-set cardinality on every style. Applied to
    /// documents arriving from persistence or profile loads, which may
    /// have been written by an older catalog.
    pub fn enforce_detail_invariants(&mut self) {
        for style in &mut self.styles {
            style.dynamic_detail_sets.resize_with(DETAIL_SET_COUNT, DetailSet::empty);
            for set in &mut style.dynamic_detail_sets {
                set.normalize();
            }
        }
    }
}
