use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::settings::defaults::{FALLBACK_THEME_EN, FALLBACK_THEME_ZH, HEADER_TITLE_TEXT_ID};
use crate::settings::document::{
    empty_detail_sets, RoomType, SettingsDocument, Style, UiText,
};
use crate::settings::merge::deep_merge;

const THEME_ELABORATION_RATIO: usize = 4;

fn non_empty_str<'a>(value: Option<&'a Value>) -> Option<&'a str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Accepts the proposed theme pair when both halves are usable, falling
/// back to the fixed factory phrase per half otherwise.
pub fn reconcile_theme(proposal: &Value) -> (String, String) {
    let theme_en = non_empty_str(proposal.get("themeEn"))
        .unwrap_or(FALLBACK_THEME_EN)
        .to_string();
    let theme_zh = non_empty_str(proposal.get("themeZh"))
        .unwrap_or(FALLBACK_THEME_ZH)
        .to_string();
    (theme_en, theme_zh)
}

/// The model is told to translate the theme, not to embellish it. That
/// cannot be enforced structurally, so an accepted theme much longer than
/// the input only raises a flag.
pub fn theme_looks_elaborated(input: &str, accepted: &str) -> bool {
    let input_chars = input.trim().chars().count().max(1);
    accepted.chars().count() > input_chars * THEME_ELABORATION_RATIO
}

/// Deep-merges a proposed keyed table into the baseline table. Anything
/// that is not an object, or that no longer deserializes into the table's
/// entry type after the merge, leaves the baseline untouched.
pub fn merge_tables<T>(base: &BTreeMap<String, T>, patch: Option<&Value>) -> BTreeMap<String, T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let Some(patch) = patch.filter(|value| value.is_object()) else {
        return base.clone();
    };
    let base_value = match serde_json::to_value(base) {
        Ok(value) => value,
        Err(err) => {
            warn!("Could not serialize baseline table for merge: {}", err);
            return base.clone();
        }
    };
    let merged = deep_merge(&base_value, patch);
    match serde_json::from_value(merged) {
        Ok(table) => table,
        Err(err) => {
            debug!("Proposed table did not fit the baseline shape, keeping baseline: {}", err);
            base.clone()
        }
    }
}

/// UI labels merge like any keyed table, except the header title, which
/// always keeps its baseline value.
pub fn reconcile_ui_texts(
    base: &BTreeMap<String, UiText>,
    patch: Option<&Value>,
) -> BTreeMap<String, UiText> {
    let mut merged = merge_tables(base, patch);
    if let Some(baseline_title) = base.get(HEADER_TITLE_TEXT_ID) {
        merged.insert(HEADER_TITLE_TEXT_ID.to_string(), baseline_title.clone());
    }
    merged
}

/// Rewrites room-type display text in place. The output always has the
/// baseline's length and id sequence; a proposal entry only applies when
/// it matches an existing id and carries non-empty text for both
/// languages.
pub fn reconcile_room_types(baseline: &[RoomType], patch: Option<&Value>) -> Vec<RoomType> {
    let proposed = patch.and_then(Value::as_array);
    baseline
        .iter()
        .map(|room| {
            let replacement = proposed.and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| entry.get("id").and_then(Value::as_str) == Some(room.id.as_str()))
            });
            if let Some(entry) = replacement {
                if let (Some(term_en), Some(term_zh)) = (
                    non_empty_str(entry.get("termEn")),
                    non_empty_str(entry.get("termZh")),
                ) {
                    return RoomType {
                        id: room.id.clone(),
                        term_en: term_en.to_string(),
                        term_zh: term_zh.to_string(),
                        is_custom: false,
                    };
                }
            }
            room.clone()
        })
        .collect()
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn blanked_style(style: &Style) -> Style {
    let mut blanked = style.clone();
    blanked.description_en = String::new();
    blanked.description_zh = String::new();
    blanked.dynamic_detail_sets = empty_detail_sets();
    blanked
}

fn style_from_proposal(baseline: &Style, entry: &Value, known_category_ids: &[String]) -> Style {
    let text_field = |key: &str, fallback: &str| -> String {
        entry
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    };

    Style {
        id: baseline.id.clone(),
        name_en: text_field("nameEn", &baseline.name_en),
        name_zh: text_field("nameZh", &baseline.name_zh),
        // Descriptions and detail sets always restart empty; stale model
        // output from an earlier pass is never carried forward.
        description_en: String::new(),
        description_zh: String::new(),
        base_prompt_en: text_field("basePromptEn", &baseline.base_prompt_en),
        base_prompt_zh: text_field("basePromptZh", &baseline.base_prompt_zh),
        related_category_ids: string_list(entry.get("relatedCategoryIds"))
            .unwrap_or_else(|| known_category_ids.to_vec()),
        dynamic_detail_sets: empty_detail_sets(),
        is_custom: baseline.is_custom,
    }
}

/// Rebuilds the style list from the proposal, keyed by baseline order so
/// the id set and length can never drift. Baseline styles the proposal
/// does not cover, and the no-proposal case, fall back to the baseline
/// style with descriptions and detail sets blanked.
pub fn reconcile_styles(
    baseline: &[Style],
    known_category_ids: &[String],
    patch: Option<&Value>,
) -> Vec<Style> {
    let proposed = patch.and_then(Value::as_array);
    baseline
        .iter()
        .map(|style| {
            let entry = proposed.and_then(|entries| {
                entries
                    .iter()
                    .find(|entry| entry.get("id").and_then(Value::as_str) == Some(style.id.as_str()))
            });
            match entry {
                Some(entry) => style_from_proposal(style, entry, known_category_ids),
                None => blanked_style(style),
            }
        })
        .collect()
}

/// Applies every per-section rule to a parsed proposal, building the new
/// canonical document from the factory baseline. Absent or malformed
/// sections keep their baseline values; nothing in here fails.
pub fn apply_proposal(
    baseline: &SettingsDocument,
    proposal: &Value,
    theme_input: &str,
) -> SettingsDocument {
    let (theme_en, theme_zh) = reconcile_theme(proposal);
    if theme_looks_elaborated(theme_input, &theme_en) {
        warn!(
            "Derived theme looks elaborated beyond a translation: input {} chars, theme {} chars",
            theme_input.trim().chars().count(),
            theme_en.chars().count()
        );
    }

    let known_category_ids: Vec<String> = baseline.categories.keys().cloned().collect();

    SettingsDocument {
        theme_en,
        theme_zh,
        prompt_templates: merge_tables(&baseline.prompt_templates, proposal.get("promptTemplates")),
        ui_texts: reconcile_ui_texts(&baseline.ui_texts, proposal.get("uiTexts")),
        categories: merge_tables(&baseline.categories, proposal.get("categories")),
        styles: reconcile_styles(&baseline.styles, &known_category_ids, proposal.get("styles")),
        room_types: reconcile_room_types(&baseline.room_types, proposal.get("roomTypes")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::defaults::factory_default_document;
    use crate::settings::document::{DETAIL_SET_COUNT, DETAIL_TERMS_PER_SET};
    use serde_json::json;

    #[test]
    fn theme_falls_back_per_half() {
        let (en, zh) = reconcile_theme(&json!({"themeEn": "Vintage Café", "themeZh": "  "}));
        assert_eq!(en, "Vintage Café");
        assert_eq!(zh, FALLBACK_THEME_ZH);

        let (en, zh) = reconcile_theme(&json!({}));
        assert_eq!(en, FALLBACK_THEME_EN);
        assert_eq!(zh, FALLBACK_THEME_ZH);
    }

    #[test]
    fn theme_elaboration_flag_trips_on_long_output() {
        assert!(!theme_looks_elaborated("复古咖啡館", "Vintage Café"));
        assert!(theme_looks_elaborated(
            "cafe",
            "A lavishly detailed vintage café interior with patinated woodwork and brass fittings"
        ));
    }

    #[test]
    fn header_title_is_immune_to_rewrites() {
        let baseline = factory_default_document();
        let patch = json!({
            HEADER_TITLE_TEXT_ID: {"textEn": "Hijacked", "textZh": "被劫持"},
            "generateButton": {"textEn": "Brew", "textZh": "冲煮"}
        });
        let merged = reconcile_ui_texts(&baseline.ui_texts, Some(&patch));
        assert_eq!(
            merged.get(HEADER_TITLE_TEXT_ID),
            baseline.ui_texts.get(HEADER_TITLE_TEXT_ID)
        );
        assert_eq!(merged.get("generateButton").unwrap().text_en, "Brew");
    }

    #[test]
    fn merge_tables_ignores_invented_entries() {
        let baseline = factory_default_document();
        let patch = json!({"inventedLabel": {"id": "inventedLabel", "textEn": "x"}});
        let merged = merge_tables(&baseline.ui_texts, Some(&patch));
        assert!(!merged.contains_key("inventedLabel"));
        assert_eq!(merged.len(), baseline.ui_texts.len());
    }

    #[test]
    fn merge_tables_keeps_baseline_on_shape_breakage() {
        let baseline = factory_default_document();
        // isOpenByDefault replaced by a string breaks deserialization.
        let patch = json!({"lighting": {"isOpenByDefault": "yes"}});
        let merged = merge_tables(&baseline.categories, Some(&patch));
        assert_eq!(merged, baseline.categories);
    }

    #[test]
    fn room_types_keep_length_and_id_sequence() {
        let baseline = factory_default_document();
        let patch = json!([
            {"id": "bedroom", "termEn": "Sleeping nook", "termZh": "睡眠角落"},
            {"id": "bedroom", "termEn": "duplicate ignored", "termZh": "重复"},
            {"id": "unknown-room", "termEn": "Attic", "termZh": "阁楼"},
            {"id": "kitchen", "termEn": "", "termZh": "厨房"}
        ]);
        let output = reconcile_room_types(&baseline.room_types, Some(&patch));

        let baseline_ids: Vec<&str> = baseline.room_types.iter().map(|r| r.id.as_str()).collect();
        let output_ids: Vec<&str> = output.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(output_ids, baseline_ids);

        let bedroom = output.iter().find(|r| r.id == "bedroom").unwrap();
        assert_eq!(bedroom.term_en, "Sleeping nook");
        assert!(!bedroom.is_custom);
        // Empty proposed text keeps the baseline entry.
        let kitchen = output.iter().find(|r| r.id == "kitchen").unwrap();
        assert_eq!(kitchen.term_en, "Kitchen");
    }

    #[test]
    fn room_types_survive_a_non_array_proposal() {
        let baseline = factory_default_document();
        let output = reconcile_room_types(&baseline.room_types, Some(&json!("nonsense")));
        assert_eq!(output, baseline.room_types);
    }

    #[test]
    fn styles_keep_ids_and_reset_descriptions() {
        let mut baseline = factory_default_document();
        baseline.styles[0].description_en = "stale description".to_string();
        baseline.styles[0].dynamic_detail_sets[0].terms_en[0] = "stale term".to_string();

        let patch = json!([
            {"id": "modern-minimalist", "nameEn": "Espresso minimalist", "basePromptEn": "espresso bar interior"},
            {"id": "invented-style", "nameEn": "Should not appear"}
        ]);
        let output = reconcile_styles(
            &baseline.styles,
            &["lighting".to_string()],
            Some(&patch),
        );

        let baseline_ids: Vec<&str> = baseline.styles.iter().map(|s| s.id.as_str()).collect();
        let output_ids: Vec<&str> = output.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(output_ids, baseline_ids);

        let rewritten = &output[0];
        assert_eq!(rewritten.name_en, "Espresso minimalist");
        assert_eq!(rewritten.base_prompt_en, "espresso bar interior");
        assert_eq!(rewritten.description_en, "");
        assert_eq!(rewritten.dynamic_detail_sets, empty_detail_sets());
        // Proposal omitted relatedCategoryIds, so it defaults to all known.
        assert_eq!(rewritten.related_category_ids, vec!["lighting".to_string()]);
    }

    #[test]
    fn style_detail_cardinality_holds_for_any_proposal() {
        let baseline = factory_default_document();
        let category_ids: Vec<String> = baseline.categories.keys().cloned().collect();
        let patches = [
            json!([{"id": "japandi", "dynamicDetailSets": []}]),
            json!([{"id": "japandi", "dynamicDetailSets": [{"termsEn": ["one"], "termsZh": []}]}]),
            json!([{
                "id": "japandi",
                "dynamicDetailSets": [
                    {"termsEn": ["a", "b", "c", "d", "e"], "termsZh": ["一", "二", "三", "四", "五"]},
                    {"termsEn": ["f"], "termsZh": ["六"]},
                    {"termsEn": ["g"], "termsZh": ["七"]}
                ]
            }]),
            json!([{"id": "japandi", "dynamicDetailSets": "not an array"}]),
            json!("styles is not even a list"),
        ];

        for patch in &patches {
            let output = reconcile_styles(&baseline.styles, &category_ids, Some(patch));
            assert_eq!(output.len(), baseline.styles.len());
            for style in &output {
                assert_eq!(style.dynamic_detail_sets.len(), DETAIL_SET_COUNT);
                for set in &style.dynamic_detail_sets {
                    assert_eq!(set.terms_en.len(), DETAIL_TERMS_PER_SET);
                    assert_eq!(set.terms_zh.len(), DETAIL_TERMS_PER_SET);
                }
            }
        }
    }

    #[test]
    fn missing_styles_section_blanks_baseline_descriptions() {
        let mut baseline = factory_default_document();
        baseline.styles[1].description_zh = "旧的描述".to_string();
        let category_ids: Vec<String> = baseline.categories.keys().cloned().collect();

        let output = reconcile_styles(&baseline.styles, &category_ids, None);

        assert_eq!(output.len(), baseline.styles.len());
        assert_eq!(output[1].id, baseline.styles[1].id);
        assert_eq!(output[1].description_zh, "");
        assert_eq!(output[1].name_zh, baseline.styles[1].name_zh);
    }

    #[test]
    fn partial_proposal_touches_nothing_but_the_theme() {
        let baseline = factory_default_document();
        let proposal = json!({"themeEn": "Vintage Café", "themeZh": "复古咖啡館"});
        let output = apply_proposal(&baseline, &proposal, "复古咖啡館");

        assert_eq!(output.theme_en, "Vintage Café");
        assert_eq!(output.theme_zh, "复古咖啡館");
        assert_eq!(output.prompt_templates, baseline.prompt_templates);
        assert_eq!(output.ui_texts, baseline.ui_texts);
        assert_eq!(output.categories, baseline.categories);
        assert_eq!(output.styles, baseline.styles);
        assert_eq!(output.room_types, baseline.room_types);
    }

    #[test]
    fn echoed_baseline_proposal_is_idempotent() {
        let baseline = factory_default_document();
        let proposal = serde_json::to_value(&baseline).unwrap();
        let output = apply_proposal(&baseline, &proposal, "modern minimalist");
        assert_eq!(output, baseline);
    }
}
