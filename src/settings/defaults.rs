use std::collections::BTreeMap;

use crate::settings::document::{
    empty_detail_sets, Category, PromptTemplate, RoomType, SettingsDocument, Style, Term, UiText,
};

/// Label that always keeps its factory value, no matter what a
/// reconciliation proposal says.
pub const HEADER_TITLE_TEXT_ID: &str = "headerTitle";

/// Theme pair used when a proposal supplies no usable theme and for the
/// safe-fallback document after a failed reconciliation.
pub const FALLBACK_THEME_EN: &str = "Modern minimalist interior";
pub const FALLBACK_THEME_ZH: &str = "现代简约室内";

fn prompt_template(
    id: &str,
    name: &str,
    description: &str,
    template: &str,
    placeholders: &[&str],
) -> (String, PromptTemplate) {
    (
        id.to_string(),
        PromptTemplate {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            template: template.to_string(),
            placeholders: placeholders.iter().map(|p| p.to_string()).collect(),
        },
    )
}

fn ui_text(id: &str, name: &str, description: &str, en: &str, zh: &str) -> (String, UiText) {
    (
        id.to_string(),
        UiText {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            text_en: en.to_string(),
            text_zh: zh.to_string(),
        },
    )
}

fn term(id: &str, category_id: &str, en: &str, zh: &str) -> Term {
    Term {
        id: id.to_string(),
        term_en: en.to_string(),
        term_zh: zh.to_string(),
        category_id: category_id.to_string(),
        is_custom: false,
    }
}

fn category(
    id: &str,
    name_en: &str,
    name_zh: &str,
    is_open_by_default: bool,
    terms: Vec<Term>,
) -> (String, Category) {
    (
        id.to_string(),
        Category {
            id: id.to_string(),
            name_en: name_en.to_string(),
            name_zh: name_zh.to_string(),
            is_open_by_default,
            terms,
        },
    )
}

fn style(
    id: &str,
    name_en: &str,
    name_zh: &str,
    base_prompt_en: &str,
    base_prompt_zh: &str,
    related_category_ids: &[&str],
) -> Style {
    Style {
        id: id.to_string(),
        name_en: name_en.to_string(),
        name_zh: name_zh.to_string(),
        description_en: String::new(),
        description_zh: String::new(),
        base_prompt_en: base_prompt_en.to_string(),
        base_prompt_zh: base_prompt_zh.to_string(),
        related_category_ids: related_category_ids.iter().map(|c| c.to_string()).collect(),
        dynamic_detail_sets: empty_detail_sets(),
        is_custom: false,
    }
}

fn room_type(id: &str, en: &str, zh: &str) -> RoomType {
    RoomType {
        id: id.to_string(),
        term_en: en.to_string(),
        term_zh: zh.to_string(),
        is_custom: false,
    }
}

/// Builds the factory-default document from scratch. Style descriptions
/// and detail sets start empty; the model fills them per theme.
pub fn factory_default_document() -> SettingsDocument {
    let prompt_templates: BTreeMap<String, PromptTemplate> = [
        prompt_template(
            "imageGeneration",
            "Image generation",
            "Main prompt sent to the image model.",
            "{{theme}}, {{style}}, {{roomType}} interior, featuring {{terms}}, photorealistic, natural perspective, high detail",
            &["theme", "style", "roomType", "terms"],
        ),
        prompt_template(
            "keywordSuggestion",
            "Keyword suggestion",
            "Asks the model for extra keywords within one category.",
            "Suggest six concise {{category}} keywords that suit a {{theme}} interior. Give each keyword in English and Chinese.",
            &["category", "theme"],
        ),
        prompt_template(
            "styleDetail",
            "Style detail",
            "Asks the model for two sets of style detail phrases.",
            "For a {{style}} {{roomType}}, list two sets of three short visual detail phrases, in English and Chinese.",
            &["style", "roomType"],
        ),
    ]
    .into_iter()
    .collect();

    let ui_texts: BTreeMap<String, UiText> = [
        ui_text(
            HEADER_TITLE_TEXT_ID,
            "Header title",
            "Application title shown in the page header.",
            "Design Prompt Studio",
            "设计提示工作室",
        ),
        ui_text(
            "headerSubtitle",
            "Header subtitle",
            "Tagline under the application title.",
            "Compose interior prompts, term by term",
            "逐词构建室内设计提示词",
        ),
        ui_text(
            "themeLabel",
            "Theme label",
            "Label of the free-form theme input.",
            "Theme",
            "主题",
        ),
        ui_text(
            "generateButton",
            "Generate button",
            "Starts an image generation.",
            "Generate",
            "生成",
        ),
        ui_text(
            "randomizeButton",
            "Randomize button",
            "Picks a random set of terms.",
            "Surprise me",
            "随机灵感",
        ),
        ui_text(
            "clearButton",
            "Clear button",
            "Clears every selected term.",
            "Clear all",
            "全部清除",
        ),
        ui_text(
            "settingsTitle",
            "Settings title",
            "Heading of the settings dialog.",
            "Settings",
            "设置",
        ),
        ui_text(
            "profilesTitle",
            "Profiles title",
            "Heading of the saved-profiles list.",
            "Saved profiles",
            "已保存方案",
        ),
        ui_text(
            "saveProfileButton",
            "Save profile button",
            "Saves the current settings as a profile.",
            "Save profile",
            "保存方案",
        ),
        ui_text(
            "reconcileButton",
            "Reconcile button",
            "Rewrites the catalog around the entered theme.",
            "Restyle with AI",
            "AI 重塑风格",
        ),
    ]
    .into_iter()
    .collect();

    let categories: BTreeMap<String, Category> = [
        category(
            "lighting",
            "Lighting",
            "灯光",
            true,
            vec![
                term("lighting-natural", "lighting", "natural light", "自然光"),
                term("lighting-golden-hour", "lighting", "golden hour glow", "黄金时刻光线"),
                term("lighting-soft-ambient", "lighting", "soft ambient lighting", "柔和氛围光"),
            ],
        ),
        category(
            "materials",
            "Materials",
            "材质",
            true,
            vec![
                term("materials-oak", "materials", "oak wood", "橡木"),
                term("materials-brass", "materials", "brushed brass", "拉丝黄铜"),
                term("materials-linen", "materials", "natural linen", "天然亚麻"),
                term("materials-concrete", "materials", "polished concrete", "抛光混凝土"),
            ],
        ),
        category(
            "colorPalette",
            "Color palette",
            "色彩搭配",
            false,
            vec![
                term("colorPalette-warm-neutrals", "colorPalette", "warm neutrals", "暖色中性调"),
                term("colorPalette-sage-green", "colorPalette", "sage green accents", "鼠尾草绿点缀"),
                term("colorPalette-charcoal", "colorPalette", "charcoal grey", "炭灰色"),
            ],
        ),
        category(
            "mood",
            "Mood",
            "氛围",
            false,
            vec![
                term("mood-cozy", "mood", "cozy and inviting", "温馨宜人"),
                term("mood-airy", "mood", "bright and airy", "明亮通透"),
                term("mood-dramatic", "mood", "dramatic and moody", "深邃戏剧感"),
            ],
        ),
    ]
    .into_iter()
    .collect();

    let all_categories = ["lighting", "materials", "colorPalette", "mood"];

    let styles = vec![
        style(
            "modern-minimalist",
            "Modern minimalist",
            "现代简约",
            "modern minimalist interior, clean lines, uncluttered surfaces",
            "现代简约室内，线条利落，台面整洁",
            &all_categories,
        ),
        style(
            "scandinavian",
            "Scandinavian",
            "北欧风",
            "scandinavian interior, light wood, hygge warmth, functional simplicity",
            "北欧风室内，浅色木质，温馨惬意，简洁实用",
            &all_categories,
        ),
        style(
            "industrial-loft",
            "Industrial loft",
            "工业阁楼",
            "industrial loft interior, exposed brick, steel beams, raw textures",
            "工业阁楼室内，裸露砖墙，钢结构，原始质感",
            &all_categories,
        ),
        style(
            "japandi",
            "Japandi",
            "日式北欧",
            "japandi interior, wabi-sabi calm, low furniture, muted earth tones",
            "日式北欧室内，侘寂宁静，低矮家具，大地色调",
            &all_categories,
        ),
    ];

    let room_types = vec![
        room_type("living-room", "Living room", "客厅"),
        room_type("bedroom", "Bedroom", "卧室"),
        room_type("kitchen", "Kitchen", "厨房"),
        room_type("dining-room", "Dining room", "餐厅"),
        room_type("bathroom", "Bathroom", "浴室"),
        room_type("home-office", "Home office", "家庭办公室"),
    ];

    SettingsDocument {
        theme_en: FALLBACK_THEME_EN.to_string(),
        theme_zh: FALLBACK_THEME_ZH.to_string(),
        prompt_templates,
        ui_texts,
        categories,
        styles,
        room_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::document::{DETAIL_SET_COUNT, DETAIL_TERMS_PER_SET};

    #[test]
    fn factory_document_satisfies_detail_cardinality() {
        let document = factory_default_document();
        for style in &document.styles {
            assert_eq!(style.dynamic_detail_sets.len(), DETAIL_SET_COUNT);
            for set in &style.dynamic_detail_sets {
                assert_eq!(set.terms_en.len(), DETAIL_TERMS_PER_SET);
                assert_eq!(set.terms_zh.len(), DETAIL_TERMS_PER_SET);
            }
        }
    }

    #[test]
    fn factory_document_terms_point_at_their_category() {
        let document = factory_default_document();
        for (id, category) in &document.categories {
            assert_eq!(id, &category.id);
            for term in &category.terms {
                assert_eq!(&term.category_id, id);
                assert!(!term.is_custom);
            }
        }
    }

    #[test]
    fn header_title_label_exists() {
        let document = factory_default_document();
        assert!(document.ui_texts.contains_key(HEADER_TITLE_TEXT_ID));
    }
}
