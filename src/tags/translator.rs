use log::{debug, warn};
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

/// Default timeout for the free translation endpoint
pub const TRANSLATE_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Zh,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    pub fn other(&self) -> Language {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

/// `Zh` when any character is a CJK Unified Ideograph, otherwise `En`.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c)) {
        Language::Zh
    } else {
        Language::En
    }
}

/// Curated English → Chinese vocabulary for common AI-art tags
const TAG_TRANSLATIONS: &[(&str, &str)] = &[
    // Quality
    ("masterpiece", "杰作"),
    ("best quality", "最佳质量"),
    ("high quality", "高质量"),
    ("ultra detailed", "超详细"),
    ("absurdres", "超高分辨率"),
    ("highres", "高分辨率"),
    ("8k", "8K"),
    ("4k", "4K"),
    ("wallpaper", "壁纸"),
    ("official art", "官方艺术"),
    ("extremely detailed", "极其详细"),
    ("beautiful detailed", "精美详细"),
    // Style
    ("anime", "动漫"),
    ("realistic", "写实"),
    ("photorealistic", "照片级写实"),
    ("illustration", "插画"),
    ("painting", "绘画"),
    ("digital art", "数字艺术"),
    ("concept art", "概念艺术"),
    ("watercolor", "水彩"),
    ("oil painting", "油画"),
    ("sketch", "素描"),
    ("lineart", "线稿"),
    ("manga", "漫画"),
    // Character
    ("1girl", "一个女孩"),
    ("1boy", "一个男孩"),
    ("solo", "单人"),
    ("multiple girls", "多个女孩"),
    ("multiple boys", "多个男孩"),
    ("couple", "情侣"),
    ("group", "群体"),
    // Body / face
    ("long hair", "长发"),
    ("short hair", "短发"),
    ("blonde hair", "金发"),
    ("black hair", "黑发"),
    ("blue eyes", "蓝眼睛"),
    ("red eyes", "红眼睛"),
    ("smile", "微笑"),
    ("blush", "脸红"),
    ("looking at viewer", "看向观众"),
    ("closed eyes", "闭眼"),
    ("open mouth", "张嘴"),
    // Clothing
    ("dress", "连衣裙"),
    ("uniform", "制服"),
    ("swimsuit", "泳装"),
    ("school uniform", "校服"),
    ("maid", "女仆装"),
    ("armor", "盔甲"),
    ("kimono", "和服"),
    ("hoodie", "卫衣"),
    ("jacket", "夹克"),
    // Scene / background
    ("outdoors", "户外"),
    ("indoors", "室内"),
    ("nature", "自然"),
    ("city", "城市"),
    ("forest", "森林"),
    ("beach", "海滩"),
    ("sky", "天空"),
    ("night", "夜晚"),
    ("sunset", "日落"),
    ("mountains", "山脉"),
    ("ocean", "海洋"),
    ("garden", "花园"),
    // Lighting
    ("dramatic lighting", "戏剧性光照"),
    ("soft lighting", "柔和光照"),
    ("backlighting", "逆光"),
    ("sunlight", "阳光"),
    ("moonlight", "月光"),
    ("cinematic lighting", "电影光照"),
    ("rim lighting", "轮廓光"),
    // Composition
    ("full body", "全身"),
    ("upper body", "上半身"),
    ("portrait", "肖像"),
    ("close-up", "特写"),
    ("from above", "俯视"),
    ("from below", "仰视"),
    ("side view", "侧视"),
    ("dynamic angle", "动态角度"),
    // Action / pose
    ("standing", "站立"),
    ("sitting", "坐着"),
    ("lying", "躺着"),
    ("walking", "走路"),
    ("running", "奔跑"),
    ("jumping", "跳跃"),
    ("dancing", "跳舞"),
    ("fighting", "战斗"),
    ("flying", "飞行"),
    // Negative
    ("lowres", "低分辨率"),
    ("bad anatomy", "解剖错误"),
    ("bad hands", "手部错误"),
    ("text", "文字"),
    ("error", "错误"),
    ("missing fingers", "手指缺失"),
    ("extra digit", "多余手指"),
    ("fewer digits", "手指缺少"),
    ("cropped", "裁剪"),
    ("worst quality", "最差质量"),
    ("low quality", "低质量"),
    ("blurry", "模糊"),
    ("watermark", "水印"),
    ("signature", "签名"),
];

static DICTIONARY: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| TAG_TRANSLATIONS.iter().copied().collect());

/// Bundled Chinese rendering of an English tag, if there is one
pub fn dictionary_lookup(text: &str) -> Option<&'static str> {
    DICTIONARY.get(text.trim().to_lowercase().as_str()).copied()
}

/// Best-effort translator: bundled dictionary first, then the free
/// translation endpoint. Failures return the input unchanged.
pub struct Translator {
    client: Client,
    endpoint: String,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_TRANSLATE_ENDPOINT.to_string(), TRANSLATE_TIMEOUT)
    }

    pub fn with_endpoint(endpoint: String, timeout: Duration) -> Self {
        Translator {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            endpoint,
        }
    }

    /// Translate `text`; never fails; callers get the original text back when
    /// nothing better is available.
    pub async fn translate(&self, text: &str, source: Language, target: Language) -> String {
        if target == Language::Zh {
            if let Some(hit) = dictionary_lookup(text) {
                return hit.to_string();
            }
        }

        match self.fetch(text, source, target).await {
            Some(translated) => translated,
            None => text.to_string(),
        }
    }

    async fn fetch(&self, text: &str, source: Language, target: Language) -> Option<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(USER_AGENT, "Mozilla/5.0")
            .query(&[
                ("client", "gtx"),
                ("sl", source.code()),
                ("tl", target.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| warn!("Translation error for '{}': {}", text, e))
            .ok()?;

        if !response.status().is_success() {
            warn!(
                "Translation endpoint returned {} for '{}'",
                response.status(),
                text
            );
            return None;
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| warn!("Translation response for '{}' is not JSON: {}", text, e))
            .ok()?;
        debug!("Translation response: {}", body);

        // Shape: [[["译文", "source", ...], ...], ...]
        let segments = body.get(0)?.as_array()?;
        if segments.is_empty() {
            return None;
        }
        Some(
            segments
                .iter()
                .filter_map(|segment| segment.get(0).and_then(Value::as_str))
                .collect(),
        )
    }
}
