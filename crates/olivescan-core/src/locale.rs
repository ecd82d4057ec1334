//! 국제화 (i18n) 모듈.
//!
//! 영어(en), 프랑스어(fr), 아랍어(ar) 지원.

use serde::{Deserialize, Serialize};

/// 지원 언어
///
/// 설정 파일의 알 수 없는 코드는 영어로 읽는다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Language {
    /// 영어 (기본값)
    #[default]
    En,
    /// 프랑스어
    Fr,
    /// 아랍어 (RTL)
    Ar,
}

impl Language {
    /// 지원 언어 전체
    pub const ALL: [Language; 3] = [Language::En, Language::Fr, Language::Ar];

    /// 언어 코드 반환
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Ar => "ar",
        }
    }

    /// 언어 이름 (해당 언어로)
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "Français",
            Language::Ar => "العربية",
        }
    }

    /// 오른쪽→왼쪽 표기 여부
    pub fn is_rtl(&self) -> bool {
        matches!(self, Language::Ar)
    }

    /// 언어 코드로 변환: 알 수 없는 코드는 영어
    pub fn from_code(code: &str) -> Self {
        Self::parse_code(code).unwrap_or_default()
    }

    /// 언어 코드 엄격 파싱 (설정 변경 입력 검증용)
    pub fn parse_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_ascii_lowercase();
        // "fr_FR", "ar-EG" 같은 지역 접미사는 무시
        let primary = normalized
            .split(|c: char| c == '_' || c == '-')
            .next()
            .unwrap_or_default();
        Self::ALL.into_iter().find(|lang| lang.code() == primary)
    }

    /// 로컬라이즈 문자열 테이블
    pub fn strings(&self) -> &'static Strings {
        Strings::for_language(*self)
    }
}

impl From<String> for Language {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// CLI 문자열 (로컬라이즈)
#[derive(Debug, Clone)]
pub struct Strings {
    // 탐지
    pub detecting: &'static str,
    pub detection_results: &'static str,
    pub leaf_count: &'static str,
    pub no_detections: &'static str,
    pub detection_failed: &'static str,
    pub saved_to_history: &'static str,
    pub annotated_image_saved: &'static str,

    // 기록
    pub history: &'static str,
    pub history_empty: &'static str,
    pub history_cleared: &'static str,
    pub history_deleted: &'static str,
    pub history_not_found: &'static str,
    pub history_watching: &'static str,
    pub source_image: &'static str,
    pub annotated_image: &'static str,

    // 설정
    pub settings: &'static str,
    pub server_url: &'static str,
    pub language: &'static str,
    pub config_file: &'static str,
    pub settings_saved: &'static str,
}

impl Strings {
    /// 영어 문자열
    pub const EN: Strings = Strings {
        detecting: "Analyzing image...",
        detection_results: "Detection Results",
        leaf_count: "Leaves detected",
        no_detections: "No leaves detected",
        detection_failed: "Detection failed",
        saved_to_history: "Saved to history",
        annotated_image_saved: "Annotated image written to",

        history: "Detection History",
        history_empty: "No detection history yet",
        history_cleared: "History cleared",
        history_deleted: "Deleted record",
        history_not_found: "No record with id",
        history_watching: "Watching history (Ctrl+C to stop)",
        source_image: "Source image",
        annotated_image: "Annotated image",

        settings: "Settings",
        server_url: "Server URL",
        language: "Language",
        config_file: "Config file",
        settings_saved: "Settings saved",
    };

    /// 프랑스어 문자열
    pub const FR: Strings = Strings {
        detecting: "Analyse de l'image...",
        detection_results: "Résultats de détection",
        leaf_count: "Feuilles détectées",
        no_detections: "Aucune feuille détectée",
        detection_failed: "Échec de la détection",
        saved_to_history: "Enregistré dans l'historique",
        annotated_image_saved: "Image annotée écrite dans",

        history: "Historique des détections",
        history_empty: "Aucun historique pour le moment",
        history_cleared: "Historique effacé",
        history_deleted: "Enregistrement supprimé",
        history_not_found: "Aucun enregistrement avec l'id",
        history_watching: "Surveillance de l'historique (Ctrl+C pour arrêter)",
        source_image: "Image source",
        annotated_image: "Image annotée",

        settings: "Paramètres",
        server_url: "URL du serveur",
        language: "Langue",
        config_file: "Fichier de configuration",
        settings_saved: "Paramètres enregistrés",
    };

    /// 아랍어 문자열
    pub const AR: Strings = Strings {
        detecting: "جارٍ تحليل الصورة...",
        detection_results: "نتائج الكشف",
        leaf_count: "الأوراق المكتشفة",
        no_detections: "لم يتم اكتشاف أي أوراق",
        detection_failed: "فشل الكشف",
        saved_to_history: "تم الحفظ في السجل",
        annotated_image_saved: "تم حفظ الصورة المشروحة في",

        history: "سجل الكشف",
        history_empty: "لا يوجد سجل بعد",
        history_cleared: "تم مسح السجل",
        history_deleted: "تم حذف السجل",
        history_not_found: "لا يوجد سجل بالمعرف",
        history_watching: "مراقبة السجل (Ctrl+C للإيقاف)",
        source_image: "الصورة الأصلية",
        annotated_image: "الصورة المشروحة",

        settings: "الإعدادات",
        server_url: "عنوان الخادم",
        language: "اللغة",
        config_file: "ملف الإعدادات",
        settings_saved: "تم حفظ الإعدادات",
    };

    /// 언어별 문자열 테이블
    pub fn for_language(language: Language) -> &'static Strings {
        match language {
            Language::En => &Self::EN,
            Language::Fr => &Self::FR,
            Language::Ar => &Self::AR,
        }
    }
}

/// 신뢰도(0~1)를 정수 퍼센트 문자열로 (`0.875` → `"87%"`)
pub fn format_confidence(confidence: f64) -> String {
    format!("{}%", (confidence * 100.0) as i64)
}
