//! User-facing strings. Russian is the default catalogue.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::Ru => &RU,
            Locale::En => &EN,
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ru" | "ru-ru" | "russian" => Ok(Locale::Ru),
            "en" | "en-us" | "en-gb" | "english" => Ok(Locale::En),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::Ru => f.write_str("ru"),
            Locale::En => f.write_str("en"),
        }
    }
}

#[derive(Debug)]
pub struct Messages {
    pub invalid_file: &'static str,
    pub analysis_failed: &'static str,
    pub export_failed: &'static str,
    pub not_specified: &'static str,
    pub name_not_specified: &'static str,
    pub no_drugs: &'static str,
    pub disclaimer: &'static str,
    pub results_title: &'static str,
    pub analyzed_at: &'static str,
    pub summary_title: &'static str,
    pub main_condition: &'static str,
    pub drugs_title: &'static str,
    pub inn_english: &'static str,
    pub dosage: &'static str,
    pub route: &'static str,
    pub frequency: &'static str,
    pub duration: &'static str,
    pub indication: &'static str,
    pub analyzing: &'static str,
}

static RU: Messages = Messages {
    invalid_file: "Пожалуйста, выберите файл в формате DOCX",
    analysis_failed: "Ошибка при анализе файла",
    export_failed: "Ошибка при экспорте в PDF",
    not_specified: "Не указано",
    name_not_specified: "Название не указано",
    no_drugs: "Не удалось извлечь информацию о лекарствах из документа. \
               Попробуйте другой документ или проверьте его содержимое.",
    disclaimer: "Внимание: Анализ генерируется искусственным интеллектом. \
                 Эта информация предназначена для ознакомительных целей и не заменяет \
                 консультацию квалифицированного медицинского специалиста.",
    results_title: "Результаты анализа",
    analyzed_at: "Дата анализа",
    summary_title: "Резюме протокола",
    main_condition: "Основное состояние",
    drugs_title: "Анализ лекарственных средств",
    inn_english: "МНН (англ.)",
    dosage: "Дозировка",
    route: "Путь введения",
    frequency: "Режим",
    duration: "Длительность",
    indication: "Показание",
    analyzing: "Анализ протокола...",
};

static EN: Messages = Messages {
    invalid_file: "Please select a file in DOCX format",
    analysis_failed: "Failed to analyze the file",
    export_failed: "Failed to export to PDF",
    not_specified: "Not specified",
    name_not_specified: "Name not specified",
    no_drugs: "Could not extract drug information from the document. \
               Try another document or check its contents.",
    disclaimer: "Warning: This analysis is generated by artificial intelligence. \
                 It is provided for informational purposes only and does not replace \
                 consultation with a qualified medical professional.",
    results_title: "Analysis results",
    analyzed_at: "Analyzed at",
    summary_title: "Protocol summary",
    main_condition: "Main condition",
    drugs_title: "Drug analysis",
    inn_english: "INN (English)",
    dosage: "Dosage",
    route: "Route",
    frequency: "Frequency",
    duration: "Duration",
    indication: "Indication",
    analyzing: "Analyzing protocol...",
};
