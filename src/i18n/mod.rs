// Message catalogues for response messages and field errors
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::entity::FieldError;

const EN_CATALOGUE: &str = include_str!("locales/en.yaml");
const ID_CATALOGUE: &str = include_str!("locales/id.yaml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Id,
}

impl Language {
    /// Match a single language tag such as `en`, `en-US` or `id-ID`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Language::En),
            // "in" is the legacy code for Indonesian
            "id" | "in" => Some(Language::Id),
            _ => None,
        }
    }

    /// First supported language in an `Accept-Language` header value
    pub fn from_accept_language(header: &str) -> Option<Self> {
        header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .find_map(Self::from_tag)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Id => "id",
        }
    }
}

/// A field error with its message resolved for one language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedFieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Translator {
    catalogues: HashMap<Language, HashMap<String, String>>,
    default_language: Language,
}

impl Translator {
    /// Parse the embedded catalogues
    pub fn load(default_language: Language) -> Result<Self, serde_yaml::Error> {
        let mut catalogues = HashMap::new();
        catalogues.insert(Language::En, serde_yaml::from_str(EN_CATALOGUE)?);
        catalogues.insert(Language::Id, serde_yaml::from_str(ID_CATALOGUE)?);
        Ok(Self {
            catalogues,
            default_language,
        })
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Resolve `key`, falling back to the default language and then to the key
    pub fn translate(&self, language: Language, key: &str) -> String {
        self.lookup(language, key)
            .or_else(|| self.lookup(self.default_language, key))
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }

    /// Like [`Translator::translate`], substituting `{Name}` placeholders
    /// from `context`
    pub fn translate_with(&self, language: Language, key: &str, context: &Map<String, Value>) -> String {
        let mut message = self.translate(language, key);
        for (name, value) in context {
            let replacement = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            message = message.replace(&format!("{{{}}}", name), &replacement);
        }
        message
    }

    pub fn translate_errors(&self, language: Language, errors: &[FieldError]) -> Vec<TranslatedFieldError> {
        errors
            .iter()
            .map(|error| TranslatedFieldError {
                field: error.field.clone(),
                message: self.translate_with(language, &error.message, &error.context),
            })
            .collect()
    }

    fn lookup(&self, language: Language, key: &str) -> Option<&str> {
        self.catalogues
            .get(&language)
            .and_then(|catalogue| catalogue.get(key))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::user::{MSG_EMAIL_INVALID, MSG_FIRST_NAME_REQUIRED};

    #[test]
    fn test_catalogues_parse_and_share_keys() {
        let translator = Translator::load(Language::En).unwrap();
        let en = &translator.catalogues[&Language::En];
        let id = &translator.catalogues[&Language::Id];
        let mut en_keys: Vec<_> = en.keys().collect();
        let mut id_keys: Vec<_> = id.keys().collect();
        en_keys.sort();
        id_keys.sort();
        assert_eq!(en_keys, id_keys);
    }

    #[test]
    fn test_accept_language_parsing() {
        assert_eq!(Language::from_accept_language("id-ID,id;q=0.9,en;q=0.8"), Some(Language::Id));
        assert_eq!(Language::from_accept_language("fr-FR, en-US;q=0.5"), Some(Language::En));
        assert_eq!(Language::from_accept_language("fr, de"), None);
        assert_eq!(Language::from_tag("IN"), Some(Language::Id));
    }

    #[test]
    fn test_field_errors_are_translated_with_context() {
        let translator = Translator::load(Language::En).unwrap();
        let errors = vec![
            FieldError::new("first_name", MSG_FIRST_NAME_REQUIRED).with_field_context(),
            FieldError::new("email", MSG_EMAIL_INVALID),
        ];

        let en = translator.translate_errors(Language::En, &errors);
        assert_eq!(en[0].message, "The first_name field is required");
        assert_eq!(en[1].message, "Invalid email format");

        let id = translator.translate_errors(Language::Id, &errors);
        assert_eq!(id[0].message, "Kolom first_name wajib diisi");
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        let translator = Translator::load(Language::En).unwrap();
        assert_eq!(translator.translate(Language::Id, "api.msg.unknown"), "api.msg.unknown");
    }
}
