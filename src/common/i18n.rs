// src/common/i18n.rs

use std::{collections::HashMap, sync::OnceLock};

const DEFAULT_LANG: &str = "en";

// Os arquivos de tradução vão embutidos no binário.
const BUNDLES: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

/// Mensagens traduzidas, indexadas por idioma e chave.
#[derive(Debug, Default)]
pub struct I18nStore {
    messages: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut messages = HashMap::new();
        for (lang, raw) in BUNDLES {
            let bundle: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("Arquivo de tradução '{}' inválido: {}", lang, e))?;
            messages.insert(lang.to_string(), bundle);
        }
        Ok(Self { messages })
    }

    /// Instância global para quem não tem acesso ao AppState (middlewares).
    pub fn shared() -> &'static I18nStore {
        static STORE: OnceLock<I18nStore> = OnceLock::new();
        STORE.get_or_init(|| {
            I18nStore::load().unwrap_or_else(|e| {
                tracing::error!("{}", e);
                I18nStore::default()
            })
        })
    }

    /// Idioma pedido → inglês → a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|bundle| bundle.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|bundle| bundle.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bundle_has_the_same_keys() {
        let store = I18nStore::load().unwrap();
        let en = &store.messages["en"];
        for (lang, bundle) in &store.messages {
            for key in en.keys() {
                assert!(bundle.contains_key(key), "{lang} sem a chave {key}");
            }
        }
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let store = I18nStore::load().unwrap();
        assert_eq!(
            store.translate("de", "error.empty_cart"),
            store.translate("en", "error.empty_cart")
        );
        assert_eq!(store.translate("pt", "error.nao_existe"), "error.nao_existe");
    }
}
