use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::database::store::{JsonStore, Query, Table};
use crate::error::{Error, Result};
use crate::models::setting::{NewSetting, Setting};

#[derive(Clone)]
pub struct SettingsService {
    store: JsonStore,
}

impl SettingsService {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub async fn all(&self) -> Result<BTreeMap<String, JsonValue>> {
        let settings: Vec<Setting> = self.store.all(Table::Settings).await?;
        Ok(settings.into_iter().map(|s| (s.key, s.value)).collect())
    }

    pub async fn put(&self, key: &str, value: JsonValue) -> Result<Setting> {
        let key = key.trim();
        if key.is_empty() || key.len() > 64 {
            return Err(Error::BadRequest("Setting keys must be 1-64 characters".into()));
        }

        let existing: Option<Setting> = self
            .store
            .find_one(Table::Settings, &Query::new().eq("key", key))
            .await?;

        match existing {
            Some(setting) => {
                self.store
                    .update(Table::Settings, setting.id, |s: &mut Setting| {
                        s.value = value;
                        Ok(())
                    })
                    .await
            }
            None => {
                self.store
                    .insert_unique(
                        Table::Settings,
                        "key",
                        &NewSetting {
                            key: key.to_string(),
                            value,
                        },
                    )
                    .await
            }
        }
    }
}
