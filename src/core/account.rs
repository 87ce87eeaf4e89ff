use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::paths::LauncherDataLayout;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{3,16}$").expect("patrón de usuario"));

pub fn validate_username(username: &str) -> bool {
    USERNAME_PATTERN.is_match(username)
}

/// UUID estable derivado del nombre, igual que el modo offline del juego:
/// md5("OfflinePlayer:" + nombre) con formato 8-4-4-4-12.
pub fn offline_uuid(username: &str) -> String {
    let digest = format!("{:x}", md5::compute(format!("OfflinePlayer:{username}")));
    format!(
        "{}-{}-{}-{}-{}",
        &digest[..8],
        &digest[8..12],
        &digest[12..16],
        &digest[16..20],
        &digest[20..32]
    )
}

fn random_username() -> String {
    let suffix: u32 = rand::rng().random_range(1000..=9999);
    format!("Jugador{suffix}")
}

fn account_key(username: &str) -> String {
    format!("offline_{}", username.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub username: String,
    pub uuid: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    pub account_type: String,
    #[serde(default)]
    pub skin_url: Option<String>,
}

impl AccountRecord {
    fn offline(username: &str) -> Self {
        Self {
            username: username.to_string(),
            uuid: offline_uuid(username),
            access_token: String::new(),
            refresh_token: String::new(),
            account_type: "offline".to_string(),
            skin_url: None,
        }
    }
}

#[derive(Debug)]
pub struct AccountStore {
    accounts_file: PathBuf,
    accounts: BTreeMap<String, AccountRecord>,
    current: Option<String>,
}

impl AccountStore {
    pub fn open(layout: &LauncherDataLayout) -> Self {
        let accounts_file = layout.accounts_file();
        let accounts = Self::load_accounts(&accounts_file);
        let current = accounts.keys().next().cloned();
        let mut store = Self {
            accounts_file,
            accounts,
            current,
        };
        if store.accounts.is_empty() {
            store.create_default_account();
        }
        store
    }

    fn load_accounts(path: &PathBuf) -> BTreeMap<String, AccountRecord> {
        if !path.exists() {
            return BTreeMap::new();
        }
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("Error leyendo las cuentas: {error}");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str::<BTreeMap<String, AccountRecord>>(&raw) {
            Ok(accounts) => {
                tracing::info!("Cargadas {} cuentas", accounts.len());
                accounts
            }
            Err(error) => {
                tracing::error!("Error cargando las cuentas: {error}");
                BTreeMap::new()
            }
        }
    }

    fn save_accounts(&self) -> bool {
        if let Some(parent) = self.accounts_file.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                tracing::error!("No se pudo crear la carpeta de cuentas: {error}");
                return false;
            }
        }
        let raw = match serde_json::to_string_pretty(&self.accounts) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!("No se pudieron serializar las cuentas: {error}");
                return false;
            }
        };
        match fs::write(&self.accounts_file, raw) {
            Ok(()) => true,
            Err(error) => {
                tracing::error!("Error guardando las cuentas: {error}");
                false
            }
        }
    }

    fn create_default_account(&mut self) {
        let username = random_username();
        match self.create_offline(&username) {
            Ok(account) => {
                tracing::info!("Cuenta por defecto creada: {}", account.username);
            }
            Err(error) => {
                tracing::error!("Error creando la cuenta por defecto: {error}");
            }
        }
    }

    pub fn create_offline(&mut self, username: &str) -> Result<AccountRecord, String> {
        if !validate_username(username) {
            return Err(format!("Nombre de usuario inválido: {username}"));
        }
        let account = AccountRecord::offline(username);
        let key = account_key(username);
        self.accounts.insert(key.clone(), account.clone());
        self.current.get_or_insert(key);
        self.save_accounts();
        tracing::info!("Cuenta offline creada: {} ({})", username, account.uuid);
        Ok(account)
    }

    pub fn rename(&mut self, key: &str, new_username: &str) -> bool {
        let Some(account) = self.accounts.get(key) else {
            tracing::error!("Cuenta no encontrada: {key}");
            return false;
        };
        if account.account_type != "offline" {
            tracing::error!("Solo se pueden renombrar cuentas offline");
            return false;
        }
        if !validate_username(new_username) {
            tracing::error!("Nombre de usuario inválido: {new_username}");
            return false;
        }

        let mut account = self.accounts.remove(key).expect("cuenta ya comprobada");
        let old_username = std::mem::replace(&mut account.username, new_username.to_string());
        account.uuid = offline_uuid(new_username);
        let new_key = account_key(new_username);
        self.accounts.insert(new_key.clone(), account);
        if self.current.as_deref() == Some(key) {
            self.current = Some(new_key);
        }
        self.save_accounts();
        tracing::info!("Cuenta renombrada: {old_username} -> {new_username}");
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if !self.accounts.contains_key(key) {
            tracing::error!("Cuenta para eliminar no encontrada: {key}");
            return false;
        }

        let was_current = self.current.as_deref() == Some(key);
        let removed = self.accounts.remove(key).expect("cuenta ya comprobada");

        if was_current {
            self.current = self.accounts.keys().next().cloned();
            if self.current.is_none() {
                // Nunca nos quedamos sin identidad para lanzar
                self.create_default_account();
            }
        }

        self.save_accounts();
        tracing::info!("Cuenta eliminada: {}", removed.username);
        true
    }

    pub fn set_current(&mut self, key: &str) -> bool {
        if self.accounts.contains_key(key) {
            self.current = Some(key.to_string());
            return true;
        }
        tracing::error!("Cuenta no encontrada: {key}");
        false
    }

    pub fn current(&self) -> Option<&AccountRecord> {
        self.current
            .as_deref()
            .and_then(|key| self.accounts.get(key))
    }

    pub fn all(&self) -> &BTreeMap<String, AccountRecord> {
        &self.accounts
    }

    /// Identidad (usuario, uuid, token) para un lanzamiento. Si no hay ninguna
    /// cuenta utilizable se genera una identidad efímera que no se persiste.
    pub fn account_for_launch(&self, key: Option<&str>) -> (String, String, String) {
        let account = key
            .and_then(|key| self.accounts.get(key))
            .or_else(|| self.current());
        match account {
            Some(account) => (
                account.username.clone(),
                account.uuid.clone(),
                account.access_token.clone(),
            ),
            None => {
                let username = random_username();
                let uuid = offline_uuid(&username);
                (username, uuid, String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::LauncherDataLayout;

    fn store() -> (tempfile::TempDir, AccountStore) {
        let root = tempfile::tempdir().expect("tempdir");
        let layout = LauncherDataLayout::from_data_root(root.path());
        layout.ensure().expect("ensure");
        (root, AccountStore::open(&layout))
    }

    #[test]
    fn username_rules() {
        assert!(!validate_username("ab"));
        assert!(validate_username("Player_1"));
        assert!(validate_username("abc"));
        assert!(!validate_username("nombre con espacios"));
        assert!(!validate_username("diecisiete_letras_x"));
        assert!(!validate_username(""));
    }

    #[test]
    fn offline_uuid_is_deterministic() {
        assert_eq!(offline_uuid("Player_1"), offline_uuid("Player_1"));
        assert_ne!(offline_uuid("Player_1"), offline_uuid("player_1"));

        let uuid = offline_uuid("Steve");
        let parts: Vec<&str> = uuid.split('-').collect();
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![8, 4, 4, 4, 12]
        );
    }

    #[test]
    fn fresh_store_creates_a_default_account() {
        let (_root, store) = store();
        assert_eq!(store.all().len(), 1);
        assert!(store.current().is_some());
        assert_eq!(store.current().expect("cuenta").account_type, "offline");
    }

    #[test]
    fn create_offline_rejects_invalid_usernames() {
        let (_root, mut store) = store();
        assert!(store.create_offline("ab").is_err());
        let before = store.all().clone();
        assert_eq!(store.all(), &before);
    }

    #[test]
    fn duplicate_usernames_overwrite_by_key() {
        let (_root, mut store) = store();
        store.create_offline("Steve").expect("cuenta");
        store.create_offline("steve").expect("cuenta");
        // Las claves se normalizan a minúsculas
        assert!(store.all().contains_key("offline_steve"));
        assert_eq!(
            store.all().get("offline_steve").expect("cuenta").username,
            "steve"
        );
    }

    #[test]
    fn removing_the_last_account_creates_a_replacement() {
        let (_root, mut store) = store();
        let key = store.all().keys().next().expect("clave").clone();
        assert!(store.remove(&key));
        assert_eq!(store.all().len(), 1);
        assert!(store.current().is_some());
    }

    #[test]
    fn removing_the_current_account_promotes_another() {
        let (_root, mut store) = store();
        store.create_offline("Alex").expect("cuenta");
        store.create_offline("Steve").expect("cuenta");
        store.set_current("offline_alex");
        assert!(store.remove("offline_alex"));
        let current = store.current().expect("cuenta actual");
        assert_ne!(current.username, "Alex");
    }

    #[test]
    fn launch_identity_prefers_explicit_then_current() {
        let (_root, mut store) = store();
        store.create_offline("Alex").expect("cuenta");
        store.create_offline("Steve").expect("cuenta");
        store.set_current("offline_steve");

        let (username, uuid, token) = store.account_for_launch(Some("offline_alex"));
        assert_eq!(username, "Alex");
        assert_eq!(uuid, offline_uuid("Alex"));
        assert_eq!(token, "");

        let (username, _, _) = store.account_for_launch(None);
        assert_eq!(username, "Steve");
    }

    #[test]
    fn rename_rederives_the_uuid_and_rekeys() {
        let (_root, mut store) = store();
        store.create_offline("Alex").expect("cuenta");
        assert!(store.rename("offline_alex", "Alexandra"));
        assert!(!store.all().contains_key("offline_alex"));
        let account = store.all().get("offline_alexandra").expect("cuenta");
        assert_eq!(account.uuid, offline_uuid("Alexandra"));
    }
}
