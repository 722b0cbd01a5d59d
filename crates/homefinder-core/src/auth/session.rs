use futures::future::join_all;
use tracing::{debug, warn};

use crate::models::UserInfo;

use super::store::{
    SessionStore, StoreError, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_INFO_KEY,
};

/// Snapshot of the credentials held in a `SessionStore`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user_info: Option<UserInfo>,
}

impl Session {
    /// Read all three session keys concurrently.
    pub async fn load(store: &dyn SessionStore) -> Result<Self, StoreError> {
        let (access_token, refresh_token, user_info) = futures::try_join!(
            store.get(ACCESS_TOKEN_KEY),
            store.get(REFRESH_TOKEN_KEY),
            store.get(USER_INFO_KEY),
        )?;

        let user_info = user_info.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable stored user info");
                None
            }
        });

        Ok(Self {
            access_token,
            refresh_token,
            user_info,
        })
    }

    /// Requests will carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// A 401 can be recovered from.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Persist a freshly issued session. The writes go out concurrently and
    /// all of them complete before this returns.
    pub async fn save(&self, store: &dyn SessionStore) -> Result<(), StoreError> {
        let user_json = self.user_info.as_ref().map(serde_json::to_string).transpose()?;

        futures::try_join!(
            write_or_delete(store, ACCESS_TOKEN_KEY, self.access_token.as_deref()),
            write_or_delete(store, REFRESH_TOKEN_KEY, self.refresh_token.as_deref()),
            write_or_delete(store, USER_INFO_KEY, user_json.as_deref()),
        )?;
        debug!("Session saved");
        Ok(())
    }
}

/// Overwrite the access token (and user info when the refresh returned it).
pub async fn store_refreshed(
    store: &dyn SessionStore,
    access_token: &str,
    user_info: Option<&UserInfo>,
) -> Result<(), StoreError> {
    match user_info {
        Some(info) => {
            let user_json = serde_json::to_string(info)?;
            futures::try_join!(
                store.set(ACCESS_TOKEN_KEY, access_token),
                store.set(USER_INFO_KEY, &user_json),
            )?;
        }
        None => store.set(ACCESS_TOKEN_KEY, access_token).await?,
    }
    Ok(())
}

/// Delete every session key. Every delete is attempted even if one fails;
/// the first failure is returned. Clearing an empty store succeeds.
pub async fn clear(store: &dyn SessionStore) -> Result<(), StoreError> {
    let results = join_all(SESSION_KEYS.iter().map(|key| store.delete(key))).await;
    for result in results {
        result?;
    }
    debug!("Session cleared");
    Ok(())
}

async fn write_or_delete(
    store: &dyn SessionStore,
    key: &str,
    value: Option<&str>,
) -> Result<(), StoreError> {
    match value {
        Some(v) => store.set(key, v).await,
        None => store.delete(key).await,
    }
}
