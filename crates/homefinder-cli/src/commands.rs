//! Subcommand handlers. Each prints its result as pretty JSON on stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use homefinder_core::{
    ApiError, Config, Credentials, CredentialBackend, EncryptedFileStore, ImageUpload,
    KeyringStore, MemoryStore, NewReview, PropertyApi, PropertyInput, Registration, SessionStore,
};

use crate::cli::{Cli, Command, ListArgs, RegisterArgs};

/// Encrypted session file inside the data directory
const SESSION_FILE: &str = "session.bin";

pub async fn run(cli: Cli, mut config: Config) -> Result<()> {
    let mut client_config = config.client_config();
    if let Some(url) = &cli.api_url {
        client_config.base_url = url.trim_end_matches('/').to_string();
    }
    debug!(base_url = %client_config.base_url, "Using API");

    let backend = cli.store.map(CredentialBackend::from).unwrap_or(config.credential_backend);
    let store = open_store(backend, &config, cli.passphrase.as_deref()).await?;
    let api = PropertyApi::new(&client_config, store)?;

    match cli.command {
        Command::Login { username } => {
            let username = username
                .or_else(|| config.last_username.clone())
                .ok_or_else(|| anyhow::anyhow!("No username given and none remembered"))?;
            let password = rpassword::prompt_password("Password: ")?;
            let login = api
                .login_user(&Credentials {
                    username: username.clone(),
                    password,
                })
                .await?;

            config.last_username = Some(username.clone());
            config.save().context("Failed to save config")?;
            info!(username = %username, "Logged in");

            match login.user {
                Some(user) => print_json(&user),
                None => print_json(&json!({ "username": username })),
            }
        }
        Command::Register(args) => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != confirm {
                anyhow::bail!("Passwords do not match");
            }
            let user = api.register_user(&registration(args, password)).await?;
            info!(username = %user.username, "Registered");
            print_json(&user)
        }
        Command::Logout => {
            api.logout_user().await?;
            print_json(&json!({ "logged_out": true }))
        }
        Command::Whoami => print_json(&api.get_current_user().await?),
        Command::Verify => print_json(&json!({ "valid": api.validate_token().await })),
        Command::List(args) => list(&api, &args).await,
        Command::Show { id } => print_json(&api.get_property_by_id(id).await?),
        Command::Types => print_json(&api.get_property_types().await?),
        Command::Create(listing) => {
            let input = listing.to_new_input().map_err(anyhow::Error::msg)?;
            print_json(&api.create_property(&input).await?)
        }
        Command::Update { id, listing } => {
            let current = api.get_property_by_id(id).await?;
            let mut input = PropertyInput::from(&current);
            listing.apply(&mut input);
            print_json(&api.update_property(id, &input).await?)
        }
        Command::Delete { id } => {
            api.delete_property(id).await?;
            print_json(&json!({ "deleted": id }))
        }
        Command::UploadImage {
            property_id,
            path,
            primary,
        } => {
            let upload = read_upload(property_id, &path, primary).await?;
            print_json(&api.create_property_image(&upload).await?)
        }
        Command::Favorites => print_json(&api.get_favorites().await?),
        Command::Favorite { property_id } => print_json(&api.add_favorite(property_id).await?),
        Command::Unfavorite { favorite_id } => {
            api.remove_favorite(favorite_id).await?;
            print_json(&json!({ "removed": favorite_id }))
        }
        Command::Reviews { property_id } => print_json(&api.get_reviews(property_id).await?),
        Command::Review {
            property_id,
            rating,
        } => {
            let review = api
                .post_review(&NewReview {
                    property: property_id,
                    rating,
                })
                .await?;
            print_json(&review)
        }
    }
}

async fn list(api: &PropertyApi, args: &ListArgs) -> Result<()> {
    let filters = if args.saved {
        api.load_filters().await?
    } else {
        args.filters()
    };
    if args.save_filters {
        api.save_filters(&filters).await?;
    }
    print_json(&api.get_all_properties(&filters).await?)
}

fn registration(args: RegisterArgs, password: String) -> Registration {
    Registration {
        username: args.username,
        email: args.email,
        password,
        first_name: args.first_name,
        last_name: args.last_name,
        phone_number: args.phone,
        role: args.role,
        bio: args.bio,
    }
}

async fn open_store(
    backend: CredentialBackend,
    config: &Config,
    passphrase: Option<&str>,
) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match backend {
        CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
        CredentialBackend::Memory => Arc::new(MemoryStore::new()),
        CredentialBackend::File => {
            let path = config.data_dir()?.join(SESSION_FILE);
            let passphrase = match passphrase {
                Some(p) => p.to_string(),
                None => rpassword::prompt_password("Credential file passphrase: ")?,
            };
            let store = EncryptedFileStore::open(&path, &passphrase)
                .await
                .with_context(|| format!("Failed to open credential file {}", path.display()))?;
            Arc::new(store)
        }
    };
    Ok(store)
}

async fn read_upload(property_id: i64, path: &Path, primary: bool) -> Result<ImageUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();

    Ok(ImageUpload {
        property: property_id,
        is_primary: primary,
        content_type: content_type_for(path).to_string(),
        file_name,
        bytes,
    })
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Extra line for errors the user can act on.
pub fn hint(err: &anyhow::Error) -> Option<&'static str> {
    let api_err = err.downcast_ref::<ApiError>()?;
    if api_err.is_session_expired() {
        Some("Your session has ended. Run `homefinder login` to sign in again.")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("front.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("plan.png")), "image/png");
        assert_eq!(content_type_for(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn test_registration_from_args() {
        let args = RegisterArgs {
            username: "nia".to_string(),
            email: "n@example.com".to_string(),
            first_name: "Nia".to_string(),
            last_name: "Ng".to_string(),
            phone: None,
            role: Some("buyer".to_string()),
            bio: None,
        };
        let registration = registration(args, "pw".to_string());
        assert_eq!(registration.username, "nia");
        assert_eq!(registration.password, "pw");
        assert_eq!(registration.role.as_deref(), Some("buyer"));
        assert_eq!(registration.phone_number, None);
    }

    #[test]
    fn test_hint_for_expired_session() {
        let err = anyhow::Error::from(ApiError::no_refresh_token());
        assert!(hint(&err).is_some());

        let err = anyhow::Error::from(ApiError::from_status(404, ""));
        assert!(hint(&err).is_none());

        let err = anyhow::anyhow!("No username given and none remembered");
        assert!(hint(&err).is_none());
    }

    #[tokio::test]
    async fn test_read_upload_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("porch.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let upload = read_upload(12, &path, true).await.unwrap();
        assert_eq!(upload.file_name, "porch.png");
        assert_eq!(upload.content_type, "image/png");
        assert_eq!(upload.bytes.len(), 4);
        assert!(upload.is_primary);
    }
}
