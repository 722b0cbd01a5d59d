//! Typed operations against the HomeFinder REST API.
//!
//! Every operation goes through the `AuthInterceptor`, except the credential
//! endpoints (login, registration, refresh, verify), which go straight to
//! the transport. Failures are re-labelled with the operation's message;
//! nothing but `ApiError` leaves this module.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::{
    session, Session, SessionStore, ACCESS_TOKEN_KEY, FILTERS_KEY, REFRESH_TOKEN_KEY,
};
use crate::config::ClientConfig;
use crate::models::{
    Credentials, Favorite, FavoriteCreated, ImageUpload, LoginResponse, NewReview, Property,
    PropertyFilters, PropertyImage, PropertyInput, PropertyType, Registration, Review,
    ReviewSummary, User, UserInfo,
};

use super::interceptor::AuthInterceptor;
use super::transport::{ApiRequest, FormPart, HttpTransport, Transport};
use super::ApiError;

const PROPERTIES_PATH: &str = "/properties/properties/";
const PROPERTY_TYPES_PATH: &str = "/properties/property-types/";
const PROPERTY_IMAGES_PATH: &str = "/properties/property-images/";
const FAVORITES_PATH: &str = "/properties/favorites/";
const REVIEWS_PATH: &str = "/reviews/reviews/";
const USERS_PATH: &str = "/users/users/";
const LOGIN_PATH: &str = "/users/api/token/";
const VERIFY_PATH: &str = "/users/api/token/verify/";
const CURRENT_USER_PATH: &str = "/users/api/user/";
const LOGOUT_PATH: &str = "/users/api/logout/";

/// API client for HomeFinder.
pub struct PropertyApi<T = HttpTransport> {
    http: AuthInterceptor<T>,
    store: Arc<dyn SessionStore>,
}

impl PropertyApi<HttpTransport> {
    /// Create a client talking to the configured backend.
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, ApiError> {
        Ok(Self::with_transport(HttpTransport::new(config)?, store))
    }
}

impl<T: Transport> PropertyApi<T> {
    pub fn with_transport(transport: T, store: Arc<dyn SessionStore>) -> Self {
        Self {
            http: AuthInterceptor::new(transport, store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Send through the auth layer and decode the JSON body.
    async fn call<R: DeserializeOwned>(&self, request: ApiRequest, message: &str) -> Result<R, ApiError> {
        let result = match self.http.send(request).await {
            Ok(response) => response.json::<R>(),
            Err(e) => Err(e),
        };
        result.map_err(|e| Self::failed(e, message))
    }

    /// Send through the auth layer, ignoring the body.
    async fn call_empty(&self, request: ApiRequest, message: &str) -> Result<(), ApiError> {
        self.http
            .send(request)
            .await
            .map(|_| ())
            .map_err(|e| Self::failed(e, message))
    }

    /// Send without authorization or refresh handling.
    async fn call_public<R: DeserializeOwned>(&self, request: ApiRequest, message: &str) -> Result<R, ApiError> {
        let result = match self.http.inner().send(request).await {
            Ok(response) => response.json::<R>(),
            Err(e) => Err(e),
        };
        result.map_err(|e| Self::failed(e, message))
    }

    fn failed(err: ApiError, message: &str) -> ApiError {
        warn!(status = ?err.status, error = %err, "{}", message);
        err.in_operation(message)
    }

    fn json_request<B: Serialize + ?Sized>(request: ApiRequest, body: &B, message: &str) -> Result<ApiRequest, ApiError> {
        request.with_json(body).map_err(|e| e.in_operation(message))
    }

    // ===== Properties =====

    /// Fetch listings matching the server-side filters
    pub async fn get_all_properties(&self, filters: &PropertyFilters) -> Result<Vec<Property>, ApiError> {
        let request = ApiRequest::get(PROPERTIES_PATH).with_query(filters.to_query());
        self.call(request, "Failed to fetch properties").await
    }

    pub async fn get_property_by_id(&self, id: i64) -> Result<Property, ApiError> {
        let path = format!("{}{}/", PROPERTIES_PATH, id);
        self.call(ApiRequest::get(path), &format!("Failed to fetch property {}", id))
            .await
    }

    pub async fn create_property(&self, input: &PropertyInput) -> Result<Property, ApiError> {
        let message = "Failed to create property";
        let request = Self::json_request(ApiRequest::post(PROPERTIES_PATH), input, message)?;
        let property: Property = self.call(request, message).await?;
        info!(id = property.id, "Property created");
        Ok(property)
    }

    pub async fn update_property(&self, id: i64, input: &PropertyInput) -> Result<Property, ApiError> {
        let message = format!("Failed to update property {}", id);
        let path = format!("{}{}/", PROPERTIES_PATH, id);
        let request = Self::json_request(ApiRequest::put(path), input, &message)?;
        self.call(request, &message).await
    }

    pub async fn delete_property(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("{}{}/", PROPERTIES_PATH, id);
        self.call_empty(ApiRequest::delete(path), &format!("Failed to delete property {}", id))
            .await
    }

    pub async fn get_property_types(&self) -> Result<Vec<PropertyType>, ApiError> {
        self.call(ApiRequest::get(PROPERTY_TYPES_PATH), "Failed to fetch property types")
            .await
    }

    // ===== Property Images =====

    /// Upload an image as multipart form data
    pub async fn create_property_image(&self, upload: &ImageUpload) -> Result<PropertyImage, ApiError> {
        let request = ApiRequest::post(PROPERTY_IMAGES_PATH).with_multipart(vec![
            FormPart::Text {
                name: "property".to_string(),
                value: upload.property.to_string(),
            },
            FormPart::Text {
                name: "is_primary".to_string(),
                value: upload.is_primary.to_string(),
            },
            FormPart::File {
                name: "image".to_string(),
                file_name: upload.file_name.clone(),
                content_type: upload.content_type.clone(),
                bytes: upload.bytes.clone(),
            },
        ]);
        self.call(request, "Failed to upload image").await
    }

    pub async fn delete_property_image(&self, image_id: i64) -> Result<(), ApiError> {
        let path = format!("{}{}/delete/", PROPERTY_IMAGES_PATH, image_id);
        self.call_empty(ApiRequest::delete(path), &format!("Failed to delete image {}", image_id))
            .await
    }

    // ===== Accounts =====

    pub async fn register_user(&self, registration: &Registration) -> Result<UserInfo, ApiError> {
        let message = "User registration failed";
        let request = Self::json_request(ApiRequest::post(USERS_PATH), registration, message)?;
        self.call_public(request, message).await
    }

    /// Authenticate and persist the new session. All three session keys are
    /// written before this returns.
    pub async fn login_user(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let message = "Login failed";
        let request = Self::json_request(ApiRequest::post(LOGIN_PATH), credentials, message)?;
        let login: LoginResponse = self.call_public(request, message).await?;

        let session = Session {
            access_token: Some(login.access.clone()),
            refresh_token: Some(login.refresh.clone()),
            user_info: login.user.clone(),
        };
        session
            .save(self.store.as_ref())
            .await
            .map_err(|e| Self::failed(e.into(), message))?;

        info!(username = %credentials.username, "Logged in");
        Ok(login)
    }

    /// Revoke the tokens server-side when possible, then delete the local
    /// session. Succeeds when there is no session.
    pub async fn logout_user(&self) -> Result<(), ApiError> {
        match self.store.get(REFRESH_TOKEN_KEY).await {
            Ok(Some(refresh)) => {
                let body = json!({ "refresh": refresh });
                let sent = match Self::json_request(ApiRequest::post(LOGOUT_PATH), &body, "Logout failed") {
                    Ok(request) => self.http.send(request).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                if let Err(e) = sent {
                    warn!(status = ?e.status, error = %e, "Server-side logout failed");
                }
            }
            Ok(None) => debug!("No refresh token stored, skipping server-side logout"),
            Err(e) => warn!(error = %e, "Could not read refresh token, skipping server-side logout"),
        }

        session::clear(self.store.as_ref())
            .await
            .map_err(|e| Self::failed(e.into(), "Logout failed"))?;
        info!("Logged out");
        Ok(())
    }

    /// Exchange the refresh token for a new access token and store it.
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        self.http
            .refresh_now()
            .await
            .map_err(|e| Self::failed(e, "Token refresh failed"))
    }

    /// Ask the backend whether the stored access token is still valid.
    /// Any failure, including a missing token, counts as invalid.
    pub async fn validate_token(&self) -> bool {
        let token = match self.store.get(ACCESS_TOKEN_KEY).await {
            Ok(Some(token)) => token,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "Could not read access token");
                return false;
            }
        };
        let request = match ApiRequest::post(VERIFY_PATH).with_json(&json!({ "token": token })) {
            Ok(request) => request,
            Err(_) => return false,
        };
        match self.http.inner().send(request).await {
            Ok(_) => true,
            Err(e) => {
                debug!(status = ?e.status, "Access token rejected");
                false
            }
        }
    }

    pub async fn get_current_user(&self) -> Result<User, ApiError> {
        self.call(ApiRequest::get(CURRENT_USER_PATH), "Failed to fetch user details")
            .await
    }

    /// The session currently held by the store.
    pub async fn current_session(&self) -> Result<Session, ApiError> {
        Ok(Session::load(self.store.as_ref()).await?)
    }

    // ===== Favorites =====

    pub async fn get_favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        self.call(ApiRequest::get(FAVORITES_PATH), "Failed to fetch favorites")
            .await
    }

    pub async fn add_favorite(&self, property_id: i64) -> Result<FavoriteCreated, ApiError> {
        let message = "Failed to add favorite";
        let request = Self::json_request(ApiRequest::post(FAVORITES_PATH), &json!({ "property": property_id }), message)?;
        self.call(request, message).await
    }

    /// Remove a favorite by its own id (not the property id)
    pub async fn remove_favorite(&self, favorite_id: i64) -> Result<(), ApiError> {
        let path = format!("{}{}/", FAVORITES_PATH, favorite_id);
        self.call_empty(ApiRequest::delete(path), &format!("Failed to remove favorite {}", favorite_id))
            .await
    }

    /// The user's favorite entry for a listing, if any
    pub async fn favorite_for_property(&self, property_id: i64) -> Result<Option<Favorite>, ApiError> {
        let favorites = self.get_favorites().await?;
        Ok(favorites.into_iter().find(|f| f.property.id == property_id))
    }

    // ===== Reviews =====

    pub async fn get_reviews(&self, property_id: i64) -> Result<ReviewSummary, ApiError> {
        let request = ApiRequest::get(REVIEWS_PATH)
            .with_query(vec![("property".to_string(), property_id.to_string())]);
        let reviews: Vec<Review> = self
            .call(request, &format!("Failed to fetch reviews for property {}", property_id))
            .await?;
        Ok(ReviewSummary::for_property(property_id, &reviews))
    }

    pub async fn post_review(&self, review: &NewReview) -> Result<Review, ApiError> {
        let message = "Failed to post review";
        let request = Self::json_request(ApiRequest::post(REVIEWS_PATH), review, message)?;
        self.call(request, message).await
    }

    // ===== Saved Filters =====

    pub async fn save_filters(&self, filters: &PropertyFilters) -> Result<(), ApiError> {
        let raw = serde_json::to_string(filters)
            .map_err(|e| ApiError::decode("filters could not be encoded", e))?;
        self.store.set(FILTERS_KEY, &raw).await?;
        Ok(())
    }

    /// Saved filters; unreadable data is treated as no filters.
    pub async fn load_filters(&self) -> Result<PropertyFilters, ApiError> {
        let Some(raw) = self.store.get(FILTERS_KEY).await? else {
            return Ok(PropertyFilters::default());
        };
        match serde_json::from_str(&raw) {
            Ok(filters) => Ok(filters),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable saved filters");
                Ok(PropertyFilters::default())
            }
        }
    }

    pub async fn clear_filters(&self) -> Result<(), ApiError> {
        self.store.delete(FILTERS_KEY).await?;
        Ok(())
    }
}
