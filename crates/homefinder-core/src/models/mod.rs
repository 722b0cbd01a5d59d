//! Data models for HomeFinder entities.
//!
//! These mirror the backend serializers:
//!
//! - `Property`, `PropertyType`, `PropertyImage`: listings and their media
//! - `PropertyInput`, `ImageUpload`: write shapes for listings
//! - `PropertyFilters`: server-side search parameters
//! - `User`, `UserInfo`, `Registration`, `Credentials`: accounts and login
//! - `Favorite`, `Review`, `ReviewSummary`: per-user listing data

pub mod filters;
pub mod property;
pub mod review;
pub mod user;

pub use filters::PropertyFilters;
pub use property::{ImageUpload, ListingType, Property, PropertyImage, PropertyInput, PropertyType, SaleStatus};
pub use review::{Favorite, FavoriteCreated, NewReview, Review, ReviewSummary};
pub use user::{Credentials, LoginResponse, RefreshResponse, Registration, User, UserInfo};
