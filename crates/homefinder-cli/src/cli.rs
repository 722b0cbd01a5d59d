use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use homefinder_core::{CredentialBackend, ListingType, PropertyFilters, PropertyInput, SaleStatus};

#[derive(Parser, Debug)]
#[command(name = "homefinder")]
#[command(about = "Browse and manage HomeFinder listings", version)]
pub struct Cli {
    /// API root, e.g. http://localhost:8000/api
    #[arg(long, global = true, env = "HOMEFINDER_API_URL")]
    pub api_url: Option<String>,

    /// Where to keep session credentials (defaults to the config file setting)
    #[arg(long, global = true, value_enum)]
    pub store: Option<StoreKind>,

    /// Passphrase for the encrypted credential file
    #[arg(long, global = true, env = "HOMEFINDER_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Also write logs to this file, rotated daily
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in and store the session
    Login {
        /// Defaults to the last user who signed in
        username: Option<String>,
    },
    /// Create an account (password is prompted)
    Register(RegisterArgs),
    /// Revoke and forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check whether the stored access token is still accepted
    Verify,
    /// Search listings
    List(ListArgs),
    /// Show one listing
    Show { id: i64 },
    /// List property types
    Types,
    /// Create a listing
    Create(ListingArgs),
    /// Change fields of a listing you own; omitted fields keep their value
    Update {
        id: i64,
        #[command(flatten)]
        listing: ListingArgs,
    },
    /// Delete a listing you own
    Delete { id: i64 },
    /// Attach an image to a listing
    UploadImage {
        property_id: i64,
        path: PathBuf,
        /// Make this the listing's primary image
        #[arg(long)]
        primary: bool,
    },
    /// List your favorites
    Favorites,
    /// Add a listing to your favorites
    Favorite { property_id: i64 },
    /// Remove a favorite by its id
    Unfavorite { favorite_id: i64 },
    /// Show the rating summary for a listing
    Reviews { property_id: i64 },
    /// Rate a listing
    Review {
        property_id: i64,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=5))]
        rating: u32,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub min_price: Option<u64>,
    #[arg(long)]
    pub max_price: Option<u64>,
    #[arg(long)]
    pub bedrooms: Option<u32>,
    #[arg(long)]
    pub bathrooms: Option<u32>,
    /// Property type name
    #[arg(long = "type")]
    pub property_type: Option<String>,
    #[arg(long, value_enum)]
    pub listing: Option<Listing>,
    #[arg(long)]
    pub city: Option<String>,
    /// Owner user id
    #[arg(long)]
    pub owner: Option<i64>,
    /// Remember these filters for `--saved`
    #[arg(long, conflicts_with = "saved")]
    pub save_filters: bool,
    /// Use the filters saved earlier
    #[arg(long)]
    pub saved: bool,
}

impl ListArgs {
    pub fn filters(&self) -> PropertyFilters {
        PropertyFilters {
            min_price: self.min_price,
            max_price: self.max_price,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            property_type: self.property_type.clone(),
            listing_type: self.listing.map(ListingType::from),
            city: self.city.clone(),
            owner: self.owner,
        }
    }
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub phone: Option<String>,
    /// e.g. buyer, seller, agent
    #[arg(long)]
    pub role: Option<String>,
    #[arg(long)]
    pub bio: Option<String>,
}

/// Listing fields shared by `create` and `update`.
#[derive(Args, Debug, Default)]
pub struct ListingArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<f64>,
    /// Property type id (see `types`)
    #[arg(long = "type-id")]
    pub property_type_id: Option<i64>,
    #[arg(long, value_enum)]
    pub listing: Option<Listing>,
    #[arg(long)]
    pub bedrooms: Option<u32>,
    #[arg(long)]
    pub bathrooms: Option<f64>,
    #[arg(long)]
    pub square_feet: Option<u32>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub zip_code: Option<String>,
    #[arg(long)]
    pub latitude: Option<f64>,
    #[arg(long)]
    pub longitude: Option<f64>,
    #[arg(long, value_enum)]
    pub status: Option<Status>,
}

impl ListingArgs {
    /// Input for a new listing. Fails naming the first missing required field.
    pub fn to_new_input(&self) -> Result<PropertyInput, String> {
        fn required<T: Clone>(value: &Option<T>, flag: &str) -> Result<T, String> {
            value.clone().ok_or_else(|| format!("--{} is required to create a listing", flag))
        }

        Ok(PropertyInput {
            title: required(&self.title, "title")?,
            description: self.description.clone().unwrap_or_default(),
            price: required(&self.price, "price")?,
            property_type_id: required(&self.property_type_id, "type-id")?,
            listing_type: required(&self.listing, "listing")?.into(),
            bedrooms: self.bedrooms.unwrap_or_default(),
            bathrooms: self.bathrooms.unwrap_or_default(),
            square_feet: self.square_feet.unwrap_or_default(),
            address: required(&self.address, "address")?,
            city: required(&self.city, "city")?,
            state: required(&self.state, "state")?,
            zip_code: required(&self.zip_code, "zip-code")?,
            latitude: self.latitude,
            longitude: self.longitude,
            status: self.status.map(SaleStatus::from).unwrap_or_default(),
        })
    }

    /// Overwrite the fields that were given on the command line.
    pub fn apply(&self, input: &mut PropertyInput) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut input.title, &self.title);
        set(&mut input.description, &self.description);
        set(&mut input.price, &self.price);
        set(&mut input.property_type_id, &self.property_type_id);
        set(&mut input.bedrooms, &self.bedrooms);
        set(&mut input.bathrooms, &self.bathrooms);
        set(&mut input.square_feet, &self.square_feet);
        set(&mut input.address, &self.address);
        set(&mut input.city, &self.city);
        set(&mut input.state, &self.state);
        set(&mut input.zip_code, &self.zip_code);
        if let Some(listing) = self.listing {
            input.listing_type = listing.into();
        }
        if let Some(status) = self.status {
            input.status = status.into();
        }
        if self.latitude.is_some() {
            input.latitude = self.latitude;
        }
        if self.longitude.is_some() {
            input.longitude = self.longitude;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Status {
    Available,
    Pending,
    Sold,
}

impl From<Status> for SaleStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Available => SaleStatus::Available,
            Status::Pending => SaleStatus::Pending,
            Status::Sold => SaleStatus::Sold,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Listing {
    Rent,
    Sale,
}

impl From<Listing> for ListingType {
    fn from(listing: Listing) -> Self {
        match listing {
            Listing::Rent => ListingType::Rent,
            Listing::Sale => ListingType::Sale,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Keyring,
    File,
    Memory,
}

impl From<StoreKind> for CredentialBackend {
    fn from(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Keyring => CredentialBackend::Keyring,
            StoreKind::File => CredentialBackend::File,
            StoreKind::Memory => CredentialBackend::Memory,
        }
    }
}
