//! `bazaar-parties`: marketplace accounts and vendor (store) profiles.

pub mod user;
pub mod vendor;

pub use user::{
    AccountStatus, Address, NewUser, ProfileUpdate, User, UserProfile, UserQuery, normalize_email,
};
pub use vendor::{
    NewVendor, Vendor, VendorProfileUpdate, VendorQuery, VendorStatus, sort_for_directory,
};
