//! Business logic over the datastore.
//!
//! # Services
//!
//! - `guard` - Membership and ownership checks, fail closed
//! - `households` - Household creation and membership management
//! - `invitations` - Invitation lifecycle and notification
//! - `pantry` - Pantry item lifecycle
//! - `shopping_list` - Deduplicated shopping list
//! - `email` - Invitation email delivery
//! - `product_lookup` - Barcode metadata lookup
//!
//! Services borrow a `&dyn Datastore` and are built per request, e.g.
//! `PantryService::new(state.store())`.

pub mod email;
pub mod guard;
pub mod households;
pub mod invitations;
pub mod pantry;
pub mod product_lookup;
pub mod shopping_list;

pub use email::{DisabledMailer, EmailError, InvitationMailer, InvitationNotice, SmtpMailer};
pub use guard::AccessGuard;
pub use households::HouseholdService;
pub use invitations::{InvitationDetails, InvitationService};
pub use pantry::PantryService;
pub use product_lookup::{ProductInfo, ProductLookupClient, ProductLookupError};
pub use shopping_list::ShoppingListService;
