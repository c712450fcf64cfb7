//! Authentication and admission core.
//!
//! ## Token schemes
//!
//! Two schemes sign bearer tokens:
//!
//! - **Asymmetric** (`RS256`): signed with the RSA private key, verified with the
//!   public key. Used for profile access, admin checks and the session cookie.
//! - **Symmetric** (`HS256`): signed and verified with a shared secret. Kept for a
//!   narrow legacy surface.
//!
//! A token is only valid under the scheme it was signed with.
//!
//! ## Admission
//!
//! Every route has an explicit entry in the [`RoutePolicyTable`]. The [`admit`]
//! middleware looks it up, validates the credential from the declared source,
//! and consults the [`PermissionResolver`] only for admin routes and only after
//! the token has been accepted.
//!
//! ## Session cookie
//!
//! [`SessionCookieManager`] re-issues the current session cookie with new
//! lifetime attributes. It never changes the token itself.

pub mod cookie;
pub mod error;
pub mod guard;
pub mod keys;
pub mod permission;
pub mod policy;
pub mod token;

pub use cookie::{Attr, CookieDirective, CookiePolicy, SameSite, SessionCookieManager};
pub use error::AdmissionError;
pub use guard::{Admission, Verdict, admit, extract_credential};
pub use keys::{KeyMaterial, KeyMaterialSource, Scheme};
pub use permission::{PermissionResolver, PgPermissionResolver};
pub use policy::{Access, CredentialSource, RoutePolicy, RoutePolicyTable};
pub use token::{Claims, IdentityClaim, TokenValidator};
