// Password hashing, session tokens and the optional bearer guard

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{extract_bearer_token, AuthenticatedAccount, Claims, JwtService};
pub use middleware::{cors_layer, jwt_auth_middleware, security_headers_layer};
pub use password::{
    generate_refresh_token, HashedPassword, PasswordError, PasswordPolicy, PasswordService,
};
