use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PasswordError {
    #[error("Password must be at least {0} characters long.")]
    TooShort(usize),
    #[error("Password must contain at least one uppercase letter.")]
    NoUppercase,
    #[error("Password must contain at least one lowercase letter.")]
    NoLowercase,
    #[error("Password must contain at least one number.")]
    NoNumber,
    #[error("Failed to hash password")]
    HashingFailed,
    #[error("Failed to verify password")]
    VerificationFailed,
    #[error("Stored salt is not valid")]
    InvalidSalt,
    #[error("Password task was cancelled")]
    Interrupted,
}

/// Password strength requirements
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_number: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 6,
            require_uppercase: true,
            require_lowercase: true,
            require_number: true,
        }
    }
}

impl PasswordPolicy {
    /// Reports the first requirement the password misses.
    pub fn check(&self, password: &str) -> Result<(), PasswordError> {
        if password.chars().count() < self.min_length {
            return Err(PasswordError::TooShort(self.min_length));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(PasswordError::NoUppercase);
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            return Err(PasswordError::NoLowercase);
        }
        if self.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordError::NoNumber);
        }
        Ok(())
    }
}

/// A bcrypt hash together with the base64 salt it was produced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    pub hash: String,
    pub salt: String,
}

/// bcrypt hashing with a per-account random salt.
#[derive(Debug, Clone)]
pub struct PasswordService {
    cost: u32,
}

impl PasswordService {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<HashedPassword, PasswordError> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);

        let hash = self.hash_with_salt(password, salt)?;
        Ok(HashedPassword {
            hash,
            salt: STANDARD.encode(salt),
        })
    }

    /// Recomputes the hash with the stored salt and compares it to the stored hash.
    pub fn verify(&self, password: &str, hash: &str, salt: &str) -> Result<bool, PasswordError> {
        let decoded = STANDARD
            .decode(salt)
            .map_err(|_| PasswordError::InvalidSalt)?;
        let salt: [u8; 16] = decoded
            .try_into()
            .map_err(|_| PasswordError::InvalidSalt)?;

        let cost = hash
            .parse::<bcrypt::HashParts>()
            .map_err(|_| PasswordError::VerificationFailed)?
            .get_cost();
        let recomputed = bcrypt::hash_with_salt(password, cost, salt)
            .map_err(|_| PasswordError::VerificationFailed)?
            .format_for_version(bcrypt::Version::TwoB);

        Ok(recomputed == hash)
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    pub async fn hash_blocking(&self, password: String) -> Result<HashedPassword, PasswordError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|_| PasswordError::Interrupted)?
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    pub async fn verify_blocking(
        &self,
        password: String,
        hash: String,
        salt: String,
    ) -> Result<bool, PasswordError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify(&password, &hash, &salt))
            .await
            .map_err(|_| PasswordError::Interrupted)?
    }

    fn hash_with_salt(&self, password: &str, salt: [u8; 16]) -> Result<String, PasswordError> {
        bcrypt::hash_with_salt(password, self.cost, salt)
            .map(|parts| parts.format_for_version(bcrypt::Version::TwoB))
            .map_err(|_| PasswordError::HashingFailed)
    }
}

/// Opaque refresh token: 64 random bytes, base64 encoded.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
